//! Centralized string constants for the rest CLI
//!
//! Bucket and key names of the persisted layout live here so that the
//! settings codec, the resolver and the service manager agree on them.

// Root buckets
pub const BUCKET_INFO: &str = "info";
pub const BUCKET_SERVICES: &str = "services";

// Info keys
pub const KEY_CURRENT: &str = "current";
pub const KEY_VERSION: &str = "version";

// Service sub-buckets
pub const BUCKET_PATHS: &str = "paths";
pub const BUCKET_ALIASES: &str = "aliases";

// Settings scalars
pub const KEY_SCHEME: &str = "scheme";
pub const KEY_HOST: &str = "host";
pub const KEY_PORT: &str = "port";
pub const KEY_BASE_PATH: &str = "base-path";
pub const KEY_USERNAME: &str = "username";
pub const KEY_PASSWORD: &str = "password";

// Settings maps
pub const BUCKET_HEADERS: &str = "headers";
pub const BUCKET_PARAMETERS: &str = "parameters";
pub const BUCKET_QUERIES: &str = "queries";

// Output group
pub const BUCKET_OUTPUT: &str = "output";
pub const KEY_PRETTY: &str = "pretty";
pub const KEY_INDENT: &str = "indent";
pub const KEY_FILTER: &str = "filter";
pub const KEY_RESPONSE_HOOK: &str = "response-hook";
pub const KEY_REQUEST_HOOK: &str = "request-hook";
pub const KEY_REQUEST_DATA_HOOK: &str = "request-data-hook";
pub const BUCKET_SET_PARAMETERS: &str = "set-parameters";

// Retry group
pub const BUCKET_RETRY: &str = "retry";
pub const KEY_RETRIES: &str = "retries";
pub const KEY_DELAY: &str = "delay";
pub const KEY_EXPONENTIAL_BACKOFF: &str = "exponential-backoff";
pub const KEY_JITTER: &str = "jitter";

// Alias keys
pub const KEY_DESCRIPTION: &str = "description";
pub const KEY_PATH: &str = "path";
pub const KEY_METHOD: &str = "method";
pub const KEY_DATA: &str = "data";

// Environment variables
pub const ENV_DB: &str = "REST_DB";
pub const ENV_LOG: &str = "REST_LOG";
pub const ENV_LOG_FORMAT: &str = "REST_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "REST_LOG_FILE";
pub const ENV_LOG_MAX_BODY: &str = "REST_LOG_MAX_BODY";
pub const ENV_HOOK_SITE: &str = "REST_HOOK_SITE";

/// File name of the store inside the home directory.
pub const DEFAULT_DB_FILE: &str = ".rest.db";

/// Built-in command names an alias may not shadow.
pub const RESERVED_COMMANDS: &[&str] = &[
    "service", "get", "post", "put", "delete", "patch", "head", "options", "version", "help",
];
