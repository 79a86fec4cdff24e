pub mod args;
pub mod commands;
pub mod errors;
pub mod tracing_init;

use crate::constants;
use args::{parse_key_value, parse_retry_delay};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Flags accepted anywhere on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Increase logging verbosity, up to three times
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = ArgAction::Count,
        help = "Increase logging verbosity (-v requests and statuses, -vv headers, -vvv bodies)"
    )]
    pub verbosity: u8,

    /// Configuration database to use
    #[arg(
        long,
        global = true,
        env = constants::ENV_DB,
        value_name = "PATH",
        help = "Configuration database (default: ~/.rest.db)"
    )]
    pub db: Option<PathBuf>,

    /// Suppress non-essential output (confirmations)
    /// Response bodies and listings are always printed
    #[arg(
        long,
        short = 'q',
        global = true,
        help = "Suppress informational output"
    )]
    pub quiet: bool,

    /// Output all errors as structured JSON to stderr
    #[arg(long, global = true, help = "Output errors in JSON format")]
    pub json_errors: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "rest",
    author,
    version,
    about = "rest: HTTP client with persistent, layered service configuration",
    long_about = "rest sends HTTP requests to named services whose settings are stored\n\
                  in a local database. Settings layer from service to path to method\n\
                  to alias, and command-line flags override them all.\n\n\
                  Examples:\n  \
                  rest service init api --host api.example.com\n  \
                  rest get /users/:id --parameter id=42 --pretty\n  \
                  rest post /users '{\"name\":\"Ann\"}' --filter id\n  \
                  rest service alias user get /users/:id\n  \
                  rest user --id 42"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage services, their settings and aliases
    #[command(long_about = "Manage services and their stored settings.\n\n\
                      Settings can be stored on a service, on one of its paths, on a\n\
                      method of a path, or on an alias.\n\n\
                      Examples:\n  \
                      rest service init api --host api.example.com --port 8443\n  \
                      rest service set api /users --header Accept=application/json\n  \
                      rest service set api /users post --parameter role=admin\n  \
                      rest service unset api --header Accept\n  \
                      rest service config api")]
    Service {
        #[command(subcommand)]
        command: ServiceCommands,
    },
    /// Perform a GET request
    Get(RequestArgs),
    /// Perform a POST request
    Post(RequestArgs),
    /// Perform a PUT request
    Put(RequestArgs),
    /// Perform a DELETE request
    Delete(RequestArgs),
    /// Perform a PATCH request
    Patch(RequestArgs),
    /// Perform a HEAD request
    Head(RequestArgs),
    /// Perform an OPTIONS request
    Options(RequestArgs),
    /// Display version info
    Version,
    /// Run an alias defined with `rest service alias`
    #[command(external_subcommand)]
    Alias(Vec<String>),
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// Create a service
    Init {
        /// Service name
        name: String,
        /// Replace the service if it already exists
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Delete a service and everything stored under it
    Remove {
        /// Service name
        name: String,
    },
    /// Store settings on a service, path, method or alias
    Set {
        /// Service name
        name: String,
        /// Request path the settings apply to
        path: Option<String>,
        /// Method of the path the settings apply to
        method: Option<String>,
        /// Alias the settings apply to
        #[arg(long, conflicts_with_all = ["path", "method"])]
        alias: Option<String>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Remove stored settings from a service, path, method or alias
    Unset {
        /// Service name
        name: String,
        /// Request path to unset settings on
        path: Option<String>,
        /// Method of the path to unset settings on
        method: Option<String>,
        /// Alias to unset settings on
        #[arg(long, conflicts_with_all = ["path", "method"])]
        alias: Option<String>,
        /// Remove everything stored at the location
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        fields: UnsetArgs,
    },
    /// Switch the current service
    Use {
        /// Service name
        name: String,
    },
    /// List services; the current one is marked with '*'
    List,
    /// Show stored configuration
    Config {
        /// Service to show; all services when omitted
        name: Option<String>,
        /// Dotted key inside the service, e.g. headers.Accept or paths./users
        key: Option<String>,
    },
    /// Create or update an alias
    Alias {
        /// Alias name, usable as a command: `rest <name>`
        name: String,
        /// Request method
        method: Option<String>,
        /// Request path
        path: Option<String>,
        /// Request body
        data: Option<String>,
        /// Description shown in the alias help
        #[arg(long)]
        description: Option<String>,
        /// Service to add the alias to (default: current service)
        #[arg(long, short = 's')]
        service: Option<String>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// List the aliases of a service
    Aliases {
        /// Service name (default: current service)
        service: Option<String>,
    },
}

/// Arguments of a direct request command.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Request path, may reference parameters as :name, {name} or {{name}}
    pub path: String,
    /// Request body
    pub data: Option<String>,
    #[command(flatten)]
    pub flags: RequestFlags,
}

/// Flags shared by direct requests and alias invocations.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestFlags {
    /// Service to use (default: current service)
    #[arg(long, short = 's', value_name = "SERVICE")]
    pub service: Option<String>,
    /// Ignore stored headers
    #[arg(long)]
    pub no_headers: bool,
    /// Ignore stored queries
    #[arg(long)]
    pub no_queries: bool,
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Every setting that can be given on the command line.
///
/// Boolean settings take an optional value: `--pretty` and `--pretty=true`
/// are the same, `--pretty=false` overrides a stored `true`.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    #[arg(long, value_name = "SCHEME", help_heading = "Settings", help = "URL scheme, e.g. https")]
    pub scheme: Option<String>,
    #[arg(long, value_name = "HOST", help_heading = "Settings", help = "Host name")]
    pub host: Option<String>,
    #[arg(long, value_name = "PORT", help_heading = "Settings", help = "Port")]
    pub port: Option<u16>,
    #[arg(long, value_name = "PATH", help_heading = "Settings", help = "Path prefix for every request")]
    pub base_path: Option<String>,
    #[arg(long, value_name = "USER", help_heading = "Settings", help = "Basic auth username")]
    pub username: Option<String>,
    #[arg(long, value_name = "PASSWORD", help_heading = "Settings", help = "Basic auth password")]
    pub password: Option<String>,

    #[arg(
        long = "header",
        short = 'H',
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help_heading = "Settings",
        help = "Request header (repeatable)"
    )]
    pub headers: Vec<(String, String)>,
    #[arg(
        long = "parameter",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help_heading = "Settings",
        help = "Parameter for :name, {name} and {{name}} references (repeatable)"
    )]
    pub parameters: Vec<(String, String)>,
    #[arg(
        long = "query",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help_heading = "Settings",
        help = "Query parameter (repeatable)"
    )]
    pub queries: Vec<(String, String)>,

    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        help_heading = "Output",
        help = "Pretty-print JSON responses"
    )]
    pub pretty: Option<bool>,
    #[arg(long, value_name = "INDENT", help_heading = "Output", help = "Indent string for pretty output")]
    pub pretty_indent: Option<String>,
    #[arg(long, short = 'f', value_name = "EXPR", help_heading = "Output", help = "JMESPath expression applied to the response")]
    pub filter: Option<String>,
    #[arg(long, value_name = "CODE", help_heading = "Hooks", help = "Shell code rewriting the response body")]
    pub response_hook: Option<String>,
    #[arg(long, value_name = "CODE", help_heading = "Hooks", help = "Shell code rewriting the request")]
    pub request_hook: Option<String>,
    #[arg(long, value_name = "CODE", help_heading = "Hooks", help = "Shell code rewriting the request body")]
    pub request_data_hook: Option<String>,
    #[arg(
        long = "set-parameter",
        value_name = "RULE=EXPR",
        value_parser = parse_key_value,
        help_heading = "Output",
        help = "Store the result of EXPR on the response as the parameter RULE (repeatable)"
    )]
    pub set_parameters: Vec<(String, String)>,

    #[arg(long, value_name = "N", help_heading = "Retry", help = "Retries after the first attempt")]
    pub retries: Option<u32>,
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = parse_retry_delay,
        help_heading = "Retry",
        help = "Base delay between attempts (e.g. '500ms', '1s')"
    )]
    pub retry_delay: Option<Duration>,
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        help_heading = "Retry",
        help = "Grow the delay exponentially between attempts"
    )]
    pub exponential_backoff: Option<bool>,
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        require_equals = true,
        help_heading = "Retry",
        help = "Randomise each delay below its computed value"
    )]
    pub jitter: Option<bool>,
}

/// Selects stored fields to remove. Map fields take the keys to remove.
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct UnsetArgs {
    #[arg(long, help_heading = "Fields")]
    pub scheme: bool,
    #[arg(long, help_heading = "Fields")]
    pub host: bool,
    #[arg(long, help_heading = "Fields")]
    pub port: bool,
    #[arg(long, help_heading = "Fields")]
    pub base_path: bool,
    #[arg(long, help_heading = "Fields")]
    pub username: bool,
    #[arg(long, help_heading = "Fields")]
    pub password: bool,
    #[arg(long = "header", value_name = "KEY", help_heading = "Fields")]
    pub headers: Vec<String>,
    #[arg(long = "parameter", value_name = "KEY", help_heading = "Fields")]
    pub parameters: Vec<String>,
    #[arg(long = "query", value_name = "KEY", help_heading = "Fields")]
    pub queries: Vec<String>,
    #[arg(long, help_heading = "Fields")]
    pub pretty: bool,
    #[arg(long, help_heading = "Fields")]
    pub pretty_indent: bool,
    #[arg(long, help_heading = "Fields")]
    pub filter: bool,
    #[arg(long, help_heading = "Fields")]
    pub response_hook: bool,
    #[arg(long, help_heading = "Fields")]
    pub request_hook: bool,
    #[arg(long, help_heading = "Fields")]
    pub request_data_hook: bool,
    #[arg(long = "set-parameter", value_name = "RULE", help_heading = "Fields")]
    pub set_parameters: Vec<String>,
    #[arg(long, help_heading = "Fields")]
    pub retries: bool,
    #[arg(long, help_heading = "Fields")]
    pub retry_delay: bool,
    #[arg(long, help_heading = "Fields")]
    pub exponential_backoff: bool,
    #[arg(long, help_heading = "Fields")]
    pub jitter: bool,
}
