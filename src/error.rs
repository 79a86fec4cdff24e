use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which scripting hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSite {
    RequestData,
    Request,
    Response,
}

impl HookSite {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RequestData => "request-data",
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for HookSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The point inside a hook run where it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Start,
    Execute,
    Output,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "starting hook",
            Self::Execute => "running hook code",
            Self::Output => "reading hook output",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store error: {0}")]
    Store(#[from] redb::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("malformed database, no {bucket} bucket")]
    MalformedDatabase { bucket: String },
    #[error("no current service set")]
    NoServiceSet,
    #[error("no service {name} found")]
    NoSuchService { name: String },
    #[error("service {name} already exists")]
    ServiceExists { name: String },
    #[error("path {path} not valid")]
    InvalidPath { path: String },
    #[error("no alias {alias} defined")]
    NoAlias { alias: String },
    #[error("no aliases defined")]
    NoAliases,
    #[error("no destination to write settings to")]
    NoDestination,
    #[error("hook error during {site} hook ({stage}): {reason}")]
    Hook {
        site: HookSite,
        stage: HookStage,
        reason: String,
    },
    #[error("filter '{expression}' failed: {reason}")]
    Filter { expression: String, reason: String },
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("unsupported request method '{method}'")]
    InvalidMethod { method: String },
    #[error("stored value for {key} is not valid: '{value}'")]
    InvalidStoredValue { key: String, value: String },
    #[error("{0}")]
    InvalidArgument(String),
}

/// JSON representation of an error for structured output
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonError {
    pub error_type: String,
    pub message: String,
    pub context: Option<String>,
}

impl Error {
    #[must_use]
    pub fn hook(site: HookSite, stage: HookStage, reason: impl Into<String>) -> Self {
        Self::Hook {
            site,
            stage,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn filter(expression: &str, reason: impl fmt::Display) -> Self {
        Self::Filter {
            expression: expression.to_string(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn malformed(bucket: &str) -> Self {
        Self::MalformedDatabase {
            bucket: bucket.to_string(),
        }
    }

    /// Convert error to JSON representation for structured output
    #[must_use]
    pub fn to_json(&self) -> JsonError {
        let (error_type, context) = match self {
            Self::Io(io_err) => (
                "FileSystem",
                match io_err.kind() {
                    std::io::ErrorKind::NotFound => {
                        Some("Check that the file path is correct and the file exists.")
                    }
                    std::io::ErrorKind::PermissionDenied => {
                        Some("Check file permissions or run with appropriate privileges.")
                    }
                    _ => None,
                },
            ),
            Self::Network(req_err) => (
                "Network",
                if req_err.is_connect() {
                    Some("Check that the service is running and the host and port are correct.")
                } else if req_err.is_timeout() {
                    Some("The service may be slow or unresponsive. Try again later.")
                } else {
                    None
                },
            ),
            Self::Json(_) => (
                "JSONParsing",
                Some("Check that the response body is valid JSON, or disable --pretty."),
            ),
            Self::Store(_) => ("Store", Some("Check the database file passed with --db.")),
            Self::Url(_) => (
                "InvalidUrl",
                Some("Check the scheme, host, port and base-path of the service."),
            ),
            Self::MalformedDatabase { .. } => {
                ("MalformedDatabase", Some("Run 'rest service init <name>' first."))
            }
            Self::NoServiceSet => (
                "NoServiceSet",
                Some("Pass --service or run 'rest service use <name>'."),
            ),
            Self::NoSuchService { .. } => (
                "NoSuchService",
                Some("Use 'rest service list' to see configured services."),
            ),
            Self::ServiceExists { .. } => ("ServiceExists", Some("Use --force to overwrite.")),
            Self::InvalidPath { .. } => ("InvalidPath", None),
            Self::NoAlias { .. } | Self::NoAliases => (
                "NoAlias",
                Some("Use 'rest service aliases' to see the aliases of a service."),
            ),
            Self::NoDestination => ("NoDestination", None),
            Self::Hook { .. } => ("Hook", None),
            Self::Filter { .. } => ("Filter", Some("Check the JMESPath expression.")),
            Self::InvalidName { .. } => ("InvalidName", None),
            Self::InvalidMethod { .. } => (
                "InvalidMethod",
                Some("Use one of get, post, put, delete, patch, head, options."),
            ),
            Self::InvalidStoredValue { .. } => (
                "InvalidStoredValue",
                Some("Use 'rest service unset' to remove the value."),
            ),
            Self::InvalidArgument(_) => ("InvalidArgument", None),
        };

        JsonError {
            error_type: error_type.to_string(),
            message: self.to_string(),
            context: context.map(str::to_string),
        }
    }
}

macro_rules! store_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(e: $source) -> Self {
                    Self::Store(redb::Error::from(e))
                }
            }
        )*
    };
}

store_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
