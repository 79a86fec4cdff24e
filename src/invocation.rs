//! CLI-agnostic invocation model.
//!
//! The executor takes a [`RequestCall`] and returns an [`Outcome`]; clap types
//! never reach the engine.

use crate::config::settings::Settings;
use crate::error::Error;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported request methods. Stored and displayed lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Head,
        Self::Options,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Head => "head",
            Self::Options => "options",
        }
    }

    #[must_use]
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| Error::InvalidMethod {
                method: s.to_string(),
            })
    }
}

/// One request as asked for on the command line.
#[derive(Debug, Clone)]
pub struct RequestCall {
    /// Target service; `None` means the current service.
    pub service: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub data: String,
    /// Set when the request was issued through an alias of this name.
    pub alias: Option<String>,
    /// Highest-precedence settings layer, from command-line flags.
    pub cli: Settings,
    pub no_headers: bool,
    pub no_queries: bool,
}

/// The mutable parts of a request seen by hooks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestParts {
    pub path: String,
    pub data: String,
    pub headers: BTreeMap<String, String>,
    pub queries: BTreeMap<String, String>,
}

/// Result of a completed exchange, ready for printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: u16,
    /// Bytes to print; the raw body when neither filter nor pretty applies.
    pub display: Vec<u8>,
    pub exit_code: i32,
}

/// Maps an HTTP status to the process exit code: 0 for 2xx, otherwise the
/// status class digit.
#[must_use]
pub fn exit_code_for(status: u16) -> i32 {
    if (200..300).contains(&status) {
        0
    } else {
        i32::from(status / 100)
    }
}
