//! Typed addresses of settings buckets.

use crate::constants;
use crate::error::Error;
use crate::invocation::HttpMethod;
use crate::store::BucketPath;
use std::fmt;

/// Where a layer of settings lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Service {
        service: String,
    },
    Path {
        service: String,
        path: String,
    },
    Method {
        service: String,
        path: String,
        method: HttpMethod,
    },
    Alias {
        service: String,
        alias: String,
    },
}

/// Checks a service, path or alias name before it becomes a bucket name.
///
/// Names must be non-empty and free of control characters. Paths keep their
/// slashes and placeholders verbatim.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] describing the first violated rule.
pub fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "name cannot be empty"));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid_name(
            name,
            "name cannot contain control characters",
        ));
    }
    Ok(())
}

/// Bucket of a service: `services/<service>`.
#[must_use]
pub fn service_bucket(service: &str) -> BucketPath {
    BucketPath::root(constants::BUCKET_SERVICES).child(service)
}

impl Location {
    /// Builds a location from the optional parts given on the command line.
    ///
    /// An alias takes the place of path and method.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid, the method is unknown, or both
    /// an alias and a path are given.
    pub fn from_parts(
        service: &str,
        path: Option<&str>,
        method: Option<&str>,
        alias: Option<&str>,
    ) -> Result<Self, Error> {
        validate_name(service)?;
        let service = service.to_string();
        match (alias, path, method) {
            (Some(alias), None, None) => {
                validate_name(alias)?;
                Ok(Self::Alias {
                    service,
                    alias: alias.to_string(),
                })
            }
            (Some(_), _, _) => Err(Error::InvalidArgument(
                "an alias location cannot also name a path or method".to_string(),
            )),
            (None, None, _) => Ok(Self::Service { service }),
            (None, Some(path), None) => {
                validate_name(path)?;
                Ok(Self::Path {
                    service,
                    path: path.to_string(),
                })
            }
            (None, Some(path), Some(method)) => {
                validate_name(path)?;
                Ok(Self::Method {
                    service,
                    path: path.to_string(),
                    method: method.parse()?,
                })
            }
        }
    }

    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::Service { service }
            | Self::Path { service, .. }
            | Self::Method { service, .. }
            | Self::Alias { service, .. } => service,
        }
    }

    #[must_use]
    pub fn bucket(&self) -> BucketPath {
        let root = service_bucket(self.service());
        match self {
            Self::Service { .. } => root,
            Self::Path { path, .. } => root.child(constants::BUCKET_PATHS).child(path),
            Self::Method { path, method, .. } => root
                .child(constants::BUCKET_PATHS)
                .child(path)
                .child(method.as_str()),
            Self::Alias { alias, .. } => root.child(constants::BUCKET_ALIASES).child(alias),
        }
    }

    /// The error reported when this location does not exist.
    #[must_use]
    pub fn missing(&self) -> Error {
        match self {
            Self::Service { service } => Error::NoSuchService {
                name: service.clone(),
            },
            Self::Alias { alias, .. } => Error::NoAlias {
                alias: alias.clone(),
            },
            Self::Path { .. } | Self::Method { .. } => Error::InvalidPath {
                path: self.to_string(),
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service { service } => write!(f, "{service}"),
            Self::Path { service, path } => write!(f, "{service} {path}"),
            Self::Method {
                service,
                path,
                method,
            } => write!(f, "{service} {method} {path}"),
            Self::Alias { service, alias } => write!(f, "{service} alias {alias}"),
        }
    }
}
