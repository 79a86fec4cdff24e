//! Decides which stored settings layers apply to a request and merges them.
//!
//! Precedence, lowest first: built-in defaults, service, path, method (or
//! alias), command-line flags.
//!
//! Paths match by exact string equality: a request for `/users/42` does not
//! pick up settings stored for `/users/:id`. A template-aware matcher would
//! slot in at [`layers_for`].

use super::location::{service_bucket, Location};
use super::settings::Settings;
use super::storage::read_settings;
use crate::constants;
use crate::error::Error;
use crate::invocation::{HttpMethod, RequestCall};
use crate::store::{BucketPath, StoreRead};

/// Finds the service a command targets: the one given, else the current one.
///
/// # Errors
///
/// - [`Error::MalformedDatabase`] if the store was never initialised
/// - [`Error::NoServiceSet`] if no service is given and none is current
/// - [`Error::NoSuchService`] if the service does not exist
pub fn resolve_service(tx: &impl StoreRead, given: Option<&str>) -> Result<String, Error> {
    let info = BucketPath::root(constants::BUCKET_INFO);
    if !tx.bucket_exists(&info)? {
        return Err(Error::malformed(constants::BUCKET_INFO));
    }

    let name = match given {
        Some(name) => name.to_string(),
        None => tx
            .get(&info, constants::KEY_CURRENT)?
            .filter(|current| !current.is_empty())
            .ok_or(Error::NoServiceSet)?,
    };

    if !tx.bucket_exists(&BucketPath::root(constants::BUCKET_SERVICES))? {
        return Err(Error::malformed(constants::BUCKET_SERVICES));
    }
    if !tx.bucket_exists(&service_bucket(&name))? {
        return Err(Error::NoSuchService { name });
    }
    Ok(name)
}

/// Stored locations whose settings apply, lowest precedence first.
///
/// A request made through an existing alias uses only the service and the
/// alias; path and method buckets are not consulted for it.
///
/// # Errors
///
/// Returns a store error if the store cannot be read.
pub fn layers_for(
    tx: &impl StoreRead,
    service: &str,
    path: &str,
    method: HttpMethod,
    alias: Option<&str>,
) -> Result<Vec<Location>, Error> {
    let mut layers = vec![Location::Service {
        service: service.to_string(),
    }];

    if let Some(alias) = alias {
        let location = Location::Alias {
            service: service.to_string(),
            alias: alias.to_string(),
        };
        if tx.bucket_exists(&location.bucket())? {
            layers.push(location);
            return Ok(layers);
        }
    }

    if path.is_empty() {
        return Ok(layers);
    }
    let path_location = Location::Path {
        service: service.to_string(),
        path: path.to_string(),
    };
    if !tx.bucket_exists(&path_location.bucket())? {
        return Ok(layers);
    }
    layers.push(path_location);

    let method_location = Location::Method {
        service: service.to_string(),
        path: path.to_string(),
        method,
    };
    if tx.bucket_exists(&method_location.bucket())? {
        layers.push(method_location);
    }
    Ok(layers)
}

/// Settings for one request, after merging every layer.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub service: String,
    pub layers: Vec<Location>,
    pub settings: Settings,
}

/// Resolves the service and merges defaults, stored layers and the call's
/// command-line layer.
///
/// # Errors
///
/// Returns the errors of [`resolve_service`], or an error if a stored value
/// does not decode.
pub fn resolve(tx: &impl StoreRead, call: &RequestCall) -> Result<Resolved, Error> {
    let service = resolve_service(tx, call.service.as_deref())?;
    let layers = layers_for(tx, &service, &call.path, call.method, call.alias.as_deref())?;

    let stored = layers
        .iter()
        .map(|location| read_settings(tx, &location.bucket()))
        .collect::<Result<Vec<_>, _>>()?;
    let defaults = Settings::defaults();
    let settings = Settings::merge_all(
        std::iter::once(&defaults)
            .chain(&stored)
            .chain(std::iter::once(&call.cli)),
    );

    tracing::debug!(
        service = %service,
        layers = ?layers.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "resolved settings layers"
    );
    Ok(Resolved {
        service,
        layers,
        settings,
    })
}
