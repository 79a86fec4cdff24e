//! Alias definitions: named shortcuts bundling a method, a path, optional
//! data and a settings layer.

use super::location::{service_bucket, validate_name, Location};
use super::settings::Settings;
use super::storage::{read_settings, write_settings};
use crate::constants;
use crate::error::Error;
use crate::invocation::HttpMethod;
use crate::params::find_params;
use crate::store::{StoreRead, WriteTx};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDef {
    pub name: String,
    pub description: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub data: String,
}

/// A create-or-update request for an alias. `None` fields keep what is stored.
#[derive(Debug, Clone, Default)]
pub struct AliasUpdate {
    pub name: String,
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub data: Option<String>,
    pub description: Option<String>,
    pub settings: Settings,
}

/// Alias names become top-level commands, so built-in command names are off limits.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] for invalid or reserved names.
pub fn validate_alias_name(name: &str) -> Result<(), Error> {
    validate_name(name)?;
    if name.starts_with('-') {
        return Err(Error::invalid_name(name, "alias names cannot start with '-'"));
    }
    if constants::RESERVED_COMMANDS.contains(&name) {
        return Err(Error::invalid_name(
            name,
            "alias names cannot shadow a built-in command",
        ));
    }
    Ok(())
}

/// Loads one alias of a service.
///
/// # Errors
///
/// Returns [`Error::NoAliases`] if the service has no aliases at all and
/// [`Error::NoAlias`] if this one is missing or incomplete.
pub fn read_alias(tx: &impl StoreRead, service: &str, name: &str) -> Result<AliasDef, Error> {
    let aliases = service_bucket(service).child(constants::BUCKET_ALIASES);
    if !tx.bucket_exists(&aliases)? {
        return Err(Error::NoAliases);
    }
    let bucket = aliases.child(name);
    let no_alias = || Error::NoAlias {
        alias: name.to_string(),
    };
    if !tx.bucket_exists(&bucket)? {
        return Err(no_alias());
    }

    let method = tx
        .get(&bucket, constants::KEY_METHOD)?
        .ok_or_else(no_alias)?
        .parse()?;
    let path = tx.get(&bucket, constants::KEY_PATH)?.ok_or_else(no_alias)?;

    Ok(AliasDef {
        name: name.to_string(),
        description: tx.get(&bucket, constants::KEY_DESCRIPTION)?,
        method,
        path,
        data: tx.get(&bucket, constants::KEY_DATA)?.unwrap_or_default(),
    })
}

/// All aliases of a service, by name.
///
/// # Errors
///
/// Returns [`Error::NoAliases`] if the service has none.
pub fn list_aliases(tx: &impl StoreRead, service: &str) -> Result<Vec<AliasDef>, Error> {
    let aliases = service_bucket(service).child(constants::BUCKET_ALIASES);
    let names = tx.buckets(&aliases)?;
    if names.is_empty() {
        return Err(Error::NoAliases);
    }
    names
        .iter()
        .map(|name| read_alias(tx, service, name))
        .collect()
}

/// Parameters referenced by an alias: in its path, its own header and query
/// values, and its data.
///
/// # Errors
///
/// Returns an error if the alias settings cannot be read.
pub fn alias_params(
    tx: &impl StoreRead,
    service: &str,
    alias: &AliasDef,
) -> Result<BTreeSet<String>, Error> {
    let location = Location::Alias {
        service: service.to_string(),
        alias: alias.name.clone(),
    };
    let settings = read_settings(tx, &location.bucket())?;

    let mut params = find_params(&alias.path);
    params.extend(find_params(&alias.data));
    for value in settings.headers.values().chain(settings.queries.values()) {
        params.extend(find_params(value));
    }
    Ok(params)
}

/// Creates or updates an alias.
///
/// # Errors
///
/// Returns [`Error::NoAlias`] when a new alias lacks a method or path, and
/// [`Error::InvalidName`] for reserved names.
pub fn write_alias(tx: &mut WriteTx<'_>, service: &str, update: &AliasUpdate) -> Result<(), Error> {
    validate_alias_name(&update.name)?;
    let bucket = Location::Alias {
        service: service.to_string(),
        alias: update.name.clone(),
    }
    .bucket();
    let no_alias = || Error::NoAlias {
        alias: update.name.clone(),
    };

    if let Some(method) = update.method {
        tx.put(&bucket, constants::KEY_METHOD, method.as_str())?;
    } else if tx.get(&bucket, constants::KEY_METHOD)?.is_none() {
        return Err(no_alias());
    }

    if let Some(path) = &update.path {
        validate_name(path)?;
        tx.put(&bucket, constants::KEY_PATH, path)?;
    } else if tx.get(&bucket, constants::KEY_PATH)?.is_none() {
        return Err(no_alias());
    }

    if let Some(description) = &update.description {
        tx.put(&bucket, constants::KEY_DESCRIPTION, description)?;
    }
    if let Some(data) = update.data.as_deref().filter(|d| !d.is_empty()) {
        tx.put(&bucket, constants::KEY_DATA, data)?;
    }

    write_settings(tx, &bucket, &update.settings)?;
    tracing::debug!(service, alias = %update.name, "alias written");
    Ok(())
}
