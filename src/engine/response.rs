//! Display pipeline and set-parameter feedback for a received response.

use super::transport::TransportResponse;
use crate::config::location::Location;
use crate::config::settings::Settings;
use crate::constants;
use crate::error::{Error, HookSite, HookStage};
use crate::filter::{evaluate, pretty_print, render_filtered, stored_text};
use crate::hooks::{run_response_hook, HookEngine};
use crate::invocation::HttpMethod;
use crate::store::{Store, StoreRead};
use std::collections::BTreeMap;

/// Bytes shown to the user for a response.
///
/// A configured filter wins over pretty-printing; otherwise the body is shown
/// byte for byte as received (after the response hook, if any). Only the hook,
/// filter and pretty paths read the body as text.
///
/// # Errors
///
/// Returns a hook error if the hook fails or returns a body that cannot be
/// pretty-printed, a filter error, or a JSON error for a non-JSON body with
/// pretty-printing on.
pub fn process_response(
    response: &TransportResponse,
    settings: &Settings,
    hooks: &dyn HookEngine,
) -> Result<Vec<u8>, Error> {
    let (body, ran_hook) = match settings.response_hook.as_deref() {
        Some(code) => (
            run_response_hook(
                hooks,
                code,
                response.status,
                &response.headers,
                &response.text(),
            )?
            .into_bytes(),
            true,
        ),
        None => (response.body.clone(), false),
    };

    let indent = settings.indent();
    if let Some(expression) = settings.filter.as_deref().filter(|f| !f.is_empty()) {
        let value = evaluate(&body, expression)?;
        return Ok(render_filtered(value.as_ref(), settings.is_pretty(), indent)?.into_bytes());
    }
    if settings.is_pretty() {
        if body.trim_ascii().is_empty() {
            return Ok(Vec::new());
        }
        return pretty_print(&body, indent).map(String::into_bytes).map_err(|e| {
            if ran_hook {
                Error::hook(
                    HookSite::Response,
                    HookStage::Output,
                    format!("hook returned a body that is not JSON: {e}"),
                )
            } else {
                e
            }
        });
    }
    Ok(body)
}

/// Splits a set-parameter rule key into the addressed location and the
/// parameter name.
///
/// Keys are dot-separated with the parameter name last, optionally preceded
/// by `parameters`:
///
/// - `token` or `parameters.token`: the service
/// - `paths./users.id`: the `/users` path; the path itself may contain dots
/// - `paths./users.post.id`: the `post` method of `/users`
/// - `aliases.login.token`: the `login` alias
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for any other shape.
pub fn parse_rule_target(service: &str, key: &str) -> Result<(Location, String), Error> {
    let invalid = || Error::InvalidPath {
        path: key.to_string(),
    };

    let mut segments: Vec<&str> = key.split('.').collect();
    let name = segments
        .pop()
        .filter(|n| !n.is_empty())
        .ok_or_else(invalid)?
        .to_string();
    if segments.last() == Some(&constants::BUCKET_PARAMETERS) {
        segments.pop();
    }

    let service = service.to_string();
    let location = match segments.split_first() {
        None => Location::Service { service },
        Some((&constants::BUCKET_ALIASES, [alias])) if !alias.is_empty() => Location::Alias {
            service,
            alias: (*alias).to_string(),
        },
        Some((&constants::BUCKET_PATHS, rest)) if !rest.is_empty() => {
            match rest.split_last() {
                Some((last, path)) if !path.is_empty() => match last.parse::<HttpMethod>() {
                    Ok(method) => Location::Method {
                        service,
                        path: path.join("."),
                        method,
                    },
                    Err(_) => Location::Path {
                        service,
                        path: rest.join("."),
                    },
                },
                _ => Location::Path {
                    service,
                    path: rest.join("."),
                },
            }
        }
        Some(_) => return Err(invalid()),
    };
    Ok((location, name))
}

/// Applies every set-parameter rule against the raw body in one write
/// transaction, so either all rules take effect or none do.
///
/// A rule whose expression selects nothing deletes its parameter.
///
/// # Errors
///
/// Returns a filter error, [`Error::InvalidPath`] for a malformed key or a
/// missing target bucket, or a store error.
pub fn apply_set_parameters(
    store: &Store,
    service: &str,
    rules: &BTreeMap<String, String>,
    raw_body: &[u8],
) -> Result<usize, Error> {
    if rules.is_empty() {
        return Ok(0);
    }

    let mut targets = Vec::with_capacity(rules.len());
    for (key, expression) in rules {
        let (location, name) = parse_rule_target(service, key)?;
        let value = evaluate(raw_body, expression)?;
        targets.push((location, name, value));
    }

    store.update(|tx| {
        for (location, name, value) in &targets {
            let bucket = location.bucket();
            if !tx.bucket_exists(&bucket)? {
                return Err(Error::InvalidPath {
                    path: location.to_string(),
                });
            }
            let parameters = bucket.child(constants::BUCKET_PARAMETERS);
            match value {
                Some(value) => {
                    let text = stored_text(value);
                    tracing::debug!(location = %location, parameter = %name, value = %text, "storing parameter");
                    tx.put(&parameters, name, &text)?;
                }
                None => {
                    tracing::debug!(location = %location, parameter = %name, "clearing parameter");
                    tx.delete(&parameters, name)?;
                }
            }
        }
        Ok(targets.len())
    })
}
