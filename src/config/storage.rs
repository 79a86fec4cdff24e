//! Persistence of [`Settings`] inside a settings bucket.
//!
//! Layout of one settings bucket:
//!
//! ```text
//! scheme, host, port, base-path, username, password
//! headers/  parameters/  queries/
//! output/   pretty, indent, filter, response-hook, request-hook, request-data-hook
//! output/set-parameters/
//! retry/    retries, delay, exponential-backoff, jitter
//! ```
//!
//! Only set fields are ever written, so writing a partial settings value never
//! clobbers what is already stored.

use super::settings::Settings;
use crate::constants;
use crate::duration::format_millis;
use crate::error::Error;
use crate::store::{BucketPath, StoreRead, WriteTx};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

struct ScalarField {
    group: Option<&'static str>,
    key: &'static str,
    encode: fn(&Settings) -> Option<String>,
    decode: fn(&mut Settings, &str) -> Result<(), Error>,
}

struct MapField {
    group: Option<&'static str>,
    bucket: &'static str,
    get: fn(&Settings) -> &BTreeMap<String, String>,
    get_mut: fn(&mut Settings) -> &mut BTreeMap<String, String>,
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::InvalidStoredValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_delay(key: &str, value: &str) -> Result<Duration, Error> {
    parse::<u64>(key, value).map(Duration::from_millis)
}

static SCALARS: &[ScalarField] = &[
    ScalarField {
        group: None,
        key: constants::KEY_SCHEME,
        encode: |s| s.scheme.clone(),
        decode: |s, v| {
            s.scheme = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: None,
        key: constants::KEY_HOST,
        encode: |s| s.host.clone(),
        decode: |s, v| {
            s.host = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: None,
        key: constants::KEY_PORT,
        encode: |s| s.port.map(|p| p.to_string()),
        decode: |s, v| {
            s.port = Some(parse(constants::KEY_PORT, v)?);
            Ok(())
        },
    },
    ScalarField {
        group: None,
        key: constants::KEY_BASE_PATH,
        encode: |s| s.base_path.clone(),
        decode: |s, v| {
            s.base_path = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: None,
        key: constants::KEY_USERNAME,
        encode: |s| s.username.clone(),
        decode: |s, v| {
            s.username = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: None,
        key: constants::KEY_PASSWORD,
        encode: |s| s.password.clone(),
        decode: |s, v| {
            s.password = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_OUTPUT),
        key: constants::KEY_PRETTY,
        encode: |s| s.pretty.map(|b| b.to_string()),
        decode: |s, v| {
            s.pretty = Some(parse(constants::KEY_PRETTY, v)?);
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_OUTPUT),
        key: constants::KEY_INDENT,
        encode: |s| s.pretty_indent.clone(),
        decode: |s, v| {
            s.pretty_indent = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_OUTPUT),
        key: constants::KEY_FILTER,
        encode: |s| s.filter.clone(),
        decode: |s, v| {
            s.filter = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_OUTPUT),
        key: constants::KEY_RESPONSE_HOOK,
        encode: |s| s.response_hook.clone(),
        decode: |s, v| {
            s.response_hook = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_OUTPUT),
        key: constants::KEY_REQUEST_HOOK,
        encode: |s| s.request_hook.clone(),
        decode: |s, v| {
            s.request_hook = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_OUTPUT),
        key: constants::KEY_REQUEST_DATA_HOOK,
        encode: |s| s.request_data_hook.clone(),
        decode: |s, v| {
            s.request_data_hook = Some(v.to_string());
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_RETRY),
        key: constants::KEY_RETRIES,
        encode: |s| s.retries.map(|r| r.to_string()),
        decode: |s, v| {
            s.retries = Some(parse(constants::KEY_RETRIES, v)?);
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_RETRY),
        key: constants::KEY_DELAY,
        encode: |s| s.retry_delay.map(format_millis),
        decode: |s, v| {
            s.retry_delay = Some(parse_delay(constants::KEY_DELAY, v)?);
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_RETRY),
        key: constants::KEY_EXPONENTIAL_BACKOFF,
        encode: |s| s.exponential_backoff.map(|b| b.to_string()),
        decode: |s, v| {
            s.exponential_backoff = Some(parse(constants::KEY_EXPONENTIAL_BACKOFF, v)?);
            Ok(())
        },
    },
    ScalarField {
        group: Some(constants::BUCKET_RETRY),
        key: constants::KEY_JITTER,
        encode: |s| s.jitter.map(|b| b.to_string()),
        decode: |s, v| {
            s.jitter = Some(parse(constants::KEY_JITTER, v)?);
            Ok(())
        },
    },
];

static MAPS: &[MapField] = &[
    MapField {
        group: None,
        bucket: constants::BUCKET_HEADERS,
        get: |s| &s.headers,
        get_mut: |s| &mut s.headers,
    },
    MapField {
        group: None,
        bucket: constants::BUCKET_PARAMETERS,
        get: |s| &s.parameters,
        get_mut: |s| &mut s.parameters,
    },
    MapField {
        group: None,
        bucket: constants::BUCKET_QUERIES,
        get: |s| &s.queries,
        get_mut: |s| &mut s.queries,
    },
    MapField {
        group: Some(constants::BUCKET_OUTPUT),
        bucket: constants::BUCKET_SET_PARAMETERS,
        get: |s| &s.set_parameters,
        get_mut: |s| &mut s.set_parameters,
    },
];

fn group_bucket(bucket: &BucketPath, group: Option<&str>) -> BucketPath {
    group.map_or_else(|| bucket.clone(), |g| bucket.child(g))
}

impl MapField {
    fn path(&self, bucket: &BucketPath) -> BucketPath {
        group_bucket(bucket, self.group).child(self.bucket)
    }
}

/// Stores every set field of `settings` under `bucket`, creating it if needed.
///
/// # Errors
///
/// Returns [`Error::NoDestination`] for the empty bucket path, or a store error.
pub fn write_settings(
    tx: &mut WriteTx<'_>,
    bucket: &BucketPath,
    settings: &Settings,
) -> Result<(), Error> {
    if bucket.segments().is_empty() {
        return Err(Error::NoDestination);
    }
    tx.create_bucket(bucket)?;

    for field in SCALARS {
        if let Some(value) = (field.encode)(settings) {
            tx.put(&group_bucket(bucket, field.group), field.key, &value)?;
        }
    }
    for field in MAPS {
        let path = field.path(bucket);
        for (key, value) in (field.get)(settings) {
            tx.put(&path, key, value)?;
        }
    }
    Ok(())
}

/// Loads the settings stored under `bucket`. Absent fields come back unset.
///
/// # Errors
///
/// Returns [`Error::InvalidStoredValue`] if a stored scalar does not decode.
pub fn read_settings(tx: &impl StoreRead, bucket: &BucketPath) -> Result<Settings, Error> {
    let mut settings = Settings::new();
    for field in SCALARS {
        if let Some(value) = tx.get(&group_bucket(bucket, field.group), field.key)? {
            (field.decode)(&mut settings, &value)?;
        }
    }
    for field in MAPS {
        *(field.get_mut)(&mut settings) = tx.entries(&field.path(bucket))?;
    }
    Ok(settings)
}

/// Deletes from `bucket` exactly the fields that are set in `selector`.
///
/// Map fields select individual keys. Deleting something that is not stored
/// is not an error. Returns how many stored values were removed.
///
/// # Errors
///
/// Returns a store error if a delete fails.
pub fn unset_settings(
    tx: &mut WriteTx<'_>,
    bucket: &BucketPath,
    selector: &Settings,
) -> Result<usize, Error> {
    let mut removed = 0;
    for field in SCALARS {
        if (field.encode)(selector).is_some()
            && tx.delete(&group_bucket(bucket, field.group), field.key)?
        {
            removed += 1;
        }
    }
    for field in MAPS {
        let path = field.path(bucket);
        for key in (field.get)(selector).keys() {
            if tx.delete(&path, key)? {
                removed += 1;
            }
        }
    }
    Ok(removed)
}
