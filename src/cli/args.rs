//! Conversions from parsed flags into [`Settings`] layers.

use super::{RequestFlags, SettingsArgs, UnsetArgs};
use crate::config::settings::Settings;
use crate::duration::parse_duration;
use std::collections::BTreeMap;
use std::time::Duration;

/// Parses `KEY=VALUE`. Only the first `=` separates; the value may be empty.
///
/// # Errors
///
/// Returns a message if there is no `=` or the key is empty.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// clap adapter for [`parse_duration`].
///
/// # Errors
///
/// Returns the parse error as a message.
pub fn parse_retry_delay(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

fn to_map(pairs: &[(String, String)]) -> BTreeMap<String, String> {
    pairs.iter().cloned().collect()
}

fn keys(keys: &[String]) -> BTreeMap<String, String> {
    keys.iter().map(|k| (k.clone(), String::new())).collect()
}

fn flag<T>(selected: bool, marker: T) -> Option<T> {
    selected.then_some(marker)
}

impl SettingsArgs {
    /// The command-line settings layer. Flags not given stay unset.
    #[must_use]
    pub fn to_settings(&self) -> Settings {
        Settings {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            base_path: self.base_path.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            headers: to_map(&self.headers),
            parameters: to_map(&self.parameters),
            queries: to_map(&self.queries),
            pretty: self.pretty,
            pretty_indent: self.pretty_indent.clone(),
            filter: self.filter.clone(),
            response_hook: self.response_hook.clone(),
            request_hook: self.request_hook.clone(),
            request_data_hook: self.request_data_hook.clone(),
            set_parameters: to_map(&self.set_parameters),
            retries: self.retries,
            retry_delay: self.retry_delay,
            exponential_backoff: self.exponential_backoff,
            jitter: self.jitter,
        }
    }
}

impl RequestFlags {
    #[must_use]
    pub fn to_settings(&self) -> Settings {
        self.settings.to_settings()
    }
}

impl UnsetArgs {
    /// A selector for [`crate::config::storage::unset_settings`]: every chosen
    /// field is set to a placeholder, map fields carry the chosen keys.
    #[must_use]
    pub fn to_selector(&self) -> Settings {
        Settings {
            scheme: flag(self.scheme, String::new()),
            host: flag(self.host, String::new()),
            port: flag(self.port, 0),
            base_path: flag(self.base_path, String::new()),
            username: flag(self.username, String::new()),
            password: flag(self.password, String::new()),
            headers: keys(&self.headers),
            parameters: keys(&self.parameters),
            queries: keys(&self.queries),
            pretty: flag(self.pretty, false),
            pretty_indent: flag(self.pretty_indent, String::new()),
            filter: flag(self.filter, String::new()),
            response_hook: flag(self.response_hook, String::new()),
            request_hook: flag(self.request_hook, String::new()),
            request_data_hook: flag(self.request_data_hook, String::new()),
            set_parameters: keys(&self.set_parameters),
            retries: flag(self.retries, 0),
            retry_delay: flag(self.retry_delay, Duration::ZERO),
            exponential_backoff: flag(self.exponential_backoff, false),
            jitter: flag(self.jitter, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Accept=application/json").unwrap(),
            ("Accept".to_string(), "application/json".to_string())
        );
        assert_eq!(
            parse_key_value("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_key_value("empty=").unwrap().1, "");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_unset_selector_marks_chosen_fields() {
        let args = UnsetArgs {
            host: true,
            jitter: true,
            headers: vec!["Accept".into()],
            ..UnsetArgs::default()
        };
        let selector = args.to_selector();
        assert!(selector.host.is_some());
        assert!(selector.jitter.is_some());
        assert!(selector.scheme.is_none());
        assert!(selector.headers.contains_key("Accept"));
    }

    #[test]
    fn test_settings_args_leave_unset_fields_empty() {
        let args = SettingsArgs {
            port: Some(8080),
            pretty: Some(false),
            ..SettingsArgs::default()
        };
        let settings = args.to_settings();
        assert_eq!(settings.port, Some(8080));
        assert_eq!(settings.pretty, Some(false));
        assert!(settings.host.is_none());
        assert!(settings.headers.is_empty());
    }
}
