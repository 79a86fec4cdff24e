//! The layered settings value.
//!
//! Every level of configuration (defaults, service, path, method, alias and
//! command-line flags) is a [`Settings`] whose scalars are `Option`s: `None`
//! means "not set at this level" and never stands for a zero value. Layers are
//! combined with [`Settings::merge`], lowest precedence first.
//!
//! Merge is not commutative: when two layers set the same field, the overlay
//! wins. Map fields merge key by key.

use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_INDENT: &str = "\t";
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_path: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    pub headers: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
    pub queries: BTreeMap<String, String>,

    pub pretty: Option<bool>,
    pub pretty_indent: Option<String>,
    pub filter: Option<String>,
    pub response_hook: Option<String>,
    pub request_hook: Option<String>,
    pub request_data_hook: Option<String>,
    /// Parameter address → extraction expression.
    pub set_parameters: BTreeMap<String, String>,

    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub exponential_backoff: Option<bool>,
    pub jitter: Option<bool>,
}

fn pick<T: Clone>(base: &Option<T>, overlay: &Option<T>) -> Option<T> {
    overlay.clone().or_else(|| base.clone())
}

fn union(
    base: &BTreeMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

impl Settings {
    /// Empty settings: every scalar unset, every map empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults, the lowest layer of every merge chain.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            scheme: Some(DEFAULT_SCHEME.to_string()),
            host: Some(DEFAULT_HOST.to_string()),
            port: Some(DEFAULT_PORT),
            pretty_indent: Some(DEFAULT_INDENT.to_string()),
            retries: Some(DEFAULT_RETRIES),
            retry_delay: Some(DEFAULT_RETRY_DELAY),
            exponential_backoff: Some(true),
            jitter: Some(true),
            ..Self::default()
        }
    }

    /// Returns `self` with `overlay` applied on top.
    #[must_use]
    pub fn merge(&self, overlay: &Self) -> Self {
        Self {
            scheme: pick(&self.scheme, &overlay.scheme),
            host: pick(&self.host, &overlay.host),
            port: pick(&self.port, &overlay.port),
            base_path: pick(&self.base_path, &overlay.base_path),
            username: pick(&self.username, &overlay.username),
            password: pick(&self.password, &overlay.password),
            headers: union(&self.headers, &overlay.headers),
            parameters: union(&self.parameters, &overlay.parameters),
            queries: union(&self.queries, &overlay.queries),
            pretty: pick(&self.pretty, &overlay.pretty),
            pretty_indent: pick(&self.pretty_indent, &overlay.pretty_indent),
            filter: pick(&self.filter, &overlay.filter),
            response_hook: pick(&self.response_hook, &overlay.response_hook),
            request_hook: pick(&self.request_hook, &overlay.request_hook),
            request_data_hook: pick(&self.request_data_hook, &overlay.request_data_hook),
            set_parameters: union(&self.set_parameters, &overlay.set_parameters),
            retries: pick(&self.retries, &overlay.retries),
            retry_delay: pick(&self.retry_delay, &overlay.retry_delay),
            exponential_backoff: pick(&self.exponential_backoff, &overlay.exponential_backoff),
            jitter: pick(&self.jitter, &overlay.jitter),
        }
    }

    /// Folds layers lowest precedence first.
    #[must_use]
    pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a Self>) -> Self {
        layers
            .into_iter()
            .fold(Self::new(), |acc, layer| acc.merge(layer))
    }

    #[must_use]
    pub fn indent(&self) -> &str {
        self.pretty_indent.as_deref().unwrap_or(DEFAULT_INDENT)
    }

    #[must_use]
    pub fn is_pretty(&self) -> bool {
        self.pretty.unwrap_or(false)
    }
}
