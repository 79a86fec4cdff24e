//! Turns a resolved request into a [`PreparedRequest`].
//!
//! Order of work: parameter substitution on path, data, header and query
//! values; the request-data hook; the request hook; dropping headers and
//! queries that are still unresolved references; URL assembly.

use super::transport::PreparedRequest;
use crate::config::settings::{Settings, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SCHEME};
use crate::error::Error;
use crate::hooks::{run_data_hook, run_request_hook, HookEngine};
use crate::invocation::{RequestCall, RequestParts};
use crate::params::{is_bare_reference, Substitution};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Joins the base path and the request path with exactly one slash.
fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_matches('/');
    let path = path.trim_start_matches('/');
    match (base.is_empty(), path.is_empty()) {
        (true, _) => format!("/{path}"),
        (false, true) => format!("/{base}"),
        (false, false) => format!("/{base}/{path}"),
    }
}

/// Builds the target URL.
///
/// A query string written into `path` is kept; `queries` are added on top and
/// replace path query keys of the same name.
///
/// # Errors
///
/// Returns an error if scheme, host and port do not form a valid URL.
pub fn build_url(
    settings: &Settings,
    path: &str,
    queries: &BTreeMap<String, String>,
) -> Result<Url, Error> {
    let scheme = settings.scheme.as_deref().unwrap_or(DEFAULT_SCHEME);
    let host = settings.host.as_deref().unwrap_or(DEFAULT_HOST);
    let port = settings.port.unwrap_or(DEFAULT_PORT);
    let mut url = Url::parse(&format!("{scheme}://{host}:{port}"))?;

    let (path, inline_query) = path.split_once('?').unwrap_or((path, ""));
    url.set_path(&join_paths(
        settings.base_path.as_deref().unwrap_or_default(),
        path,
    ));

    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(inline_query.as_bytes())
        .into_owned()
        .filter(|(key, _)| !queries.contains_key(key))
        .collect();
    pairs.extend(queries.iter().map(|(k, v)| (k.clone(), v.clone())));
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(url)
}

/// Substitutes every value, remembering which ones were unresolved bare
/// references.
fn substitute_map(
    sub: &Substitution<'_>,
    values: &BTreeMap<String, String>,
) -> (BTreeMap<String, String>, BTreeSet<String>) {
    let mut unresolved = BTreeSet::new();
    let substituted = values
        .iter()
        .map(|(key, value)| {
            if sub.apply_value(value).is_none() {
                unresolved.insert(key.clone());
            }
            (key.clone(), sub.apply(value))
        })
        .collect();
    (substituted, unresolved)
}

fn drop_unresolved(
    values: BTreeMap<String, String>,
    unresolved: &BTreeSet<String>,
) -> BTreeMap<String, String> {
    values
        .into_iter()
        .filter(|(key, value)| {
            let keep = !is_bare_reference(value) && !(value.is_empty() && unresolved.contains(key));
            if !keep {
                tracing::debug!(key = %key, "dropping unresolved value");
            }
            keep
        })
        .collect()
}

/// Assembles the outgoing request.
///
/// # Errors
///
/// Returns a hook error if a hook fails, or a URL error.
pub fn prepare(
    call: &RequestCall,
    settings: &Settings,
    hooks: &dyn HookEngine,
) -> Result<PreparedRequest, Error> {
    let sub = Substitution::new(&settings.parameters);

    let empty = BTreeMap::new();
    let headers = if call.no_headers { &empty } else { &settings.headers };
    let queries = if call.no_queries { &empty } else { &settings.queries };
    let (headers, unresolved_headers) = substitute_map(&sub, headers);
    let (queries, unresolved_queries) = substitute_map(&sub, queries);

    let mut parts = RequestParts {
        path: sub.apply(&call.path),
        data: sub.apply(&call.data),
        headers,
        queries,
    };

    if let Some(code) = settings.request_data_hook.as_deref() {
        parts.data = run_data_hook(hooks, code, parts.data)?;
    }
    if let Some(code) = settings.request_hook.as_deref() {
        parts = run_request_hook(hooks, code, parts)?;
    }

    let headers = drop_unresolved(parts.headers, &unresolved_headers);
    let queries = drop_unresolved(parts.queries, &unresolved_queries);
    let url = build_url(settings, &parts.path, &queries)?;

    let basic_auth = match (settings.username.as_deref(), settings.password.as_deref()) {
        (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
            Some((user.to_string(), pass.to_string()))
        }
        _ => None,
    };

    Ok(PreparedRequest {
        method: call.method,
        url,
        headers,
        body: Some(parts.data).filter(|d| !d.is_empty()),
        basic_auth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookSite;
    use crate::invocation::HttpMethod;
    use serde_json::{json, Value};

    struct NoHooks;

    impl HookEngine for NoHooks {
        fn run(&self, site: HookSite, _code: &str, _input: Value) -> Result<Value, Error> {
            panic!("unexpected {site} hook");
        }
    }

    /// Rewrites the request path and adds a header.
    struct Rewrite;

    impl HookEngine for Rewrite {
        fn run(&self, site: HookSite, _code: &str, mut input: Value) -> Result<Value, Error> {
            match site {
                HookSite::RequestData => Ok(json!({ "data": "{\"hooked\":true}" })),
                HookSite::Request => {
                    input["path"] = json!("/rewritten");
                    input["headers"]["X-Hooked"] = json!("yes");
                    Ok(input)
                }
                HookSite::Response => Ok(input),
            }
        }
    }

    fn call(path: &str, data: &str) -> RequestCall {
        RequestCall {
            service: None,
            method: HttpMethod::Get,
            path: path.to_string(),
            data: data.to_string(),
            alias: None,
            cli: Settings::new(),
            no_headers: false,
            no_queries: false,
        }
    }

    fn settings() -> Settings {
        let mut s = Settings::defaults();
        s.host = Some("api.example.com".into());
        s
    }

    #[test]
    fn test_url_from_parts() {
        let mut s = settings();
        s.scheme = Some("http".into());
        s.port = Some(8080);
        s.base_path = Some("/v1/".into());
        let url = build_url(&s, "/users", &BTreeMap::new()).unwrap();
        assert_eq!(url.as_str(), "http://api.example.com:8080/v1/users");
    }

    #[test]
    fn test_default_port_is_elided() {
        let url = build_url(&settings(), "users", &BTreeMap::new()).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/users");
    }

    #[test]
    fn test_settings_queries_override_inline() {
        let queries = BTreeMap::from([("page".to_string(), "2".to_string())]);
        let url = build_url(&settings(), "/items?page=1&sort=asc", &queries).unwrap();
        assert_eq!(url.query(), Some("sort=asc&page=2"));
    }

    #[test]
    fn test_prepare_substitutes_and_drops() {
        let mut s = settings();
        s.parameters.insert("id".into(), "42".into());
        s.headers.insert("X-Id".into(), "{id}".into());
        s.headers.insert("X-Trace".into(), ":trace".into());
        s.queries.insert("q".into(), ":missing".into());

        let request = prepare(&call("/users/:id", ""), &s, &NoHooks).unwrap();
        assert_eq!(request.url.path(), "/users/42");
        assert_eq!(request.url.query(), None);
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers["X-Id"], "42");
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_suppressed_headers_and_queries() {
        let mut s = settings();
        s.headers.insert("Accept".into(), "text/plain".into());
        s.queries.insert("page".into(), "1".into());
        let mut c = call("/x", "");
        c.no_headers = true;
        c.no_queries = true;
        let request = prepare(&c, &s, &NoHooks).unwrap();
        assert!(request.headers.is_empty());
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn test_basic_auth_needs_both_parts() {
        let mut s = settings();
        s.username = Some("ann".into());
        s.password = Some(String::new());
        assert_eq!(prepare(&call("/", ""), &s, &NoHooks).unwrap().basic_auth, None);

        s.password = Some("pw".into());
        assert_eq!(
            prepare(&call("/", ""), &s, &NoHooks).unwrap().basic_auth,
            Some(("ann".to_string(), "pw".to_string()))
        );
    }

    #[test]
    fn test_hooks_run_in_order() {
        let mut s = settings();
        s.request_data_hook = Some("data".into());
        s.request_hook = Some("request".into());
        let request = prepare(&call("/original", "raw"), &s, &Rewrite).unwrap();
        assert_eq!(request.url.path(), "/rewritten");
        assert_eq!(request.body.as_deref(), Some("{\"hooked\":true}"));
        assert_eq!(request.headers["X-Hooked"], "yes");
    }
}
