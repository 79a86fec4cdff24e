//! Parameter substitution for paths, bodies, headers and query values.
//!
//! A reference to parameter `id` may be written `:id`, `{id}` or `{{id}}`.
//! Bound references are replaced by the parameter value; unbound ones are left
//! as they are. Environment variables (`$HOME`, `${HOME}`) are expanded after
//! parameters, with undefined variables expanding to nothing.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\{\{\s*([A-Za-z_][A-Za-z0-9_.-]*)\s*\}\}|\{([A-Za-z_][A-Za-z0-9_.-]*)\}|:([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("Regex pattern is hardcoded and valid")
});

fn reference_name<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map_or("", |m| m.as_str())
}

/// Returns `true` if the whole text is a single parameter reference.
#[must_use]
pub fn is_bare_reference(text: &str) -> bool {
    REFERENCE
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

/// Names of every parameter referenced in `text`.
///
/// The JSON literals `true`, `false` and `null` are not reported, so that a
/// compact body such as `{"a":true}` does not produce a `true` parameter.
#[must_use]
pub fn find_params(text: &str) -> BTreeSet<String> {
    REFERENCE
        .captures_iter(text)
        .map(|caps| reference_name(&caps).to_string())
        .filter(|name| !matches!(name.as_str(), "true" | "false" | "null"))
        .collect()
}

/// Applies a fixed set of parameter values to text.
#[derive(Debug, Clone, Copy)]
pub struct Substitution<'a> {
    parameters: &'a BTreeMap<String, String>,
}

impl<'a> Substitution<'a> {
    #[must_use]
    pub const fn new(parameters: &'a BTreeMap<String, String>) -> Self {
        Self { parameters }
    }

    fn replace_params<'t>(&self, text: &'t str) -> Cow<'t, str> {
        REFERENCE.replace_all(text, |caps: &Captures<'_>| {
            self.parameters
                .get(reference_name(caps))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
    }

    /// Substitutes parameters, then environment variables.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let replaced = self.replace_params(text);
        shellexpand::env_with_context_no_errors(replaced.as_ref(), |var: &str| {
            Some(std::env::var(var).unwrap_or_default())
        })
        .into_owned()
    }

    /// Substitutes a header or query value.
    ///
    /// Returns `None` when the value was a lone reference that did not resolve
    /// to anything, so the header or query can be left off the request.
    #[must_use]
    pub fn apply_value(&self, value: &str) -> Option<String> {
        let substituted = self.apply(value);
        if is_bare_reference(value) && (substituted.is_empty() || substituted == value) {
            tracing::debug!(value, "dropping unresolved parameter reference");
            return None;
        }
        Some(substituted)
    }

    /// Substitutes every value of a header or query map, dropping unresolved ones.
    #[must_use]
    pub fn apply_map(&self, values: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        values
            .iter()
            .filter_map(|(key, value)| self.apply_value(value).map(|v| (key.clone(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_all_three_syntaxes_substitute() {
        let bound = params(&[("id", "42")]);
        let sub = Substitution::new(&bound);
        assert_eq!(sub.apply("/users/:id"), "/users/42");
        assert_eq!(sub.apply("/users/{id}"), "/users/42");
        assert_eq!(sub.apply("/users/{{id}}"), "/users/42");
        assert_eq!(sub.apply("/users/{{ id }}"), "/users/42");
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let bound = params(&[("id", "7")]);
        let sub = Substitution::new(&bound);
        assert_eq!(sub.apply("/a/:id/b/{id}"), "/a/7/b/7");
    }

    #[test]
    fn test_unbound_reference_stays_literal() {
        let bound = params(&[("id", "1")]);
        let sub = Substitution::new(&bound);
        assert_eq!(sub.apply("/orgs/:org/users/:id"), "/orgs/:org/users/1");
    }

    #[test]
    fn test_longer_name_is_not_split() {
        let bound = params(&[("id", "1"), ("identity", "me")]);
        let sub = Substitution::new(&bound);
        assert_eq!(sub.apply("/:identity/:id"), "/me/1");
    }

    #[test]
    fn test_env_expansion_after_params() {
        std::env::set_var("REST_PARAMS_TEST_TOKEN", "s3cr3t");
        let bound = params(&[("scheme", "Bearer")]);
        let sub = Substitution::new(&bound);
        assert_eq!(
            sub.apply(":scheme ${REST_PARAMS_TEST_TOKEN}"),
            "Bearer s3cr3t"
        );
        assert_eq!(sub.apply("x$REST_PARAMS_TEST_UNDEFINED_VAR"), "x");
        std::env::remove_var("REST_PARAMS_TEST_TOKEN");
    }

    #[test]
    fn test_unresolved_bare_reference_is_dropped() {
        let empty = BTreeMap::new();
        let sub = Substitution::new(&empty);
        assert_eq!(sub.apply_value(":id"), None);
        assert_eq!(sub.apply_value("{{token}}"), None);
        assert_eq!(sub.apply_value("Bearer :token"), Some("Bearer :token".to_string()));

        let blank = params(&[("id", "")]);
        assert_eq!(Substitution::new(&blank).apply_value(":id"), None);
    }

    #[test]
    fn test_apply_map_keeps_resolved_values() {
        let bound = params(&[("token", "abc")]);
        let headers = params(&[
            ("Authorization", "Bearer {token}"),
            ("X-Trace", ":trace"),
            ("Accept", "application/json"),
        ]);
        let out = Substitution::new(&bound).apply_map(&headers);
        assert_eq!(out.len(), 2);
        assert_eq!(out["Authorization"], "Bearer abc");
        assert_eq!(out["Accept"], "application/json");
    }

    #[test]
    fn test_find_params_deduplicates() {
        let found = find_params("/users/:id/posts/{post}/{{id}}");
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["id".to_string(), "post".to_string()]
        );
    }

    #[test]
    fn test_find_params_ignores_json_literals() {
        let found = find_params(r#"{"active":true,"name":":name","x":null}"#);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["name".to_string()]);
    }

    #[test]
    fn test_is_bare_reference() {
        assert!(is_bare_reference(":id"));
        assert!(is_bare_reference("{id}"));
        assert!(is_bare_reference("{{id}}"));
        assert!(!is_bare_reference("x:id"));
        assert!(!is_bare_reference("plain"));
    }
}
