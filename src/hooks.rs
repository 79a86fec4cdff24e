//! Request and response hooks.
//!
//! A hook is user code stored in a service's output settings. It receives a
//! JSON object describing the data at its site and returns a JSON object of
//! the same shape:
//!
//! | site         | input                                         | read back            |
//! |--------------|-----------------------------------------------|----------------------|
//! | request-data | `{"data"}`                                    | `data`               |
//! | request      | `{"path", "data", "headers", "queries"}`      | all four             |
//! | response     | `{"status", "headers": {k: [v]}, "body"}`     | `body`               |
//!
//! Fields missing from the returned object keep their input value.

use crate::constants;
use crate::error::{Error, HookSite, HookStage};
use crate::invocation::RequestParts;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

/// Executes hook code against an input table.
pub trait HookEngine: Send + Sync {
    /// # Errors
    ///
    /// Returns a hook error labelled with the site and the stage that failed.
    fn run(&self, site: HookSite, code: &str, input: Value) -> Result<Value, Error>;
}

/// Runs hook code with `sh -c`, exchanging JSON over stdin and stdout.
///
/// Each run is a fresh process, so nothing leaks between hook sites.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellHookEngine;

impl HookEngine for ShellHookEngine {
    fn run(&self, site: HookSite, code: &str, input: Value) -> Result<Value, Error> {
        let payload = serde_json::to_vec(&input)
            .map_err(|e| Error::hook(site, HookStage::Start, e.to_string()))?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(code)
            .env(constants::ENV_HOOK_SITE, site.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::hook(site, HookStage::Start, e.to_string()))?;

        let stdin = child.stdin.take();
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload)?;
            }
            Ok(())
        });

        let output = child
            .wait_with_output()
            .map_err(|e| Error::hook(site, HookStage::Execute, e.to_string()))?;

        match writer.join() {
            Ok(Ok(())) => {}
            // the hook is free to ignore its input
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(Error::hook(site, HookStage::Execute, e.to_string())),
            Err(_) => {
                return Err(Error::hook(
                    site,
                    HookStage::Execute,
                    "failed to write hook input",
                ))
            }
        }

        if !output.status.success() {
            return Err(Error::hook(
                site,
                HookStage::Execute,
                format!("hook exited with {}", output.status),
            ));
        }

        tracing::debug!(site = %site, bytes = output.stdout.len(), "hook finished");
        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::hook(site, HookStage::Output, e.to_string()))
    }
}

fn output_object(site: HookSite, value: Value) -> Result<Map<String, Value>, Error> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::hook(
            site,
            HookStage::Output,
            format!("expected an object, got {other}"),
        )),
    }
}

fn read_string(
    site: HookSite,
    table: &Map<String, Value>,
    field: &str,
    current: String,
) -> Result<String, Error> {
    match table.get(field) {
        None => Ok(current),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::hook(
            site,
            HookStage::Output,
            format!("'{field}' must be a string, got {other}"),
        )),
    }
}

fn read_string_map(
    site: HookSite,
    table: &Map<String, Value>,
    field: &str,
    current: BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, Error> {
    let Some(value) = table.get(field) else {
        return Ok(current);
    };
    let Value::Object(entries) = value else {
        return Err(Error::hook(
            site,
            HookStage::Output,
            format!("'{field}' must be an object, got {value}"),
        ));
    };
    entries
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k.clone(), s.clone())),
            other => Err(Error::hook(
                site,
                HookStage::Output,
                format!("'{field}.{k}' must be a string, got {other}"),
            )),
        })
        .collect()
}

/// Passes the request body through the request-data hook.
///
/// # Errors
///
/// Returns a hook error if the hook fails or returns a malformed table.
pub fn run_data_hook(engine: &dyn HookEngine, code: &str, data: String) -> Result<String, Error> {
    let site = HookSite::RequestData;
    let output = engine.run(site, code, json!({ "data": data }))?;
    let table = output_object(site, output)?;
    read_string(site, &table, "data", data)
}

/// Passes the assembled request through the request hook.
///
/// # Errors
///
/// Returns a hook error if the hook fails or returns a malformed table.
pub fn run_request_hook(
    engine: &dyn HookEngine,
    code: &str,
    parts: RequestParts,
) -> Result<RequestParts, Error> {
    let site = HookSite::Request;
    let input = json!({
        "path": parts.path,
        "data": parts.data,
        "headers": parts.headers,
        "queries": parts.queries,
    });
    let table = output_object(site, engine.run(site, code, input)?)?;
    Ok(RequestParts {
        path: read_string(site, &table, "path", parts.path)?,
        data: read_string(site, &table, "data", parts.data)?,
        headers: read_string_map(site, &table, "headers", parts.headers)?,
        queries: read_string_map(site, &table, "queries", parts.queries)?,
    })
}

/// Passes a response body through the response hook.
///
/// # Errors
///
/// Returns a hook error if the hook fails or returns a malformed table.
pub fn run_response_hook(
    engine: &dyn HookEngine,
    code: &str,
    status: u16,
    headers: &BTreeMap<String, Vec<String>>,
    body: &str,
) -> Result<String, Error> {
    let site = HookSite::Response;
    let input = json!({ "status": status, "headers": headers, "body": body });
    let table = output_object(site, engine.run(site, code, input)?)?;
    read_string(site, &table, "body", body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Engine that answers every run with a canned value.
    struct Canned(Value);

    impl HookEngine for Canned {
        fn run(&self, _site: HookSite, _code: &str, _input: Value) -> Result<Value, Error> {
            Ok(self.0.clone())
        }
    }

    fn parts() -> RequestParts {
        RequestParts {
            path: "/users".into(),
            data: String::new(),
            headers: BTreeMap::from([("Accept".to_string(), "text/plain".to_string())]),
            queries: BTreeMap::new(),
        }
    }

    #[test]
    fn test_request_hook_keeps_missing_fields() {
        let engine = Canned(json!({ "path": "/people" }));
        let out = run_request_hook(&engine, "", parts()).unwrap();
        assert_eq!(out.path, "/people");
        assert_eq!(out.headers["Accept"], "text/plain");
    }

    #[test]
    fn test_request_hook_rejects_non_object_headers() {
        let engine = Canned(json!({ "headers": "Accept: */*" }));
        let err = run_request_hook(&engine, "", parts()).unwrap_err();
        assert!(matches!(
            err,
            Error::Hook {
                site: HookSite::Request,
                stage: HookStage::Output,
                ..
            }
        ));
    }

    #[test]
    fn test_data_hook_requires_object() {
        let engine = Canned(json!("data"));
        assert!(run_data_hook(&engine, "", "x".into()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_engine_round_trip() {
        let engine = ShellHookEngine;
        let out = run_data_hook(
            &engine,
            r#"read -r _; printf '{"data":"%s"}' "$REST_HOOK_SITE""#,
            "ignored".into(),
        )
        .unwrap();
        assert_eq!(out, "request-data");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_engine_failure_is_execute_stage() {
        let err = ShellHookEngine
            .run(HookSite::Response, "exit 3", json!({}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Hook {
                stage: HookStage::Execute,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_engine_bad_output_is_output_stage() {
        let err = ShellHookEngine
            .run(HookSite::Response, "echo not-json", json!({}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Hook {
                stage: HookStage::Output,
                ..
            }
        ));
    }
}
