//! Handlers for `rest get|post|put|delete|patch|head|options`.

use crate::cli::RequestArgs;
use crate::engine::{execute, HttpTransport};
use crate::error::Error;
use crate::hooks::ShellHookEngine;
use crate::invocation::{HttpMethod, RequestCall};
use crate::output::Output;
use crate::store::Store;

/// Builds the call for a direct request command.
#[must_use]
pub fn request_call(method: HttpMethod, args: RequestArgs) -> RequestCall {
    RequestCall {
        service: args.flags.service.clone(),
        method,
        path: args.path,
        data: args.data.unwrap_or_default(),
        alias: None,
        cli: args.flags.to_settings(),
        no_headers: args.flags.no_headers,
        no_queries: args.flags.no_queries,
    }
}

/// Sends `call` over HTTP and prints the rendered response. Returns the exit
/// code derived from the response status.
pub async fn send(store: &Store, output: &Output, call: &RequestCall) -> Result<i32, Error> {
    let transport = HttpTransport::new()?;
    let outcome = execute(store, &transport, &ShellHookEngine, call).await?;
    output.raw(&outcome.display);
    if outcome.exit_code != 0 {
        tracing::debug!(status = outcome.status, exit_code = outcome.exit_code, "non-success status");
    }
    Ok(outcome.exit_code)
}

pub async fn execute_request_command(
    store: &Store,
    output: &Output,
    method: HttpMethod,
    args: RequestArgs,
) -> Result<i32, Error> {
    let call = request_call(method, args);
    send(store, output, &call).await
}
