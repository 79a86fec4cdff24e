use super::request::prepare;
use super::response::{apply_set_parameters, process_response};
use super::transport::{PreparedRequest, Transport, TransportResponse};
use crate::config::resolver::resolve;
use crate::error::Error;
use crate::hooks::HookEngine;
use crate::invocation::{exit_code_for, Outcome, RequestCall};
use crate::logging::{get_max_body_len, log_request, log_response};
use crate::resilience::{execute_with_retry, RetryPolicy};
use crate::store::Store;
use std::time::Instant;

/// Sends one attempt, logging both sides of the exchange.
async fn send_logged(
    transport: &impl Transport,
    request: &PreparedRequest,
    attempt: u32,
    max_body_len: usize,
) -> Result<TransportResponse, Error> {
    log_request(
        attempt,
        request.method.as_str(),
        request.url.as_str(),
        &request.headers,
        request.body.as_deref(),
    );

    let start = Instant::now();
    let response = transport.send(request).await?;
    log_response(
        attempt,
        response.status,
        start.elapsed().as_millis(),
        &response.flat_headers(),
        &response.text(),
        max_body_len,
    );
    Ok(response)
}

/// Runs a request end to end: resolve settings, build, send with retries,
/// render the response and apply set-parameter rules.
///
/// Once the attempt budget is spent the most recent response is used even if
/// it is a 5xx; only when no response arrived at all is the transport error
/// returned.
///
/// # Errors
///
/// Returns resolution, hook, filter and store errors, or the final transport
/// error when every attempt failed.
pub async fn execute(
    store: &Store,
    transport: &impl Transport,
    hooks: &dyn HookEngine,
    call: &RequestCall,
) -> Result<Outcome, Error> {
    let resolved = store.view(|tx| resolve(tx, call))?;
    let settings = &resolved.settings;

    let request = prepare(call, settings, hooks)?;
    let policy = RetryPolicy::from_settings(settings);
    let max_body_len = get_max_body_len();

    let request = &request;
    let outcome = execute_with_retry(
        &policy,
        move |attempt| send_logged(transport, request, attempt + 1, max_body_len),
        |response: &TransportResponse| response.status,
    )
    .await;

    let response = match (outcome.response, outcome.error) {
        (Some(response), error) => {
            if let Some(e) = error {
                tracing::warn!(error = %e, "last attempt failed, using earlier response");
            }
            response
        }
        (None, Some(e)) => return Err(e),
        (None, None) => {
            return Err(Error::InvalidArgument(
                "request was never attempted".to_string(),
            ))
        }
    };
    tracing::debug!(
        status = response.status,
        attempts = outcome.attempts,
        "request complete"
    );

    let display = process_response(&response, settings, hooks)?;
    let stored = apply_set_parameters(
        store,
        &resolved.service,
        &settings.set_parameters,
        &response.body,
    )?;
    if stored > 0 {
        tracing::info!(rules = stored, service = %resolved.service, "applied set-parameter rules");
    }

    Ok(Outcome {
        status: response.status,
        display,
        exit_code: exit_code_for(response.status),
    })
}
