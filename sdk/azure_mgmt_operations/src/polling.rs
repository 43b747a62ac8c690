//! Polling conventions for Resource Manager long-running operations.
//!
//! A long-running operation is started by a `PUT`, `PATCH`, `POST` or
//! `DELETE` whose response names where to poll:
//!
//! - `Operation-Location` or `Azure-AsyncOperation`: a status monitor whose
//!   body carries a `status` field;
//! - `Location`: a URL answering `202 Accepted` while the operation runs and
//!   a final status once it is done;
//! - neither, on `PUT`/`PATCH`: the resource itself, whose
//!   `properties.provisioningState` reports progress.
//!
//! When several headers are present the order above decides which one is
//! polled. Where the final resource is read from is a separate, per-operation
//! choice expressed by [`FinalStateVia`].

use azure_mgmt_core::error::{ArmError, ArmResult};
use azure_mgmt_core::http::{
    Method, RawResponse, AZURE_ASYNC_OPERATION, LOCATION, OPERATION_LOCATION,
};
use azure_mgmt_core::models::ResponseError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::state::OperationState;

/// Where the final resource of a completed operation is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalStateVia {
    /// The status monitor named by `Azure-AsyncOperation`.
    AzureAsyncOperation,
    /// The URL of the initial `Location` header.
    Location,
    /// The URL of the request that started the operation.
    OriginalUri,
    /// The status monitor named by `Operation-Location`.
    OperationLocation,
}

/// How the status of an operation is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PollingMethod {
    /// A status monitor reporting `status` in its body.
    StatusMonitor,
    /// A `Location` URL answering `202` until done.
    Location,
    /// The resource itself, reporting `properties.provisioningState`.
    Resource,
}

/// The polling target chosen from an initial response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PollingTarget {
    pub method: PollingMethod,
    pub url: Url,
}

/// Pick the polling target for an operation from its initial response.
///
/// Returns `Ok(None)` when the initial response is already final.
pub(crate) fn select_polling_target(
    initial: &RawResponse,
    request_method: &Method,
    request_url: &Url,
) -> ArmResult<Option<PollingTarget>> {
    let headers = [
        (OPERATION_LOCATION, PollingMethod::StatusMonitor),
        (AZURE_ASYNC_OPERATION, PollingMethod::StatusMonitor),
        (LOCATION, PollingMethod::Location),
    ];
    for (name, method) in headers {
        if let Some(value) = initial.header(name).filter(|v| !v.trim().is_empty()) {
            let url = resolve_url(request_url, value)?;
            return Ok(Some(PollingTarget { method, url }));
        }
    }

    if *request_method == Method::PUT || *request_method == Method::PATCH {
        let body = initial.json_value().ok().flatten();
        let pending = body
            .as_ref()
            .and_then(provisioning_state)
            .is_some_and(|s| !OperationState::from_status(s).is_terminal());
        if pending {
            return Ok(Some(PollingTarget {
                method: PollingMethod::Resource,
                url: request_url.clone(),
            }));
        }
    }

    if initial.status() == 202 {
        return Err(ArmError::Polling(
            "202 Accepted response carries no polling location".into(),
        ));
    }

    Ok(None)
}

/// Resolve a header value that may be relative to the request URL.
pub(crate) fn resolve_url(base: &Url, value: &str) -> ArmResult<Url> {
    base.join(value.trim()).map_err(|e| {
        ArmError::invalid_endpoint_with_source(format!("invalid polling URL '{value}'"), e)
    })
}

/// What one poll response says about an operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Observation {
    pub state: OperationState,
    pub error: Option<ResponseError>,
    pub resource_location: Option<String>,
}

impl Observation {
    fn bare(state: OperationState) -> Self {
        Self {
            state,
            error: None,
            resource_location: None,
        }
    }
}

fn provisioning_state(body: &serde_json::Value) -> Option<&str> {
    body.get("properties")?.get("provisioningState")?.as_str()
}

fn status_field(body: &serde_json::Value) -> Option<&str> {
    body.get("status")?.as_str()
}

/// Interpret one poll response.
///
/// # Errors
///
/// Returns [`ArmError::Polling`] when the body does not carry the status
/// the polling method requires.
pub(crate) fn observe(response: &RawResponse, method: PollingMethod) -> ArmResult<Observation> {
    if method == PollingMethod::Location {
        match response.status() {
            202 => return Ok(Observation::bare(OperationState::Running)),
            204 => return Ok(Observation::bare(OperationState::Succeeded)),
            _ => {}
        }
    }

    let body = response
        .json_value()
        .map_err(|e| ArmError::Polling(format!("poll response body is not valid JSON: {e}")))?;

    let body = match body {
        Some(value) if value.is_object() => value,
        _ if method == PollingMethod::Location => {
            return Ok(Observation::bare(OperationState::Succeeded));
        }
        _ => {
            return Err(ArmError::Polling(format!(
                "poll response (HTTP {}) has no JSON object body",
                response.status()
            )));
        }
    };

    let status = match method {
        PollingMethod::Resource => provisioning_state(&body).or_else(|| status_field(&body)),
        PollingMethod::StatusMonitor | PollingMethod::Location => {
            status_field(&body).or_else(|| provisioning_state(&body))
        }
    };
    let status = match status {
        Some(status) => status,
        // A Location target answers with the final payload itself.
        None if method == PollingMethod::Location => {
            return Ok(Observation::bare(OperationState::Succeeded));
        }
        None => {
            return Err(ArmError::Polling(
                "poll response is missing the required 'status' field".into(),
            ));
        }
    };

    let state = OperationState::from_status(status);
    let error = if matches!(state, OperationState::Failed | OperationState::Canceled) {
        ResponseError::from_value(&body)
    } else {
        None
    };

    Ok(Observation {
        state,
        error,
        resource_location: body
            .get("resourceLocation")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

/// The state reported by an initial response that needs no polling.
pub(crate) fn initial_terminal_state(initial: &RawResponse) -> (OperationState, Option<ResponseError>) {
    let body = initial.json_value().ok().flatten();
    let state = body
        .as_ref()
        .and_then(provisioning_state)
        .map(OperationState::from_status)
        .filter(|s| s.is_terminal())
        .unwrap_or(OperationState::Succeeded);
    let error = match (state, body.as_ref()) {
        (OperationState::Failed | OperationState::Canceled, Some(body)) => {
            ResponseError::from_value(body)
        }
        _ => None,
    };
    (state, error)
}

/// The delay between polls when the service gives no `Retry-After` hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelayStrategy {
    /// The same delay before every poll.
    Fixed(Duration),
    /// 1s, 1s, 1s, 2s, 4s, 8s, 16s, then 32s for every later poll.
    #[default]
    Sequential,
}

const SEQUENTIAL_DELAYS_SECS: [u64; 8] = [1, 1, 1, 2, 4, 8, 16, 32];

impl DelayStrategy {
    /// The delay before poll number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Sequential => {
                let index = (attempt as usize).min(SEQUENTIAL_DELAYS_SECS.len() - 1);
                Duration::from_secs(SEQUENTIAL_DELAYS_SECS[index])
            }
        }
    }
}

/// Options for waiting on a long-running operation.
#[derive(Debug, Clone, Default)]
pub struct PollingOptions {
    /// Delay used when the service sends no retry hint.
    pub strategy: DelayStrategy,
    /// Upper bound on the strategy's delay. Server hints are not capped.
    pub max_delay: Option<Duration>,
}

impl PollingOptions {
    /// Poll at a fixed interval unless the service says otherwise.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            strategy: DelayStrategy::Fixed(interval),
            max_delay: None,
        }
    }

    /// Cap the strategy's delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// The delay before poll number `attempt`.
    ///
    /// A server hint (`Retry-After` and friends) is authoritative.
    pub fn next_delay(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        if let Some(hint) = server_hint {
            return hint;
        }
        let delay = self.strategy.delay(attempt);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}
