//! Handles for long-running operations.
//!
//! An [`ArmOperation`] is created from the response of the request that
//! started an operation. It can be polled step by step with
//! [`poll`](ArmOperation::poll), driven to completion with
//! [`wait_for_completion`](ArmOperation::wait_for_completion), or saved as a
//! [`ResumeToken`] and picked up again later.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_core::http::Method;
//! use azure_mgmt_operations::operation::ArmOperation;
//! use azure_mgmt_operations::polling::FinalStateVia;
//! use azure_mgmt_operations::source::JsonOperationSource;
//!
//! # async fn example(client: ArmClient) -> azure_mgmt_core::ArmResult<()> {
//! let request = client
//!     .request(Method::PUT, "/subscriptions/s/resourceGroups/rg")?
//!     .with_json(&serde_json::json!({"location": "westus"}))?;
//!
//! let source = JsonOperationSource::<serde_json::Value>::new("Microsoft.Resources/resourceGroups");
//! let mut operation = ArmOperation::start(client, source, request, FinalStateVia::OriginalUri).await?;
//! let group = operation.wait_for_completion().await?;
//! println!("{}", group["id"]);
//! # Ok(())
//! # }
//! ```

use azure_mgmt_core::client::ArmClient;
use azure_mgmt_core::error::{ArmError, ArmResult};
use azure_mgmt_core::http::{ArmRequest, Method, RawResponse, LOCATION};
use azure_mgmt_core::models::ResponseError;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::polling::{
    initial_terminal_state, observe, resolve_url, select_polling_target, FinalStateVia,
    PollingMethod, PollingOptions, PollingTarget,
};
use crate::resume::{ResumeStateV1, ResumeToken};
use crate::source::OperationSource;
use crate::state::OperationState;

/// Whether a façade call returns once the operation has started or only
/// once it has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Return as soon as the service accepted the request.
    Started,
    /// Poll until the operation reaches a terminal state.
    Completed,
}

/// A long-running operation on Resource Manager.
///
/// The handle owns its state: it only changes through [`poll`](Self::poll)
/// and the wait methods, and once terminal it never changes again. The
/// typed result is available exactly when the state is
/// [`OperationState::Succeeded`].
pub struct ArmOperation<S: OperationSource> {
    client: ArmClient,
    source: S,
    request_method: Method,
    request_url: Url,
    polling: Option<PollingTarget>,
    location_url: Option<Url>,
    final_state_via: FinalStateVia,
    state: OperationState,
    raw_response: Option<RawResponse>,
    value: Option<S::Output>,
    error: Option<ResponseError>,
}

impl<S: OperationSource> ArmOperation<S> {
    /// Send `request` and wrap the operation it starts.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::lro::start` with fields `method` and `kind`.
    #[tracing::instrument(
        name = "arm::lro::start",
        skip(client, source, request),
        fields(method = %request.method(), kind = %source.kind())
    )]
    pub async fn start(
        client: ArmClient,
        source: S,
        request: ArmRequest,
        final_state_via: FinalStateVia,
    ) -> ArmResult<Self> {
        tracing::debug!("starting long-running operation");
        let initial = client.send(&request).await?;
        Self::new(client, source, &request, initial, final_state_via)
    }

    /// Wrap an operation from the response of the request that started it.
    ///
    /// The handle starts `Running` when the response names a polling
    /// location, and terminal otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Polling`] for a `202 Accepted` without a polling
    /// location, and the source's error if a synchronous success cannot be
    /// mapped to a result.
    pub fn new(
        client: ArmClient,
        source: S,
        request: &ArmRequest,
        initial: RawResponse,
        final_state_via: FinalStateVia,
    ) -> ArmResult<Self> {
        let request_url = request.url().clone();
        let polling = select_polling_target(&initial, request.method(), &request_url)?;
        let location_url = initial
            .header(LOCATION)
            .filter(|v| !v.trim().is_empty())
            .map(|v| resolve_url(&request_url, v))
            .transpose()?;

        let mut operation = Self {
            client,
            source,
            request_method: request.method().clone(),
            request_url,
            polling,
            location_url,
            final_state_via,
            state: OperationState::Running,
            raw_response: None,
            value: None,
            error: None,
        };

        match &operation.polling {
            Some(target) => {
                tracing::debug!(
                    polling_url = %target.url,
                    polling_method = ?target.method,
                    "operation is running",
                );
            }
            None => {
                let (state, error) = initial_terminal_state(&initial);
                if state == OperationState::Succeeded {
                    operation.value = Some(operation.source.create_result(&initial)?);
                }
                operation.error = error;
                operation.state = state;
                tracing::debug!(state = %state, "operation completed synchronously");
            }
        }
        operation.raw_response = Some(initial);
        Ok(operation)
    }

    /// Rebuild a handle from a [`ResumeToken`].
    ///
    /// The handle starts in [`OperationState::NotStarted`] and learns its
    /// real state on the first poll.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidState`] when the token was produced for a
    /// different result kind than `source` handles, or holds invalid URLs.
    pub fn rehydrate(client: ArmClient, source: S, token: ResumeToken) -> ArmResult<Self> {
        if token.result_kind() != source.kind() {
            return Err(ArmError::InvalidState(format!(
                "resume token is for '{}' but the operation source handles '{}'",
                token.result_kind(),
                source.kind()
            )));
        }
        let state: ResumeStateV1 = token.into_state();

        let parse = |value: &str| {
            Url::parse(value).map_err(|e| {
                ArmError::InvalidState(format!("resume token holds invalid URL '{value}': {e}"))
            })
        };
        let request_method = Method::from_bytes(state.request_method.as_bytes()).map_err(|_| {
            ArmError::InvalidState(format!(
                "resume token holds invalid HTTP method '{}'",
                state.request_method
            ))
        })?;

        Ok(Self {
            client,
            source,
            request_method,
            request_url: parse(&state.request_url)?,
            polling: Some(PollingTarget {
                method: state.polling_method,
                url: parse(&state.polling_url)?,
            }),
            location_url: state.location_url.as_deref().map(parse).transpose()?,
            final_state_via: state.final_state_via,
            state: OperationState::NotStarted,
            raw_response: None,
            value: None,
            error: None,
        })
    }

    /// A token from which [`rehydrate`](Self::rehydrate) can rebuild this
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidState`] when the operation completed
    /// synchronously, since there is nothing to poll.
    pub fn resume_token(&self) -> ArmResult<ResumeToken> {
        let target = self.polling.as_ref().ok_or_else(|| {
            ArmError::InvalidState("operation completed synchronously and cannot be resumed".into())
        })?;
        Ok(ResumeToken::V1(ResumeStateV1 {
            request_method: self.request_method.to_string(),
            request_url: self.request_url.to_string(),
            polling_url: target.url.to_string(),
            polling_method: target.method,
            location_url: self.location_url.as_ref().map(Url::to_string),
            final_state_via: self.final_state_via,
            result_kind: self.source.kind().to_string(),
        }))
    }

    /// The last known state.
    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Whether the operation reached a terminal state.
    pub fn has_completed(&self) -> bool {
        self.state.is_terminal()
    }

    /// The last response observed, if any.
    pub fn raw_response(&self) -> Option<&RawResponse> {
        self.raw_response.as_ref()
    }

    /// The service error reported for a failed or canceled operation.
    pub fn error(&self) -> Option<&ResponseError> {
        self.error.as_ref()
    }

    /// The URL being polled, if the operation needed polling.
    pub fn polling_url(&self) -> Option<&Url> {
        self.polling.as_ref().map(|t| &t.url)
    }

    /// The result of a succeeded operation.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidState`] unless the state is
    /// [`OperationState::Succeeded`].
    pub fn value(&self) -> ArmResult<&S::Output> {
        match (&self.state, &self.value) {
            (OperationState::Succeeded, Some(value)) => Ok(value),
            _ => Err(ArmError::InvalidState(format!(
                "operation has no value in state {}",
                self.state
            ))),
        }
    }

    /// Consume the handle and return the result of a succeeded operation.
    pub fn into_value(self) -> ArmResult<S::Output> {
        match (self.state, self.value) {
            (OperationState::Succeeded, Some(value)) => Ok(value),
            (state, _) => Err(ArmError::InvalidState(format!(
                "operation has no value in state {state}"
            ))),
        }
    }

    /// Issue one status request and update the state.
    ///
    /// On a terminal handle nothing is sent and the terminal state is
    /// returned. When the operation is seen to succeed, the final resource
    /// is fetched (if it lives elsewhere) and mapped before the state
    /// becomes `Succeeded`; if that fails the handle stays `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Polling`] for a status response without a status,
    /// and pipeline errors unchanged. The state is not modified on error.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::lro::poll` with field `state`.
    #[tracing::instrument(name = "arm::lro::poll", skip(self), fields(state = %self.state))]
    pub async fn poll(&mut self) -> ArmResult<OperationState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        let (polling_url, polling_method) = match &self.polling {
            Some(target) => (target.url.clone(), target.method),
            None => {
                return Err(ArmError::InvalidState(
                    "operation has no polling location".into(),
                ))
            }
        };

        tracing::trace!(polling_url = %polling_url, "polling operation status");
        let response = self.client.send(&ArmRequest::get(polling_url.clone())).await?;
        let observation = observe(&response, polling_method)?;
        let next = self.state.advance(observation.state);

        match next {
            OperationState::Succeeded => {
                let final_url = self.final_url(&polling_url, observation.resource_location.as_deref())?;
                let final_response = match final_url {
                    Some(url) => {
                        tracing::debug!(final_url = %url, "fetching final resource");
                        self.client.send(&ArmRequest::get(url)).await?
                    }
                    None => response,
                };
                self.value = Some(self.source.create_result(&final_response)?);
                self.raw_response = Some(final_response);
            }
            OperationState::Failed | OperationState::Canceled => {
                self.error = observation.error;
                self.raw_response = Some(response);
            }
            OperationState::NotStarted | OperationState::Running => {
                self.raw_response = Some(response);
            }
        }

        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, "operation state changed");
        }
        self.state = next;
        Ok(next)
    }

    /// Where the final resource is read from, when it is not the terminal
    /// status response itself.
    fn final_url(&self, polling_url: &Url, resource_location: Option<&str>) -> ArmResult<Option<Url>> {
        let Some(target) = &self.polling else {
            return Ok(None);
        };
        if target.method != PollingMethod::StatusMonitor || self.request_method == Method::DELETE {
            return Ok(None);
        }

        let resource_location = resource_location
            .map(|l| resolve_url(&self.request_url, l))
            .transpose()?;
        let is_post = self.request_method == Method::POST;

        let url = match self.final_state_via {
            FinalStateVia::Location if self.location_url.is_some() => self.location_url.clone(),
            FinalStateVia::AzureAsyncOperation | FinalStateVia::OperationLocation if is_post => {
                resource_location
            }
            FinalStateVia::OriginalUri => Some(self.request_url.clone()),
            _ if self.location_url.is_some() => self.location_url.clone(),
            _ if self.request_method == Method::PUT || self.request_method == Method::PATCH => {
                Some(self.request_url.clone())
            }
            _ => resource_location,
        };
        Ok(url.filter(|u| u != polling_url))
    }

    /// Poll until the operation is terminal, with default options.
    ///
    /// See [`wait_for_completion_with`](Self::wait_for_completion_with).
    pub async fn wait_for_completion(&mut self) -> ArmResult<S::Output>
    where
        S::Output: Clone,
    {
        self.wait_for_completion_with(&PollingOptions::default(), &CancellationToken::new())
            .await
    }

    /// Poll until the operation is terminal.
    ///
    /// Between polls the handle sleeps for the service's `Retry-After`
    /// when present, and for the delay from `options` otherwise.
    ///
    /// Cancelling `cancel` stops the wait: an in-flight poll is abandoned,
    /// no further request is sent, the handle keeps its last observed state,
    /// and [`ArmError::Cancelled`] is returned. The operation itself keeps
    /// running on the service.
    ///
    /// # Errors
    ///
    /// - [`ArmError::OperationFailed`] when the operation failed;
    /// - [`ArmError::OperationCanceled`] when the service canceled it;
    /// - [`ArmError::Cancelled`] when `cancel` fired;
    /// - any error from [`poll`](Self::poll).
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::lro::wait_for_completion`.
    #[tracing::instrument(
        name = "arm::lro::wait_for_completion",
        skip(self, options, cancel),
        fields(kind = %self.source.kind())
    )]
    pub async fn wait_for_completion_with(
        &mut self,
        options: &PollingOptions,
        cancel: &CancellationToken,
    ) -> ArmResult<S::Output>
    where
        S::Output: Clone,
    {
        let mut attempt = 0u32;
        while !self.state.is_terminal() {
            let state = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Self::cancelled()),
                result = self.poll() => result?,
            };
            if state.is_terminal() {
                break;
            }

            let hint = self.raw_response.as_ref().and_then(RawResponse::retry_after);
            let delay = options.next_delay(attempt, hint);
            attempt += 1;
            tracing::trace!(
                state = %state,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "operation still in progress, waiting",
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Self::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.terminal_result()
    }

    fn cancelled() -> ArmError {
        tracing::debug!("wait cancelled by caller");
        ArmError::Cancelled
    }

    fn terminal_result(&self) -> ArmResult<S::Output>
    where
        S::Output: Clone,
    {
        match self.state {
            OperationState::Succeeded => self.value().cloned(),
            OperationState::Failed => {
                let error = self.error.clone().unwrap_or_default();
                Err(ArmError::OperationFailed {
                    code: error.code_or_unknown().to_string(),
                    message: error
                        .message
                        .unwrap_or_else(|| "the operation failed without details".into()),
                })
            }
            OperationState::Canceled => Err(ArmError::OperationCanceled),
            OperationState::NotStarted | OperationState::Running => Err(ArmError::InvalidState(
                format!("operation is not complete (state {})", self.state),
            )),
        }
    }
}

impl<S: OperationSource> std::fmt::Debug for ArmOperation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmOperation")
            .field("kind", &self.source.kind())
            .field("request_method", &self.request_method)
            .field("request_url", &self.request_url.as_str())
            .field("polling_url", &self.polling_url().map(Url::as_str))
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
