//! Resume tokens for long-running operations.
//!
//! A resume token is a versioned, JSON-encoded record holding everything
//! needed to continue polling an operation from another process: the
//! request that started it, the polling URL and method, the final-state
//! strategy, and the kind of result the operation produces.
//!
//! ```rust
//! use azure_mgmt_operations::resume::ResumeToken;
//!
//! let encoded = r#"{
//!     "version": "1",
//!     "requestMethod": "PUT",
//!     "requestUrl": "https://management.azure.com/subscriptions/s/resourceGroups/rg?api-version=2022-09-01",
//!     "pollingUrl": "https://management.azure.com/ops/abc",
//!     "pollingMethod": "location",
//!     "finalStateVia": "Location",
//!     "resultKind": "Microsoft.Resources/resourceGroups"
//! }"#;
//! let token = ResumeToken::decode(encoded).unwrap();
//! assert_eq!(token.result_kind(), "Microsoft.Resources/resourceGroups");
//! ```

use azure_mgmt_core::error::{ArmError, ArmResult};
use serde::{Deserialize, Serialize};

use crate::polling::{FinalStateVia, PollingMethod};

/// A serializable snapshot of an in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum ResumeToken {
    #[serde(rename = "1")]
    V1(ResumeStateV1),
}

/// Version 1 of the resume token layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeStateV1 {
    /// HTTP method of the request that started the operation.
    pub request_method: String,
    /// URL of the request that started the operation.
    pub request_url: String,
    /// URL polled for status.
    pub polling_url: String,
    /// How the polling URL reports status.
    pub polling_method: PollingMethod,
    /// The `Location` header of the initial response, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_url: Option<String>,
    /// Where the final resource is read from.
    pub final_state_via: FinalStateVia,
    /// Discriminator of the result shape, see
    /// [`OperationSource::kind`](crate::source::OperationSource::kind).
    pub result_kind: String,
}

impl ResumeToken {
    /// Encode the token as a JSON string.
    pub fn encode(&self) -> ArmResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a token produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidState`] for malformed tokens and for
    /// token versions this library does not know.
    pub fn decode(encoded: &str) -> ArmResult<Self> {
        serde_json::from_str(encoded)
            .map_err(|e| ArmError::InvalidState(format!("invalid resume token: {e}")))
    }

    /// The result-shape discriminator recorded in the token.
    pub fn result_kind(&self) -> &str {
        match self {
            Self::V1(state) => &state.result_kind,
        }
    }

    pub(crate) fn into_state(self) -> ResumeStateV1 {
        match self {
            Self::V1(state) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResumeToken {
        ResumeToken::V1(ResumeStateV1 {
            request_method: "DELETE".into(),
            request_url: "https://management.azure.com/sub/rg/vm?api-version=1".into(),
            polling_url: "https://management.azure.com/ops/42".into(),
            polling_method: PollingMethod::StatusMonitor,
            location_url: Some("https://management.azure.com/loc/42".into()),
            final_state_via: FinalStateVia::AzureAsyncOperation,
            result_kind: "empty".into(),
        })
    }

    #[test]
    fn encoded_token_carries_version_tag() {
        let encoded = sample().encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["version"], "1");
        assert_eq!(value["pollingMethod"], "statusMonitor");
        assert_eq!(value["finalStateVia"], "AzureAsyncOperation");
        assert_eq!(ResumeToken::decode(&encoded).unwrap(), sample());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let encoded = sample().encode().unwrap().replace(r#""version":"1""#, r#""version":"9""#);
        let err = ResumeToken::decode(&encoded).unwrap_err();
        assert!(matches!(err, ArmError::InvalidState(_)), "got {err:?}");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            ResumeToken::decode("not a token").unwrap_err(),
            ArmError::InvalidState(_)
        ));
    }
}
