//! Mapping a completed operation's final response to a typed result.

use azure_mgmt_core::error::ArmResult;
use azure_mgmt_core::http::RawResponse;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Converts the final response of a succeeded operation into its result.
///
/// [`kind`](Self::kind) names the result shape. It is written into resume
/// tokens so that a handle rehydrated in another process can check it is
/// being resumed with a compatible source.
pub trait OperationSource {
    /// The typed result of the operation.
    type Output;

    /// Discriminator for the result shape, e.g. `"Microsoft.Storage/storageAccounts"`.
    fn kind(&self) -> &str;

    /// Build the result from the final response.
    ///
    /// Called once per handle, after the operation is observed to succeed.
    fn create_result(&self, response: &RawResponse) -> ArmResult<Self::Output>;
}

/// Deserializes the final response body as JSON.
#[derive(Debug)]
pub struct JsonOperationSource<T> {
    kind: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonOperationSource<T> {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for JsonOperationSource<T> {
    fn clone(&self) -> Self {
        Self::new(self.kind.clone())
    }
}

impl<T: DeserializeOwned> OperationSource for JsonOperationSource<T> {
    type Output = T;

    fn kind(&self) -> &str {
        &self.kind
    }

    fn create_result(&self, response: &RawResponse) -> ArmResult<T> {
        response.json()
    }
}

/// For operations without a result body, such as deletes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyOperationSource;

impl EmptyOperationSource {
    /// Discriminator written into resume tokens.
    pub const KIND: &'static str = "empty";
}

impl OperationSource for EmptyOperationSource {
    type Output = ();

    fn kind(&self) -> &str {
        Self::KIND
    }

    fn create_result(&self, _response: &RawResponse) -> ArmResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Vault {
        name: String,
    }

    #[test]
    fn json_source_deserializes_body() {
        let source = JsonOperationSource::<Vault>::new("Microsoft.KeyVault/vaults");
        let response = RawResponse::new(200, HeaderMap::new(), r#"{"name": "kv-1", "extra": 1}"#);
        let vault = source.create_result(&response).expect("valid body");
        assert_eq!(vault, Vault { name: "kv-1".into() });
        assert_eq!(source.kind(), "Microsoft.KeyVault/vaults");
    }

    #[test]
    fn json_source_reports_malformed_body() {
        let source = JsonOperationSource::<Vault>::new("Microsoft.KeyVault/vaults");
        let response = RawResponse::new(200, HeaderMap::new(), "{}");
        assert!(source.create_result(&response).is_err());
    }

    #[test]
    fn empty_source_ignores_body() {
        let response = RawResponse::new(204, HeaderMap::new(), "");
        EmptyOperationSource.create_result(&response).expect("always ok");
        assert_eq!(EmptyOperationSource.kind(), "empty");
    }
}
