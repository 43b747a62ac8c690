//! Helpers for testing crates built on top of `azure_mgmt_core`.
//!
//! Enabled with the `test-support` feature. Not part of the stable API.

use crate::auth::ArmCredential;
use crate::client::{ArmClient, RetryPolicy};
use wiremock::MockServer;

/// Test bearer token (not a real token).
pub const TEST_TOKEN: &str = "test-token";

/// API version used by mock clients.
pub const TEST_API_VERSION: &str = "2024-03-01";

/// Subscription used in test resource ids.
pub const TEST_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// Create a client connected to a mock server.
///
/// Retries are disabled so every mocked response is observed exactly once.
pub async fn setup_mock_client(server: &MockServer) -> ArmClient {
    ArmClient::builder()
        .endpoint(server.uri())
        .credential(ArmCredential::bearer_token(TEST_TOKEN))
        .api_version(TEST_API_VERSION)
        .retry_policy(RetryPolicy::none())
        .build()
        .expect("should build client")
}
