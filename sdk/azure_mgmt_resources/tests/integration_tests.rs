//! Integration tests for azure_mgmt_resources.
//!
//! These tests require a live Azure subscription.
//! Run with: `cargo test --features integration-tests`
//!
//! Required environment variables:
//! - `AZURE_ACCESS_TOKEN`: A Resource Manager bearer token
//! - `AZURE_SUBSCRIPTION_ID`: The subscription to create resources in
//! - `AZURE_RESOURCE_GROUP`: An existing resource group
//!
//! Optional:
//! - `AZURE_RESOURCE_MANAGER_ENDPOINT`: Defaults to the public cloud
//! - `AZURE_LOCATION`: Defaults to `westus`

#![cfg(feature = "integration-tests")]

use azure_mgmt_core::client::ArmClient;
use azure_mgmt_operations::{OperationState, WaitUntil};
use azure_mgmt_resources::{ResourceCollection, ResourceData, ResourceId};
use futures::TryStreamExt;

const IDENTITY_TYPE: &str = "Microsoft.ManagedIdentity/userAssignedIdentities";
const IDENTITY_API_VERSION: &str = "2023-01-31";

fn identities() -> ResourceCollection {
    let subscription = std::env::var("AZURE_SUBSCRIPTION_ID").expect("AZURE_SUBSCRIPTION_ID not set");
    let group = std::env::var("AZURE_RESOURCE_GROUP").expect("AZURE_RESOURCE_GROUP not set");

    let client = ArmClient::builder().build().expect("Failed to build client");
    let parent = ResourceId::resource_group(&subscription, &group).expect("valid resource group id");
    ResourceCollection::new(client, parent, IDENTITY_TYPE)
        .expect("valid resource type")
        .with_api_version(IDENTITY_API_VERSION)
}

fn location() -> String {
    std::env::var("AZURE_LOCATION").unwrap_or_else(|_| "westus".to_string())
}

#[tokio::test]
async fn test_identity_lifecycle() {
    let identities = identities();
    let name = format!("it-{}", std::process::id());

    // Create
    let data = ResourceData::new(location()).with_tag("purpose", "integration-test");
    let created = identities
        .create_or_update(WaitUntil::Completed, &name, &data)
        .await
        .expect("create identity");
    assert_eq!(created.state(), OperationState::Succeeded);
    let created = created.into_value().expect("created identity");
    assert_eq!(created.name.as_deref(), Some(name.as_str()));
    assert_eq!(created.tag("purpose"), Some("integration-test"));

    // Get and exists
    let fetched = identities.get(&name).await.expect("get identity");
    assert_eq!(fetched.id, created.id);
    assert!(identities.exists(&name).await.expect("exists"));

    // List
    let listed: Vec<ResourceData> = identities
        .get_all()
        .expect("list")
        .items()
        .try_collect()
        .await
        .expect("list identities");
    assert!(listed.iter().any(|i| i.name.as_deref() == Some(name.as_str())));

    // Delete
    identities
        .delete(WaitUntil::Completed, &name)
        .await
        .expect("delete identity");
    assert!(!identities.exists(&name).await.expect("exists after delete"));
}

#[tokio::test]
async fn test_missing_resource() {
    let identities = identities();
    let missing = identities
        .get_if_exists("it-does-not-exist")
        .await
        .expect("lookup");
    assert!(missing.is_none());
}
