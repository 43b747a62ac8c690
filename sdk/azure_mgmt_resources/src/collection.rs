//! Collections of resources of one type under one parent.
//!
//! A [`ResourceCollection`] offers the operations every Resource Manager
//! resource type supports: create or update, get, existence checks, listing
//! and deletion. Creation, update and deletion are long-running and return
//! an [`ArmOperation`] handle.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_operations::WaitUntil;
//! use azure_mgmt_resources::collection::ResourceCollection;
//! use azure_mgmt_resources::models::ResourceData;
//! use azure_mgmt_resources::resource_id::ResourceId;
//! use futures::TryStreamExt;
//!
//! # async fn example(client: ArmClient) -> azure_mgmt_core::ArmResult<()> {
//! let parent = ResourceId::resource_group("00000000-0000-0000-0000-000000000000", "my-rg")?;
//! let identities = ResourceCollection::new(
//!     client,
//!     parent,
//!     "Microsoft.ManagedIdentity/userAssignedIdentities",
//! )?
//! .with_api_version("2023-01-31");
//!
//! // Create and wait
//! let data = ResourceData::new("westus").with_tag("env", "dev");
//! let operation = identities
//!     .create_or_update(WaitUntil::Completed, "my-identity", &data)
//!     .await?;
//! println!("created {:?}", operation.value()?.id);
//!
//! // List
//! let all: Vec<_> = identities.get_all()?.items().try_collect().await?;
//! println!("{} identities", all.len());
//!
//! // Delete without waiting, keep the token for later
//! let deletion = identities.delete(WaitUntil::Started, "my-identity").await?;
//! if !deletion.has_completed() {
//!     let token = deletion.resume_token()?.encode()?;
//!     let mut resumed = identities.rehydrate_delete(&token)?;
//!     resumed.wait_for_completion().await?;
//! }
//! # Ok(())
//! # }
//! ```

use azure_mgmt_core::client::ArmClient;
use azure_mgmt_core::error::{ArmError, ArmResult};
use azure_mgmt_core::http::{ArmRequest, Method};
use azure_mgmt_operations::{
    ArmOperation, EmptyOperationSource, FinalStateVia, JsonOperationSource, OperationSource,
    Pager, PollingOptions, ResumeToken, WaitUntil,
};
use tokio_util::sync::CancellationToken;

use crate::models::ResourceData;
use crate::resource_id::{validate_segment, ResourceId};

/// Handle for a create, update or other operation yielding a resource.
pub type ResourceOperation = ArmOperation<JsonOperationSource<ResourceData>>;

/// Handle for a delete operation.
pub type DeleteOperation = ArmOperation<EmptyOperationSource>;

/// The resources of one type directly under one parent.
///
/// For a top-level type such as `Microsoft.Storage/storageAccounts` the
/// parent is a subscription or resource group. For a child type such as
/// `Microsoft.Sql/servers/databases` the parent is the enclosing resource.
#[derive(Debug, Clone)]
pub struct ResourceCollection {
    client: ArmClient,
    parent: ResourceId,
    namespace: String,
    types: Vec<String>,
    api_version: Option<String>,
    polling: PollingOptions,
}

impl ResourceCollection {
    /// A collection of `resource_type` resources under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] when `resource_type` is not of
    /// the form `Namespace/type[/childType...]`, or when a child type does
    /// not match the parent's type.
    pub fn new(client: ArmClient, parent: ResourceId, resource_type: &str) -> ArmResult<Self> {
        let mut parts = resource_type.split('/');
        let namespace = parts.next().unwrap_or_default().to_string();
        let types: Vec<String> = parts.map(str::to_string).collect();
        if namespace.trim().is_empty() || types.is_empty() || types.iter().any(|t| t.trim().is_empty()) {
            return Err(ArmError::InvalidArgument(format!(
                "resource type '{resource_type}' must look like 'Namespace/type'"
            )));
        }

        if types.len() > 1 {
            let expected_parent = format!("{namespace}/{}", types[..types.len() - 1].join("/"));
            if !parent.resource_type().eq_ignore_ascii_case(&expected_parent) {
                return Err(ArmError::InvalidArgument(format!(
                    "'{resource_type}' resources must live under a '{expected_parent}', not '{}'",
                    parent.resource_type()
                )));
            }
        }

        Ok(Self {
            client,
            parent,
            namespace,
            types,
            api_version: None,
            polling: PollingOptions::default(),
        })
    }

    /// Use a specific API version instead of the client's.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// How long-running operations are polled when waiting for completion.
    pub fn with_polling_options(mut self, options: PollingOptions) -> Self {
        self.polling = options;
        self
    }

    pub fn parent(&self) -> &ResourceId {
        &self.parent
    }

    /// The full resource type, e.g. `Microsoft.Storage/storageAccounts`.
    pub fn resource_type(&self) -> String {
        format!("{}/{}", self.namespace, self.types.join("/"))
    }

    /// The id of the resource called `name` in this collection.
    pub fn resource_id(&self, name: &str) -> ArmResult<ResourceId> {
        validate_segment("resource name", name)?;
        match self.types.as_slice() {
            [single] => self
                .parent
                .append_provider_resource(&self.namespace, single, name),
            [.., last] => self.parent.append_child(last, name),
            [] => Err(ArmError::InvalidState("collection has no resource type".into())),
        }
    }

    fn list_path(&self) -> String {
        match self.types.as_slice() {
            [single] => format!("{}/providers/{}/{}", self.parent, self.namespace, single),
            [.., last] => format!("{}/{}", self.parent, last),
            [] => self.parent.to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> ArmResult<ArmRequest> {
        match &self.api_version {
            Some(version) => self.client.request_with_api_version(method, path, version),
            None => self.client.request(method, path),
        }
    }

    fn source(&self) -> JsonOperationSource<ResourceData> {
        JsonOperationSource::new(self.resource_type())
    }

    async fn finish<S>(&self, wait_until: WaitUntil, operation: &mut ArmOperation<S>) -> ArmResult<()>
    where
        S: OperationSource,
        S::Output: Clone,
    {
        if wait_until == WaitUntil::Completed {
            operation
                .wait_for_completion_with(&self.polling, &CancellationToken::new())
                .await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Create a resource, or replace it if it exists.
    ///
    /// With [`WaitUntil::Completed`] the call returns once the resource is
    /// provisioned and [`ArmOperation::value`] holds it. With
    /// [`WaitUntil::Started`] it returns as soon as the service accepted the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] for an invalid name, and the
    /// operation's error when waiting for a failed or canceled operation.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::resources::create_or_update` with fields
    /// `resource_type` and `name`.
    #[tracing::instrument(
        name = "arm::resources::create_or_update",
        skip(self, data),
        fields(resource_type = %self.resource_type(), name = %name)
    )]
    pub async fn create_or_update(
        &self,
        wait_until: WaitUntil,
        name: &str,
        data: &ResourceData,
    ) -> ArmResult<ResourceOperation> {
        let id = self.resource_id(name)?;
        tracing::debug!("creating or updating resource");

        let request = self.request(Method::PUT, &id.to_string())?.with_json(data)?;
        let mut operation =
            ArmOperation::start(self.client.clone(), self.source(), request, FinalStateVia::OriginalUri)
                .await?;
        self.finish(wait_until, &mut operation).await?;

        tracing::debug!(state = %operation.state(), "create or update returned");
        Ok(operation)
    }

    /// Update some fields of an existing resource with `PATCH`.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::resources::update` with fields
    /// `resource_type` and `name`.
    #[tracing::instrument(
        name = "arm::resources::update",
        skip(self, patch),
        fields(resource_type = %self.resource_type(), name = %name)
    )]
    pub async fn update(
        &self,
        wait_until: WaitUntil,
        name: &str,
        patch: &serde_json::Value,
    ) -> ArmResult<ResourceOperation> {
        let id = self.resource_id(name)?;
        tracing::debug!("updating resource");

        let request = self.request(Method::PATCH, &id.to_string())?.with_json(patch)?;
        let mut operation =
            ArmOperation::start(self.client.clone(), self.source(), request, FinalStateVia::OriginalUri)
                .await?;
        self.finish(wait_until, &mut operation).await?;
        Ok(operation)
    }

    /// Get a resource by name.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::RequestFailed`] with status 404 when the resource
    /// does not exist.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::resources::get` with fields `resource_type`
    /// and `name`.
    #[tracing::instrument(
        name = "arm::resources::get",
        skip(self),
        fields(resource_type = %self.resource_type(), name = %name)
    )]
    pub async fn get(&self, name: &str) -> ArmResult<ResourceData> {
        let id = self.resource_id(name)?;
        tracing::debug!("getting resource");

        let response = self.client.send(&self.request(Method::GET, &id.to_string())?).await?;
        response.json()
    }

    /// Get a resource, or `None` when it does not exist.
    pub async fn get_if_exists(&self, name: &str) -> ArmResult<Option<ResourceData>> {
        match self.get(name).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether a resource called `name` exists.
    ///
    /// Only a 404 answer means "no"; every other error is returned.
    pub async fn exists(&self, name: &str) -> ArmResult<bool> {
        Ok(self.get_if_exists(name).await?.is_some())
    }

    /// Every resource in the collection, as a lazy [`Pager`].
    ///
    /// Nothing is sent until the pager's stream is polled.
    pub fn get_all(&self) -> ArmResult<Pager<ResourceData>> {
        let request = self.request(Method::GET, &self.list_path())?;
        tracing::debug!(
            resource_type = %self.resource_type(),
            url = %request.url(),
            "listing resources",
        );
        Ok(Pager::from_url(self.client.clone(), request.url().clone()))
    }

    /// Delete a resource.
    ///
    /// # Tracing
    ///
    /// Emits a span named `arm::resources::delete` with fields
    /// `resource_type` and `name`.
    #[tracing::instrument(
        name = "arm::resources::delete",
        skip(self),
        fields(resource_type = %self.resource_type(), name = %name)
    )]
    pub async fn delete(&self, wait_until: WaitUntil, name: &str) -> ArmResult<DeleteOperation> {
        let id = self.resource_id(name)?;
        tracing::debug!("deleting resource");

        let request = self.request(Method::DELETE, &id.to_string())?;
        let mut operation =
            ArmOperation::start(self.client.clone(), EmptyOperationSource, request, FinalStateVia::Location)
                .await?;
        self.finish(wait_until, &mut operation).await?;

        tracing::debug!(state = %operation.state(), "delete returned");
        Ok(operation)
    }

    /// Resume a create, update or other resource-yielding operation from an
    /// encoded [`ResumeToken`].
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidState`] for malformed tokens and for tokens
    /// of operations that do not yield this collection's resource type.
    pub fn rehydrate_create_or_update(&self, token: &str) -> ArmResult<ResourceOperation> {
        let token = ResumeToken::decode(token)?;
        ArmOperation::rehydrate(self.client.clone(), self.source(), token)
    }

    /// Resume a delete operation from an encoded [`ResumeToken`].
    pub fn rehydrate_delete(&self, token: &str) -> ArmResult<DeleteOperation> {
        let token = ResumeToken::decode(token)?;
        ArmOperation::rehydrate(self.client.clone(), EmptyOperationSource, token)
    }
}
