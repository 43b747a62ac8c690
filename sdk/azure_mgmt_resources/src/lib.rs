//! # Azure Resource Manager resources
//!
//! Generic building blocks shared by every Resource Manager resource type:
//!
//! - [`resource_id`] - Parse and build resource ids
//! - [`models`] - The common resource envelope, keeping unknown fields
//! - [`collection`] - Create, get, list and delete resources of one type
//! - [`polymorphic`] - Model families selected by a `kind`-style discriminator
//! - [`deployment_script`] - Deployment scripts, one such family
//!
//! Long-running calls return handles from `azure_mgmt_operations`; listings
//! return its lazy `Pager`.

pub mod collection;
pub mod deployment_script;
pub mod models;
pub mod polymorphic;
pub mod resource_id;

pub use collection::{DeleteOperation, ResourceCollection, ResourceOperation};
pub use deployment_script::DeploymentScript;
pub use models::{ResourceData, SystemData};
pub use polymorphic::{Discriminated, Polymorphic};
pub use resource_id::ResourceId;
