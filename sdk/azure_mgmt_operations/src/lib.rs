//! # Azure Resource Manager operations
//!
//! Long-running operations and paged listings for the Azure Resource Manager
//! Rust SDK.
//!
//! Many Resource Manager calls do not finish within the HTTP exchange that
//! starts them. This crate wraps such calls in an [`ArmOperation`] handle that
//! polls the service until the operation reaches a terminal state, and turns
//! multi-page list endpoints into lazy [`Pager`] streams.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_core::http::Method;
//! use azure_mgmt_operations::{ArmOperation, FinalStateVia, EmptyOperationSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ArmClient::builder().build()?;
//!
//!     let request = client.request(
//!         Method::DELETE,
//!         "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/old-rg",
//!     )?;
//!     let mut operation =
//!         ArmOperation::start(client, EmptyOperationSource, request, FinalStateVia::Location).await?;
//!
//!     // Save the token to resume from another process.
//!     if !operation.has_completed() {
//!         println!("resume with {}", operation.resume_token()?.encode()?);
//!     }
//!
//!     operation.wait_for_completion().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`state`] - Operation lifecycle states
//! - [`polling`] - Polling conventions, final-state strategies and delays
//! - [`source`] - Mapping a final response to a typed result
//! - [`operation`] - The long-running operation handle
//! - [`resume`] - Versioned resume tokens
//! - [`pager`] - Lazy paged listings

pub mod operation;
pub mod pager;
pub mod polling;
pub mod resume;
pub mod source;
pub mod state;

pub use operation::{ArmOperation, WaitUntil};
pub use pager::{Page, Pager, PagingConvention};
pub use polling::{DelayStrategy, FinalStateVia, PollingMethod, PollingOptions};
pub use resume::ResumeToken;
pub use source::{EmptyOperationSource, JsonOperationSource, OperationSource};
pub use state::OperationState;
