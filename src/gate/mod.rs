//! Tower middleware gating handlers on an authorization decision
//!
//! This module runs the [`Authorizer`](crate::Authorizer) in-process for
//! services that are not fronted by a gateway enforcing the returned
//! policy. Cross-origin headers are left to the transport layer.
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use pdp::gate::{Principal, RequireAccess};
//!
//! async fn list_messages(principal: Principal) -> String {
//!     format!("messages for {}", principal.principal_id)
//! }
//!
//! let app = Router::new()
//!     .route("/messages", get(list_messages))
//!     .layer(RequireAccess::new(
//!         authorizer,
//!         "arn:aws:execute-api:eu-west-1:123456789012:abc123/dev",
//!     ));
//! ```

pub mod error;
pub mod extract;
pub mod middleware;

pub use error::GateRejection;
pub use extract::{describe_request, Principal};
pub use middleware::RequireAccess;
