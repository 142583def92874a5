//! # ember-rpc
//!
//! A JSON-RPC 2.0 request-dispatch layer for HTTP servers.
//!
//! ## Features
//!
//! - **Complete JSON-RPC 2.0 support** - Requests, notifications, and batches,
//!   with spec-accurate error classification
//! - **Content negotiation** - Strict media-type and charset handling,
//!   including UTF-16/UTF-32 request and response bodies
//! - **Declared method contracts** - Parameter shapes registered up front and
//!   enforced during deserialization, before application code runs
//! - **Named parameters with defaults** - Arguments bound in declaration
//!   order, optional parameters filled from declared defaults
//! - **Batch policy limits** - Configurable batch-size and id-length caps,
//!   plus duplicate-id rejection, applied before any method is invoked
//! - **Type-safe builders** - Fluent API for constructing requests,
//!   responses, and method tables
//! - **Axum transport** - Router-based HTTP integration behind a feature flag
//!
//! ## Quick Start
//!
//! ```rust
//! use ember_rpc::{MethodDef, ParamKind, RpcService};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = RpcService::builder()
//!     .method(
//!         MethodDef::builder("add")
//!             .positional(ParamKind::Integer)
//!             .positional(ParamKind::Integer)
//!             .handler(|args| async move {
//!                 let a = args[0].as_i64().unwrap_or_default();
//!                 let b = args[1].as_i64().unwrap_or_default();
//!                 Ok(json!(a + b))
//!             })
//!             .build(),
//!     )
//!     .build()?;
//! # let _ = service;
//! # Ok(())
//! # }
//! ```
//!
//! With the `axum` feature, mount the service in a router:
//!
//! ```rust,ignore
//! let router = ember_rpc::AxumRpcLayer::builder()
//!     .handler(std::sync::Arc::new(service))
//!     .path("/rpc")
//!     .build()?
//!     .into_router();
//! ```

pub mod builders;
pub mod cancel;
pub mod codec;
pub mod contract;
pub mod dispatch;
pub mod negotiate;
pub mod service;
pub mod traits;
pub mod types;

#[cfg(feature = "axum")]
pub mod transports;

/// The only protocol version this crate speaks.
pub const JSONRPC_VERSION: &str = "2.0";

// Re-export async_trait for users implementing Handler
pub use async_trait::async_trait;

// Re-export all core types
pub use types::*;

// Re-export all builders
pub use builders::*;

pub use cancel::CancelToken;
pub use contract::{Contract, ContractRegistry, ContractRegistryBuilder, ParamKind, ParamsShape, RegistryError};
pub use dispatch::{DispatchConfig, DispatchError, Dispatcher};
pub use negotiate::{Charset, NegotiateError, Negotiation};
pub use service::{MethodDef, MethodError, ResultKind, RpcService, ServiceError};
pub use traits::{Handler, HandlerError};

#[cfg(feature = "axum")]
pub use transports::{AxumRpcBuilder, AxumRpcLayer};
