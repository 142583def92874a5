//! Transport layer implementations.
//!
//! A transport owns the listening socket and the HTTP machinery; it hands
//! each inbound request to a [`crate::dispatch::Dispatcher`] and writes
//! whatever comes back. Currently one transport is provided:
//! - **Axum**: router-based HTTP transport for embedding in Axum apps

#[cfg(feature = "axum")]
pub mod axum;

#[cfg(feature = "axum")]
pub use axum::{AxumRpcBuilder, AxumRpcLayer};
