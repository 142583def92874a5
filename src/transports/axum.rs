//! Axum HTTP transport.
//!
//! Wraps a [`Dispatcher`] as an [`axum::Router`] for embedding in an
//! existing Axum application. The route accepts every HTTP method; the
//! dispatcher owns content negotiation and answers non-POST traffic with
//! 405 itself. Dispatch failures (cancellation, handler bugs, response id
//! mismatches) surface as a bare 500 with no body, never as a JSON-RPC
//! envelope.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::routing::any;
use bytes::Bytes;
use http::{Request as HttpRequest, StatusCode, request::Parts};

use crate::cancel::CancelToken;
use crate::dispatch::{DispatchConfig, DispatchError, Dispatcher};
use crate::traits::Handler;

struct RpcState {
    dispatcher: Dispatcher,
    cancel: CancelToken,
}

/// Builder for [`AxumRpcLayer`]
pub struct AxumRpcBuilder {
    handler: Option<Arc<dyn Handler>>,
    path: String,
    config: DispatchConfig,
    cancel: CancelToken,
}

impl AxumRpcBuilder {
    pub fn new() -> Self {
        Self {
            handler: None,
            path: "/rpc".to_string(),
            config: DispatchConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Set the handler serving this endpoint (required)
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Route path for the endpoint, "/rpc" by default
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Dispatch policy limits (batch size, id length)
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Token the host cancels to drain in-flight dispatches
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<AxumRpcLayer, std::io::Error> {
        let handler = self
            .handler
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Handler not set"))?;

        Ok(AxumRpcLayer {
            state: Arc::new(RpcState {
                dispatcher: Dispatcher::with_config(handler, self.config),
                cancel: self.cancel,
            }),
            path: self.path,
        })
    }
}

impl Default for AxumRpcBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured endpoint, ready to become a router.
pub struct AxumRpcLayer {
    state: Arc<RpcState>,
    path: String,
}

impl std::fmt::Debug for AxumRpcLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxumRpcLayer")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl AxumRpcLayer {
    pub fn builder() -> AxumRpcBuilder {
        AxumRpcBuilder::new()
    }

    /// Build a router serving the endpoint; merge or nest it into the
    /// application's own router.
    pub fn into_router(self) -> Router {
        Router::new()
            .route(&self.path, any(handle_rpc))
            .with_state(self.state)
    }
}

async fn handle_rpc(
    State(state): State<Arc<RpcState>>,
    parts: Parts,
    body: Bytes,
) -> AxumResponse {
    let request = HttpRequest::from_parts(parts, body);
    match state.dispatcher.dispatch(request, &state.cancel).await {
        Ok(response) => response.map(axum::body::Body::from),
        Err(DispatchError::Cancelled) => {
            tracing::debug!("dispatch cancelled");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "dispatch failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
