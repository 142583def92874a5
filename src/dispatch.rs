//! The per-request dispatch state machine.
//!
//! One inbound HTTP request flows through five states: negotiate, parse,
//! dispatch (single or batch), serialize, write. Negotiation failures are
//! the only errors reported via HTTP status codes; everything after that
//! travels inside the JSON-RPC envelope on 200/204. Invariant violations
//! (response id mismatch, a non-service error escaping application code)
//! and cancellation propagate as [`DispatchError`] for the host to turn
//! into its generic fault response.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request as HttpRequest, Response as HttpResponse, StatusCode, header};

use crate::cancel::CancelToken;
use crate::codec::{self, ParseOutcome, Payload};
use crate::negotiate::{self, Charset};
use crate::traits::{Handler, HandlerError};
use crate::types::{Error, Message, RequestId, Response, error_codes};

/// Per-deployment policy limits, applied as a pre-pass before any
/// handler invocation.
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    max_batch_size: Option<usize>,
    max_id_length: Option<usize>,
}

impl DispatchConfig {
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder {
            config: DispatchConfig::default(),
        }
    }

    pub fn max_batch_size(&self) -> Option<usize> {
        self.max_batch_size
    }

    pub fn max_id_length(&self) -> Option<usize> {
        self.max_id_length
    }
}

/// Builder for [`DispatchConfig`]
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl DispatchConfigBuilder {
    /// Reject batches with more than `limit` items
    pub fn max_batch_size(mut self, limit: usize) -> Self {
        self.config.max_batch_size = Some(limit);
        self
    }

    /// Reject string ids longer than `limit` bytes
    pub fn max_id_length(mut self, limit: usize) -> Self {
        self.config.max_id_length = Some(limit);
        self
    }

    pub fn build(self) -> DispatchConfig {
        self.config
    }
}

/// Failures that escape the JSON-RPC envelope entirely.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The caller went away; propagated, never converted into a
    /// JSON-RPC error.
    #[error("dispatch cancelled by the caller")]
    Cancelled,

    /// A handler answered a request with a different id. This is a bug
    /// in the handler, and silently substituting the id would let a
    /// client correlate a response to the wrong request.
    #[error("handler response id does not match request id {request_id}")]
    ResponseIdMismatch { request_id: RequestId },

    /// A non-service error escaped application code.
    #[error("handler failed: {0}")]
    Handler(HandlerError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to build http response: {0}")]
    Http(#[from] http::Error),
}

/// What the dispatch states produced before serialization.
enum Outcome {
    /// Nothing to send: 204 No Content.
    Empty,
    Single(Response),
    Batch(Vec<Response>),
}

/// Drives one HTTP request through the dispatch states.
///
/// Holds one handler capability; concurrency across simultaneous HTTP
/// requests is the hosting server's concern. The handler's contract
/// registry is read-only and safe to share.
pub struct Dispatcher {
    handler: Arc<dyn Handler>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self::with_config(handler, DispatchConfig::default())
    }

    pub fn with_config(handler: Arc<dyn Handler>, config: DispatchConfig) -> Self {
        Self { handler, config }
    }

    /// Handle one HTTP request, producing one HTTP response.
    pub async fn dispatch(
        &self,
        request: HttpRequest<Bytes>,
        cancel: &CancelToken,
    ) -> Result<HttpResponse<Bytes>, DispatchError> {
        let (parts, body) = request.into_parts();

        // Negotiate before touching the body.
        let negotiation = match negotiate::negotiate(&parts) {
            Ok(negotiation) => negotiation,
            Err(err) => {
                tracing::debug!(error = %err, method = %parts.method, "content negotiation failed");
                return Ok(status_only(err.status())?);
            }
        };

        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let payload = match negotiation.request_charset.decode(&body) {
            Ok(text) => codec::decode_payload(&text, self.handler.contracts()),
            Err(err) => {
                // Negotiation passed, so a body that cannot be decoded is
                // a parse failure inside the protocol, not a 4xx.
                tracing::debug!(
                    error = %err,
                    charset = negotiation.request_charset.name(),
                    "body decode failed"
                );
                Payload::Single(ParseOutcome::Invalid {
                    error: Error::new(error_codes::PARSE_ERROR, "Parse error"),
                    id: None,
                })
            }
        };

        let outcome = match payload {
            Payload::Single(outcome) => self.dispatch_single(outcome).await?,
            Payload::Batch(outcomes) => self.dispatch_batch(outcomes, cancel).await?,
        };

        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        match outcome {
            Outcome::Empty => status_only(StatusCode::NO_CONTENT),
            Outcome::Single(response) => {
                write_body(codec::encode_single(&response)?, negotiation.response_charset)
            }
            Outcome::Batch(responses) => {
                write_body(codec::encode_batch(&responses)?, negotiation.response_charset)
            }
        }
    }

    async fn dispatch_single(&self, outcome: ParseOutcome) -> Result<Outcome, DispatchError> {
        let message = match outcome {
            ParseOutcome::Invalid { error, id } => {
                return Ok(Outcome::Single(Response::error(error, id)));
            }
            ParseOutcome::Valid(message) => message,
        };

        if let Some(error) = self.id_length_violation(message.id()) {
            return Ok(Outcome::Single(Response::error(error, None)));
        }

        match self.invoke(message).await? {
            Some(response) => Ok(Outcome::Single(response)),
            None => Ok(Outcome::Empty),
        }
    }

    async fn dispatch_batch(
        &self,
        outcomes: Vec<ParseOutcome>,
        cancel: &CancelToken,
    ) -> Result<Outcome, DispatchError> {
        // Policy pre-pass over the whole batch; nothing is invoked if it
        // fails, and the remaining items are discarded.
        if let Some(error) = self.batch_policy_violation(&outcomes) {
            return Ok(Outcome::Single(Response::error(error, None)));
        }

        let mut responses = Vec::new();
        for outcome in outcomes {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }
            match outcome {
                ParseOutcome::Invalid { error, id } => {
                    responses.push(Response::error(error, id));
                }
                ParseOutcome::Valid(message) => {
                    if let Some(response) = self.invoke(message).await? {
                        responses.push(response);
                    }
                }
            }
        }

        if responses.is_empty() {
            // Every surviving item was a notification: empty body, not [].
            Ok(Outcome::Empty)
        } else {
            Ok(Outcome::Batch(responses))
        }
    }

    /// Invoke the handler for one valid message and apply the
    /// notification rules to whatever comes back.
    async fn invoke(&self, message: Message) -> Result<Option<Response>, DispatchError> {
        let is_request = message.is_request();
        let method = message.method().to_string();
        let request_id = message.id().cloned();

        let produced = self
            .handler
            .handle(message)
            .await
            .map_err(DispatchError::Handler)?;

        match produced {
            None => {
                if is_request {
                    tracing::warn!(method = %method, "handler produced no response for a request");
                }
                Ok(None)
            }
            Some(response) => {
                if !is_request {
                    tracing::debug!(method = %method, "discarding response produced for a notification");
                    return Ok(None);
                }
                // request_id is always present on the request path.
                if let Some(request_id) = request_id {
                    if response.id() != Some(&request_id) {
                        return Err(DispatchError::ResponseIdMismatch { request_id });
                    }
                }
                Ok(Some(response))
            }
        }
    }

    fn id_length_violation(&self, id: Option<&RequestId>) -> Option<Error> {
        let max = self.config.max_id_length?;
        let len = id.and_then(RequestId::string_len)?;
        if len > max {
            tracing::warn!(id_length = len, max_id_length = max, "id length limit exceeded");
            Some(Error::new(
                error_codes::ID_LENGTH_EXCEEDED,
                format!("id length {} exceeds maximum {}", len, max),
            ))
        } else {
            None
        }
    }

    fn batch_policy_violation(&self, outcomes: &[ParseOutcome]) -> Option<Error> {
        if let Some(max) = self.config.max_batch_size
            && outcomes.len() > max
        {
            tracing::warn!(
                batch_size = outcomes.len(),
                max_batch_size = max,
                "batch size limit exceeded"
            );
            return Some(Error::new(
                error_codes::BATCH_LIMIT_EXCEEDED,
                format!("batch size {} exceeds maximum {}", outcomes.len(), max),
            ));
        }

        let mut seen = HashSet::new();
        for outcome in outcomes {
            if let ParseOutcome::Valid(Message::Request(req)) = outcome
                && let Some(id) = req.id()
            {
                if let Some(error) = self.id_length_violation(Some(id)) {
                    return Some(error);
                }
                if !seen.insert(id) {
                    tracing::warn!(id = %id, "duplicate request id in batch");
                    return Some(Error::new(
                        error_codes::DUPLICATE_REQUEST_IDS,
                        format!("duplicate request id '{}' in batch", id),
                    ));
                }
            }
        }
        None
    }
}

fn status_only(status: StatusCode) -> Result<HttpResponse<Bytes>, DispatchError> {
    Ok(HttpResponse::builder()
        .status(status)
        .header(header::CONTENT_LENGTH, 0)
        .body(Bytes::new())?)
}

fn write_body(text: String, charset: Charset) -> Result<HttpResponse<Bytes>, DispatchError> {
    let bytes = charset.encode(&text);
    Ok(HttpResponse::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, charset.content_type())
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Bytes::from(bytes))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Contract, ContractRegistry, ParamKind};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Handler exercising every dispatcher edge: well-behaved methods,
    /// one that stays silent on requests, one that answers notifications,
    /// one that lies about ids, and one that fails outright.
    struct TestHandler {
        contracts: ContractRegistry,
        calls: AtomicUsize,
    }

    impl TestHandler {
        fn new() -> Self {
            Self {
                contracts: ContractRegistry::builder()
                    .contract(
                        "add",
                        Contract::by_position([ParamKind::Integer, ParamKind::Integer]),
                    )
                    .contract("ping", Contract::none())
                    .contract("silent", Contract::none())
                    .contract("chatty", Contract::none())
                    .contract("liar", Contract::none())
                    .contract("boom", Contract::none())
                    .build()
                    .unwrap(),
            calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Handler for TestHandler {
        fn contracts(&self) -> &ContractRegistry {
            &self.contracts
        }

        async fn handle(
            &self,
            message: Message,
        ) -> Result<Option<Response>, crate::traits::HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = message.id().cloned();
            match message.method() {
                "add" => {
                    let params = message.params().cloned().unwrap_or(Value::Null);
                    let sum = params[0].as_i64().unwrap() + params[1].as_i64().unwrap();
                    Ok(id.map(|id| Response::success(json!(sum), Some(id))))
                }
                "ping" => Ok(id.map(|id| Response::success(json!("pong"), Some(id)))),
                "silent" => Ok(None),
                "chatty" => Ok(Some(Response::success(json!("noise"), id))),
                "liar" => Ok(Some(Response::success(
                    json!(0),
                    Some(RequestId::from("wrong")),
                ))),
                "boom" => Err("database exploded".into()),
                other => panic!("unexpected method {}", other),
            }
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<TestHandler>) {
        let handler = Arc::new(TestHandler::new());
        (Dispatcher::new(handler.clone()), handler)
    }

    fn dispatcher_with(config: DispatchConfig) -> (Dispatcher, Arc<TestHandler>) {
        let handler = Arc::new(TestHandler::new());
        (Dispatcher::with_config(handler.clone(), config), handler)
    }

    fn post(body: &str) -> HttpRequest<Bytes> {
        HttpRequest::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(Bytes::from(body.to_string()))
            .unwrap()
    }

    async fn run(dispatcher: &Dispatcher, request: HttpRequest<Bytes>) -> HttpResponse<Bytes> {
        dispatcher
            .dispatch(request, &CancelToken::new())
            .await
            .unwrap()
    }

    fn body_json(response: &HttpResponse<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_gets_200_with_matching_id() {
        let (dispatcher, _) = dispatcher();
        let response = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/json; charset=utf-8"
        );
        let body = body_json(&response);
        assert_eq!(body["result"], json!(3));
        assert_eq!(body["id"], json!(1));
    }

    #[tokio::test]
    async fn test_content_length_is_exact() {
        let (dispatcher, _) = dispatcher();
        let response = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#),
        )
        .await;
        let declared: usize = response.headers()["content-length"]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(declared, response.body().len());
    }

    #[tokio::test]
    async fn test_notification_gets_204_no_body() {
        let (dispatcher, handler) = dispatcher();
        let response = run(&dispatcher, post(r#"{"jsonrpc":"2.0","method":"ping"}"#)).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_notification_response_is_discarded() {
        // A handler must not be able to force a body onto a notification.
        let (dispatcher, _) = dispatcher();
        let response = run(&dispatcher, post(r#"{"jsonrpc":"2.0","method":"chatty"}"#)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_silent_handler_on_request_yields_204() {
        let (dispatcher, _) = dispatcher();
        let response = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"silent","id":1}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_negotiation_failures() {
        let (dispatcher, handler) = dispatcher();

        let get = HttpRequest::builder()
            .method("GET")
            .uri("/rpc")
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(
            run(&dispatcher, get).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let bad_type = HttpRequest::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "text/plain")
            .header("accept", "application/json")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(
            run(&dispatcher, bad_type).await.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );

        let no_accept = HttpRequest::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(
            run(&dispatcher, no_accept).await.status(),
            StatusCode::NOT_ACCEPTABLE
        );

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_200_parse_error() {
        let (dispatcher, _) = dispatcher();
        let response = run(&dispatcher, post("{broken")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(&response);
        assert_eq!(body["error"]["code"], json!(error_codes::PARSE_ERROR));
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_method_is_200_with_id() {
        let (dispatcher, _) = dispatcher();
        let response = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"nope","id":5}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(&response);
        assert_eq!(body["error"]["code"], json!(error_codes::METHOD_NOT_FOUND));
        assert_eq!(body["id"], json!(5));
    }

    #[tokio::test]
    async fn test_response_id_mismatch_raises() {
        let (dispatcher, _) = dispatcher();
        let err = dispatcher
            .dispatch(
                post(r#"{"jsonrpc":"2.0","method":"liar","id":1}"#),
                &CancelToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ResponseIdMismatch { .. }));
    }

    #[tokio::test]
    async fn test_application_bug_propagates() {
        let (dispatcher, _) = dispatcher();
        let err = dispatcher
            .dispatch(
                post(r#"{"jsonrpc":"2.0","method":"boom","id":1}"#),
                &CancelToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
    }

    #[tokio::test]
    async fn test_batch_responses_in_request_order_without_notifications() {
        let (dispatcher, _) = dispatcher();
        let body = r#"[
            {"jsonrpc":"2.0","method":"add","params":[1,2],"id":1},
            {"jsonrpc":"2.0","method":"ping"},
            {"jsonrpc":"2.0","method":"add","params":[3,4],"id":2},
            {"jsonrpc":"2.0","method":"nope","id":3}
        ]"#;
        let response = run(&dispatcher, post(body)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(&response);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], json!(1));
        assert_eq!(items[0]["result"], json!(3));
        assert_eq!(items[1]["id"], json!(2));
        assert_eq!(items[1]["result"], json!(7));
        assert_eq!(items[2]["id"], json!(3));
        assert_eq!(
            items[2]["error"]["code"],
            json!(error_codes::METHOD_NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_abort_before_any_invocation() {
        let (dispatcher, handler) = dispatcher();
        let body = r#"[
            {"jsonrpc":"2.0","method":"ping","id":1},
            {"jsonrpc":"2.0","method":"ping","id":1}
        ]"#;
        let response = run(&dispatcher, post(body)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(&response);
        assert!(body.is_object(), "policy errors are a single response, not an array");
        assert_eq!(
            body["error"]["code"],
            json!(error_codes::DUPLICATE_REQUEST_IDS)
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_same_value_different_tag_is_not_a_duplicate() {
        let (dispatcher, _) = dispatcher();
        let body = r#"[
            {"jsonrpc":"2.0","method":"ping","id":1},
            {"jsonrpc":"2.0","method":"ping","id":"1"}
        ]"#;
        let response = run(&dispatcher, post(body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(&response).as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_all_notification_batch_is_204_not_empty_array() {
        let (dispatcher, handler) = dispatcher();
        let body = r#"[
            {"jsonrpc":"2.0","method":"ping"},
            {"jsonrpc":"2.0","method":"ping"}
        ]"#;
        let response = run(&dispatcher, post(body)).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let (dispatcher, handler) =
            dispatcher_with(DispatchConfig::builder().max_batch_size(2).build());
        let body = r#"[
            {"jsonrpc":"2.0","method":"ping","id":1},
            {"jsonrpc":"2.0","method":"ping","id":2},
            {"jsonrpc":"2.0","method":"ping","id":3}
        ]"#;
        let response = run(&dispatcher, post(body)).await;

        let body = body_json(&response);
        assert_eq!(
            body["error"]["code"],
            json!(error_codes::BATCH_LIMIT_EXCEEDED)
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_id_length_limit_on_batch_and_single() {
        let (dispatcher, handler) =
            dispatcher_with(DispatchConfig::builder().max_id_length(4).build());

        let response = run(
            &dispatcher,
            post(r#"[{"jsonrpc":"2.0","method":"ping","id":"too-long"}]"#),
        )
        .await;
        assert_eq!(
            body_json(&response)["error"]["code"],
            json!(error_codes::ID_LENGTH_EXCEEDED)
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);

        let response = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"ping","id":"too-long"}"#),
        )
        .await;
        assert_eq!(
            body_json(&response)["error"]["code"],
            json!(error_codes::ID_LENGTH_EXCEEDED)
        );

        // Within the limit everything proceeds.
        let response = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"ping","id":"ok"}"#),
        )
        .await;
        assert_eq!(body_json(&response)["result"], json!("pong"));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts() {
        let (dispatcher, handler) = dispatcher();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = dispatcher
            .dispatch(post(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_utf16_request_and_response() {
        let (dispatcher, _) = dispatcher();
        let body = Charset::Utf16.encode(r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":7}"#);
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json; charset=utf-16")
            .header("accept", "application/json; charset=utf-16")
            .body(Bytes::from(body))
            .unwrap();

        let response = run(&dispatcher, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/json; charset=utf-16"
        );
        let text = Charset::Utf16.decode(response.body()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["result"], json!(5));
        assert_eq!(value["id"], json!(7));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_parse_error_not_4xx() {
        let (dispatcher, _) = dispatcher();
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json; charset=utf-16")
            .header("accept", "application/json")
            .body(Bytes::from_static(&[0x41, 0x00, 0x42])) // truncated
            .unwrap();

        let response = run(&dispatcher, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(&response)["error"]["code"],
            json!(error_codes::PARSE_ERROR)
        );
    }

    #[tokio::test]
    async fn test_dispatch_is_deterministic() {
        let (dispatcher, _) = dispatcher();
        let first = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"add","params":[2,2],"id":1}"#),
        )
        .await;
        let second = run(
            &dispatcher,
            post(r#"{"jsonrpc":"2.0","method":"add","params":[2,2],"id":1}"#),
        )
        .await;
        assert_eq!(
            body_json(&first)["result"],
            body_json(&second)["result"]
        );
    }

    #[test]
    fn test_config_builder() {
        let config = DispatchConfig::builder()
            .max_batch_size(10)
            .max_id_length(64)
            .build();
        assert_eq!(config.max_batch_size(), Some(10));
        assert_eq!(config.max_id_length(), Some(64));

        let config = DispatchConfig::default();
        assert_eq!(config.max_batch_size(), None);
        assert_eq!(config.max_id_length(), None);
    }

    #[tokio::test]
    async fn test_single_item_batch_returns_array() {
        let (dispatcher, _) = dispatcher();
        let response = run(
            &dispatcher,
            post(r#"[{"jsonrpc":"2.0","method":"ping","id":1}]"#),
        )
        .await;
        let body = body_json(&response);
        assert!(body.is_array(), "batch-in means batch-out");
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
