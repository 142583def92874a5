//! Core JSON-RPC 2.0 types and data structures.

use serde::{Deserialize, Serialize};

/// Prefix reserved by the JSON-RPC 2.0 specification for system extensions.
///
/// Method names beginning with this prefix must never be registered as
/// application methods; registration builders reject them at startup.
pub const SYSTEM_METHOD_PREFIX: &str = "rpc.";

/// Check whether a method name falls into the reserved system namespace.
pub fn is_system_method(name: &str) -> bool {
    name.starts_with(SYSTEM_METHOD_PREFIX)
}

/// Request identifier - a 64-bit integer or a string.
///
/// Equality is by tag and value: `Number(1)` never equals `String("1")`.
/// Absence of an id (a notification) is modeled as `Option<RequestId>` on
/// [`Request`] and [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl RequestId {
    /// Length of the string form, for string ids only.
    pub fn string_len(&self) -> Option<usize> {
        match self {
            RequestId::String(s) => Some(s.len()),
            RequestId::Number(_) => None,
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

/// JSON-RPC 2.0 request message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl Request {
    /// Create a new JSON-RPC request
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
            id: None,
        }
    }

    /// Add parameters to the request
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Add an ID to the request
    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Check if this request expects a response
    pub fn expects_response(&self) -> bool {
        self.id.is_some()
    }

    /// Check if this is a notification (no response expected)
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get the method name
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get a reference to the parameters
    pub fn params(&self) -> Option<&serde_json::Value> {
        self.params.as_ref()
    }

    /// Get a reference to the request ID
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }
}

/// JSON-RPC 2.0 notification message - a request with no id, no response
/// may ever be produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&serde_json::Value> {
        self.params.as_ref()
    }
}

/// An inbound message after validation: either a request expecting a
/// response or a fire-and-forget notification.
///
/// Deserialization from raw text goes through [`crate::codec`], which
/// validates the envelope against the contract registry; `Message` itself
/// only serializes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Notification(Notification),
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, Message::Notification(_))
    }

    pub fn method(&self) -> &str {
        match self {
            Message::Request(req) => &req.method,
            Message::Notification(notif) => &notif.method,
        }
    }

    pub fn params(&self) -> Option<&serde_json::Value> {
        match self {
            Message::Request(req) => req.params.as_ref(),
            Message::Notification(notif) => notif.params.as_ref(),
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Message::Request(req) => req.id.as_ref(),
            Message::Notification(_) => None,
        }
    }
}

/// JSON-RPC 2.0 response message
///
/// Carries exactly one of `result` or `error`, enforced by the
/// constructors. The `id` member is always serialized (null when the
/// originating id could not be determined), as the specification requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    pub id: Option<RequestId>,
}

impl Response {
    /// Create a successful response
    pub fn success(result: serde_json::Value, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    pub fn error(error: Error, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Check if this is a successful response
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Get a reference to the result
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    /// Get error information
    pub fn error_info(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Get the response ID
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Error {
    /// Create a new error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Add additional data to the error
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_parse_error(&self) -> bool {
        self.code == error_codes::PARSE_ERROR
    }

    pub fn is_invalid_request(&self) -> bool {
        self.code == error_codes::INVALID_REQUEST
    }

    pub fn is_method_not_found(&self) -> bool {
        self.code == error_codes::METHOD_NOT_FOUND
    }

    pub fn is_invalid_params(&self) -> bool {
        self.code == error_codes::INVALID_PARAMS
    }

    pub fn is_internal_error(&self) -> bool {
        self.code == error_codes::INTERNAL_ERROR
    }

    /// Check if the code falls in the implementation-reserved server range
    pub fn is_server_error(&self) -> bool {
        (error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END).contains(&self.code)
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }
}

/// Standard JSON-RPC 2.0 error codes plus the implementation-reserved
/// codes used by the dispatcher's batch policy checks.
pub mod error_codes {
    /// Parse error - invalid JSON was received by the server.
    pub const PARSE_ERROR: i64 = -32700;

    /// Invalid Request - the JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i64 = -32600;

    /// Method not found - the method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;

    /// Invalid params - invalid method parameter(s).
    pub const INVALID_PARAMS: i64 = -32602;

    /// Internal error - internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Server error range reserved for implementation-defined errors.
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;

    /// Two request items in one batch carried the same id.
    pub const DUPLICATE_REQUEST_IDS: i64 = -32001;

    /// Batch exceeded the configured maximum number of items.
    pub const BATCH_LIMIT_EXCEEDED: i64 = -32002;

    /// A string id exceeded the configured maximum length.
    pub const ID_LENGTH_EXCEEDED: i64 = -32003;
}
