//! Deserialization and validation of inbound JSON-RPC payloads, and
//! serialization of outbound responses.
//!
//! Decoding is contract-driven: every candidate message is validated
//! against the [`ContractRegistry`] before it ever reaches a handler.
//! Nothing here touches HTTP; charset handling lives in [`crate::negotiate`]
//! and status-code policy in [`crate::dispatch`].

use serde_json::Value;

use crate::contract::{Contract, ContractRegistry, ParamsShape};
use crate::types::{Error, Message, Notification, Request, RequestId, Response, error_codes};

/// Result of validating one candidate message.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A well-formed request or notification, matched against its contract.
    Valid(Message),
    /// A malformed message, with the best-effort extracted id so the
    /// error response can still be correlated by the client.
    Invalid {
        error: Error,
        id: Option<RequestId>,
    },
}

impl ParseOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParseOutcome::Valid(_))
    }
}

/// A decoded request body: either one message or an ordered batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(ParseOutcome),
    Batch(Vec<ParseOutcome>),
}

/// Decode a request body into parse outcomes.
///
/// A body that is not valid JSON at all short-circuits into a single
/// parse-error outcome before any batch/single distinction is made. A
/// top-level array decodes element-wise in original order; the JSON-RPC
/// rule that an empty batch is itself an invalid request is applied here.
pub fn decode_payload(text: &str, registry: &ContractRegistry) -> Payload {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "request body is not valid JSON");
            return Payload::Single(invalid(error_codes::PARSE_ERROR, "Parse error", None));
        }
    };

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Payload::Single(invalid(
                    error_codes::INVALID_REQUEST,
                    "batch must not be empty",
                    None,
                ));
            }
            tracing::trace!(batch_size = items.len(), "decoding batch payload");
            Payload::Batch(
                items
                    .into_iter()
                    .map(|item| decode_message(item, registry))
                    .collect(),
            )
        }
        other => Payload::Single(decode_message(other, registry)),
    }
}

fn invalid(code: i64, message: impl Into<String>, id: Option<RequestId>) -> ParseOutcome {
    ParseOutcome::Invalid {
        error: Error::new(code, message),
        id,
    }
}

/// Validate one candidate message against the registry.
fn decode_message(value: Value, registry: &ContractRegistry) -> ParseOutcome {
    let Value::Object(mut envelope) = value else {
        return invalid(
            error_codes::INVALID_REQUEST,
            "request must be a JSON object",
            None,
        );
    };

    // Extract the id first so later failures can still carry it.
    let id = match envelope.remove("id") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) => Some(RequestId::Number(n)),
            None => {
                return invalid(
                    error_codes::INVALID_REQUEST,
                    "id must be an integer or a string",
                    None,
                );
            }
        },
        Some(Value::String(s)) => Some(RequestId::String(s)),
        Some(_) => {
            return invalid(
                error_codes::INVALID_REQUEST,
                "id must be an integer or a string",
                None,
            );
        }
    };

    if envelope.get("jsonrpc").and_then(Value::as_str) != Some(crate::JSONRPC_VERSION) {
        return invalid(
            error_codes::INVALID_REQUEST,
            "jsonrpc version must be \"2.0\"",
            id,
        );
    }

    let method = match envelope.get("method").and_then(Value::as_str) {
        Some(method) => method.to_string(),
        None => {
            return invalid(error_codes::INVALID_REQUEST, "method must be a string", id);
        }
    };

    let Some(contract) = registry.get(&method) else {
        tracing::debug!(method = %method, "method not found");
        return invalid(
            error_codes::METHOD_NOT_FOUND,
            format!("method '{}' not found", method),
            id,
        );
    };

    let params = match check_params(envelope.remove("params"), contract) {
        Ok(params) => params,
        Err(error) => return ParseOutcome::Invalid { error, id },
    };

    match id {
        Some(id) => ParseOutcome::Valid(Message::Request(Request {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            method,
            params,
            id: Some(id),
        })),
        None => ParseOutcome::Valid(Message::Notification(Notification {
            jsonrpc: crate::JSONRPC_VERSION.to_string(),
            method,
            params,
        })),
    }
}

fn invalid_params(message: impl Into<String>) -> Error {
    Error::new(error_codes::INVALID_PARAMS, message)
}

/// Coerce raw params into the contract's declared shape.
///
/// Missing named parameters are deliberately not rejected here; defaults
/// and optional-notification handling belong to the invoker.
fn check_params(params: Option<Value>, contract: &Contract) -> Result<Option<Value>, Error> {
    match contract.shape() {
        ParamsShape::None => match params {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(values)) if values.is_empty() => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(_) => Err(invalid_params("method takes no parameters")),
        },
        ParamsShape::ByPosition(kinds) => {
            let values = match params {
                Some(Value::Array(values)) => values,
                None | Some(Value::Null) if kinds.is_empty() => Vec::new(),
                _ => return Err(invalid_params("method takes positional parameters")),
            };
            if values.len() != kinds.len() {
                return Err(invalid_params(format!(
                    "expected {} parameters, got {}",
                    kinds.len(),
                    values.len()
                )));
            }
            for (position, (value, kind)) in values.iter().zip(kinds).enumerate() {
                if !kind.matches(value) {
                    return Err(invalid_params(format!(
                        "parameter {} has an incompatible type",
                        position
                    )));
                }
            }
            Ok(Some(Value::Array(values)))
        }
        ParamsShape::ByName(_) => {
            let map = match params {
                Some(Value::Object(map)) => map,
                None | Some(Value::Null) => serde_json::Map::new(),
                _ => return Err(invalid_params("method takes named parameters")),
            };
            for (name, value) in &map {
                match contract.named_kind(name) {
                    None => {
                        return Err(invalid_params(format!("unknown parameter '{}'", name)));
                    }
                    Some(kind) if !kind.matches(value) => {
                        return Err(invalid_params(format!(
                            "parameter '{}' has an incompatible type",
                            name
                        )));
                    }
                    Some(_) => {}
                }
            }
            Ok(Some(Value::Object(map)))
        }
    }
}

/// Serialize one response.
pub fn encode_single(response: &Response) -> Result<String, serde_json::Error> {
    serde_json::to_string(response)
}

/// Serialize a batch of responses. Always emits a JSON array, even for a
/// single surviving item: batch-in means batch-out.
pub fn encode_batch(responses: &[Response]) -> Result<String, serde_json::Error> {
    serde_json::to_string(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ParamKind;
    use serde_json::json;

    fn registry() -> ContractRegistry {
        ContractRegistry::builder()
            .contract(
                "add",
                Contract::by_position([ParamKind::Integer, ParamKind::Integer]),
            )
            .contract(
                "greet",
                Contract::by_name([("name", ParamKind::String), ("shout", ParamKind::Bool)]),
            )
            .contract("ping", Contract::none())
            .build()
            .unwrap()
    }

    fn decode_one(text: &str) -> ParseOutcome {
        match decode_payload(text, &registry()) {
            Payload::Single(outcome) => outcome,
            Payload::Batch(_) => panic!("expected single payload"),
        }
    }

    fn expect_invalid(outcome: ParseOutcome) -> (Error, Option<RequestId>) {
        match outcome {
            ParseOutcome::Invalid { error, id } => (error, id),
            ParseOutcome::Valid(_) => panic!("expected invalid outcome"),
        }
    }

    #[test]
    fn test_malformed_json_short_circuits_to_parse_error() {
        let (error, id) = expect_invalid(decode_one("{not json"));
        assert!(error.is_parse_error());
        assert_eq!(id, None);

        // Even a broken array body never becomes a batch.
        let (error, _) = expect_invalid(decode_one("[{\"jsonrpc\":"));
        assert!(error.is_parse_error());
    }

    #[test]
    fn test_empty_batch_is_invalid_request() {
        let (error, id) = expect_invalid(decode_one("[]"));
        assert!(error.is_invalid_request());
        assert_eq!(id, None);
    }

    #[test]
    fn test_non_object_message() {
        let (error, _) = expect_invalid(decode_one("42"));
        assert!(error.is_invalid_request());
    }

    #[test]
    fn test_fractional_id_rejected() {
        let (error, id) = expect_invalid(decode_one(
            r#"{"jsonrpc":"2.0","method":"ping","id":1.5}"#,
        ));
        assert!(error.is_invalid_request());
        assert_eq!(id, None);
    }

    #[test]
    fn test_null_id_is_notification() {
        let outcome = decode_one(r#"{"jsonrpc":"2.0","method":"ping","id":null}"#);
        match outcome {
            ParseOutcome::Valid(Message::Notification(notif)) => assert_eq!(notif.method(), "ping"),
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_version_keeps_extracted_id() {
        let (error, id) = expect_invalid(decode_one(r#"{"method":"ping","id":7}"#));
        assert!(error.is_invalid_request());
        assert_eq!(id, Some(RequestId::Number(7)));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let (error, _) = expect_invalid(decode_one(
            r#"{"jsonrpc":"1.0","method":"ping","id":1}"#,
        ));
        assert!(error.is_invalid_request());
    }

    #[test]
    fn test_missing_method_rejected() {
        let (error, id) = expect_invalid(decode_one(r#"{"jsonrpc":"2.0","id":"r"}"#));
        assert!(error.is_invalid_request());
        assert_eq!(id, Some(RequestId::from("r")));
    }

    #[test]
    fn test_unknown_method_keeps_id() {
        let (error, id) = expect_invalid(decode_one(
            r#"{"jsonrpc":"2.0","method":"nope","id":5}"#,
        ));
        assert!(error.is_method_not_found());
        assert_eq!(id, Some(RequestId::Number(5)));
    }

    #[test]
    fn test_valid_positional_request() {
        let outcome = decode_one(r#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}"#);
        match outcome {
            ParseOutcome::Valid(Message::Request(req)) => {
                assert_eq!(req.method(), "add");
                assert_eq!(req.params(), Some(&json!([1, 2])));
                assert_eq!(req.id(), Some(&RequestId::Number(1)));
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_positional_arity_mismatch() {
        let (error, _) = expect_invalid(decode_one(
            r#"{"jsonrpc":"2.0","method":"add","params":[1],"id":1}"#,
        ));
        assert!(error.is_invalid_params());
    }

    #[test]
    fn test_positional_type_mismatch() {
        let (error, _) = expect_invalid(decode_one(
            r#"{"jsonrpc":"2.0","method":"add","params":[1,"two"],"id":1}"#,
        ));
        assert!(error.is_invalid_params());
        assert!(error.message().contains("parameter 1"));
    }

    #[test]
    fn test_named_params_accept_partial_set() {
        // Missing names are deferred to the invoker for default handling.
        let outcome = decode_one(
            r#"{"jsonrpc":"2.0","method":"greet","params":{"name":"rls"},"id":1}"#,
        );
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_named_params_reject_unknown_name() {
        let (error, _) = expect_invalid(decode_one(
            r#"{"jsonrpc":"2.0","method":"greet","params":{"nam":"typo"},"id":1}"#,
        ));
        assert!(error.is_invalid_params());
        assert!(error.message().contains("nam"));
    }

    #[test]
    fn test_named_params_reject_bad_type() {
        let (error, _) = expect_invalid(decode_one(
            r#"{"jsonrpc":"2.0","method":"greet","params":{"shout":"yes"},"id":1}"#,
        ));
        assert!(error.is_invalid_params());
    }

    #[test]
    fn test_no_params_contract_accepts_empty_shapes() {
        assert!(decode_one(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#).is_valid());
        assert!(decode_one(r#"{"jsonrpc":"2.0","method":"ping","params":[],"id":1}"#).is_valid());
        assert!(decode_one(r#"{"jsonrpc":"2.0","method":"ping","params":{},"id":1}"#).is_valid());
        assert!(decode_one(r#"{"jsonrpc":"2.0","method":"ping","params":null,"id":1}"#).is_valid());

        let (error, _) = expect_invalid(decode_one(
            r#"{"jsonrpc":"2.0","method":"ping","params":[1],"id":1}"#,
        ));
        assert!(error.is_invalid_params());
    }

    #[test]
    fn test_batch_preserves_order_and_mixed_outcomes() {
        let body = r#"[
            {"jsonrpc":"2.0","method":"add","params":[1,2],"id":1},
            {"jsonrpc":"2.0","method":"missing","id":2},
            {"jsonrpc":"2.0","method":"ping"}
        ]"#;
        let Payload::Batch(outcomes) = decode_payload(body, &registry()) else {
            panic!("expected batch payload");
        };
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_valid());
        assert!(!outcomes[1].is_valid());
        match &outcomes[2] {
            ParseOutcome::Valid(Message::Notification(_)) => {}
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_batch_is_always_an_array() {
        let responses = vec![Response::success(json!(3), Some(RequestId::Number(1)))];
        let encoded = encode_batch(&responses).unwrap();
        assert!(encoded.starts_with('['));
        assert!(encoded.ends_with(']'));
    }

    #[test]
    fn test_encode_single() {
        let response = Response::success(json!("pong"), Some(RequestId::Number(9)));
        let encoded = encode_single(&response).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["result"], json!("pong"));
        assert_eq!(value["id"], json!(9));
    }
}
