//! Method registration and invocation.
//!
//! [`RpcService`] is the batteries-included [`Handler`]: applications
//! declare methods up front with [`MethodDef::builder`], and the service
//! derives the contract registry, binds parameters in declaration order,
//! applies named-parameter defaults, and maps the two error channels
//! (service errors into the envelope, everything else out to the host).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::contract::{Contract, ContractRegistry, ParamKind, RegistryError, validate_contract};
use crate::traits::{Handler, HandlerError};
use crate::types::{Error, Message, Response, error_codes};

/// Application-level failure a method reports deliberately.
///
/// This is the only sanctioned way for application code to put an error
/// into the JSON-RPC envelope. Anything else a handler raises is treated
/// as a bug and propagated out of the dispatcher.
#[derive(Debug, Clone, thiserror::Error)]
#[error("service error {code}: {message}")]
pub struct ServiceError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl ServiceError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail for the client
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn into_error(self) -> Error {
        let error = Error::new(self.code, self.message);
        match self.data {
            Some(data) => error.with_data(data),
            None => error,
        }
    }
}

/// What a method invocation can produce.
#[derive(Debug, thiserror::Error)]
pub enum MethodError {
    /// Deliberate application failure, reported to the client.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A bug; never surfaced to the client.
    #[error("internal method failure: {0}")]
    Internal(HandlerError),
}

impl MethodError {
    /// Wrap an arbitrary error as an internal failure
    pub fn internal(err: impl Into<HandlerError>) -> Self {
        MethodError::Internal(err.into())
    }
}

/// Boxed future returned by a method callable.
pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Value, MethodError>> + Send>>;

/// Type-erased method callable. Receives the bound arguments in
/// declaration order.
pub type MethodFn = Box<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>;

/// Whether a method produces a value or only side effects.
///
/// Unit methods still answer requests, with a `null` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Unit,
    Value,
}

#[derive(Debug, Clone)]
struct ParamDef {
    name: Option<String>,
    kind: ParamKind,
    default: Option<Value>,
}

/// One declared method: name, parameter table, result kind, callable.
pub struct MethodDef {
    name: String,
    params: Vec<ParamDef>,
    result_kind: ResultKind,
    handler: Option<MethodFn>,
}

impl MethodDef {
    /// Start declaring a method
    pub fn builder(name: impl Into<String>) -> MethodDefBuilder {
        MethodDefBuilder {
            def: MethodDef {
                name: name.into(),
                params: Vec::new(),
                result_kind: ResultKind::Value,
                handler: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`MethodDef`].
///
/// Parameters are bound to the callable's argument vector in the order
/// they are declared here.
pub struct MethodDefBuilder {
    def: MethodDef,
}

impl MethodDefBuilder {
    /// Declare the next positional parameter
    pub fn positional(mut self, kind: ParamKind) -> Self {
        self.def.params.push(ParamDef {
            name: None,
            kind,
            default: None,
        });
        self
    }

    /// Declare a required named parameter
    pub fn named(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.def.params.push(ParamDef {
            name: Some(name.into()),
            kind,
            default: None,
        });
        self
    }

    /// Declare an optional named parameter with a default value
    pub fn named_or(mut self, name: impl Into<String>, kind: ParamKind, default: Value) -> Self {
        self.def.params.push(ParamDef {
            name: Some(name.into()),
            kind,
            default: Some(default),
        });
        self
    }

    /// Set the callable for a value-producing method
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, MethodError>> + Send + 'static,
    {
        self.def.result_kind = ResultKind::Value;
        self.def.handler = Some(Box::new(move |args| Box::pin(f(args))));
        self
    }

    /// Set the callable for a side-effect-only method
    pub fn unit_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), MethodError>> + Send + 'static,
    {
        self.def.result_kind = ResultKind::Unit;
        self.def.handler = Some(Box::new(move |args| {
            let fut = f(args);
            Box::pin(async move { fut.await.map(|()| Value::Null) })
        }));
        self
    }

    pub fn build(self) -> MethodDef {
        self.def
    }
}

struct RegisteredMethod {
    params: Vec<ParamDef>,
    handler: MethodFn,
}

/// A [`Handler`] backed by a declared method table.
pub struct RpcService {
    contracts: ContractRegistry,
    methods: HashMap<String, RegisteredMethod>,
}

impl std::fmt::Debug for RpcService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcService").finish_non_exhaustive()
    }
}

impl RpcService {
    /// Start declaring a service
    pub fn builder() -> RpcServiceBuilder {
        RpcServiceBuilder {
            methods: Vec::new(),
        }
    }

    /// Bind one item's arguments, in declaration order.
    ///
    /// Deserialization already guaranteed positional arity and the types
    /// of everything present; what remains here is filling in named
    /// defaults and rejecting missing required names.
    fn bind_args(params: &[ParamDef], provided: Option<&Value>) -> Result<Vec<Value>, String> {
        let by_name = params.iter().any(|p| p.name.is_some());

        if by_name {
            let empty = serde_json::Map::new();
            let object = provided.and_then(Value::as_object).unwrap_or(&empty);
            let mut args = Vec::with_capacity(params.len());
            for param in params {
                // Positional entries cannot appear here; mixed styles are
                // rejected at build time.
                let name = param.name.as_deref().unwrap_or_default();
                match object.get(name).cloned().or_else(|| param.default.clone()) {
                    Some(value) => args.push(value),
                    None => return Err(name.to_string()),
                }
            }
            Ok(args)
        } else {
            match provided.and_then(Value::as_array) {
                Some(values) => Ok(values.clone()),
                None => Ok(Vec::new()),
            }
        }
    }
}

#[async_trait::async_trait]
impl Handler for RpcService {
    fn contracts(&self) -> &ContractRegistry {
        &self.contracts
    }

    async fn handle(&self, message: Message) -> Result<Option<Response>, HandlerError> {
        let is_request = message.is_request();
        let id = message.id().cloned();
        let method_name = message.method().to_string();

        // Deserialization only admits registered methods, so a miss here
        // means the contract registry and the method table diverged.
        let method = self
            .methods
            .get(&method_name)
            .ok_or_else(|| format!("method '{}' has a contract but no callable", method_name))?;

        let args = match Self::bind_args(&method.params, message.params()) {
            Ok(args) => args,
            Err(param) => {
                if !is_request {
                    tracing::debug!(method = %method_name, param = %param,
                        "dropping notification missing a required parameter");
                    return Ok(None);
                }
                return Ok(Some(Response::error(
                    Error::new(
                        error_codes::INVALID_PARAMS,
                        format!("missing required parameter '{}'", param),
                    ),
                    id,
                )));
            }
        };

        match (method.handler)(args).await {
            Ok(value) => {
                if is_request {
                    Ok(Some(Response::success(value, id)))
                } else {
                    Ok(None)
                }
            }
            Err(MethodError::Service(err)) => {
                if is_request {
                    Ok(Some(Response::error(err.into_error(), id)))
                } else {
                    tracing::warn!(method = %method_name, code = err.code(),
                        "notification handler reported a service error with nowhere to send it");
                    Ok(None)
                }
            }
            Err(MethodError::Internal(err)) => Err(err),
        }
    }
}

/// Builder for [`RpcService`]; all validation happens in `build()`.
pub struct RpcServiceBuilder {
    methods: Vec<MethodDef>,
}

impl RpcServiceBuilder {
    /// Register a method
    pub fn method(mut self, def: MethodDef) -> Self {
        self.methods.push(def);
        self
    }

    /// Validate the method table and derive the contract registry.
    ///
    /// Errors are startup-fatal by design.
    pub fn build(self) -> Result<RpcService, RegistryError> {
        let mut contracts = ContractRegistry::builder();
        let mut methods = HashMap::with_capacity(self.methods.len());

        for def in self.methods {
            let named = def.params.iter().filter(|p| p.name.is_some()).count();
            if named > 0 && named < def.params.len() {
                return Err(RegistryError::MixedParamStyles { method: def.name });
            }

            let contract = if def.params.is_empty() {
                Contract::none()
            } else if named > 0 {
                Contract::by_name(def.params.iter().map(|p| {
                    // Guarded by the mixed-styles check above.
                    (p.name.clone().unwrap_or_default(), p.kind)
                }))
            } else {
                Contract::by_position(def.params.iter().map(|p| p.kind))
            };
            validate_contract(&def.name, &contract)?;

            let handler = def
                .handler
                .ok_or_else(|| RegistryError::MissingHandler {
                    method: def.name.clone(),
                })?;

            contracts = contracts.contract(def.name.clone(), contract);
            methods.insert(
                def.name,
                RegisteredMethod {
                    params: def.params,
                    handler,
                },
            );
        }

        let contracts = contracts.build()?;
        tracing::debug!(method_count = methods.len(), "rpc service built");
        Ok(RpcService { contracts, methods })
    }
}
