//! Method contracts: per-method declarations of the expected parameter
//! shape, used to drive deserialization.
//!
//! A [`ContractRegistry`] is built once per handler at startup and is
//! read-only afterwards. Construction problems (reserved method names,
//! duplicate methods, duplicate named parameters) are fatal: `build()`
//! returns an error that should abort application startup.

use std::collections::HashMap;

use crate::types::is_system_method;

/// Expected JSON type of a single parameter slot.
///
/// Used purely for type-compatible parsing, not semantic validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    /// Any JSON integer representable as i64/u64.
    Integer,
    /// Any JSON number, integral or not.
    Float,
    String,
    Array,
    Object,
    /// Accepts every JSON value, including null.
    Any,
}

impl ParamKind {
    /// Check whether a JSON value is compatible with this kind.
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ParamKind::Bool => value.is_boolean(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Float => value.is_number(),
            ParamKind::String => value.is_string(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
            ParamKind::Any => true,
        }
    }
}

/// Declared parameter shape of a method.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamsShape {
    /// The method takes no parameters.
    None,
    /// An ordered list of expected value kinds.
    ByPosition(Vec<ParamKind>),
    /// Declared parameter names with expected kinds, in declaration order.
    ByName(Vec<(String, ParamKind)>),
}

/// Per-method contract describing how parameters must be shaped.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    shape: ParamsShape,
}

impl Contract {
    /// Contract for a method with no parameters
    pub fn none() -> Self {
        Self {
            shape: ParamsShape::None,
        }
    }

    /// Contract for positional parameters of the given kinds
    pub fn by_position(kinds: impl IntoIterator<Item = ParamKind>) -> Self {
        Self {
            shape: ParamsShape::ByPosition(kinds.into_iter().collect()),
        }
    }

    /// Contract for named parameters, in declaration order
    pub fn by_name(params: impl IntoIterator<Item = (impl Into<String>, ParamKind)>) -> Self {
        Self {
            shape: ParamsShape::ByName(
                params
                    .into_iter()
                    .map(|(name, kind)| (name.into(), kind))
                    .collect(),
            ),
        }
    }

    pub fn shape(&self) -> &ParamsShape {
        &self.shape
    }

    /// Kind declared for a named parameter, if any
    pub fn named_kind(&self, name: &str) -> Option<ParamKind> {
        match &self.shape {
            ParamsShape::ByName(params) => params
                .iter()
                .find(|(declared, _)| declared == name)
                .map(|(_, kind)| *kind),
            _ => None,
        }
    }
}

/// Fatal registration-time configuration errors.
///
/// These abort application startup; none of them are reachable at
/// request time because registries are validated before first use.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("method name '{method}' uses the reserved 'rpc.' prefix")]
    ReservedMethodName { method: String },

    #[error("method '{method}' registered more than once")]
    DuplicateMethod { method: String },

    #[error("method '{method}' declares parameter '{param}' more than once")]
    DuplicateParamName { method: String, param: String },

    #[error("method '{method}' mixes positional and named parameters")]
    MixedParamStyles { method: String },

    #[error("method '{method}' has no callable registered")]
    MissingHandler { method: String },
}

/// Read-only map from method name to [`Contract`], built once at startup.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    contracts: HashMap<String, Contract>,
}

impl ContractRegistry {
    /// Start building a registry
    pub fn builder() -> ContractRegistryBuilder {
        ContractRegistryBuilder {
            entries: Vec::new(),
        }
    }

    /// Registry with no methods (every call resolves to method-not-found)
    pub fn empty() -> Self {
        Self {
            contracts: HashMap::new(),
        }
    }

    /// Look up the contract for a method name
    pub fn get(&self, method: &str) -> Option<&Contract> {
        self.contracts.get(method)
    }

    /// Check if a method is registered
    pub fn contains(&self, method: &str) -> bool {
        self.contracts.contains_key(method)
    }

    /// Get list of all registered method names
    pub fn method_names(&self) -> Vec<String> {
        self.contracts.keys().cloned().collect()
    }

    /// Number of registered methods
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Builder for [`ContractRegistry`]; all validation happens in `build()`.
pub struct ContractRegistryBuilder {
    entries: Vec<(String, Contract)>,
}

impl ContractRegistryBuilder {
    /// Declare a method contract
    pub fn contract(mut self, method: impl Into<String>, contract: Contract) -> Self {
        self.entries.push((method.into(), contract));
        self
    }

    /// Validate the declarations and build the registry.
    ///
    /// Errors here are startup-fatal by design; callers should propagate
    /// them out of application composition code.
    pub fn build(self) -> Result<ContractRegistry, RegistryError> {
        let mut contracts = HashMap::with_capacity(self.entries.len());

        for (method, contract) in self.entries {
            validate_contract(&method, &contract)?;
            if contracts.insert(method.clone(), contract).is_some() {
                return Err(RegistryError::DuplicateMethod { method });
            }
        }

        tracing::debug!(method_count = contracts.len(), "contract registry built");
        Ok(ContractRegistry { contracts })
    }
}

pub(crate) fn validate_contract(method: &str, contract: &Contract) -> Result<(), RegistryError> {
    if is_system_method(method) {
        return Err(RegistryError::ReservedMethodName {
            method: method.to_string(),
        });
    }

    if let ParamsShape::ByName(params) = contract.shape() {
        for (i, (name, _)) in params.iter().enumerate() {
            if params[..i].iter().any(|(earlier, _)| earlier == name) {
                return Err(RegistryError::DuplicateParamName {
                    method: method.to_string(),
                    param: name.clone(),
                });
            }
        }
    }

    Ok(())
}
