//! Operation types: the `(resource type, method)` pairs a provider declares.
//!
//! A resource type is written `Namespace/typeName` (e.g.
//! `Applications.Dapr/secretStores`). Identity comparisons ignore case, the
//! way the resource-manager protocol treats provider and type names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Operation methods
// ---------------------------------------------------------------------------

/// The verb half of an [`OperationType`].
///
/// The five standard verbs map onto collection/instance routes. Anything else
/// is a custom action (e.g. `LISTSECRETS`) dispatched as a POST to an action
/// segment below the instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum OperationMethod {
    List,
    Get,
    Put,
    Patch,
    Delete,
    Custom(String),
}

/// Upper-case tokens reserved for the standard verbs.
const STANDARD_TOKENS: &[&str] = &["LIST", "GET", "PUT", "PATCH", "DELETE"];

impl OperationMethod {
    /// Build a custom action method, validating its token.
    ///
    /// The token is upper-cased. It must be non-empty ASCII alphanumerics and
    /// must not name one of the standard verbs.
    pub fn custom(token: &str) -> Result<Self, CoreError> {
        let upper = token.to_ascii_uppercase();
        if upper.is_empty() || !upper.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidOperation(format!(
                "Custom operation '{token}' must be non-empty ASCII alphanumerics"
            )));
        }
        if STANDARD_TOKENS.contains(&upper.as_str()) {
            return Err(CoreError::InvalidOperation(format!(
                "Custom operation '{token}' collides with a standard verb"
            )));
        }
        Ok(Self::Custom(upper))
    }

    /// The upper-case token for this method.
    pub fn as_str(&self) -> &str {
        match self {
            Self::List => "LIST",
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Custom(token) => token,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Access category used by the provider operations listing.
    pub fn access(&self) -> &'static str {
        match self {
            Self::List | Self::Get => "read",
            Self::Put | Self::Patch => "write",
            Self::Delete => "delete",
            Self::Custom(_) => "action",
        }
    }
}

impl fmt::Display for OperationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LIST" => Ok(Self::List),
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Self::custom(s),
        }
    }
}

impl From<OperationMethod> for String {
    fn from(method: OperationMethod) -> Self {
        method.as_str().to_string()
    }
}

impl TryFrom<String> for OperationMethod {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Resource type names
// ---------------------------------------------------------------------------

/// Validate a `Namespace/typeName` resource type string.
pub fn validate_resource_type(resource_type: &str) -> Result<(), CoreError> {
    match resource_type.split_once('/') {
        Some((namespace, name))
            if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok(())
        }
        _ => Err(CoreError::InvalidResourceType(resource_type.to_string())),
    }
}

/// Split a resource type into `(namespace, typeName)`.
///
/// Returns the whole string as the type name when there is no namespace.
pub fn split_resource_type(resource_type: &str) -> (&str, &str) {
    resource_type.split_once('/').unwrap_or(("", resource_type))
}

// ---------------------------------------------------------------------------
// Operation types
// ---------------------------------------------------------------------------

/// A `(resource type, method)` pair declaring one supported management action.
///
/// Equality, ordering and hashing ignore the case of the resource type; the
/// declared spelling is kept for display and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationType {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub method: OperationMethod,
}

impl OperationType {
    pub fn new(resource_type: impl Into<String>, method: OperationMethod) -> Self {
        Self {
            resource_type: resource_type.into(),
            method,
        }
    }

    /// Lower-cased resource type, used as the identity key.
    pub fn type_key(&self) -> String {
        self.resource_type.to_ascii_lowercase()
    }

    pub fn namespace(&self) -> &str {
        split_resource_type(&self.resource_type).0
    }

    pub fn type_name(&self) -> &str {
        split_resource_type(&self.resource_type).1
    }
}

impl PartialEq for OperationType {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.resource_type.eq_ignore_ascii_case(&other.resource_type)
    }
}

impl Eq for OperationType {}

impl Hash for OperationType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_key().hash(state);
        self.method.hash(state);
    }
}

impl PartialOrd for OperationType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OperationType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_key()
            .cmp(&other.type_key())
            .then_with(|| self.method.cmp(&other.method))
    }
}

impl fmt::Display for OperationType {
    /// Renders `RESOURCETYPE|METHOD`, upper-cased.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}",
            self.resource_type.to_ascii_uppercase(),
            self.method
        )
    }
}

impl FromStr for OperationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource_type, method) = s
            .split_once('|')
            .ok_or_else(|| CoreError::InvalidOperation(format!("Invalid operation type '{s}'")))?;
        validate_resource_type(resource_type)?;
        Ok(Self::new(resource_type, method.parse()?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
