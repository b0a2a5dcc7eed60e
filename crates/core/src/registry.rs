//! Process-wide declaration of which operations each resource type supports.
//!
//! Built once at startup and then shared read-only with the validator and
//! the provider discovery endpoint.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CoreError;
use crate::operation::{validate_resource_type, OperationMethod, OperationType};

#[derive(Debug, Clone)]
struct Declaration {
    /// Resource type as first declared (display spelling).
    resource_type: String,
    methods: BTreeSet<OperationMethod>,
}

/// Declared operation sets keyed by lower-cased resource type.
#[derive(Debug, Clone, Default)]
pub struct OperationTypeRegistry {
    declarations: BTreeMap<String, Declaration>,
}

impl OperationTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the operations supported by `resource_type`.
    ///
    /// Declaring the same resource type again with the same operation set is
    /// a no-op. A different set fails with [`CoreError::DuplicateDeclaration`].
    pub fn declare(
        &mut self,
        resource_type: &str,
        operations: impl IntoIterator<Item = OperationMethod>,
    ) -> Result<(), CoreError> {
        validate_resource_type(resource_type)?;
        let methods: BTreeSet<OperationMethod> = operations.into_iter().collect();
        let key = resource_type.to_ascii_lowercase();

        match self.declarations.get(&key) {
            Some(existing) if existing.methods == methods => Ok(()),
            Some(_) => Err(CoreError::DuplicateDeclaration {
                resource_type: resource_type.to_string(),
            }),
            None => {
                self.declarations.insert(
                    key,
                    Declaration {
                        resource_type: resource_type.to_string(),
                        methods,
                    },
                );
                Ok(())
            }
        }
    }

    /// Declared operation types for one resource type (empty when undeclared).
    pub fn list(&self, resource_type: &str) -> BTreeSet<OperationType> {
        self.declarations
            .get(&resource_type.to_ascii_lowercase())
            .map(|decl| {
                decl.methods
                    .iter()
                    .map(|m| OperationType::new(decl.resource_type.clone(), m.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `operation` has been declared.
    pub fn contains(&self, operation: &OperationType) -> bool {
        self.declarations
            .get(&operation.type_key())
            .is_some_and(|decl| decl.methods.contains(&operation.method))
    }

    /// Every declared operation type, ordered by resource type then method.
    pub fn operation_types(&self) -> impl Iterator<Item = OperationType> + '_ {
        self.declarations.values().flat_map(|decl| {
            decl.methods
                .iter()
                .map(|m| OperationType::new(decl.resource_type.clone(), m.clone()))
        })
    }

    /// Declared resource types in their declared spelling.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.declarations.values().map(|d| d.resource_type.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SECRET_STORES: &str = "Applications.Dapr/secretStores";

    fn crud() -> Vec<OperationMethod> {
        vec![
            OperationMethod::List,
            OperationMethod::Get,
            OperationMethod::Put,
            OperationMethod::Patch,
            OperationMethod::Delete,
        ]
    }

    #[test]
    fn declare_and_list() {
        let mut registry = OperationTypeRegistry::new();
        registry.declare(SECRET_STORES, crud()).unwrap();

        let ops = registry.list(SECRET_STORES);
        assert_eq!(ops.len(), 5);
        assert!(registry.contains(&OperationType::new(
            "applications.dapr/secretstores",
            OperationMethod::Patch
        )));
    }

    #[test]
    fn redeclaring_same_set_is_idempotent() {
        let mut registry = OperationTypeRegistry::new();
        registry.declare(SECRET_STORES, crud()).unwrap();
        registry
            .declare("applications.dapr/SecretStores", crud().into_iter().rev())
            .unwrap();
        assert_eq!(registry.operation_types().count(), 5);
    }

    #[test]
    fn conflicting_redeclaration_fails() {
        let mut registry = OperationTypeRegistry::new();
        registry.declare(SECRET_STORES, crud()).unwrap();
        let err = registry
            .declare(SECRET_STORES, [OperationMethod::Get])
            .unwrap_err();
        assert_matches!(err, CoreError::DuplicateDeclaration { resource_type } if resource_type == SECRET_STORES);
    }

    #[test]
    fn undeclared_type_lists_nothing() {
        let registry = OperationTypeRegistry::new();
        assert!(registry.list(SECRET_STORES).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_resource_type_is_rejected() {
        let mut registry = OperationTypeRegistry::new();
        assert_matches!(
            registry.declare("secretStores", crud()),
            Err(CoreError::InvalidResourceType(_))
        );
    }
}
