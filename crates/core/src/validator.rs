//! Startup cross-check between declared operation types and registered routes.
//!
//! Every declared operation must be reachable under every configured
//! convention, every registered route must correspond to a declaration, and
//! the polling routes must exist for every provider namespace. All problems
//! are collected into one [`MismatchReport`] so the whole drift is visible at
//! once.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::builder::{RouteTable, OPERATION_RESULTS_TYPE, OPERATION_STATUSES_TYPE};
use crate::error::CoreError;
use crate::operation::{OperationMethod, OperationType};
use crate::registry::OperationTypeRegistry;
use crate::route::{HttpVerb, RouteShape};
use crate::scope::{ConventionKind, RootScope, ScopeLevel};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A registered route with no matching declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeclaredRoute {
    pub convention: ConventionKind,
    pub operation_type: OperationType,
    pub verb: HttpVerb,
    pub template: String,
}

/// A declared operation bound more than once at the same scope level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateBinding {
    pub convention: ConventionKind,
    pub operation_type: OperationType,
    pub scope_level: ScopeLevel,
    pub templates: Vec<String>,
}

/// Every mismatch found by [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MismatchReport {
    /// Declared operations with no route under a convention.
    pub missing_routes: Vec<(ConventionKind, OperationType)>,
    /// Routes whose operation type was never declared.
    pub undeclared_routes: Vec<UndeclaredRoute>,
    /// Declared operations bound more than once at one scope level.
    pub duplicate_bindings: Vec<DuplicateBinding>,
    /// Polling routes missing under a convention, by operation type.
    pub missing_async_surface: Vec<(ConventionKind, OperationType)>,
}

impl MismatchReport {
    pub fn is_empty(&self) -> bool {
        self.missing_routes.is_empty()
            && self.undeclared_routes.is_empty()
            && self.duplicate_bindings.is_empty()
            && self.missing_async_surface.is_empty()
    }

    pub fn len(&self) -> usize {
        self.missing_routes.len()
            + self.undeclared_routes.len()
            + self.duplicate_bindings.len()
            + self.missing_async_surface.len()
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} problem(s)", self.len())?;
        for (convention, op) in &self.missing_routes {
            write!(f, "; {op} is declared but has no route under {convention}")?;
        }
        for route in &self.undeclared_routes {
            write!(
                f,
                "; {} {} under {} is registered for undeclared {}",
                route.verb, route.template, route.convention, route.operation_type
            )?;
        }
        for dup in &self.duplicate_bindings {
            write!(
                f,
                "; {} is bound {} times at {:?} scope under {}: {}",
                dup.operation_type,
                dup.templates.len(),
                dup.scope_level,
                dup.convention,
                dup.templates.join(", ")
            )?;
        }
        for (convention, op) in &self.missing_async_surface {
            write!(f, "; polling route {op} is missing under {convention}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate `table` against `registry`, honouring the route-level exemptions.
pub fn validate<H>(registry: &OperationTypeRegistry, table: &RouteTable<H>) -> Result<(), CoreError> {
    validate_with_exemptions(registry, table, &[])
}

/// Validate with an additional explicit list of exempt operation types.
///
/// Exempt operations are neither required to have a route nor required to
/// be declared. Routes flagged `skip_operation_type_validation` are always
/// exempt.
pub fn validate_with_exemptions<H>(
    registry: &OperationTypeRegistry,
    table: &RouteTable<H>,
    exemptions: &[OperationType],
) -> Result<(), CoreError> {
    let mut report = MismatchReport::default();
    let is_exempt = |op: &OperationType| exemptions.contains(op);

    for convention in table.conventions() {
        let kind = convention.kind();
        let checked: Vec<_> = table
            .specs()
            .filter(|s| s.convention == kind)
            .filter(|s| !s.flags.skip_operation_type_validation && !is_exempt(&s.operation_type))
            .collect();

        // Declared -> routed, exactly once per scope level.
        for op in registry.operation_types().filter(|op| !is_exempt(op)) {
            let mut by_level: BTreeMap<ScopeLevel, Vec<String>> = BTreeMap::new();
            for spec in checked.iter().filter(|s| s.operation_type == op) {
                by_level
                    .entry(spec.scope_level)
                    .or_default()
                    .push(spec.template.to_string());
            }
            if by_level.is_empty() {
                report.missing_routes.push((kind, op));
                continue;
            }
            for (scope_level, templates) in by_level {
                if templates.len() > 1 {
                    report.duplicate_bindings.push(DuplicateBinding {
                        convention: kind,
                        operation_type: op.clone(),
                        scope_level,
                        templates,
                    });
                }
            }
        }

        // Routed -> declared.
        for spec in checked.iter().filter(|s| !s.shape.is_async_surface()) {
            if !registry.contains(&spec.operation_type) {
                report.undeclared_routes.push(UndeclaredRoute {
                    convention: kind,
                    operation_type: spec.operation_type.clone(),
                    verb: spec.verb,
                    template: spec.template.to_string(),
                });
            }
        }

        // Polling routes for every provider namespace.
        let namespaces: BTreeSet<String> = registry
            .resource_types()
            .filter_map(|t| t.split_once('/').map(|(ns, _)| ns.to_string()))
            .collect();
        for namespace in dedup_case_insensitive(namespaces) {
            for (type_name, shape) in [
                (OPERATION_STATUSES_TYPE, RouteShape::OperationStatus),
                (OPERATION_RESULTS_TYPE, RouteShape::OperationResult),
            ] {
                let op = OperationType::new(format!("{namespace}/{type_name}"), OperationMethod::Get);
                let present = table.specs().any(|s| {
                    s.convention == kind && s.shape == shape && s.operation_type == op
                });
                if !present {
                    report.missing_async_surface.push((kind, op));
                }
            }
        }
    }

    if report.is_empty() {
        Ok(())
    } else {
        Err(CoreError::OperationTypeMismatch(report))
    }
}

fn dedup_case_insensitive(values: BTreeSet<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_ascii_lowercase()))
        .collect()
}
