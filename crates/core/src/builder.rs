//! Route table construction.
//!
//! [`RouteTableBuilder`] turns resource-type descriptors into concrete
//! `(template, verb)` bindings under each configured scope convention, and
//! injects the async operation surface (`operationStatuses` and
//! `operationResults`) once per provider namespace and convention.
//!
//! The builder is generic over the handler value `H` bound to each route.
//! The API layer uses controller factories; tests use plain labels.

use std::collections::{BTreeMap, HashSet};

use crate::error::CoreError;
use crate::operation::{split_resource_type, validate_resource_type, OperationMethod, OperationType};
use crate::route::{PathTemplate, RouteFlags, RouteShape, RouteSpec};
use crate::scope::{RootScope, ScopeConvention};

/// Placeholder for the resource instance name.
pub const RESOURCE_NAME_PARAM: &str = "resourceName";

/// Placeholder for the location segment of the polling routes.
pub const LOCATION_PARAM: &str = "location";

/// Placeholder for the operation identifier of the polling routes.
pub const OPERATION_ID_PARAM: &str = "operationId";

/// Resource type suffix of the operation status routes.
pub const OPERATION_STATUSES_TYPE: &str = "operationStatuses";

/// Resource type suffix of the operation result routes.
pub const OPERATION_RESULTS_TYPE: &str = "operationResults";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One operation of a resource type bound to a handler.
#[derive(Debug, Clone)]
pub struct HandlerBinding<H> {
    pub method: OperationMethod,
    pub shape: RouteShape,
    pub flags: RouteFlags,
    pub handler: H,
}

impl<H> HandlerBinding<H> {
    /// Bind `method` at its default shape with no flags.
    pub fn new(method: OperationMethod, handler: H) -> Self {
        Self {
            shape: RouteShape::for_method(&method),
            method,
            flags: RouteFlags::NONE,
            handler,
        }
    }

    pub fn with_shape(mut self, shape: RouteShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_flags(mut self, flags: RouteFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A resource type and the handlers registered for it.
#[derive(Debug, Clone)]
pub struct ResourceTypeDescriptor<H> {
    pub resource_type: String,
    pub bindings: Vec<HandlerBinding<H>>,
}

impl<H> ResourceTypeDescriptor<H> {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            bindings: Vec::new(),
        }
    }

    /// Bind `method` at its default shape.
    pub fn bind(mut self, method: OperationMethod, handler: H) -> Self {
        self.bindings.push(HandlerBinding::new(method, handler));
        self
    }

    pub fn bind_with(mut self, binding: HandlerBinding<H>) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn namespace(&self) -> &str {
        split_resource_type(&self.resource_type).0
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A route spec together with its handler.
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub spec: RouteSpec,
    pub handler: H,
}

/// The complete set of bindings for every configured convention.
///
/// Immutable once built; share it behind an `Arc` across request handlers.
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    pub(crate) path_base: PathTemplate,
    pub(crate) conventions: Vec<ScopeConvention>,
    pub(crate) routes: Vec<Route<H>>,
}

impl<H> RouteTable<H> {
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    pub fn specs(&self) -> impl Iterator<Item = &RouteSpec> {
        self.routes.iter().map(|r| &r.spec)
    }

    pub fn conventions(&self) -> &[ScopeConvention] {
        &self.conventions
    }

    pub fn path_base(&self) -> &PathTemplate {
        &self.path_base
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Operation types registered only through routes flagged
    /// `skip_operation_type_validation`.
    pub fn exemptions(&self) -> Vec<OperationType> {
        let mut exempt: Vec<OperationType> = self
            .specs()
            .filter(|s| s.flags.skip_operation_type_validation)
            .map(|s| s.operation_type.clone())
            .collect();
        exempt.sort();
        exempt.dedup();
        exempt
    }

    /// Replace every handler, keeping the specs.
    pub fn try_map<T, E>(
        self,
        mut f: impl FnMut(&RouteSpec, H) -> Result<T, E>,
    ) -> Result<RouteTable<T>, E> {
        let routes = self
            .routes
            .into_iter()
            .map(|route| {
                let handler = f(&route.spec, route.handler)?;
                Ok(Route {
                    spec: route.spec,
                    handler,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(RouteTable {
            path_base: self.path_base,
            conventions: self.conventions,
            routes,
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects resource types and conventions, then synthesizes a [`RouteTable`].
#[derive(Debug, Clone)]
pub struct RouteTableBuilder<H> {
    path_base: PathTemplate,
    conventions: Vec<ScopeConvention>,
    resource_types: Vec<ResourceTypeDescriptor<H>>,
    operation_statuses: H,
    operation_results: H,
}

impl<H: Clone> RouteTableBuilder<H> {
    /// Start a builder. `path_base` is a literal prefix placed before every
    /// root scope (empty for none). The two handlers serve the polling routes.
    pub fn new(path_base: &str, operation_statuses: H, operation_results: H) -> Self {
        Self {
            path_base: PathTemplate::new().literal(path_base),
            conventions: Vec::new(),
            resource_types: Vec::new(),
            operation_statuses,
            operation_results,
        }
    }

    pub fn convention(mut self, convention: ScopeConvention) -> Self {
        if !self.conventions.contains(&convention) {
            self.conventions.push(convention);
        }
        self
    }

    pub fn conventions(self, conventions: impl IntoIterator<Item = ScopeConvention>) -> Self {
        conventions.into_iter().fold(self, Self::convention)
    }

    pub fn resource_type(mut self, descriptor: ResourceTypeDescriptor<H>) -> Self {
        self.resource_types.push(descriptor);
        self
    }

    pub fn resource_types(
        self,
        descriptors: impl IntoIterator<Item = ResourceTypeDescriptor<H>>,
    ) -> Self {
        descriptors.into_iter().fold(self, Self::resource_type)
    }

    /// Synthesize the route table.
    ///
    /// Fails with [`CoreError::AmbiguousRoute`] when two bindings under one
    /// convention collapse to the same template and verb.
    pub fn build(&self) -> Result<RouteTable<H>, CoreError> {
        let mut namespaces: BTreeMap<String, String> = BTreeMap::new();
        for descriptor in &self.resource_types {
            validate_resource_type(&descriptor.resource_type)?;
            let namespace = descriptor.namespace();
            namespaces
                .entry(namespace.to_ascii_lowercase())
                .or_insert_with(|| namespace.to_string());
        }

        let mut routes = Vec::new();
        for convention in &self.conventions {
            let start = routes.len();

            for descriptor in &self.resource_types {
                for binding in &descriptor.bindings {
                    if !convention.supports(binding.flags) {
                        continue;
                    }
                    let operation_type =
                        OperationType::new(descriptor.resource_type.clone(), binding.method.clone());
                    self.push_routes(
                        &mut routes,
                        convention,
                        operation_type,
                        &binding.shape,
                        binding.flags,
                        &binding.handler,
                    )?;
                }
            }

            for namespace in namespaces.values() {
                for (type_name, shape, handler) in [
                    (
                        OPERATION_STATUSES_TYPE,
                        RouteShape::OperationStatus,
                        &self.operation_statuses,
                    ),
                    (
                        OPERATION_RESULTS_TYPE,
                        RouteShape::OperationResult,
                        &self.operation_results,
                    ),
                ] {
                    let operation_type =
                        OperationType::new(format!("{namespace}/{type_name}"), OperationMethod::Get);
                    self.push_routes(
                        &mut routes,
                        convention,
                        operation_type,
                        &shape,
                        RouteFlags::NONE,
                        handler,
                    )?;
                }
            }

            check_unambiguous(convention, &routes[start..])?;
        }

        Ok(RouteTable {
            path_base: self.path_base.clone(),
            conventions: self.conventions.clone(),
            routes,
        })
    }

    fn push_routes(
        &self,
        routes: &mut Vec<Route<H>>,
        convention: &ScopeConvention,
        operation_type: OperationType,
        shape: &RouteShape,
        flags: RouteFlags,
        handler: &H,
    ) -> Result<(), CoreError> {
        let verb = shape.verb_for(&operation_type.method)?;
        let suffix = resource_suffix(&operation_type, shape);

        for level in convention.levels_for(shape, flags) {
            let Some(prefix) = convention.prefix(level) else {
                continue;
            };
            let template = self.path_base.clone().join(&prefix).join(&suffix);
            routes.push(Route {
                spec: RouteSpec {
                    operation_type: operation_type.clone(),
                    convention: convention.kind(),
                    template,
                    verb,
                    flags,
                    shape: shape.clone(),
                    scope_level: level,
                },
                handler: handler.clone(),
            });
        }
        Ok(())
    }
}

/// Template below the scope prefix for a resource type at `shape`.
fn resource_suffix(operation_type: &OperationType, shape: &RouteShape) -> PathTemplate {
    let provider = PathTemplate::new()
        .literal("providers")
        .literal(operation_type.namespace());
    let typed = provider.clone().literal(operation_type.type_name());

    match shape {
        RouteShape::Collection => typed,
        RouteShape::Instance => typed.param(RESOURCE_NAME_PARAM),
        RouteShape::Action(action) => typed.param(RESOURCE_NAME_PARAM).literal(action),
        RouteShape::ProviderOperations => provider.literal("operations"),
        RouteShape::OperationStatus => provider
            .literal("locations")
            .param(LOCATION_PARAM)
            .literal("operationstatuses")
            .operation_id(OPERATION_ID_PARAM),
        RouteShape::OperationResult => provider
            .literal("locations")
            .param(LOCATION_PARAM)
            .literal("operationresults")
            .operation_id(OPERATION_ID_PARAM),
    }
}

/// No two routes under one convention may share `(template, verb)`.
fn check_unambiguous<H>(convention: &ScopeConvention, routes: &[Route<H>]) -> Result<(), CoreError> {
    let mut seen = HashSet::with_capacity(routes.len());
    for route in routes {
        if !seen.insert((route.spec.template.match_key(), route.spec.verb)) {
            return Err(CoreError::AmbiguousRoute {
                convention: convention.kind().to_string(),
                verb: route.spec.verb,
                template: route.spec.template.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::route::HttpVerb;
    use crate::scope::ScopeLevel;

    const DAPR_SECRET_STORES: &str = "Applications.Dapr/secretStores";

    fn secret_stores() -> ResourceTypeDescriptor<&'static str> {
        ResourceTypeDescriptor::new(DAPR_SECRET_STORES)
            .bind(OperationMethod::List, "list")
            .bind(OperationMethod::Get, "get")
            .bind(OperationMethod::Put, "put")
            .bind(OperationMethod::Patch, "patch")
            .bind(OperationMethod::Delete, "delete")
    }

    fn builder() -> RouteTableBuilder<&'static str> {
        RouteTableBuilder::new("/api.ucp.dev", "status", "result")
    }

    fn templates(table: &RouteTable<&'static str>) -> Vec<String> {
        table
            .specs()
            .map(|s| format!("{} {}", s.verb, s.template))
            .collect()
    }

    #[test]
    fn crud_routes_under_plane_convention() {
        let table = builder()
            .convention(ScopeConvention::plane())
            .resource_type(secret_stores())
            .build()
            .unwrap();

        // List twice, four instance verbs, two polling routes.
        assert_eq!(table.len(), 8);
        let all = templates(&table);
        assert!(all.contains(
            &"GET /api.ucp.dev/planes/{planeType}/{planeName}/providers/applications.dapr/secretstores"
                .to_string()
        ));
        assert!(all.contains(
            &"PATCH /api.ucp.dev/planes/{planeType}/{planeName}/resourcegroups/{resourceGroupName}/providers/applications.dapr/secretstores/{resourceName}"
                .to_string()
        ));
        assert!(all.contains(
            &"GET /api.ucp.dev/planes/{planeType}/{planeName}/providers/applications.dapr/locations/{location}/operationstatuses/{operationId}"
                .to_string()
        ));
    }

    #[test]
    fn custom_action_is_post_below_instance() {
        let table = builder()
            .convention(ScopeConvention::subscription())
            .resource_type(
                ResourceTypeDescriptor::new("Applications.Datastores/mongoDatabases").bind(
                    OperationMethod::Custom("LISTSECRETS".into()),
                    "secrets",
                ),
            )
            .build()
            .unwrap();

        let action = table
            .specs()
            .find(|s| s.operation_type.method.is_custom())
            .unwrap();
        assert_eq!(action.verb, HttpVerb::Post);
        assert_eq!(
            action.template.to_string(),
            "/api.ucp.dev/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}/providers/applications.datastores/mongodatabases/{resourceName}/listsecrets"
        );
    }

    #[test]
    fn discovery_route_only_under_subscription_convention() {
        let discovery = ResourceTypeDescriptor::new("Applications.Dapr/providers").bind_with(
            HandlerBinding::new(OperationMethod::Get, "discovery")
                .with_shape(RouteShape::ProviderOperations)
                .with_flags(RouteFlags::DISCOVERY),
        );
        let table = RouteTableBuilder::new("", "status", "result")
            .conventions([ScopeConvention::plane(), ScopeConvention::subscription()])
            .resource_type(discovery)
            .build()
            .unwrap();

        let routes: Vec<_> = table
            .routes()
            .iter()
            .filter(|r| r.handler == "discovery")
            .collect();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].spec.template.to_string(), "/providers/applications.dapr/operations");
        assert_eq!(routes[0].spec.scope_level, ScopeLevel::Unscoped);
        assert_eq!(
            table.exemptions(),
            vec![OperationType::new("Applications.Dapr/providers", OperationMethod::Get)]
        );
    }

    #[test]
    fn async_surface_injected_per_convention_and_namespace() {
        let table = builder()
            .conventions([ScopeConvention::plane(), ScopeConvention::subscription()])
            .resource_type(secret_stores())
            .resource_type(
                ResourceTypeDescriptor::new("applications.dapr/stateStores")
                    .bind(OperationMethod::Get, "get"),
            )
            .build()
            .unwrap();

        let polling = table.specs().filter(|s| s.shape.is_async_surface()).count();
        assert_eq!(polling, 4);
    }

    #[test]
    fn async_surface_present_without_resource_bindings() {
        let table = builder()
            .convention(ScopeConvention::plane())
            .resource_type(ResourceTypeDescriptor::new("Applications.Dapr/secretStores"))
            .build()
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn colliding_bindings_are_ambiguous() {
        let duplicated = secret_stores().bind(OperationMethod::Get, "get-again");
        let err = builder()
            .convention(ScopeConvention::plane())
            .resource_type(duplicated)
            .build()
            .unwrap_err();
        assert_matches!(err, CoreError::AmbiguousRoute { verb: HttpVerb::Get, .. });
    }

    #[test]
    fn type_names_differing_only_in_case_are_ambiguous() {
        let err = builder()
            .convention(ScopeConvention::plane())
            .resource_type(secret_stores())
            .resource_type(
                ResourceTypeDescriptor::new("applications.dapr/SECRETSTORES")
                    .bind(OperationMethod::List, "list"),
            )
            .build()
            .unwrap_err();
        assert_matches!(err, CoreError::AmbiguousRoute { .. });
    }

    #[test]
    fn list_bound_at_instance_shape_is_rejected() {
        let err = builder()
            .convention(ScopeConvention::plane())
            .resource_type(ResourceTypeDescriptor::new(DAPR_SECRET_STORES).bind_with(
                HandlerBinding::new(OperationMethod::List, "list").with_shape(RouteShape::Instance),
            ))
            .build()
            .unwrap_err();
        assert_matches!(err, CoreError::InvalidOperation(_));
    }

    #[test]
    fn building_twice_is_deterministic() {
        let builder = builder()
            .conventions([ScopeConvention::plane(), ScopeConvention::subscription()])
            .resource_type(secret_stores());
        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(templates(&first), templates(&second));
    }

    #[test]
    fn try_map_replaces_handlers() {
        let table = builder()
            .convention(ScopeConvention::plane())
            .resource_type(secret_stores())
            .build()
            .unwrap();
        let mapped = table
            .try_map(|spec, handler| Ok::<_, CoreError>(format!("{handler}:{}", spec.verb)))
            .unwrap();
        assert!(mapped.routes().iter().any(|r| r.handler == "put:PUT"));
    }
}
