//! Request matching against a built [`RouteTable`].
//!
//! One request moves through these states:
//!
//! ```text
//! Unmatched --(no template)-----------------> NotFound
//! Unmatched --(template matches path)-------> ScopeResolved
//! ScopeResolved --(no route for method)-----> MethodNotAllowed
//! ScopeResolved --(route for method)--------> MethodMatched
//! MethodMatched --(operation id malformed)--> MalformedIdentifier
//! MethodMatched ----------------------------> Dispatched
//! ```
//!
//! Only `Dispatched` hands a [`RouteMatch`] back to the caller, which then
//! invokes exactly one controller. Every other terminal state is an error.

use crate::builder::{Route, RouteTable};
use crate::error::CoreError;
use crate::operation_id::OperationId;
use crate::route::{split_path, HttpVerb};
use crate::scope::{ResolvedScope, RootScope, ScopeConvention, ScopeLevel, RESOURCE_GROUP_SEGMENT};

/// The successful outcome of matching one request.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub route: &'a Route<H>,
    /// Captured placeholders in template order, original case.
    pub params: Vec<(String, String)>,
    pub scope: ResolvedScope,
    /// Request path below the path base, original case.
    pub resource_path: String,
    /// Parsed identifier for the polling routes.
    pub operation_id: Option<OperationId>,
}

impl<H> RouteMatch<'_, H> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn handler(&self) -> &H {
        &self.route.handler
    }
}

impl<H> RouteTable<H> {
    /// Resolve `method path` to a single route.
    ///
    /// Among the templates that match the path, deeper and more literal
    /// templates are tried first and the first one registered for `method`
    /// wins. Method names outside the supported verbs (e.g. `TRACE`) never
    /// match and end in `MethodNotAllowed` when the path is known.
    pub fn resolve(&self, method: &str, path: &str) -> Result<RouteMatch<'_, H>, CoreError> {
        let segments = split_path(path);

        let mut candidates: Vec<(&Route<H>, Vec<(String, String)>)> = self
            .routes
            .iter()
            .filter_map(|route| {
                route
                    .spec
                    .template
                    .matches(&segments)
                    .map(|params| (route, params))
            })
            .collect();

        if candidates.is_empty() {
            return Err(CoreError::NotFound {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        // Stable sort keeps registration order among equally specific routes.
        candidates.sort_by(|(a, _), (b, _)| {
            b.spec
                .template
                .specificity()
                .cmp(&a.spec.template.specificity())
        });

        let verb = HttpVerb::from_name(method);
        let Some(position) = candidates
            .iter()
            .position(|(route, _)| Some(route.spec.verb) == verb)
        else {
            let mut allowed: Vec<HttpVerb> = candidates.iter().map(|(r, _)| r.spec.verb).collect();
            allowed.sort();
            allowed.dedup();
            return Err(CoreError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
                allowed,
            });
        };
        let (route, params) = candidates.swap_remove(position);

        let below_base = &segments[self.path_base.segments().len()..];
        let scope = self.resolve_scope(route, below_base);

        let operation_id = route
            .spec
            .template
            .operation_id_param()
            .and_then(|name| params.iter().find(|(key, _)| key == name))
            .map(|(_, value)| OperationId::parse(value))
            .transpose()?;

        Ok(RouteMatch {
            route,
            params,
            scope,
            resource_path: format!("/{}", below_base.join("/")),
            operation_id,
        })
    }

    fn resolve_scope(&self, route: &Route<H>, below_base: &[&str]) -> ResolvedScope {
        let convention = ScopeConvention::from_kind(route.spec.convention);
        let root_len = convention.root_template().segments().len();

        let (root, resource_group) = match route.spec.scope_level {
            ScopeLevel::Unscoped => (String::new(), None),
            ScopeLevel::Root => (format!("/{}", below_base[..root_len].join("/")), None),
            ScopeLevel::ResourceGroup => {
                debug_assert!(below_base[root_len].eq_ignore_ascii_case(RESOURCE_GROUP_SEGMENT));
                (
                    format!("/{}", below_base[..root_len].join("/")),
                    Some(below_base[root_len + 1].to_string()),
                )
            }
        };

        ResolvedScope {
            convention: route.spec.convention,
            root,
            resource_group,
        }
    }
}
