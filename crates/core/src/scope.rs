//! Root-scope conventions.
//!
//! A convention describes the path prefix a resource lives under:
//!
//! ```text
//! plane          /planes/{planeType}/{planeName}[/resourcegroups/{resourceGroupName}]
//! subscription   /subscriptions/{subscriptionId}[/resourcegroups/{resourceGroupName}]
//! ```
//!
//! Conventions are a closed set ([`ScopeConvention`]); each variant implements
//! [`RootScope`] so adding one is a matter of adding a variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::route::{split_path, PathTemplate, RouteFlags, RouteShape};

/// Literal segment introducing a resource group.
pub const RESOURCE_GROUP_SEGMENT: &str = "resourcegroups";

/// Placeholder name for the resource group.
pub const RESOURCE_GROUP_PARAM: &str = "resourceGroupName";

// ---------------------------------------------------------------------------
// Kinds and levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConventionKind {
    Plane,
    Subscription,
}

impl ConventionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Plane => "plane",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for ConventionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConventionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plane" | "ucp" => Ok(Self::Plane),
            "subscription" | "azure" | "arm" => Ok(Self::Subscription),
            other => Err(CoreError::InvalidScope(format!(
                "Unknown scope convention '{other}'. Must be one of: plane, subscription"
            ))),
        }
    }
}

/// How much of the scope prefix a route is mounted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeLevel {
    /// No root scope at all (provider discovery routes).
    Unscoped,
    /// Root scope only, e.g. "list across the whole subscription".
    Root,
    /// Root scope plus resource group.
    ResourceGroup,
}

// ---------------------------------------------------------------------------
// Convention behaviour
// ---------------------------------------------------------------------------

/// Behaviour shared by every root-scope convention.
pub trait RootScope {
    fn kind(&self) -> ConventionKind;

    /// Template of the root prefix, without any resource group.
    fn root_template(&self) -> PathTemplate;

    /// Whether the root names a tenant (subscription) rather than a plane.
    fn requires_tenant_segment(&self) -> bool;

    /// Whether resources can be grouped below the root.
    fn has_resource_groups(&self) -> bool {
        true
    }

    /// Whether collections are also listed across the whole root scope,
    /// with the resource-group segment omitted.
    fn resource_group_optional(&self) -> bool;

    /// Whether a route registered with `flags` applies under this convention.
    fn supports(&self, flags: RouteFlags) -> bool {
        !flags.without_root_scope || self.requires_tenant_segment()
    }
}

/// `/planes/{planeType}/{planeName}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneScope;

impl RootScope for PlaneScope {
    fn kind(&self) -> ConventionKind {
        ConventionKind::Plane
    }

    fn root_template(&self) -> PathTemplate {
        PathTemplate::new()
            .literal("planes")
            .param("planeType")
            .param("planeName")
    }

    fn requires_tenant_segment(&self) -> bool {
        false
    }

    fn resource_group_optional(&self) -> bool {
        true
    }
}

/// `/subscriptions/{subscriptionId}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionScope;

impl RootScope for SubscriptionScope {
    fn kind(&self) -> ConventionKind {
        ConventionKind::Subscription
    }

    fn root_template(&self) -> PathTemplate {
        PathTemplate::new()
            .literal("subscriptions")
            .param("subscriptionId")
    }

    fn requires_tenant_segment(&self) -> bool {
        true
    }

    fn resource_group_optional(&self) -> bool {
        true
    }
}

/// The closed set of supported conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeConvention {
    Plane(PlaneScope),
    Subscription(SubscriptionScope),
}

impl ScopeConvention {
    pub fn plane() -> Self {
        Self::Plane(PlaneScope)
    }

    pub fn subscription() -> Self {
        Self::Subscription(SubscriptionScope)
    }

    pub fn from_kind(kind: ConventionKind) -> Self {
        match kind {
            ConventionKind::Plane => Self::plane(),
            ConventionKind::Subscription => Self::subscription(),
        }
    }

    fn inner(&self) -> &dyn RootScope {
        match self {
            Self::Plane(scope) => scope,
            Self::Subscription(scope) => scope,
        }
    }

    /// Template for the scope prefix at `level`, or `None` if the convention
    /// has no such level.
    pub fn prefix(&self, level: ScopeLevel) -> Option<PathTemplate> {
        match level {
            ScopeLevel::Unscoped => Some(PathTemplate::new()),
            ScopeLevel::Root => Some(self.root_template()),
            ScopeLevel::ResourceGroup if self.has_resource_groups() => Some(
                self.root_template()
                    .literal(RESOURCE_GROUP_SEGMENT)
                    .param(RESOURCE_GROUP_PARAM),
            ),
            ScopeLevel::ResourceGroup => None,
        }
    }

    /// Scope levels a route of `shape` is mounted at.
    ///
    /// Collections are reachable across the whole root scope and per resource
    /// group; instances and actions live in a resource group (or directly
    /// under the root when the convention has no groups).
    pub fn levels_for(&self, shape: &RouteShape, flags: RouteFlags) -> Vec<ScopeLevel> {
        if flags.without_root_scope {
            return vec![ScopeLevel::Unscoped];
        }
        let grouped = self.has_resource_groups();
        match shape {
            RouteShape::Collection => {
                let mut levels = Vec::with_capacity(2);
                if self.resource_group_optional() || !grouped {
                    levels.push(ScopeLevel::Root);
                }
                if grouped {
                    levels.push(ScopeLevel::ResourceGroup);
                }
                levels
            }
            shape if shape.is_group_scoped() && grouped => vec![ScopeLevel::ResourceGroup],
            _ => vec![ScopeLevel::Root],
        }
    }

    /// Build a concrete scope prefix from a concrete root and optional group.
    ///
    /// `root_prefix` must match this convention's root template, e.g.
    /// `/planes/radius/local` or `/subscriptions/{id}`.
    pub fn resolve(
        &self,
        root_prefix: &str,
        resource_group: Option<&str>,
    ) -> Result<String, CoreError> {
        let segments = split_path(root_prefix);
        if self.root_template().matches(&segments).is_none() {
            return Err(CoreError::InvalidScope(format!(
                "'{root_prefix}' is not a {} root scope",
                self.kind()
            )));
        }
        let mut scope = format!("/{}", segments.join("/"));
        if let Some(group) = resource_group {
            if !self.has_resource_groups() {
                return Err(CoreError::InvalidScope(format!(
                    "The {} convention has no resource groups",
                    self.kind()
                )));
            }
            if group.is_empty() || group.contains('/') {
                return Err(CoreError::InvalidScope(format!(
                    "Invalid resource group '{group}'"
                )));
            }
            scope.push('/');
            scope.push_str(RESOURCE_GROUP_SEGMENT);
            scope.push('/');
            scope.push_str(group);
        }
        Ok(scope)
    }
}

impl RootScope for ScopeConvention {
    fn kind(&self) -> ConventionKind {
        self.inner().kind()
    }

    fn root_template(&self) -> PathTemplate {
        self.inner().root_template()
    }

    fn requires_tenant_segment(&self) -> bool {
        self.inner().requires_tenant_segment()
    }

    fn has_resource_groups(&self) -> bool {
        self.inner().has_resource_groups()
    }

    fn resource_group_optional(&self) -> bool {
        self.inner().resource_group_optional()
    }

    fn supports(&self, flags: RouteFlags) -> bool {
        self.inner().supports(flags)
    }
}

impl fmt::Display for ScopeConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

// ---------------------------------------------------------------------------
// Resolved scopes
// ---------------------------------------------------------------------------

/// The concrete scope a request was matched under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedScope {
    pub convention: ConventionKind,
    /// Concrete root prefix (e.g. `/planes/radius/local`), empty when unscoped.
    pub root: String,
    pub resource_group: Option<String>,
}

impl ResolvedScope {
    /// Full scope path: root plus resource group, if any.
    pub fn id(&self) -> String {
        match &self.resource_group {
            Some(group) => format!("{}/{RESOURCE_GROUP_SEGMENT}/{group}", self.root),
            None => self.root.clone(),
        }
    }

    pub fn is_unscoped(&self) -> bool {
        self.root.is_empty()
    }
}
