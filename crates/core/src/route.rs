//! Route specifications and the path templates they are mounted at.

use std::fmt;

use crate::error::CoreError;
use crate::operation::{OperationMethod, OperationType};
use crate::scope::{ConventionKind, ScopeLevel};

// ---------------------------------------------------------------------------
// HTTP verbs
// ---------------------------------------------------------------------------

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpVerb {
    Get,
    Put,
    Patch,
    Delete,
    Post,
}

impl HttpVerb {
    /// Map an HTTP method name. Method names are case-sensitive, so `get`
    /// and `TRACE` both return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(Self::Get),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Path templates
// ---------------------------------------------------------------------------

/// What a placeholder segment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Any non-empty segment.
    Any,
    /// A canonical operation identifier. Matching accepts any segment; the
    /// format is checked after matching so malformed ids are reported as such
    /// rather than as an unknown path.
    OperationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Fixed text, stored lower-cased and matched case-insensitively.
    Literal(String),
    /// Named placeholder; the captured value keeps its original case.
    Param { name: String, kind: ParamKind },
}

/// A sequence of literal and placeholder segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a template string such as `/planes/{planeType}/{planeName}`.
    ///
    /// `{name}` is a placeholder; anything else is a literal. Empty segments
    /// are skipped so `""` and `"/"` both yield the empty template.
    pub fn parse(template: &str) -> Self {
        let mut path = Self::new();
        for part in template.split('/').filter(|p| !p.is_empty()) {
            path = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => path.param(name),
                None => path.literal(part),
            };
        }
        path
    }

    /// Append one or more literal segments (`a/b` appends two).
    pub fn literal(mut self, text: &str) -> Self {
        self.segments.extend(
            text.split('/')
                .filter(|p| !p.is_empty())
                .map(|p| Segment::Literal(p.to_ascii_lowercase())),
        );
        self
    }

    pub fn param(mut self, name: &str) -> Self {
        self.segments.push(Segment::Param {
            name: name.to_string(),
            kind: ParamKind::Any,
        });
        self
    }

    pub fn operation_id(mut self, name: &str) -> Self {
        self.segments.push(Segment::Param {
            name: name.to_string(),
            kind: ParamKind::OperationId,
        });
        self
    }

    pub fn join(mut self, other: &PathTemplate) -> Self {
        self.segments.extend(other.segments.iter().cloned());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of literal segments; higher means more specific.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Ordering key for match precedence: deeper paths first, then more literals.
    pub fn specificity(&self) -> (usize, usize) {
        (self.segments.len(), self.literal_count())
    }

    /// Template with placeholder names erased. Two templates with the same
    /// key match exactly the same set of paths.
    pub fn match_key(&self) -> String {
        let mut key = String::new();
        for segment in &self.segments {
            key.push('/');
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Param { .. } => key.push_str("{}"),
            }
        }
        key
    }

    /// Match already-split path segments, returning the captured placeholders.
    pub fn matches(&self, path: &[&str]) -> Option<Vec<(String, String)>> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, value) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(text) => {
                    if !text.eq_ignore_ascii_case(value) {
                        return None;
                    }
                }
                Segment::Param { name, .. } => {
                    if value.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), (*value).to_string()));
                }
            }
        }
        Some(params)
    }

    /// Name of the operation-identifier placeholder, if the template has one.
    pub fn operation_id_param(&self) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::Param {
                name,
                kind: ParamKind::OperationId,
            } => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "/{text}")?,
                Segment::Param { name, .. } => write!(f, "/{{{name}}}")?,
            }
        }
        Ok(())
    }
}

/// Split a request path into segments for [`PathTemplate::matches`].
///
/// Drops the query string, the leading slash and a single trailing slash.
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

// ---------------------------------------------------------------------------
// Route shapes and flags
// ---------------------------------------------------------------------------

/// Where below the scope a binding is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteShape {
    /// `/providers/{ns}/{type}`, mounted at every scope level.
    Collection,
    /// `/providers/{ns}/{type}/{resourceName}`.
    Instance,
    /// `/providers/{ns}/{type}/{resourceName}/{action}` (lower-cased action).
    Action(String),
    /// `/providers/{ns}/operations`, the provider discovery listing.
    ProviderOperations,
    /// `/providers/{ns}/locations/{location}/operationstatuses/{operationId}`.
    OperationStatus,
    /// `/providers/{ns}/locations/{location}/operationresults/{operationId}`.
    OperationResult,
}

impl RouteShape {
    /// Default shape for a declared method.
    pub fn for_method(method: &OperationMethod) -> Self {
        match method {
            OperationMethod::List => Self::Collection,
            OperationMethod::Get
            | OperationMethod::Put
            | OperationMethod::Patch
            | OperationMethod::Delete => Self::Instance,
            OperationMethod::Custom(token) => Self::Action(token.to_ascii_lowercase()),
        }
    }

    /// HTTP verb for `method` mounted at this shape.
    pub fn verb_for(&self, method: &OperationMethod) -> Result<HttpVerb, CoreError> {
        match (self, method) {
            (Self::Collection, OperationMethod::List) => Ok(HttpVerb::Get),
            (Self::Instance, OperationMethod::Get) => Ok(HttpVerb::Get),
            (Self::Instance, OperationMethod::Put) => Ok(HttpVerb::Put),
            (Self::Instance, OperationMethod::Patch) => Ok(HttpVerb::Patch),
            (Self::Instance, OperationMethod::Delete) => Ok(HttpVerb::Delete),
            (Self::Action(_), _) => Ok(HttpVerb::Post),
            (
                Self::ProviderOperations | Self::OperationStatus | Self::OperationResult,
                OperationMethod::Get,
            ) => Ok(HttpVerb::Get),
            (shape, method) => Err(CoreError::InvalidOperation(format!(
                "{method} cannot be mounted at a {shape:?} route"
            ))),
        }
    }

    /// Whether this shape belongs to the async operation surface.
    pub fn is_async_surface(&self) -> bool {
        matches!(self, Self::OperationStatus | Self::OperationResult)
    }

    /// Whether this shape is mounted below a resource group when one exists.
    pub(crate) fn is_group_scoped(&self) -> bool {
        matches!(self, Self::Instance | Self::Action(_))
    }
}

/// Per-route registration flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RouteFlags {
    /// Mount without any root scope prefix (provider-level discovery routes).
    pub without_root_scope: bool,
    /// Exempt from operation-type validation.
    pub skip_operation_type_validation: bool,
}

impl RouteFlags {
    pub const NONE: Self = Self {
        without_root_scope: false,
        skip_operation_type_validation: false,
    };

    /// Flags used by provider discovery routes.
    pub const DISCOVERY: Self = Self {
        without_root_scope: true,
        skip_operation_type_validation: true,
    };
}

// ---------------------------------------------------------------------------
// Route specs
// ---------------------------------------------------------------------------

/// One `(template, verb)` binding for an operation type under one convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub operation_type: OperationType,
    pub convention: ConventionKind,
    pub template: PathTemplate,
    pub verb: HttpVerb,
    pub flags: RouteFlags,
    pub shape: RouteShape,
    pub scope_level: ScopeLevel,
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} [{}]",
            self.verb, self.template, self.operation_type, self.convention
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let template = PathTemplate::parse("/Planes/{planeType}/{planeName}");
        assert_eq!(template.to_string(), "/planes/{planeType}/{planeName}");
        assert_eq!(template.literal_count(), 1);
        assert_eq!(PathTemplate::parse("").to_string(), "/");
    }

    #[test]
    fn literals_match_case_insensitively_and_params_keep_case() {
        let template = PathTemplate::new()
            .literal("providers/applications.dapr/secretstores")
            .param("secretStoreName");
        let path = split_path("/providers/Applications.Dapr/secretStores/MyStore");
        let params = template.matches(&path).unwrap();
        assert_eq!(
            params,
            vec![("secretStoreName".to_string(), "MyStore".to_string())]
        );
    }

    #[test]
    fn empty_placeholder_does_not_match() {
        let template = PathTemplate::new().literal("a").param("b").literal("c");
        assert!(template.matches(&["a", "", "c"]).is_none());
    }

    #[test]
    fn match_key_erases_placeholder_names() {
        let a = PathTemplate::parse("/x/{one}/y");
        let b = PathTemplate::parse("/X/{two}/y");
        assert_eq!(a.match_key(), b.match_key());
        assert_ne!(a, b);
    }

    #[test]
    fn split_path_drops_query_and_slashes() {
        assert_eq!(split_path("/a/b/?api-version=1"), vec!["a", "b"]);
        assert!(split_path("/").is_empty());
        assert!(split_path("").is_empty());
    }

    #[test]
    fn verb_mapping() {
        assert_eq!(
            RouteShape::Collection.verb_for(&OperationMethod::List).unwrap(),
            HttpVerb::Get
        );
        assert_eq!(
            RouteShape::for_method(&OperationMethod::Custom("LISTSECRETS".into())),
            RouteShape::Action("listsecrets".into())
        );
        assert!(RouteShape::Instance.verb_for(&OperationMethod::List).is_err());
        assert!(HttpVerb::from_name("TRACE").is_none());
        assert!(HttpVerb::from_name("get").is_none());
    }
}
