use crate::route::HttpVerb;
use crate::validator::MismatchReport;

/// Errors raised by the route/operation model.
///
/// The first group is raised while the route table is assembled at startup
/// and is always fatal. The second group is raised per request by the matcher
/// before any controller runs.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // --- Startup ---
    #[error("Duplicate declaration for resource type {resource_type} with a conflicting operation set")]
    DuplicateDeclaration { resource_type: String },

    #[error("Ambiguous route under {convention}: {verb} {template} is registered more than once")]
    AmbiguousRoute {
        convention: String,
        verb: HttpVerb,
        template: String,
    },

    #[error("Operation type mismatch: {0}")]
    OperationTypeMismatch(MismatchReport),

    #[error("Invalid resource type '{0}': expected Namespace/typeName")]
    InvalidResourceType(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Failed to construct controller for {operation}: {message}")]
    ControllerConstruction { operation: String, message: String },

    // --- Request time ---
    #[error("Malformed operation identifier '{0}'")]
    MalformedIdentifier(String),

    #[error("No route matches {method} {path}")]
    NotFound { method: String, path: String },

    #[error("Method {method} is not allowed for {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<HttpVerb>,
    },

    #[error("Invalid scope: {0}")]
    InvalidScope(String),
}

impl CoreError {
    /// Whether this error belongs to the startup phase (and must stop the process).
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::DuplicateDeclaration { .. }
                | Self::AmbiguousRoute { .. }
                | Self::OperationTypeMismatch(_)
                | Self::InvalidResourceType(_)
                | Self::InvalidOperation(_)
                | Self::ControllerConstruction { .. }
        )
    }
}
