use armrpc_core::scope::ConventionKind;

/// Errors raised while reading [`ServerConfig`] from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Literal prefix mounted before every root scope, e.g. `/apis/api.ucp.dev/v1alpha3`.
    pub path_base: String,
    /// Scope conventions to mount routes under (default: plane only).
    pub conventions: Vec<ConventionKind>,
    /// Location segment used in async-operation polling URLs (default: `global`).
    pub location: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            path_base: String::new(),
            conventions: vec![ConventionKind::Plane],
            location: "global".into(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default   |
    /// |-------------------------|-----------|
    /// | `HOST`                  | `0.0.0.0` |
    /// | `PORT`                  | `8080`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`      |
    /// | `PATH_BASE`             | (empty)   |
    /// | `SCOPE_CONVENTIONS`     | `plane`   |
    /// | `DEFAULT_LOCATION`      | `global`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = parse_var(&lookup, "PORT", defaults.port)?;
        let request_timeout_secs =
            parse_var(&lookup, "REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?;
        let shutdown_timeout_secs =
            parse_var(&lookup, "SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout_secs)?;

        let path_base = match lookup("PATH_BASE") {
            Some(base) => normalize_path_base(&base),
            None => defaults.path_base,
        };

        let conventions = match lookup("SCOPE_CONVENTIONS") {
            Some(raw) => parse_conventions(&raw)?,
            None => defaults.conventions,
        };

        let location = lookup("DEFAULT_LOCATION")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.location);

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            path_base,
            conventions,
            location,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// `"api.ucp.dev/"` and `"/api.ucp.dev"` both become `"/api.ucp.dev"`.
fn normalize_path_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_conventions(raw: &str) -> Result<Vec<ConventionKind>, ConfigError> {
    let mut conventions = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: ConventionKind = name.parse().map_err(|e: armrpc_core::error::CoreError| {
            ConfigError::Invalid {
                var: "SCOPE_CONVENTIONS",
                value: raw.to_string(),
                reason: e.to_string(),
            }
        })?;
        if !conventions.contains(&kind) {
            conventions.push(kind);
        }
    }
    if conventions.is_empty() {
        return Err(ConfigError::Invalid {
            var: "SCOPE_CONVENTIONS",
            value: raw.to_string(),
            reason: "at least one convention is required".into(),
        });
    }
    Ok(conventions)
}
