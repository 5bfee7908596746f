//! Error types for `unrelated-openapi-components`.

use thiserror::Error;

/// Main error type for the component engine and its runtime.
#[derive(Error, Debug)]
pub enum OpenApiComponentsError {
    /// Configuration errors (invalid route map pattern, name conflicts, bad settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (spec failed to load, registry could not be built).
    #[error("Startup error: {0}")]
    Startup(String),

    /// Runtime errors (component call failed, invalid arguments).
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// HTTP errors (non-2xx responses, invalid outbound URLs).
    #[error("HTTP error: {0}")]
    Http(String),

    /// `OpenAPI` errors (`$ref` resolution, unsupported constructs).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    #[error("OpenAPI error: failed to fetch spec from '{url}': {message}")]
    OpenApiSpecFetch { url: String, message: String },

    #[error("OpenAPI error: failed to read spec file '{path}': {source}")]
    OpenApiSpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenAPI error: failed to parse OpenAPI spec from '{location}': {source}")]
    OpenApiSpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// One or more path parameters were absent or null at call time.
    #[error("Missing required path parameters: {}", .0.join(", "))]
    MissingPathParameters(Vec<String>),

    /// No component with the given name or URI exists in the registry.
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors.
    #[error("Request error: {0}")]
    Request(String),
}

impl OpenApiComponentsError {
    /// Whether the caller can fix this error by changing the call arguments.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MissingPathParameters(_) | Self::ComponentNotFound(_)
        )
    }
}

/// Result type alias for component operations.
pub type Result<T> = std::result::Result<T, OpenApiComponentsError>;

#[cfg(test)]
mod tests {
    use super::OpenApiComponentsError;

    #[test]
    fn missing_path_parameters_lists_every_name() {
        let e = OpenApiComponentsError::MissingPathParameters(vec![
            "org".to_string(),
            "user_id".to_string(),
        ]);
        assert_eq!(
            e.to_string(),
            "Missing required path parameters: org, user_id"
        );
        assert!(e.is_caller_error());
    }

    #[test]
    fn config_errors_are_not_caller_errors() {
        let e = OpenApiComponentsError::Config("bad pattern".to_string());
        assert!(!e.is_caller_error());
    }
}
