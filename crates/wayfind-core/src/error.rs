//! Error types for wayfind.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the whole workspace.
///
/// Variants are typed and structured so the workflow can decide how to
/// surface them: client failures become user-visible messages, while
/// superseded operations are dropped without ever reaching the display.
#[derive(Error, Debug, Clone, Serialize, PartialEq)]
pub enum WayfindError {
    /// The external geocode / feature-query client failed
    #[error("{operation} failed: {message}")]
    Client { operation: String, message: String },

    /// The query could not be built from the given input
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A result, field or file the caller named does not exist
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Reading a gazetteer, feature table or config file failed
    #[error("IO error: {message}")]
    Io { message: String },

    /// A config file, service response or data file could not be parsed
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        /// Format of the offending document, e.g. GeoJSON
        format: String,
        message: String,
    },

    /// The workflow was asked for something its config does not provide
    #[error("Configuration error: {0}")]
    Config(String),

    /// A later operation of the same kind made this one's result moot
    #[error("Superseded by a newer {kind} operation")]
    Superseded { kind: String },

    /// The update task is gone or a reply channel closed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WayfindError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Client error for the named operation
    pub fn client(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Superseded error
    pub fn superseded(kind: impl Into<String>) -> Self {
        Self::Superseded { kind: kind.into() }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// True for failures reported by a geocode or feature client
    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    /// True when a newer operation of the same kind made this result moot
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }

    /// Whether the display boundary should show this error to the user.
    ///
    /// Supersession is never surfaced.
    pub fn is_user_visible(&self) -> bool {
        !self.is_superseded()
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for WayfindError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for WayfindError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for WayfindError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for WayfindError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, WayfindError>`.
pub type Result<T> = std::result::Result<T, WayfindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_message() {
        let err = WayfindError::client("search", "connection refused");
        assert_eq!(err.to_string(), "search failed: connection refused");
        assert!(err.is_client());
        assert!(err.is_user_visible());
    }

    #[test]
    fn test_superseded_is_not_user_visible() {
        let err = WayfindError::superseded("search");
        assert!(err.is_superseded());
        assert!(!err.is_user_visible());
    }

    #[test]
    fn test_from_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: WayfindError = parse_err.into();
        match err {
            WayfindError::Serialization { format, .. } => assert_eq!(format, "JSON"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
