//! Connector Framework error types
//!
//! Error definitions with transient/permanent classification. Connectors never
//! retry on their own; callers use the classification to decide.

use thiserror::Error;

/// Error that can occur during connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (usually transient)
    /// Failed to establish connection to target system.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    // Authentication errors (permanent)
    /// Invalid credentials provided.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    // Configuration errors (permanent)
    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Filter errors
    /// The predicate tree combines constraints the directory cannot express
    /// in a single request (for example two different entry paths).
    #[error("untranslatable filter: {reason}")]
    UntranslatableFilter { reason: String },

    // Operation errors
    /// A directory search failed.
    #[error("search failed (base: {base}, filter: {filter}): {message}")]
    SearchFailed {
        base: String,
        filter: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A directory modify failed.
    #[error("modify failed for {dn}: {message}")]
    ModifyFailed {
        dn: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A change-feed session failed before completing.
    #[error("sync failed for object class {object_class}: {message}")]
    SyncFailed {
        object_class: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Object not found in target system.
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },

    /// Invalid data format.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    // Internal errors
    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Check if this error is transient and the operation may succeed when
    /// attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::SyncFailed { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::UntranslatableFilter { .. } => "UNTRANSLATABLE_FILTER",
            ConnectorError::SearchFailed { .. } => "SEARCH_FAILED",
            ConnectorError::ModifyFailed { .. } => "MODIFY_FAILED",
            ConnectorError::SyncFailed { .. } => "SYNC_FAILED",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
            ConnectorError::InvalidData { .. } => "INVALID_DATA",
            ConnectorError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an untranslatable filter error.
    pub fn untranslatable(reason: impl Into<String>) -> Self {
        ConnectorError::UntranslatableFilter {
            reason: reason.into(),
        }
    }

    /// Create a search failed error carrying the request context.
    pub fn search_failed(
        base: impl Into<String>,
        filter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConnectorError::SearchFailed {
            base: base.into(),
            filter: filter.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a search failed error with source.
    pub fn search_failed_with_source(
        base: impl Into<String>,
        filter: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let message = source.to_string();
        ConnectorError::SearchFailed {
            base: base.into(),
            filter: filter.into(),
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a modify failed error.
    pub fn modify_failed(dn: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::ModifyFailed {
            dn: dn.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a modify failed error with source.
    pub fn modify_failed_with_source(
        dn: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let message = source.to_string();
        ConnectorError::ModifyFailed {
            dn: dn.into(),
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a sync failed error.
    pub fn sync_failed(object_class: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::SyncFailed {
            object_class: object_class.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a sync failed error with source.
    pub fn sync_failed_with_source(
        object_class: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::SyncFailed {
            object_class: object_class.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ConnectorError::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let transient_errors = vec![
            ConnectorError::connection_failed("test"),
            ConnectorError::ConnectionTimeout { timeout_secs: 30 },
            ConnectorError::sync_failed("__ACCOUNT__", "session dropped"),
        ];

        for err in transient_errors {
            assert!(
                err.is_transient(),
                "Expected {} to be transient",
                err.error_code()
            );
            assert!(!err.is_permanent());
        }
    }

    #[test]
    fn test_permanent_errors() {
        let permanent_errors = vec![
            ConnectorError::AuthenticationFailed,
            ConnectorError::InvalidConfiguration {
                message: "test".to_string(),
            },
            ConnectorError::untranslatable("two entry paths"),
            ConnectorError::search_failed("dc=example,dc=com", "(cn=x)", "no access"),
            ConnectorError::ObjectNotFound {
                identifier: "test".to_string(),
            },
        ];

        for err in permanent_errors {
            assert!(
                err.is_permanent(),
                "Expected {} to be permanent",
                err.error_code()
            );
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ConnectorError::AuthenticationFailed.error_code(),
            "AUTH_FAILED"
        );
        assert_eq!(
            ConnectorError::untranslatable("x").error_code(),
            "UNTRANSLATABLE_FILTER"
        );
        assert_eq!(
            ConnectorError::modify_failed("cn=g", "x").error_code(),
            "MODIFY_FAILED"
        );
    }

    #[test]
    fn test_search_error_carries_context() {
        let err = ConnectorError::search_failed("ou=people,o=isp", "(uid=a)", "busy");
        assert_eq!(
            err.to_string(),
            "search failed (base: ou=people,o=isp, filter: (uid=a)): busy"
        );
    }

    #[test]
    fn test_error_with_source() {
        let source_err = std::io::Error::new(std::io::ErrorKind::Other, "underlying error");
        let err = ConnectorError::connection_failed_with_source("failed", source_err);

        assert!(err.is_transient());
        if let ConnectorError::ConnectionFailed { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("Expected ConnectionFailed variant");
        }
    }
}
