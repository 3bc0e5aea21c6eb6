use thiserror::Error;

/// Unified error type for the tabgate library
#[derive(Debug, Error)]
pub enum TabgateError {
    /// An inbound message could not be turned into a coordinator input
    #[error("Malformed event: {message}")]
    MalformedEvent {
        message: String,
        field: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// IO errors
    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid site pattern
    #[error("Invalid site pattern: {pattern}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Channel/messaging errors
    #[error("Channel error: {channel} - {message}")]
    Channel {
        channel: String,
        message: String,
    },
}

impl TabgateError {
    /// Create a malformed event error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedEvent {
            message: message.into(),
            field: None,
        }
    }

    /// Create a malformed event error naming the offending field
    pub fn malformed_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::MalformedEvent {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error naming the offending field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Create an IO error
    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a channel error
    pub fn channel<S: Into<String>, M: Into<String>>(channel: S, message: M) -> Self {
        Self::Channel {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// True when the error only affects a single inbound message
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedEvent { .. } | Self::Serialization { .. } | Self::Io { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedEvent { .. } => "malformed_event",
            Self::Configuration { .. } => "configuration",
            Self::Serialization { .. } => "serialization",
            Self::Io { .. } => "io",
            Self::Pattern { .. } => "pattern",
            Self::Channel { .. } => "channel",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TabgateError>;

impl From<std::io::Error> for TabgateError {
    fn from(err: std::io::Error) -> Self {
        Self::io("io_operation", err)
    }
}

impl From<serde_json::Error> for TabgateError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

impl From<serde_yaml::Error> for TabgateError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TabgateError {
    fn from(e: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::channel("coordinator", e.to_string())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for TabgateError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::channel("coordinator", "reply dropped")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TabgateError::malformed_field("missing discriminator", "type");
        assert!(matches!(err, TabgateError::MalformedEvent { .. }));
        assert_eq!(err.category(), "malformed_event");
        assert!(err.to_string().contains("missing discriminator"));
    }

    #[test]
    fn test_error_recoverability() {
        assert!(TabgateError::malformed("bad").is_recoverable());
        assert!(!TabgateError::configuration("bad").is_recoverable());
        assert!(!TabgateError::channel("coordinator", "closed").is_recoverable());
    }

    #[test]
    fn test_json_conversion() {
        let err: TabgateError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.category(), "serialization");
    }
}
