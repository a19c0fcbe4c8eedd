use std::fmt;

use crate::schema::ValidationError;

/// Errors a handler can return, each carrying its own HTTP status.
///
/// `?` on any `anyhow`-compatible error produces [`ApiError::Unhandled`], which the
/// gate reports as a generic 500. Client-facing failures are raised explicitly with
/// [`ApiError::declared`] or [`ApiError::not_found`].
#[derive(Debug)]
pub enum ApiError {
    /// Schema rejection, reported as 400 with field-level details.
    Validation(ValidationError),
    /// Intentional failure with an explicit status code.
    Declared { status: u16, message: String },
    /// The addressed resource does not exist.
    NotFound(String),
    /// Anything else; the message is never shown to clients.
    Unhandled(anyhow::Error),
}

impl ApiError {
    pub fn declared(status: u16, message: impl Into<String>) -> Self {
        ApiError::Declared {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::Declared { status, .. } => *status,
            ApiError::NotFound(_) => 404,
            ApiError::Unhandled(_) => 500,
        }
    }

    /// Client-facing message. Unhandled errors collapse to a generic text.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::Declared { message, .. } | ApiError::NotFound(message) => message.clone(),
            ApiError::Unhandled(_) => "Internal server error".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(e) => write!(f, "validation failed: {e}"),
            ApiError::Declared { status, message } => write!(f, "{status}: {message}"),
            ApiError::NotFound(message) => write!(f, "not found: {message}"),
            ApiError::Unhandled(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Validation(e) => Some(e),
            ApiError::Unhandled(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Unhandled(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_per_kind() {
        assert_eq!(ApiError::declared(409, "taken").status(), 409);
        assert_eq!(ApiError::not_found("gone").status(), 404);
        assert_eq!(
            ApiError::from(ValidationError::single("id", "Required")).status(),
            400
        );
        assert_eq!(ApiError::from(anyhow::anyhow!("db down")).status(), 500);
    }

    #[test]
    fn test_unhandled_message_is_hidden() {
        let err = ApiError::from(anyhow::anyhow!("password=hunter2"));
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("hunter2"));
    }
}
