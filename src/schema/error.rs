use serde::Serialize;
use std::fmt;

/// A single schema rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field (`items.1.id`), empty for the root value.
    pub path: String,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn at(path: &[String], message: impl Into<String>) -> Self {
        Self::new(path.join("."), message)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Schema rejection of a params, body or query value.
///
/// Issues are kept in the order they were found, which follows field
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        ValidationError { issues }
    }

    /// Single-issue error, e.g. for a body that is not valid JSON.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new(path, message)])
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(f, "{}", joined.join(", "))
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_issues() {
        let err = ValidationError::new(vec![
            ValidationIssue::new("content", "Required"),
            ValidationIssue::new("", "Expected object, received array"),
        ]);
        assert_eq!(
            err.to_string(),
            "content: Required, Expected object, received array"
        );
    }
}
