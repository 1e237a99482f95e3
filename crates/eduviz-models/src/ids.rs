//! Safe-id validation shared by every component that turns an externally
//! supplied string into a path segment (job id, section id, analysis id,
//! upload filename).

use std::fmt;

/// Pattern every externally supplied id must satisfy: `[A-Za-z0-9_-]+`.
pub fn is_safe_id(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Error returned when a caller-supplied id fails the safe-id pattern or
/// would resolve outside the configured root.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id: {0}")]
pub struct InvalidId(pub String);

impl InvalidId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for InvalidIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidIdKind::Pattern => write!(f, "does not match [A-Za-z0-9_-]+"),
            InvalidIdKind::Traversal => write!(f, "resolves outside the configured root"),
        }
    }
}

/// Why an id was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidIdKind {
    Pattern,
    Traversal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_safe_ids() {
        assert!(is_safe_id("job-123_abc"));
        assert!(is_safe_id("ABC"));
    }

    #[test]
    fn rejects_traversal_and_empty() {
        assert!(!is_safe_id("../escape"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id("a b"));
    }
}
