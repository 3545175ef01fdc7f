//! # Error Types
//!
//! Validation errors for the core newtypes. Every constructor that accepts
//! untrusted input returns one of these instead of panicking.

use thiserror::Error;

/// Errors from parsing or validating core types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Digest string is not 64 lowercase hex characters.
    #[error("invalid content digest: {0}")]
    InvalidDigest(String),

    /// Branch name is not a base-36 number of the expected width.
    #[error("invalid branch name: {0}")]
    InvalidBranch(String),

    /// Display filename rejected.
    #[error("invalid asset name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_name_display_includes_reason() {
        let err = CoreError::InvalidName {
            name: "../x".to_string(),
            reason: "must not contain path separators",
        };
        let msg = err.to_string();
        assert!(msg.contains("../x"));
        assert!(msg.contains("path separators"));
    }
}
