// ── Core error types ──
//
// Errors surfaced by midimirror-core. Source failures for a single handle
// are normally absorbed by the reconciler and dispatcher ("object already
// gone"); only invariant violations are meant to reach callers.

use thiserror::Error;

use crate::model::{Category, Handle, UniqueId};

/// Failure reported by a [`HandleSource`](crate::source::HandleSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("object {handle} not found")]
    ObjectNotFound { handle: Handle },

    #[error("object {handle} has no property '{property}'")]
    PropertyNotFound { handle: Handle, property: String },

    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transient ────────────────────────────────────────────────────
    #[error("object {handle} vanished before it could be wrapped")]
    ObjectVanished { handle: Handle },

    #[error(transparent)]
    Source(#[from] SourceError),

    // ── Invariant violations ─────────────────────────────────────────
    #[error("unique id {unique_id} is already cached")]
    DuplicateUniqueId { unique_id: UniqueId },

    #[error("handle {handle} is already cached")]
    HandleInUse { handle: Handle },

    #[error("factory for {expected} asked to build a {actual} wrapper")]
    CategoryMismatch { expected: Category, actual: Category },

    // ── Routing ──────────────────────────────────────────────────────
    #[error("category {category} is not mirrored")]
    UnmirroredCategory { category: Category },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this error only means "the object is gone", which callers
    /// treat as a skip rather than a failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ObjectVanished { .. }
                | Self::Source(SourceError::ObjectNotFound { .. } | SourceError::PropertyNotFound { .. })
        )
    }

    /// Whether this error signals broken cache bookkeeping.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUniqueId { .. } | Self::HandleInUse { .. } | Self::CategoryMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanish_and_missing_objects_are_transient() {
        let h = Handle::new(7);
        assert!(CoreError::ObjectVanished { handle: h }.is_transient());
        assert!(CoreError::from(SourceError::ObjectNotFound { handle: h }).is_transient());
        assert!(
            !CoreError::from(SourceError::Unavailable {
                reason: "offline".into()
            })
            .is_transient()
        );
    }

    #[test]
    fn duplicate_insert_is_an_invariant_violation() {
        let err = CoreError::DuplicateUniqueId {
            unique_id: UniqueId::new(3),
        };
        assert!(err.is_invariant_violation());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "unique id 3 is already cached");
    }
}
