//! Edit outcomes
//!
//! Every native-project editor reports what a call did instead of raising for
//! "condition not met" cases. Callers treat these as advisory.

use std::fmt;

/// Result of a single idempotent edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// A new node, key or line was added
    Inserted,
    /// An existing value was replaced with a different one
    Updated,
    /// The document already held the requested state; nothing was written
    Unchanged,
    /// A required anchor (activity, intent-filter, ...) was missing; nothing was written
    Skipped(String),
}

impl EditOutcome {
    /// Whether the edit changed the document and it must be written back
    pub fn is_change(&self) -> bool {
        matches!(self, EditOutcome::Inserted | EditOutcome::Updated)
    }

    /// Whether the document is in the requested state after the call
    pub fn is_success(&self) -> bool {
        !matches!(self, EditOutcome::Skipped(_))
    }
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOutcome::Inserted => write!(f, "inserted"),
            EditOutcome::Updated => write!(f, "updated"),
            EditOutcome::Unchanged => write!(f, "unchanged"),
            EditOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}
