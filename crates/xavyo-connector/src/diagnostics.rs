//! Non-fatal conditions reported alongside operation results.
//!
//! Mapping code collects these instead of logging; the connector decides
//! where they go (usually [`Diagnostics::log`]).

use tracing::warn;

/// A single non-fatal condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An identity attribute name has no directory counterpart.
    UnresolvedAttribute { attribute: String },

    /// An attribute belongs to the membership representation that is not
    /// configured and was dropped.
    ModeConflict { attribute: String, mode: String },

    /// An attribute does not apply to the object class it was supplied for.
    AttributeNotApplicable {
        attribute: String,
        object_class: String,
    },

    /// The change feed reported an entry state the synchronizer does not
    /// act on.
    UnsupportedSyncState { entry_uuid: String, state: String },

    /// Looking up the groups of an entry failed; the object was returned
    /// without group references.
    GroupLookupFailed { dn: String, message: String },

    /// A password was supplied with an update; it needs the directory's
    /// password-change operation and was not written.
    PasswordNotApplied { dn: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnresolvedAttribute { attribute } => {
                write!(f, "attribute '{attribute}' has no directory counterpart")
            }
            Diagnostic::ModeConflict { attribute, mode } => {
                write!(f, "attribute '{attribute}' is not valid in {mode} membership mode")
            }
            Diagnostic::AttributeNotApplicable {
                attribute,
                object_class,
            } => write!(f, "attribute '{attribute}' does not apply to {object_class}"),
            Diagnostic::UnsupportedSyncState { entry_uuid, state } => {
                write!(f, "unsupported sync state {state} for entry {entry_uuid}")
            }
            Diagnostic::GroupLookupFailed { dn, message } => {
                write!(f, "could not look up groups of {dn}: {message}")
            }
            Diagnostic::PasswordNotApplied { dn } => {
                write!(f, "password for {dn} was not applied")
            }
        }
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. An identical one already recorded is not repeated.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.entries.contains(&diagnostic) {
            self.entries.push(diagnostic);
        }
    }

    /// Move every diagnostic from `other` into this collection.
    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.entries {
            self.push(diagnostic);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Whether any diagnostic matches the predicate.
    pub fn any(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.entries.iter().any(predicate)
    }

    /// Emit every diagnostic as a warning.
    pub fn log(&self, operation: &str) {
        for diagnostic in &self.entries {
            warn!(operation = %operation, "{}", diagnostic);
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
