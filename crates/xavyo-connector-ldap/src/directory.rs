//! Directory capabilities the connector depends on.
//!
//! The translator, projector and synchronizer only talk to the directory
//! through these traits, so the wire client can be swapped (see
//! [`crate::client::LdapDirectory`]) or replaced by an in-memory directory
//! in tests.

use async_trait::async_trait;

use xavyo_connector::error::ConnectorResult;
use xavyo_connector::operation::ObjectClass;

/// Attribute list asking the directory to return no attributes.
pub const NO_ATTRIBUTES: &str = "1.1";

/// Search scope relative to the base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the base entry.
    Base,
    /// Direct children of the base entry.
    OneLevel,
    /// The base entry and all descendants.
    Subtree,
}

/// A search request as sent to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    /// Directory attribute names to return. `*` and `+` select all user and
    /// operational attributes; [`NO_ATTRIBUTES`] selects none.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    pub fn new(
        base: impl Into<String>,
        scope: SearchScope,
        filter: impl Into<String>,
        attributes: Vec<String>,
    ) -> Self {
        Self {
            base: base.into(),
            scope,
            filter: filter.into(),
            attributes,
        }
    }

    /// Request that returns entry DNs only.
    pub fn dns_only(base: impl Into<String>, scope: SearchScope, filter: impl Into<String>) -> Self {
        Self::new(base, scope, filter, vec![NO_ATTRIBUTES.to_string()])
    }
}

/// One attribute of a directory entry, values as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub values: Vec<Vec<u8>>,
}

impl RawAttribute {
    pub fn new(name: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Create an attribute from text values.
    pub fn text<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            values.into_iter().map(|v| v.into().into_bytes()).collect(),
        )
    }

    /// Values decoded as UTF-8, lossy.
    pub fn text_values(&self) -> impl Iterator<Item = String> + '_ {
        self.values
            .iter()
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

/// A directory entry as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub dn: String,
    pub attributes: Vec<RawAttribute>,
}

impl RawEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute using builder pattern.
    pub fn with(mut self, attribute: RawAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Get an attribute by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&RawAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// First value of an attribute decoded as UTF-8.
    pub fn first_text(&self, name: &str) -> Option<String> {
        self.get(name)?.text_values().next()
    }
}

/// Kind of change in a modify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationKind {
    Add,
    Delete,
    Replace,
}

/// One change of a modify request.
///
/// `Delete` with no values removes the attribute; `Replace` with no values
/// clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub kind: ModificationKind,
    pub attribute: String,
    pub values: Vec<Vec<u8>>,
}

impl Modification {
    pub fn add(attribute: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            kind: ModificationKind::Add,
            attribute: attribute.into(),
            values,
        }
    }

    pub fn delete(attribute: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            kind: ModificationKind::Delete,
            attribute: attribute.into(),
            values,
        }
    }

    pub fn replace(attribute: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            kind: ModificationKind::Replace,
            attribute: attribute.into(),
            values,
        }
    }
}

/// Plain request/response access to the directory.
#[async_trait]
pub trait DirectoryConnection: Send + Sync {
    /// Run a search and return every matching entry.
    ///
    /// A base DN that does not exist yields an empty result.
    async fn search(&self, request: &SearchRequest) -> ConnectorResult<Vec<RawEntry>>;

    /// Apply modifications to one entry.
    async fn modify(&self, dn: &str, modifications: Vec<Modification>) -> ConnectorResult<()>;

    /// Release held connections. Later calls fail.
    async fn dispose(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

/// Parameters of a refresh-only content-sync session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Class the session reads, for error context.
    pub object_class: ObjectClass,
    /// Always searched with subtree scope.
    pub base: String,
    pub filter: String,
    pub attributes: Vec<String>,
    /// Position to resume from; `None` asks for the full content.
    pub cookie: Option<Vec<u8>>,
}

/// Sync state of an entry in the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Present,
    Add,
    Modify,
    Delete,
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryState::Present => write!(f, "present"),
            EntryState::Add => write!(f, "add"),
            EntryState::Modify => write!(f, "modify"),
            EntryState::Delete => write!(f, "delete"),
        }
    }
}

/// A message of a content-sync session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotification {
    /// An entry with its sync state.
    Entry {
        state: EntryState,
        entry_uuid: String,
        entry: RawEntry,
    },
    /// Ids of entries that may have been deleted.
    IdSet { entry_uuids: Vec<String> },
    /// The session completed; carries the new position if the directory
    /// reported one.
    Done { cookie: Option<Vec<u8>> },
}

/// An open content-sync session, pulled one notification at a time.
#[async_trait]
pub trait SyncSession: Send {
    /// Next notification. After `Done` the session yields `None`.
    async fn next(&mut self) -> ConnectorResult<Option<SyncNotification>>;

    /// Release the session. Must be called on every exit path.
    async fn close(&mut self);
}

/// Opens content-sync sessions.
#[async_trait]
pub trait SyncSessionFactory: Send + Sync {
    async fn open(&self, request: &SyncRequest) -> ConnectorResult<Box<dyn SyncSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_entry_lookup_is_case_insensitive() {
        let entry = RawEntry::new("uid=jdoe,ou=people,o=isp")
            .with(RawAttribute::text("cn", ["John Doe"]))
            .with(RawAttribute::text("mail", ["a@example.com", "b@example.com"]));

        assert_eq!(entry.first_text("CN"), Some("John Doe".to_string()));
        assert_eq!(entry.get("MAIL").map(|a| a.values.len()), Some(2));
        assert!(entry.get("sn").is_none());
    }

    #[test]
    fn test_dns_only_request() {
        let request = SearchRequest::dns_only("o=isp", SearchScope::Subtree, "(entryUUID=x)");
        assert_eq!(request.attributes, vec!["1.1".to_string()]);
    }
}
