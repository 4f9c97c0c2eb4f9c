//! Connector Framework traits
//!
//! Capability-based trait definitions for connectors, inspired by `ConnId`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::ConnectorResult;
use crate::operation::{
    AttributeSelection, Filter, IdentityObject, ObjectClass, SearchResult, Uid,
};

/// Base trait for all connectors.
///
/// This trait provides common functionality that all connectors must implement,
/// regardless of their specific capabilities.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the target system.
    ///
    /// Returns `Ok(())` if the connection is successful, or an error describing
    /// what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Dispose of connector resources.
    ///
    /// Implementations should close connections and refuse further work.
    async fn dispose(&self) -> ConnectorResult<()>;

    /// Check if the connector is currently healthy.
    ///
    /// This is a lightweight health check, different from `test_connection`
    /// which may perform a more thorough validation.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Capability for searching objects in the target system.
#[async_trait]
pub trait SearchOp: Connector {
    /// Search for objects in the target system.
    ///
    /// # Arguments
    /// * `object_class` - The type of objects to search for
    /// * `filter` - The predicate to apply; `None` matches every object of the class
    /// * `selection` - The identity attributes to return
    ///
    /// Connectors may push only part of the predicate down to the target
    /// system; the result is then a superset the caller narrows itself.
    async fn search(
        &self,
        object_class: &ObjectClass,
        filter: Option<&Filter>,
        selection: &AttributeSelection,
    ) -> ConnectorResult<SearchResult>;

    /// Get a single object by its UID.
    async fn get(
        &self,
        object_class: &ObjectClass,
        uid: &Uid,
        selection: &AttributeSelection,
    ) -> ConnectorResult<Option<IdentityObject>> {
        let filter = Filter::eq(crate::operation::special::UID, uid.value());
        let result = self.search(object_class, Some(&filter), selection).await?;
        Ok(result.objects.into_iter().next())
    }
}

/// Printable, opaque resume position of a change feed.
///
/// Callers persist the token and hand it back unchanged; its content is
/// meaningful only to the connector that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncToken(String);

impl SyncToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SyncToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A change observed on the target system.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncDelta {
    /// The object was created or modified; carries its current state.
    Upsert(IdentityObject),
    /// The object no longer exists.
    Delete {
        object_class: ObjectClass,
        uid: Uid,
        name: String,
    },
}

impl SyncDelta {
    /// The identifier of the changed object.
    pub fn uid(&self) -> &Uid {
        match self {
            SyncDelta::Upsert(object) => &object.uid,
            SyncDelta::Delete { uid, .. } => uid,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, SyncDelta::Delete { .. })
    }
}

/// A change plus the position to resume from after applying it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    pub delta: SyncDelta,
    /// `None` only when the target system reported no position at all.
    pub token: Option<SyncToken>,
}

/// The changes of one sync call.
///
/// A batch is consumed once. Resuming after a failure means calling
/// [`SyncCapable::sync`] again with the last token persisted.
#[derive(Debug, Default)]
pub struct SyncBatch {
    records: std::vec::IntoIter<SyncRecord>,
    token: Option<SyncToken>,
    diagnostics: Diagnostics,
}

impl SyncBatch {
    pub fn new(records: Vec<SyncRecord>, token: Option<SyncToken>, diagnostics: Diagnostics) -> Self {
        Self {
            records: records.into_iter(),
            token,
            diagnostics,
        }
    }

    /// The position reached by this batch, shared by all of its records.
    pub fn token(&self) -> Option<&SyncToken> {
        self.token.as_ref()
    }

    /// Non-fatal conditions encountered while producing the batch.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Number of records not yet consumed.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl Iterator for SyncBatch {
    type Item = SyncRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for SyncBatch {}

/// Capability for incremental synchronization from target systems.
///
/// The connector reports every object changed since a previously issued
/// [`SyncToken`], e.g. through the LDAP Content Synchronization control
/// (RFC 4533).
///
/// Delivery is at least once: a caller that crashes after applying some
/// records of a batch and resumes from an older token sees those changes
/// again, so applying a record must be idempotent.
///
/// # Example
///
/// ```ignore
/// use xavyo_connector::prelude::*;
///
/// async fn poll(connector: &impl SyncCapable, token: Option<SyncToken>) -> ConnectorResult<Option<SyncToken>> {
///     let batch = connector
///         .sync(&ObjectClass::Account, token.as_ref(), &AttributeSelection::all())
///         .await?;
///     let mut last = token;
///     for record in batch {
///         apply(&record.delta);
///         last = record.token.or(last);
///     }
///     Ok(last)
/// }
/// ```
#[async_trait]
pub trait SyncCapable: Connector {
    /// Get the current position of the change feed without reading changes.
    ///
    /// Returns `None` if the target system reports no position.
    async fn latest_sync_token(
        &self,
        object_class: &ObjectClass,
    ) -> ConnectorResult<Option<SyncToken>>;

    /// Read every change since `from` (or every object when `from` is `None`).
    ///
    /// Either the whole batch is returned or an error; records are never
    /// handed out from a session that did not complete.
    async fn sync(
        &self,
        object_class: &ObjectClass,
        from: Option<&SyncToken>,
        selection: &AttributeSelection,
    ) -> ConnectorResult<SyncBatch>;
}
