//! Change-feed synchronization over the LDAP Content Synchronization
//! operation (RFC 4533), refresh-only mode.
//!
//! Each call opens its own session, reads it to completion and closes it.
//! Entries reported as added or modified become upserts. Deletions are
//! only ever announced as id sets ("these ids may be gone"), so every id
//! is checked against the live directory and reported as deleted when the
//! check finds nothing. The directory reports its new position once, at
//! the end of the session; every record of a batch carries that position.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, info, instrument, warn};

use xavyo_connector::diagnostics::{Diagnostic, Diagnostics};
use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::operation::{AttributeSelection, ObjectClass, Uid};
use xavyo_connector::traits::{SyncBatch, SyncDelta, SyncRecord, SyncToken};

use crate::attributes::ENTRY_UUID_ATTRIBUTE;
use crate::directory::{
    DirectoryConnection, EntryState, SearchRequest, SearchScope, SyncNotification, SyncRequest,
    SyncSession, SyncSessionFactory, NO_ATTRIBUTES,
};
use crate::filter::{escape_filter_value, object_class_filter};
use crate::projection::AttributeProjector;

/// Position in the directory's change log, as issued by the directory.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncCookie(Vec<u8>);

impl SyncCookie {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Printable form handed to callers.
    pub fn to_token(&self) -> SyncToken {
        SyncToken::new(STANDARD.encode(&self.0))
    }

    /// Decode a token issued by [`to_token`](Self::to_token).
    pub fn from_token(token: &SyncToken) -> ConnectorResult<Self> {
        STANDARD
            .decode(token.as_str())
            .map(Self)
            .map_err(|e| ConnectorError::invalid_data(format!("malformed sync token: {e}")))
    }
}

impl std::fmt::Debug for SyncCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SyncCookie")
            .field(&STANDARD.encode(&self.0))
            .finish()
    }
}

struct Consumed {
    deltas: Vec<SyncDelta>,
    cookie: Option<Vec<u8>>,
    diagnostics: Diagnostics,
}

/// Reads the change feed of one directory.
pub struct Synchronizer {
    directory: Arc<dyn DirectoryConnection>,
    sessions: Arc<dyn SyncSessionFactory>,
    projector: Arc<AttributeProjector>,
    base_dn: String,
}

impl Synchronizer {
    /// `directory` serves existence checks and group lookups, `sessions`
    /// opens the change-feed sessions.
    pub fn new(
        directory: Arc<dyn DirectoryConnection>,
        sessions: Arc<dyn SyncSessionFactory>,
        projector: Arc<AttributeProjector>,
        base_dn: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            sessions,
            projector,
            base_dn: base_dn.into(),
        }
    }

    fn class_filter(&self, object_class: &ObjectClass) -> String {
        object_class_filter(self.projector.names().directory_object_class(object_class))
    }

    /// Current position of the feed, without reading any changes.
    #[instrument(skip(self))]
    pub async fn latest_position(
        &self,
        object_class: &ObjectClass,
    ) -> ConnectorResult<Option<SyncToken>> {
        let request = SyncRequest {
            object_class: object_class.clone(),
            base: self.base_dn.clone(),
            filter: self.class_filter(object_class),
            attributes: vec![NO_ATTRIBUTES.to_string()],
            cookie: None,
        };

        let mut session = self.sessions.open(&request).await?;
        let outcome = Self::read_until_done(session.as_mut(), object_class).await;
        session.close().await;

        let cookie = outcome.map_err(|e| {
            warn!(error = %e, "Sync session failed");
            e
        })?;
        let token = cookie.map(|c| SyncCookie::new(c).to_token());
        debug!(token = ?token, "Read latest sync position");
        Ok(token)
    }

    async fn read_until_done(
        session: &mut dyn SyncSession,
        object_class: &ObjectClass,
    ) -> ConnectorResult<Option<Vec<u8>>> {
        while let Some(notification) = session.next().await? {
            if let SyncNotification::Done { cookie } = notification {
                return Ok(cookie);
            }
        }
        Err(ConnectorError::sync_failed(
            object_class.to_string(),
            "session ended without completion",
        ))
    }

    /// Every change since `from`, or every object when `from` is `None`.
    ///
    /// All records share the position reported when the session completed.
    /// When the directory reports none, `from` is kept.
    #[instrument(skip(self, selection))]
    pub async fn sync(
        &self,
        object_class: &ObjectClass,
        from: Option<&SyncToken>,
        selection: &AttributeSelection,
    ) -> ConnectorResult<SyncBatch> {
        let incoming = from
            .map(SyncCookie::from_token)
            .transpose()?
            .filter(|cookie| !cookie.is_empty());

        let request = SyncRequest {
            object_class: object_class.clone(),
            base: self.base_dn.clone(),
            filter: self.class_filter(object_class),
            attributes: self.projector.return_attributes(object_class, selection),
            cookie: incoming.as_ref().map(|c| c.as_bytes().to_vec()),
        };

        let mut session = self.sessions.open(&request).await?;
        let outcome = self
            .consume(session.as_mut(), object_class, selection)
            .await;
        session.close().await;

        let Consumed {
            deltas,
            cookie,
            diagnostics,
        } = outcome.map_err(|e| {
            warn!(error = %e, "Sync session failed");
            e
        })?;

        let token = cookie
            .map(SyncCookie::new)
            .or(incoming)
            .map(|cookie| cookie.to_token());
        let records: Vec<SyncRecord> = deltas
            .into_iter()
            .map(|delta| SyncRecord {
                delta,
                token: token.clone(),
            })
            .collect();

        info!(
            records = records.len(),
            diagnostics = diagnostics.len(),
            "Sync completed"
        );
        Ok(SyncBatch::new(records, token, diagnostics))
    }

    async fn consume(
        &self,
        session: &mut dyn SyncSession,
        object_class: &ObjectClass,
        selection: &AttributeSelection,
    ) -> ConnectorResult<Consumed> {
        let wants_groups = self.projector.wants_groups(object_class, selection);
        let mut deltas = Vec::new();
        let mut diagnostics = Diagnostics::new();

        while let Some(notification) = session.next().await? {
            match notification {
                SyncNotification::Entry {
                    state: EntryState::Add | EntryState::Modify,
                    entry_uuid,
                    entry,
                } => {
                    // Sync records are keyed on the sync-state entry UUID, like deletes.
                    let uid = Uid::new(ENTRY_UUID_ATTRIBUTE, entry_uuid);
                    let mut object = self.projector.project_with_uid(
                        object_class,
                        entry,
                        selection,
                        uid,
                        &mut diagnostics,
                    );
                    if wants_groups {
                        self.projector
                            .enrich_groups(
                                self.directory.as_ref(),
                                &self.base_dn,
                                &mut object,
                                &mut diagnostics,
                            )
                            .await;
                    }
                    deltas.push(SyncDelta::Upsert(object));
                }
                SyncNotification::Entry {
                    state, entry_uuid, ..
                } => {
                    diagnostics.push(Diagnostic::UnsupportedSyncState {
                        entry_uuid,
                        state: state.to_string(),
                    });
                }
                SyncNotification::IdSet { entry_uuids } => {
                    for entry_uuid in entry_uuids {
                        if self.is_deleted(&entry_uuid).await? {
                            deltas.push(SyncDelta::Delete {
                                object_class: object_class.clone(),
                                uid: Uid::new(ENTRY_UUID_ATTRIBUTE, entry_uuid.clone()),
                                name: entry_uuid,
                            });
                        }
                    }
                }
                SyncNotification::Done { cookie } => {
                    return Ok(Consumed {
                        deltas,
                        cookie,
                        diagnostics,
                    });
                }
            }
        }

        Err(ConnectorError::sync_failed(
            object_class.to_string(),
            "session ended without completion",
        ))
    }

    /// Check the live directory for an entry id.
    async fn is_deleted(&self, entry_uuid: &str) -> ConnectorResult<bool> {
        let request = SearchRequest::dns_only(
            &self.base_dn,
            SearchScope::Subtree,
            format!(
                "({}={})",
                ENTRY_UUID_ATTRIBUTE,
                escape_filter_value(entry_uuid)
            ),
        );
        let found = self.directory.search(&request).await?;
        debug!(entry_uuid, deleted = found.is_empty(), "Checked entry existence");
        Ok(found.is_empty())
    }
}
