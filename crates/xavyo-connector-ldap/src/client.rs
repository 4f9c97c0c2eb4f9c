//! LDAP wire client built on `ldap3`.
//!
//! Plain searches and modifies share one lazily opened, cached connection.
//! Every content-sync session gets a dedicated connection that is unbound
//! when the session is closed.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ldap3::controls::{
    parse_syncinfo, Control, ControlType, MakeCritical, RawControl, RefreshMode, SyncDone,
    SyncInfo, SyncState,
};
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry, SearchStream,
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use xavyo_connector::error::{ConnectorError, ConnectorResult};

use crate::config::LdapConfig;
use crate::directory::{
    DirectoryConnection, EntryState, Modification, ModificationKind, RawAttribute, RawEntry,
    SearchRequest, SearchScope, SyncNotification, SyncRequest, SyncSession, SyncSessionFactory,
};

/// LDAP result code for a missing entry.
const NO_SUCH_OBJECT: u32 = 32;

/// LDAP result code for bad credentials.
const INVALID_CREDENTIALS: u32 = 49;

/// Directory access over LDAP.
pub struct LdapDirectory {
    config: LdapConfig,

    /// Cached connection for plain operations (lazily initialized).
    connection: Arc<RwLock<Option<Ldap>>>,

    /// Whether the directory has been disposed.
    disposed: Arc<RwLock<bool>>,
}

impl LdapDirectory {
    pub fn new(config: LdapConfig) -> Self {
        Self {
            config,
            connection: Arc::new(RwLock::new(None)),
            disposed: Arc::new(RwLock::new(false)),
        }
    }

    async fn ensure_active(&self) -> ConnectorResult<()> {
        if *self.disposed.read().await {
            return Err(ConnectorError::InvalidConfiguration {
                message: "Connector has been disposed".to_string(),
            });
        }
        Ok(())
    }

    /// Get the shared connection, creating one if necessary.
    async fn get_connection(&self) -> ConnectorResult<Ldap> {
        self.ensure_active().await?;

        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let conn = self.connect().await?;
        *self.connection.write().await = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the shared connection so the next operation reconnects.
    async fn invalidate(&self) {
        self.connection.write().await.take();
    }

    /// Open and bind a new connection.
    async fn connect(&self) -> ConnectorResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connection.connection_timeout())
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {}", url),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if let (Some(bind_dn), Some(bind_password)) =
            (&self.config.bind_dn, &self.config.bind_password)
        {
            debug!(bind_dn = %bind_dn, "Performing LDAP bind");

            let result = ldap
                .simple_bind(bind_dn, bind_password)
                .await
                .map_err(|e| {
                    ConnectorError::connection_failed_with_source(
                        format!("LDAP bind failed for {}", bind_dn),
                        e,
                    )
                })?;

            if result.rc == INVALID_CREDENTIALS {
                return Err(ConnectorError::AuthenticationFailed);
            }
            if result.rc != 0 {
                return Err(ConnectorError::connection_failed(format!(
                    "LDAP bind failed with code {}: {}",
                    result.rc, result.text
                )));
            }
        }

        info!(host = %self.config.host, "LDAP connection established");
        Ok(ldap)
    }
}

fn scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn raw_entry(entry: SearchEntry) -> RawEntry {
    let mut attributes: Vec<RawAttribute> = entry
        .attrs
        .into_iter()
        .map(|(name, values)| RawAttribute::text(name, values))
        .chain(
            entry
                .bin_attrs
                .into_iter()
                .map(|(name, values)| RawAttribute::new(name, values)),
        )
        .collect();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));

    RawEntry {
        dn: entry.dn,
        attributes,
    }
}

/// Sync-state UUIDs are raw 16-byte values; render them like `entryUUID`.
fn format_entry_uuid(bytes: &[u8]) -> String {
    match Uuid::from_slice(bytes) {
        Ok(uuid) => uuid.to_string(),
        Err(_) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

fn completion_error(object_class: &str, context: &str, result: &LdapResult) -> ConnectorError {
    ConnectorError::sync_failed(
        object_class,
        format!(
            "content sync ({}) ended with code {}: {}",
            context, result.rc, result.text
        ),
    )
}

fn entry_state(state: ldap3::controls::EntryState) -> EntryState {
    match state {
        ldap3::controls::EntryState::Present => EntryState::Present,
        ldap3::controls::EntryState::Add => EntryState::Add,
        ldap3::controls::EntryState::Modify => EntryState::Modify,
        ldap3::controls::EntryState::Delete => EntryState::Delete,
    }
}

fn modification(modification: Modification) -> Mod<Vec<u8>> {
    let attribute = modification.attribute.into_bytes();
    let values: HashSet<Vec<u8>> = modification.values.into_iter().collect();
    match modification.kind {
        ModificationKind::Add => Mod::Add(attribute, values),
        ModificationKind::Delete => Mod::Delete(attribute, values),
        ModificationKind::Replace => Mod::Replace(attribute, values),
    }
}

#[async_trait]
impl DirectoryConnection for LdapDirectory {
    #[instrument(skip(self), fields(base = %request.base, filter = %request.filter))]
    async fn search(&self, request: &SearchRequest) -> ConnectorResult<Vec<RawEntry>> {
        let mut ldap = self.get_connection().await?;

        let result = match ldap
            .with_timeout(self.config.connection.read_timeout())
            .search(
                &request.base,
                scope(request.scope),
                &request.filter,
                request.attributes.clone(),
            )
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.invalidate().await;
                return Err(ConnectorError::search_failed_with_source(
                    &request.base,
                    &request.filter,
                    e,
                ));
            }
        };

        if result.1.rc == NO_SUCH_OBJECT {
            debug!("Search base does not exist");
            return Ok(Vec::new());
        }

        let (entries, _) = result.success().map_err(|e| {
            ConnectorError::search_failed_with_source(&request.base, &request.filter, e)
        })?;

        debug!(count = entries.len(), "Search completed");
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(raw_entry)
            .collect())
    }

    #[instrument(skip(self, modifications), fields(count = modifications.len()))]
    async fn modify(&self, dn: &str, modifications: Vec<Modification>) -> ConnectorResult<()> {
        if modifications.is_empty() {
            return Ok(());
        }
        let mut ldap = self.get_connection().await?;
        let mods: Vec<Mod<Vec<u8>>> = modifications.into_iter().map(modification).collect();

        let result = match ldap
            .with_timeout(self.config.connection.read_timeout())
            .modify(dn, mods)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.invalidate().await;
                return Err(ConnectorError::modify_failed_with_source(dn, e));
            }
        };

        if result.rc == NO_SUCH_OBJECT {
            return Err(ConnectorError::ObjectNotFound {
                identifier: dn.to_string(),
            });
        }
        result
            .success()
            .map_err(|e| ConnectorError::modify_failed_with_source(dn, e))?;

        info!(dn = %dn, "LDAP entry modified");
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        *self.disposed.write().await = true;

        let mut conn_guard = self.connection.write().await;
        if let Some(mut ldap) = conn_guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind");
            }
        }

        info!("LDAP directory disposed");
        Ok(())
    }
}

#[async_trait]
impl SyncSessionFactory for LdapDirectory {
    #[instrument(skip(self, request), fields(base = %request.base, filter = %request.filter))]
    async fn open(&self, request: &SyncRequest) -> ConnectorResult<Box<dyn SyncSession>> {
        self.ensure_active().await?;
        let mut ldap = self.connect().await?;

        let control = ldap3::controls::SyncRequest {
            mode: RefreshMode::RefreshOnly,
            cookie: request.cookie.clone(),
            reload_hint: false,
        };
        let controls: Vec<RawControl> = vec![control.critical().into()];

        let stream = ldap
            .with_controls(controls)
            .streaming_search(
                &request.base,
                Scope::Subtree,
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .map_err(|e| {
                ConnectorError::sync_failed_with_source(
                    request.object_class.to_string(),
                    format!(
                        "failed to start content sync under {} with {}",
                        request.base, request.filter
                    ),
                    e,
                )
            })?;

        debug!(resuming = request.cookie.is_some(), "Content sync session opened");
        Ok(Box::new(LdapSyncSession {
            ldap,
            stream,
            object_class: request.object_class.to_string(),
            context: format!("{} {}", request.base, request.filter),
            last_cookie: None,
            finished: false,
        }))
    }
}

/// A refresh-only content-sync search on its own connection.
struct LdapSyncSession {
    ldap: Ldap,
    stream: SearchStream<'static, String, Vec<String>>,
    object_class: String,
    /// Base and filter of the search, for error messages.
    context: String,
    /// Latest cookie seen in intermediate messages.
    last_cookie: Option<Vec<u8>>,
    finished: bool,
}

impl LdapSyncSession {
    fn remember(&mut self, cookie: Option<Vec<u8>>) {
        if cookie.is_some() {
            self.last_cookie = cookie;
        }
    }

    fn completion(&mut self, result: LdapResult) -> ConnectorResult<SyncNotification> {
        if result.rc != 0 {
            return Err(completion_error(&self.object_class, &self.context, &result));
        }

        let done = result
            .ctrls
            .into_iter()
            .find_map(|Control(kind, raw)| {
                matches!(kind, Some(ControlType::SyncDone)).then(|| raw.parse::<SyncDone>())
            });
        let cookie = done
            .and_then(|done| done.cookie)
            .or_else(|| self.last_cookie.take());
        Ok(SyncNotification::Done { cookie })
    }
}

#[async_trait]
impl SyncSession for LdapSyncSession {
    async fn next(&mut self) -> ConnectorResult<Option<SyncNotification>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let next = self.stream.next().await.map_err(|e| {
                ConnectorError::sync_failed_with_source(
                    &self.object_class,
                    format!("content sync ({}) failed", self.context),
                    e,
                )
            })?;

            let Some(mut entry) = next else {
                self.finished = true;
                let result = self.stream.finish().await;
                return self.completion(result).map(Some);
            };

            if entry.is_intermediate() {
                match parse_syncinfo(entry) {
                    SyncInfo::NewCookie(cookie) => self.remember(Some(cookie)),
                    SyncInfo::RefreshDelete { cookie, .. }
                    | SyncInfo::RefreshPresent { cookie, .. } => self.remember(cookie),
                    SyncInfo::SyncIdSet {
                        cookie, sync_uuids, ..
                    } => {
                        self.remember(cookie);
                        let entry_uuids: Vec<String> = sync_uuids
                            .iter()
                            .map(|uuid| format_entry_uuid(uuid))
                            .collect();
                        return Ok(Some(SyncNotification::IdSet { entry_uuids }));
                    }
                }
                continue;
            }

            if entry.is_ref() {
                continue;
            }

            let controls = std::mem::take(&mut entry.1);
            let state = controls.into_iter().find_map(|Control(kind, raw)| {
                matches!(kind, Some(ControlType::SyncState)).then(|| raw.parse::<SyncState>())
            });
            let Some(state) = state else {
                warn!("Entry without sync state control skipped");
                continue;
            };
            self.remember(state.cookie);

            return Ok(Some(SyncNotification::Entry {
                state: entry_state(state.state),
                entry_uuid: format_entry_uuid(&state.entry_uuid),
                entry: raw_entry(SearchEntry::construct(entry)),
            }));
        }
    }

    async fn close(&mut self) {
        self.finished = true;
        if let Err(e) = self.ldap.unbind().await {
            warn!(error = %e, "Error during LDAP unbind");
        }
    }
}
