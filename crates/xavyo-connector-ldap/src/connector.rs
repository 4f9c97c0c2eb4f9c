//! LDAP Connector implementation
//!
//! Implements the connector capabilities on top of the filter translator,
//! the attribute projector and the change-feed synchronizer.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use xavyo_connector::config::ConnectorConfig;
use xavyo_connector::diagnostics::{Diagnostic, Diagnostics};
use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::operation::{
    AttributeDelta, AttributeSelection, Filter, IdentityObject, ObjectClass, SearchResult,
};
use xavyo_connector::traits::{Connector, SearchOp, SyncBatch, SyncCapable, SyncToken};

use crate::client::LdapDirectory;
use crate::config::LdapConfig;
use crate::directory::{
    DirectoryConnection, SearchRequest, SearchScope, SyncSessionFactory,
};
use crate::filter::{object_class_filter, search_filter, FilterTranslator, Translation};
use crate::projection::{AttributeProjector, MembershipPlan, WritePlan};
use crate::sync::Synchronizer;

/// LDAP Connector for reading, updating and synchronizing directory entries.
pub struct LdapConnector {
    /// Display name for this connector instance.
    display_name: String,

    base_dn: String,

    projector: Arc<AttributeProjector>,

    directory: Arc<dyn DirectoryConnection>,

    synchronizer: Synchronizer,
}

impl LdapConnector {
    /// Create a new LDAP connector with the given configuration.
    pub fn new(config: LdapConfig) -> ConnectorResult<Self> {
        let directory = Arc::new(LdapDirectory::new(config.clone()));
        Self::with_capabilities(config, directory.clone(), directory)
    }

    /// Create a connector over caller-supplied directory access.
    pub fn with_capabilities(
        config: LdapConfig,
        directory: Arc<dyn DirectoryConnection>,
        sessions: Arc<dyn SyncSessionFactory>,
    ) -> ConnectorResult<Self> {
        config.validate()?;

        let projector = Arc::new(AttributeProjector::new(&config.mapping));
        let synchronizer = Synchronizer::new(
            Arc::clone(&directory),
            sessions,
            Arc::clone(&projector),
            config.base_dn.clone(),
        );

        Ok(Self {
            display_name: format!("LDAP: {}", config.host),
            base_dn: config.base_dn,
            projector,
            directory,
            synchronizer,
        })
    }

    pub fn projector(&self) -> &AttributeProjector {
        &self.projector
    }

    /// Translate a predicate on objects of `object_class` to an LDAP filter.
    pub fn translate(
        &self,
        object_class: &ObjectClass,
        filter: &Filter,
    ) -> ConnectorResult<Translation> {
        FilterTranslator::new(self.projector.names(), object_class).translate(filter)
    }

    fn search_request(
        &self,
        object_class: &ObjectClass,
        translation: &Translation,
        selection: &AttributeSelection,
    ) -> SearchRequest {
        let class = self.projector.names().directory_object_class(object_class);
        let attributes = self.projector.return_attributes(object_class, selection);

        match &translation.filter {
            Some(native) => {
                let filter = search_filter(class, native.native());
                match native.entry_dn() {
                    Some(dn) => SearchRequest::new(dn, SearchScope::Base, filter, attributes),
                    None => {
                        SearchRequest::new(&self.base_dn, SearchScope::Subtree, filter, attributes)
                    }
                }
            }
            None => SearchRequest::new(
                &self.base_dn,
                SearchScope::Subtree,
                object_class_filter(class),
                attributes,
            ),
        }
    }

    /// Search and return the non-fatal conditions next to the result.
    ///
    /// Parts of `filter` that cannot be pushed down are dropped, so the
    /// result may contain objects the caller still has to filter out.
    #[instrument(skip(self, filter, selection))]
    pub async fn search_objects(
        &self,
        object_class: &ObjectClass,
        filter: Option<&Filter>,
        selection: &AttributeSelection,
    ) -> ConnectorResult<(SearchResult, Diagnostics)> {
        let translation = match filter {
            Some(filter) => self.translate(object_class, filter)?,
            None => Translation::default(),
        };
        let request = self.search_request(object_class, &translation, selection);
        let mut diagnostics = translation.diagnostics;

        debug!(
            base = %request.base,
            scope = ?request.scope,
            filter = %request.filter,
            "Searching LDAP"
        );

        let entries = self.directory.search(&request).await?;
        let wants_groups = self.projector.wants_groups(object_class, selection);

        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut object =
                self.projector
                    .project(object_class, entry, selection, &mut diagnostics)?;
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
            objects.push(object);
        }

        info!(count = objects.len(), "LDAP search completed");
        Ok((SearchResult::new(objects), diagnostics))
    }

    /// DNs of the groups that list `member_dn` as a member.
    pub async fn current_groups(&self, member_dn: &str) -> ConnectorResult<BTreeSet<String>> {
        let request = self.projector.group_lookup_request(&self.base_dn, member_dn);
        let groups = self.directory.search(&request).await?;
        Ok(groups.into_iter().map(|group| group.dn).collect())
    }

    /// Add `member_dn` to, and remove it from, the planned groups.
    pub async fn apply_membership_plan(
        &self,
        member_dn: &str,
        plan: &MembershipPlan,
    ) -> ConnectorResult<()> {
        for (group_dn, modification) in self.projector.group_modifications(member_dn, plan) {
            debug!(group = %group_dn, member = %member_dn, kind = ?modification.kind, "Updating group membership");
            self.directory.modify(&group_dn, vec![modification]).await?;
        }
        Ok(())
    }

    /// Replace the attributes of an existing entry with those of `object`.
    #[instrument(skip(self, object), fields(dn = %object.name))]
    pub async fn update_object(&self, object: &IdentityObject) -> ConnectorResult<Diagnostics> {
        let plan = self.projector.unproject(object);
        self.apply_write_plan(&object.name, plan).await
    }

    /// Apply attribute deltas to the entry at `dn`.
    #[instrument(skip(self, deltas))]
    pub async fn update(
        &self,
        object_class: &ObjectClass,
        dn: &str,
        deltas: &[AttributeDelta],
    ) -> ConnectorResult<Diagnostics> {
        let plan = self.projector.unproject_delta(object_class, deltas);
        self.apply_write_plan(dn, plan).await
    }

    async fn apply_write_plan(&self, dn: &str, plan: WritePlan) -> ConnectorResult<Diagnostics> {
        let WritePlan {
            modifications,
            password,
            groups,
            mut diagnostics,
        } = plan;

        // Passwords go through the password-change operation, never a plain modify.
        if password.is_some() {
            diagnostics.push(Diagnostic::PasswordNotApplied { dn: dn.to_string() });
        }
        self.directory.modify(dn, modifications).await?;

        if !groups.is_empty() {
            let current = self.current_groups(dn).await?;
            let membership = MembershipPlan::compute(&current, &groups);
            self.apply_membership_plan(dn, &membership).await?;
        }

        diagnostics.log("update");
        info!(dn = %dn, "LDAP entry updated");
        Ok(diagnostics)
    }
}

#[async_trait]
impl Connector for LdapConnector {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        let request = SearchRequest::dns_only(&self.base_dn, SearchScope::Base, "(objectClass=*)");
        let entries = self.directory.search(&request).await.map_err(|e| {
            ConnectorError::connection_failed_with_source("Test search failed", e)
        })?;

        if entries.is_empty() {
            return Err(ConnectorError::connection_failed(format!(
                "Base DN '{}' not found or not accessible",
                self.base_dn
            )));
        }

        info!("LDAP connection test successful");
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        self.directory.dispose().await?;
        info!("LDAP connector disposed");
        Ok(())
    }
}

#[async_trait]
impl SearchOp for LdapConnector {
    async fn search(
        &self,
        object_class: &ObjectClass,
        filter: Option<&Filter>,
        selection: &AttributeSelection,
    ) -> ConnectorResult<SearchResult> {
        let (result, diagnostics) = self.search_objects(object_class, filter, selection).await?;
        diagnostics.log("search");
        Ok(result)
    }
}

#[async_trait]
impl SyncCapable for LdapConnector {
    async fn latest_sync_token(
        &self,
        object_class: &ObjectClass,
    ) -> ConnectorResult<Option<SyncToken>> {
        self.synchronizer.latest_position(object_class).await
    }

    async fn sync(
        &self,
        object_class: &ObjectClass,
        from: Option<&SyncToken>,
        selection: &AttributeSelection,
    ) -> ConnectorResult<SyncBatch> {
        let batch = self.synchronizer.sync(object_class, from, selection).await?;
        batch.diagnostics().log("sync");
        Ok(batch)
    }
}
