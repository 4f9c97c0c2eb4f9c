//! Mapping between directory entries and identity objects.
//!
//! Reads turn a [`RawEntry`] into an [`IdentityObject`], writes turn identity
//! attributes into directory [`Modification`]s. Group membership is
//! represented in exactly one of two ways, chosen by
//! [`MembershipMode`]:
//!
//! | | reference mode | legacy mode |
//! |---|---|---|
//! | group members | `__MEMBERS__` (references) | member attribute (DN strings) |
//! | account groups | `__GROUPS__` (references) | `ldapGroups` (DN strings) |
//!
//! Account groups are not stored on the account; they are found by searching
//! for groups whose member attribute holds the account DN.

use std::collections::BTreeSet;

use xavyo_connector::diagnostics::{Diagnostic, Diagnostics};
use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::operation::{
    special, Attribute, AttributeDelta, AttributeSelection, AttributeValue, GuardedString,
    IdentityObject, ObjectClass, ObjectReference, Uid,
};

use crate::attributes::{AttributeNameTable, ResolvedAttribute, SpecialAttribute};
use crate::config::{AttributeMappingConfig, MembershipMode};
use crate::directory::{
    DirectoryConnection, Modification, ModificationKind, RawAttribute, RawEntry, SearchRequest,
    SearchScope, NO_ATTRIBUTES,
};
use crate::filter::{escape_filter_value, object_class_filter};

/// Group changes requested for an account, as group DNs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChanges {
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
    /// Complete desired set of groups, when the caller supplied one.
    pub replace: Option<BTreeSet<String>>,
}

impl MembershipChanges {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.replace.is_none()
    }
}

/// Per-group work needed to reach a desired set of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    pub add_to: BTreeSet<String>,
    pub remove_from: BTreeSet<String>,
}

impl MembershipPlan {
    /// Diff the current groups of an account against the requested changes.
    ///
    /// The desired set is `replace` (or the current set), plus `add`, minus
    /// `remove`.
    pub fn compute(current: &BTreeSet<String>, changes: &MembershipChanges) -> Self {
        let mut desired = changes.replace.clone().unwrap_or_else(|| current.clone());
        desired.extend(changes.add.iter().cloned());
        for group in &changes.remove {
            desired.remove(group);
        }

        Self {
            add_to: desired.difference(current).cloned().collect(),
            remove_from: current.difference(&desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add_to.is_empty() && self.remove_from.is_empty()
    }
}

/// Directory-side changes derived from identity attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
    /// Modifications of the object's own entry.
    pub modifications: Vec<Modification>,
    /// New password, applied outside plain modifications.
    pub password: Option<GuardedString>,
    /// Group changes of an account, applied on the group entries.
    pub groups: MembershipChanges,
    pub diagnostics: Diagnostics,
}

impl WritePlan {
    /// Attribute list for creating a new entry.
    pub fn attributes(&self) -> Vec<RawAttribute> {
        self.modifications
            .iter()
            .filter(|m| m.kind != ModificationKind::Delete && !m.values.is_empty())
            .map(|m| RawAttribute::new(m.attribute.clone(), m.values.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum ValueChange<'v> {
    Add(&'v [AttributeValue]),
    Remove(&'v [AttributeValue]),
    Replace(&'v [AttributeValue]),
}

impl<'v> ValueChange<'v> {
    fn values(self) -> &'v [AttributeValue] {
        match self {
            ValueChange::Add(v) | ValueChange::Remove(v) | ValueChange::Replace(v) => v,
        }
    }

    fn kind(self) -> ModificationKind {
        match self {
            ValueChange::Add(_) => ModificationKind::Add,
            ValueChange::Remove(_) => ModificationKind::Delete,
            ValueChange::Replace(_) => ModificationKind::Replace,
        }
    }
}

/// Projects entries and identity objects for one connector instance.
#[derive(Debug, Clone)]
pub struct AttributeProjector {
    names: AttributeNameTable,
}

impl AttributeProjector {
    pub fn new(mapping: &AttributeMappingConfig) -> Self {
        Self {
            names: AttributeNameTable::new(mapping),
        }
    }

    pub fn names(&self) -> &AttributeNameTable {
        &self.names
    }

    fn mapping(&self) -> &AttributeMappingConfig {
        self.names.mapping()
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Directory attributes to request for a selection.
    pub fn return_attributes(
        &self,
        object_class: &ObjectClass,
        selection: &AttributeSelection,
    ) -> Vec<String> {
        let Some(requested) = selection.names() else {
            return vec!["*".to_string(), "+".to_string()];
        };

        let mut attributes = Vec::new();
        for name in requested {
            match self.names.resolve(name) {
                ResolvedAttribute::Directory(directory) => push_unique(&mut attributes, directory),
                ResolvedAttribute::Special(SpecialAttribute::Password) => {
                    push_unique(&mut attributes, &self.mapping().password_attribute);
                }
                ResolvedAttribute::Special(SpecialAttribute::Members(_)) => {
                    push_unique(&mut attributes, &self.mapping().group_member_attribute);
                }
                ResolvedAttribute::Special(_) | ResolvedAttribute::Unmapped => {}
            }
        }

        let id_attribute = self.names.id_attribute(object_class);
        if !AttributeNameTable::is_entry_path(id_attribute) {
            push_unique(&mut attributes, id_attribute);
        }

        if attributes.is_empty() {
            attributes.push(NO_ATTRIBUTES.to_string());
        }
        attributes
    }

    /// Build the identity object for a directory entry.
    ///
    /// Fails with `InvalidData` when the entry carries no id value. Names
    /// without a directory counterpart are dropped and reported in
    /// `diagnostics`.
    pub fn project(
        &self,
        object_class: &ObjectClass,
        entry: RawEntry,
        selection: &AttributeSelection,
        diagnostics: &mut Diagnostics,
    ) -> ConnectorResult<IdentityObject> {
        let id_attribute = self.names.id_attribute(object_class);
        let uid_value = if AttributeNameTable::is_entry_path(id_attribute) {
            Some(entry.dn.clone())
        } else {
            entry.get(id_attribute).and_then(|a| self.id_value(a))
        };
        let uid_value = uid_value.ok_or_else(|| {
            ConnectorError::invalid_data(format!(
                "entry {} has no value for id attribute {}",
                entry.dn, id_attribute
            ))
        })?;

        let uid = Uid::new(id_attribute, uid_value);
        Ok(self.project_with_uid(object_class, entry, selection, uid, diagnostics))
    }

    /// Like [`project`](Self::project), with the id chosen by the caller.
    pub fn project_with_uid(
        &self,
        object_class: &ObjectClass,
        entry: RawEntry,
        selection: &AttributeSelection,
        uid: Uid,
        diagnostics: &mut Diagnostics,
    ) -> IdentityObject {
        let wanted = self.read_names(selection, diagnostics);
        let mut object = IdentityObject::new(object_class.clone(), uid, entry.dn.clone());

        for raw in entry.attributes {
            let Some(attribute) = self.read_attribute(raw, diagnostics) else {
                continue;
            };
            if let Some(wanted) = &wanted {
                if !wanted.iter().any(|w| attribute.is_named(w)) {
                    continue;
                }
            }
            object.attributes.set(attribute);
        }

        // Requested but absent attributes are reported present-but-empty.
        if let Some(wanted) = wanted {
            for name in wanted {
                if !object.attributes.has(&name) {
                    object.attributes.set(Attribute::empty(name));
                }
            }
        }

        object
    }

    fn id_value(&self, attribute: &RawAttribute) -> Option<String> {
        let value = attribute.values.first()?;
        if self.mapping().is_binary(&attribute.name) {
            Some(value.iter().map(|b| format!("{b:02x}")).collect())
        } else {
            Some(String::from_utf8_lossy(value).into_owned())
        }
    }

    /// Identity names the projector emits for a selection; `None` for all.
    ///
    /// Names are those of the active membership mode, so requesting either
    /// members name yields a single attribute.
    fn read_names(
        &self,
        selection: &AttributeSelection,
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<String>> {
        let requested = selection.names()?;
        let mut names = Vec::new();
        for name in requested {
            match self.names.resolve(name) {
                ResolvedAttribute::Directory(directory) => push_unique(&mut names, directory),
                ResolvedAttribute::Special(SpecialAttribute::Password) => {
                    push_unique(&mut names, special::PASSWORD);
                }
                ResolvedAttribute::Special(SpecialAttribute::Members(_)) => {
                    push_unique(&mut names, self.names.members_attribute());
                }
                ResolvedAttribute::Unmapped => diagnostics.push(Diagnostic::UnresolvedAttribute {
                    attribute: name.to_string(),
                }),
                ResolvedAttribute::Special(_) => {}
            }
        }
        Some(names)
    }

    fn read_attribute(&self, raw: RawAttribute, diagnostics: &mut Diagnostics) -> Option<Attribute> {
        match self.names.resolve(&raw.name) {
            ResolvedAttribute::Special(SpecialAttribute::Password) => {
                let values = raw
                    .text_values()
                    .map(|v| AttributeValue::Password(GuardedString::new(v)))
                    .collect();
                Some(Attribute::new(special::PASSWORD, values))
            }
            ResolvedAttribute::Special(SpecialAttribute::Members(_)) => {
                let attribute = match self.names.mode() {
                    MembershipMode::Legacy => Attribute::new(
                        raw.name.clone(),
                        raw.text_values().map(AttributeValue::String).collect(),
                    ),
                    MembershipMode::Reference => Attribute::new(
                        special::MEMBERS,
                        raw.text_values()
                            .map(|dn| {
                                AttributeValue::Reference(ObjectReference::new(
                                    ObjectClass::Account,
                                    dn,
                                ))
                            })
                            .collect(),
                    ),
                };
                Some(attribute)
            }
            // Derived names are never read from an entry.
            ResolvedAttribute::Special(
                SpecialAttribute::Groups(_) | SpecialAttribute::SyncCookie | SpecialAttribute::Uid,
            ) => None,
            ResolvedAttribute::Unmapped => {
                diagnostics.push(Diagnostic::UnresolvedAttribute {
                    attribute: raw.name,
                });
                None
            }
            ResolvedAttribute::Special(SpecialAttribute::Name) | ResolvedAttribute::Directory(_) => {
                let binary = self.mapping().is_binary(&raw.name);
                let RawAttribute { name, values } = raw;
                let values = values
                    .into_iter()
                    .map(|bytes| {
                        if binary {
                            AttributeValue::Binary(bytes)
                        } else {
                            match String::from_utf8(bytes) {
                                Ok(text) => AttributeValue::String(text),
                                Err(err) => AttributeValue::Binary(err.into_bytes()),
                            }
                        }
                    })
                    .collect();
                Some(Attribute::new(name, values))
            }
        }
    }

    // =========================================================================
    // Group back-references
    // =========================================================================

    /// Whether objects of this class need their groups looked up.
    pub fn wants_groups(&self, object_class: &ObjectClass, selection: &AttributeSelection) -> bool {
        self.names.is_account(object_class) && selection.includes(self.names.groups_attribute())
    }

    /// Search for the groups listing `member_dn` as a member.
    pub fn group_lookup_request(&self, base_dn: &str, member_dn: &str) -> SearchRequest {
        let filter = format!(
            "(&{}({}={}))",
            object_class_filter(&self.mapping().group_object_class),
            self.mapping().group_member_attribute,
            escape_filter_value(member_dn)
        );
        SearchRequest::dns_only(base_dn, SearchScope::Subtree, filter)
    }

    /// Attach group DNs to an account in the active representation.
    pub fn attach_groups(&self, object: &mut IdentityObject, group_dns: Vec<String>) {
        let values = group_dns
            .into_iter()
            .map(|dn| match self.names.mode() {
                MembershipMode::Legacy => AttributeValue::String(dn),
                MembershipMode::Reference => {
                    AttributeValue::Reference(ObjectReference::new(ObjectClass::Group, dn))
                }
            })
            .collect();
        object
            .attributes
            .set(Attribute::new(self.names.groups_attribute(), values));
    }

    /// Look up and attach the groups of an account. A failed lookup leaves
    /// the object without groups and is reported as a diagnostic.
    pub async fn enrich_groups(
        &self,
        directory: &dyn DirectoryConnection,
        base_dn: &str,
        object: &mut IdentityObject,
        diagnostics: &mut Diagnostics,
    ) {
        let request = self.group_lookup_request(base_dn, &object.name);
        match directory.search(&request).await {
            Ok(groups) => {
                self.attach_groups(object, groups.into_iter().map(|group| group.dn).collect());
            }
            Err(err) => diagnostics.push(Diagnostic::GroupLookupFailed {
                dn: object.name.clone(),
                message: err.to_string(),
            }),
        }
    }

    /// Modifications of group entries that carry out a membership plan.
    pub fn group_modifications(
        &self,
        member_dn: &str,
        plan: &MembershipPlan,
    ) -> Vec<(String, Modification)> {
        let member_attribute = &self.mapping().group_member_attribute;
        let value = || vec![member_dn.as_bytes().to_vec()];

        let added = plan
            .add_to
            .iter()
            .map(|group| (group.clone(), Modification::add(member_attribute, value())));
        let removed = plan
            .remove_from
            .iter()
            .map(|group| (group.clone(), Modification::delete(member_attribute, value())));
        added.chain(removed).collect()
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Directory changes for a complete object. Every attribute replaces
    /// its directory counterpart; the id and name are left to the caller.
    pub fn unproject(&self, object: &IdentityObject) -> WritePlan {
        let mut plan = WritePlan::default();
        for attribute in object.attributes.iter() {
            self.apply(
                &object.object_class,
                attribute.name(),
                ValueChange::Replace(attribute.values()),
                &mut plan,
            );
        }
        plan
    }

    /// Directory changes for per-attribute deltas.
    pub fn unproject_delta(&self, object_class: &ObjectClass, deltas: &[AttributeDelta]) -> WritePlan {
        let mut plan = WritePlan::default();
        for delta in deltas {
            if let Some(values) = &delta.values_to_replace {
                self.apply(object_class, &delta.name, ValueChange::Replace(values), &mut plan);
            }
            if !delta.values_to_add.is_empty() {
                self.apply(
                    object_class,
                    &delta.name,
                    ValueChange::Add(&delta.values_to_add),
                    &mut plan,
                );
            }
            if !delta.values_to_remove.is_empty() {
                self.apply(
                    object_class,
                    &delta.name,
                    ValueChange::Remove(&delta.values_to_remove),
                    &mut plan,
                );
            }
        }
        plan
    }

    fn apply(
        &self,
        object_class: &ObjectClass,
        name: &str,
        change: ValueChange<'_>,
        plan: &mut WritePlan,
    ) {
        match self.names.resolve(name) {
            ResolvedAttribute::Special(SpecialAttribute::Uid | SpecialAttribute::Name) => {}
            ResolvedAttribute::Special(SpecialAttribute::SyncCookie) | ResolvedAttribute::Unmapped => {
                plan.diagnostics.push(Diagnostic::UnresolvedAttribute {
                    attribute: name.to_string(),
                });
            }
            ResolvedAttribute::Special(SpecialAttribute::Password) => {
                if let ValueChange::Add(values) | ValueChange::Replace(values) = change {
                    plan.password = values.iter().find_map(|value| match value {
                        AttributeValue::Password(secret) => Some(secret.clone()),
                        AttributeValue::String(text) => Some(GuardedString::new(text.clone())),
                        _ => None,
                    });
                }
            }
            ResolvedAttribute::Special(SpecialAttribute::Groups(mode)) => {
                if !self.check_mode(name, mode, plan) {
                    return;
                }
                if !self.names.is_account(object_class) {
                    Self::not_applicable(name, object_class, plan);
                    return;
                }
                let dns: BTreeSet<String> = membership_dns(change.values()).collect();
                match change {
                    ValueChange::Add(_) => plan.groups.add.extend(dns),
                    ValueChange::Remove(_) => plan.groups.remove.extend(dns),
                    ValueChange::Replace(_) => plan.groups.replace = Some(dns),
                }
            }
            ResolvedAttribute::Special(SpecialAttribute::Members(mode)) => {
                if !self.check_mode(name, mode, plan) {
                    return;
                }
                if !self.names.is_group(object_class) {
                    Self::not_applicable(name, object_class, plan);
                    return;
                }
                plan.modifications.push(Modification {
                    kind: change.kind(),
                    attribute: self.mapping().group_member_attribute.clone(),
                    values: membership_dns(change.values())
                        .map(String::into_bytes)
                        .collect(),
                });
            }
            ResolvedAttribute::Directory(directory) => {
                plan.modifications.push(Modification {
                    kind: change.kind(),
                    attribute: directory.to_string(),
                    values: change.values().iter().filter_map(value_bytes).collect(),
                });
            }
        }
    }

    fn check_mode(&self, name: &str, mode: MembershipMode, plan: &mut WritePlan) -> bool {
        if mode == self.names.mode() {
            return true;
        }
        plan.diagnostics.push(Diagnostic::ModeConflict {
            attribute: name.to_string(),
            mode: self.names.mode().to_string(),
        });
        false
    }

    fn not_applicable(name: &str, object_class: &ObjectClass, plan: &mut WritePlan) {
        plan.diagnostics.push(Diagnostic::AttributeNotApplicable {
            attribute: name.to_string(),
            object_class: object_class.to_string(),
        });
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        names.push(name.to_string());
    }
}

fn membership_dns(values: &[AttributeValue]) -> impl Iterator<Item = String> + '_ {
    values.iter().filter_map(|value| match value {
        AttributeValue::String(dn) => Some(dn.clone()),
        AttributeValue::Reference(reference) => Some(reference.name.clone()),
        _ => None,
    })
}

fn value_bytes(value: &AttributeValue) -> Option<Vec<u8>> {
    match value {
        AttributeValue::Binary(bytes) => Some(bytes.clone()),
        other => other.to_text().map(String::into_bytes),
    }
}
