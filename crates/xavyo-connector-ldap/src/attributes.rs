//! Identity-to-directory attribute name resolution.
//!
//! The table is built once per connector from [`AttributeMappingConfig`] and
//! answers every "what is this name" question for the translator and the
//! projector.

use std::collections::HashMap;

use xavyo_connector::operation::{special, ObjectClass};

use crate::config::{AttributeMappingConfig, MembershipMode};

/// Derived attribute listing an account's groups as entry-path strings.
pub const LEGACY_GROUPS_ATTRIBUTE: &str = "ldapGroups";

/// Operational attribute exposing an entry's DN.
pub const ENTRY_DN_ATTRIBUTE: &str = "entryDN";

/// Operational attribute carrying the directory's stable entry id.
pub const ENTRY_UUID_ATTRIBUTE: &str = "entryUUID";

/// Identity name reserved for the change-feed position.
pub const SYNC_COOKIE_ATTRIBUTE: &str = "__SYNCREPL_COOKIE__";

/// Directory names that denote the entry path itself.
const ENTRY_PATH_ATTRIBUTES: [&str; 3] = [ENTRY_DN_ATTRIBUTE, "dn", "distinguishedName"];

/// An identity name with connector-defined meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialAttribute {
    Uid,
    Name,
    Password,
    /// Group members, in the given representation.
    Members(MembershipMode),
    /// Groups of an account, in the given representation.
    Groups(MembershipMode),
    SyncCookie,
}

/// Outcome of resolving an identity attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAttribute<'a> {
    Special(SpecialAttribute),
    /// Ordinary attribute, same name in the directory.
    Directory(&'a str),
    /// Special name with no directory counterpart.
    Unmapped,
}

/// Name lookup table for one connector instance.
#[derive(Debug, Clone)]
pub struct AttributeNameTable {
    mapping: AttributeMappingConfig,
    specials: HashMap<String, SpecialAttribute>,
}

impl AttributeNameTable {
    pub fn new(mapping: &AttributeMappingConfig) -> Self {
        let mut specials = HashMap::new();
        let mut register = |name: &str, attribute: SpecialAttribute| {
            specials.insert(name.to_ascii_lowercase(), attribute);
        };

        register(special::UID, SpecialAttribute::Uid);
        register(special::NAME, SpecialAttribute::Name);
        for name in ENTRY_PATH_ATTRIBUTES {
            register(name, SpecialAttribute::Name);
        }
        register(special::PASSWORD, SpecialAttribute::Password);
        register(&mapping.password_attribute, SpecialAttribute::Password);
        register(
            special::MEMBERS,
            SpecialAttribute::Members(MembershipMode::Reference),
        );
        register(
            &mapping.group_member_attribute,
            SpecialAttribute::Members(MembershipMode::Legacy),
        );
        register(
            special::GROUPS,
            SpecialAttribute::Groups(MembershipMode::Reference),
        );
        register(
            LEGACY_GROUPS_ATTRIBUTE,
            SpecialAttribute::Groups(MembershipMode::Legacy),
        );
        register(SYNC_COOKIE_ATTRIBUTE, SpecialAttribute::SyncCookie);

        Self {
            mapping: mapping.clone(),
            specials,
        }
    }

    pub fn mapping(&self) -> &AttributeMappingConfig {
        &self.mapping
    }

    pub fn mode(&self) -> MembershipMode {
        self.mapping.membership_mode
    }

    /// Resolve an identity attribute name (case-insensitive).
    pub fn resolve<'a>(&self, name: &'a str) -> ResolvedAttribute<'a> {
        if let Some(attribute) = self.specials.get(&name.to_ascii_lowercase()) {
            return ResolvedAttribute::Special(*attribute);
        }
        if special::is_special(name) {
            ResolvedAttribute::Unmapped
        } else {
            ResolvedAttribute::Directory(name)
        }
    }

    /// Whether a directory attribute name denotes the entry path.
    pub fn is_entry_path(name: &str) -> bool {
        ENTRY_PATH_ATTRIBUTES
            .iter()
            .any(|path| path.eq_ignore_ascii_case(name))
    }

    /// Directory object class for an identity object class.
    pub fn directory_object_class<'a>(&'a self, object_class: &'a ObjectClass) -> &'a str {
        match object_class {
            ObjectClass::Account => &self.mapping.account_object_class,
            ObjectClass::Group => &self.mapping.group_object_class,
            ObjectClass::Other(name) => name,
        }
    }

    pub fn is_account(&self, object_class: &ObjectClass) -> bool {
        match object_class {
            ObjectClass::Account => true,
            ObjectClass::Group => false,
            ObjectClass::Other(name) => name.eq_ignore_ascii_case(&self.mapping.account_object_class),
        }
    }

    pub fn is_group(&self, object_class: &ObjectClass) -> bool {
        match object_class {
            ObjectClass::Group => true,
            ObjectClass::Account => false,
            ObjectClass::Other(name) => name.eq_ignore_ascii_case(&self.mapping.group_object_class),
        }
    }

    /// Id attribute for an object class.
    pub fn id_attribute(&self, object_class: &ObjectClass) -> &str {
        if self.is_account(object_class) {
            &self.mapping.uid_attribute
        } else if self.is_group(object_class) {
            &self.mapping.gid_attribute
        } else {
            &self.mapping.aid_attribute
        }
    }

    /// Directory attribute a filter leaf on `name` should test, or `None`
    /// when the name cannot be pushed down.
    pub fn filter_attribute<'a>(
        &'a self,
        object_class: &ObjectClass,
        name: &'a str,
    ) -> Option<&'a str> {
        match self.resolve(name) {
            ResolvedAttribute::Directory(directory) => Some(directory),
            ResolvedAttribute::Special(SpecialAttribute::Uid) => {
                Some(self.id_attribute(object_class))
            }
            ResolvedAttribute::Special(SpecialAttribute::Name) => Some(ENTRY_DN_ATTRIBUTE),
            ResolvedAttribute::Special(SpecialAttribute::Password) => {
                Some(&self.mapping.password_attribute)
            }
            ResolvedAttribute::Special(SpecialAttribute::Members(_)) => {
                Some(&self.mapping.group_member_attribute)
            }
            ResolvedAttribute::Special(
                SpecialAttribute::Groups(_) | SpecialAttribute::SyncCookie,
            )
            | ResolvedAttribute::Unmapped => None,
        }
    }

    /// Identity name the active mode uses for group members.
    pub fn members_attribute(&self) -> &str {
        match self.mode() {
            MembershipMode::Reference => special::MEMBERS,
            MembershipMode::Legacy => &self.mapping.group_member_attribute,
        }
    }

    /// Identity name the active mode uses for an account's groups.
    pub fn groups_attribute(&self) -> &'static str {
        match self.mode() {
            MembershipMode::Reference => special::GROUPS,
            MembershipMode::Legacy => LEGACY_GROUPS_ATTRIBUTE,
        }
    }
}
