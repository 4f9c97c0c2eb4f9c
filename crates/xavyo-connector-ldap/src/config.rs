//! LDAP Connector configuration
//!
//! Connection settings plus the mapping between identity attributes and
//! directory attributes.

use serde::{Deserialize, Serialize};
use xavyo_connector::config::{ConnectionSettings, ConnectorConfig};
use xavyo_connector::error::{ConnectorError, ConnectorResult};

/// How group membership is represented on identity objects.
///
/// Exactly one representation is active per connector instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipMode {
    /// Members and groups are object references (`__MEMBERS__`, `__GROUPS__`).
    #[default]
    Reference,
    /// Members and groups are plain entry-path strings (the member attribute
    /// and `ldapGroups`).
    Legacy,
}

impl std::fmt::Display for MembershipMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipMode::Reference => write!(f, "reference"),
            MembershipMode::Legacy => write!(f, "legacy"),
        }
    }
}

/// Mapping between identity object classes/attributes and the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMappingConfig {
    /// Directory object class of accounts.
    #[serde(default = "default_account_object_class")]
    pub account_object_class: String,

    /// Directory object class of groups.
    #[serde(default = "default_group_object_class")]
    pub group_object_class: String,

    /// Id attribute of accounts.
    #[serde(default = "default_id_attribute")]
    pub uid_attribute: String,

    /// Id attribute of groups.
    #[serde(default = "default_id_attribute")]
    pub gid_attribute: String,

    /// Id attribute of any other object class.
    #[serde(default = "default_id_attribute")]
    pub aid_attribute: String,

    /// Directory attribute holding the password.
    #[serde(default = "default_password_attribute")]
    pub password_attribute: String,

    /// Directory attribute of a group listing its members.
    #[serde(default = "default_group_member_attribute")]
    pub group_member_attribute: String,

    /// Membership representation.
    #[serde(default)]
    pub membership_mode: MembershipMode,

    /// Attributes whose values are returned as raw bytes.
    #[serde(default = "default_binary_attributes")]
    pub binary_attributes: Vec<String>,
}

fn default_account_object_class() -> String {
    "inetOrgPerson".to_string()
}

fn default_group_object_class() -> String {
    "groupOfNames".to_string()
}

fn default_id_attribute() -> String {
    "entryUUID".to_string()
}

fn default_password_attribute() -> String {
    "userPassword".to_string()
}

fn default_group_member_attribute() -> String {
    "member".to_string()
}

fn default_binary_attributes() -> Vec<String> {
    vec![
        "jpegPhoto".to_string(),
        "userCertificate".to_string(),
        "objectGUID".to_string(),
        "objectSid".to_string(),
    ]
}

impl Default for AttributeMappingConfig {
    fn default() -> Self {
        Self {
            account_object_class: default_account_object_class(),
            group_object_class: default_group_object_class(),
            uid_attribute: default_id_attribute(),
            gid_attribute: default_id_attribute(),
            aid_attribute: default_id_attribute(),
            password_attribute: default_password_attribute(),
            group_member_attribute: default_group_member_attribute(),
            membership_mode: MembershipMode::default(),
            binary_attributes: default_binary_attributes(),
        }
    }
}

impl AttributeMappingConfig {
    /// Switch to legacy membership mode.
    #[must_use]
    pub fn legacy(mut self) -> Self {
        self.membership_mode = MembershipMode::Legacy;
        self
    }

    /// Use the same id attribute for every object class.
    pub fn with_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.uid_attribute.clone_from(&attribute);
        self.gid_attribute.clone_from(&attribute);
        self.aid_attribute = attribute;
        self
    }

    /// Whether values of `attribute` should be kept as bytes.
    pub fn is_binary(&self, attribute: &str) -> bool {
        self.binary_attributes
            .iter()
            .any(|a| a.eq_ignore_ascii_case(attribute))
    }

    fn validate(&self) -> ConnectorResult<()> {
        let required = [
            ("account_object_class", &self.account_object_class),
            ("group_object_class", &self.group_object_class),
            ("uid_attribute", &self.uid_attribute),
            ("gid_attribute", &self.gid_attribute),
            ("aid_attribute", &self.aid_attribute),
            ("password_attribute", &self.password_attribute),
            ("group_member_attribute", &self.group_member_attribute),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConnectorError::InvalidConfiguration {
                    message: format!("{field} must not be empty"),
                });
            }
        }

        if self
            .group_member_attribute
            .eq_ignore_ascii_case(&self.password_attribute)
        {
            return Err(ConnectorError::InvalidConfiguration {
                message: "group_member_attribute and password_attribute must differ".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration for LDAP connector.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server hostname or IP address.
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Base DN for all operations (e.g., "dc=example,dc=com").
    pub base_dn: String,

    /// Bind DN for authentication. Anonymous bind when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,

    /// Bind password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection settings (timeouts).
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Identity-to-directory mapping.
    #[serde(default)]
    pub mapping: AttributeMappingConfig,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection", &self.connection)
            .field("mapping", &self.mapping)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

impl LdapConfig {
    /// Create a new LDAP config for anonymous access.
    pub fn new(host: impl Into<String>, base_dn: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            base_dn: base_dn.into(),
            bind_dn: None,
            bind_password: None,
            connection: ConnectionSettings::default(),
            mapping: AttributeMappingConfig::default(),
        }
    }

    /// Set bind credentials.
    pub fn with_credentials(
        mut self,
        bind_dn: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.bind_dn = Some(bind_dn.into());
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Set the attribute mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: AttributeMappingConfig) -> Self {
        self.mapping = mapping;
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl ConnectorConfig for LdapConfig {
    fn validate(&self) -> ConnectorResult<()> {
        if self.host.is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "host is required".to_string(),
            });
        }

        if self.base_dn.is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "base_dn is required".to_string(),
            });
        }

        if self.use_ssl && self.use_starttls {
            return Err(ConnectorError::InvalidConfiguration {
                message: "cannot use both SSL and STARTTLS".to_string(),
            });
        }

        match (&self.bind_dn, &self.bind_password) {
            (Some(dn), Some(_)) if dn.is_empty() => {
                return Err(ConnectorError::InvalidConfiguration {
                    message: "bind_dn must not be empty".to_string(),
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConnectorError::InvalidConfiguration {
                    message: "bind_dn and bind_password must be set together".to_string(),
                });
            }
            _ => {}
        }

        self.mapping.validate()
    }

    fn get_credentials(&self) -> Vec<(&'static str, String)> {
        match &self.bind_password {
            Some(password) => vec![("bind_password", password.clone())],
            None => vec![],
        }
    }

    fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some("***REDACTED***".to_string());
        }
        config
    }
}
