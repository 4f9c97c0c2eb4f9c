//! # LDAP Connector
//!
//! LDAP directory connector for xavyo provisioning.
//!
//! The connector reads, updates and incrementally synchronizes account and
//! group entries of a directory it does not own.
//!
//! ## Components
//!
//! - [`filter`] - Translates identity predicates to LDAP filters
//! - [`projection`] - Maps directory entries to identity objects and back
//! - [`sync`] - Content-sync change feed with resumable tokens
//! - [`client`] - `ldap3` transport
//! - [`connector`] - [`LdapConnector`], the capability implementation
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_connector_ldap::{LdapConfig, LdapConnector};
//! use xavyo_connector::prelude::*;
//!
//! let config = LdapConfig::new("ldap.example.com", "dc=example,dc=com")
//!     .with_credentials("cn=admin,dc=example,dc=com", "secret")
//!     .with_ssl();
//!
//! let connector = LdapConnector::new(config)?;
//! connector.test_connection().await?;
//!
//! let baseline = connector.latest_sync_token(&ObjectClass::Account).await?;
//! let batch = connector
//!     .sync(&ObjectClass::Account, baseline.as_ref(), &AttributeSelection::all())
//!     .await?;
//! ```

pub mod attributes;
pub mod client;
pub mod config;
pub mod connector;
pub mod directory;
pub mod filter;
pub mod projection;
pub mod sync;

// Re-exports
pub use client::LdapDirectory;
pub use config::{AttributeMappingConfig, LdapConfig, MembershipMode};
pub use connector::LdapConnector;
pub use filter::{NativeFilter, Translation};
pub use projection::{AttributeProjector, MembershipChanges, MembershipPlan, WritePlan};
pub use sync::{SyncCookie, Synchronizer};
