//! # Connector Framework
//!
//! Core abstractions for connecting xavyo to external identity systems.
//!
//! The framework describes what a connector exchanges with the identity
//! layer: identity objects, attribute selections, predicate trees and
//! change-feed records. Connectors translate these to and from their
//! target system.
//!
//! ## Architecture
//!
//! The framework uses a capability-based trait system inspired by `ConnId`:
//!
//! - [`Connector`] - Base trait all connectors implement
//! - [`SearchOp`] - Search and retrieve objects
//! - [`SyncCapable`] - Incremental change feeds with resumable tokens
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_connector::prelude::*;
//!
//! let filter = Filter::and(vec![
//!     Filter::starts_with("cn", "Jo"),
//!     Filter::negate(Filter::eq("employeeType", "contractor")),
//! ]);
//! let result = connector
//!     .search(&ObjectClass::Account, Some(&filter), &AttributeSelection::all())
//!     .await?;
//!
//! let batch = connector
//!     .sync(&ObjectClass::Account, last_token.as_ref(), &AttributeSelection::all())
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with transient/permanent classification
//! - [`diagnostics`] - Non-fatal conditions returned next to results
//! - [`traits`] - Connector capability traits and change-feed types
//! - [`operation`] - Identity objects, attributes, selections, filters
//! - [`config`] - Configuration types and traits
//!
//! [`Connector`]: traits::Connector
//! [`SearchOp`]: traits::SearchOp
//! [`SyncCapable`]: traits::SyncCapable

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod operation;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_connector::prelude::*;
/// ```
pub mod prelude {
    // Error handling
    pub use crate::error::{ConnectorError, ConnectorResult};

    // Diagnostics
    pub use crate::diagnostics::{Diagnostic, Diagnostics};

    // Traits
    pub use crate::traits::{
        Connector, SearchOp, SyncBatch, SyncCapable, SyncDelta, SyncRecord, SyncToken,
    };

    // Operations
    pub use crate::operation::{
        special, Attribute, AttributeDelta, AttributeSelection, AttributeSet, AttributeValue,
        Filter, GuardedString, IdentityObject, ObjectClass, ObjectReference, SearchResult, Uid,
    };

    // Configuration
    pub use crate::config::{ConnectionSettings, ConnectorConfig};
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
