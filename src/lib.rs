//! Organization charts from flat membership rosters.
//!
//! Raw records from one or more providers are normalized, merged, completed
//! with placeholder superiors and linked into a [`tree::Forest`]. The forest
//! is laid out lazily as branches are expanded, searched, and emitted as a
//! self-contained interactive document or a static snapshot.

pub mod artifact;
pub mod config;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod logging;
pub mod provider;
pub mod roster;
pub mod search;
pub mod session;
pub mod theme;
pub mod tree;
pub mod xml;

pub use error::{Error, Result};
