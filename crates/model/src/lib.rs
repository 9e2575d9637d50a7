//! Shared data types for the recheckwatch classification pipeline.
//!
//! Every other crate in the workspace builds on the types here: the
//! catalog entry loaded from disk, the event/job records produced by the
//! event source, the channel subscription table, and the search-result
//! wrapper shared by the search and readiness crates.

pub mod catalog;
pub mod channel;
pub mod event;
pub mod result;

pub use catalog::QueryEntry;
pub use channel::{ChannelConfig, EventKind};
pub use event::{FailEvent, FailJob};
pub use result::{FacetNode, Hit, ResultSet};

/// A Gerrit change number.
pub type ChangeNumber = u64;
/// A patchset number within a change.
pub type PatchNumber = u64;
/// The launchpad-style bug identifier used as the catalog's primary key.
pub type BugId = String;
