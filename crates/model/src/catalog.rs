//! The query catalog entry: one known bug and the search query that
//! recognizes it.

use serde::{Deserialize, Serialize};

use crate::BugId;

/// One `<bug_id>.yaml` document from the query catalog directory.
///
/// `bug_id` is not part of the YAML body; it is derived from the file
/// name by the loader and filled in afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    #[serde(skip)]
    pub bug_id: BugId,

    pub query: String,

    #[serde(rename = "allow-nonvoting", default)]
    pub allow_nonvoting: bool,

    #[serde(rename = "suppress-graph", default)]
    pub suppress_graph: bool,

    #[serde(default)]
    pub filters: Option<QueryFilters>,
}

/// Optional narrowing filters attached to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default, rename = "test_ids")]
    pub test_ids: Vec<String>,
}

impl QueryEntry {
    /// Apply the voting-clause invariant: unless `allow_nonvoting`, the
    /// effective query is conjoined with a literal `voting:1` clause.
    ///
    /// Mirrors the historical `str.rstrip()` + `" AND voting:1"` append:
    /// trailing whitespace only, never interior whitespace.
    pub fn effective_query(&self) -> String {
        if self.allow_nonvoting {
            self.query.clone()
        } else {
            format!("{} AND voting:1", self.query.trim_end())
        }
    }

    /// `true` if this entry requires a test-result-database check before
    /// a search hit counts as a match (§4.F-3).
    pub fn has_test_id_filter(&self) -> bool {
        self.filters
            .as_ref()
            .is_some_and(|f| !f.test_ids.is_empty())
    }
}
