//! Failure event and per-job records produced by the event source and
//! enriched by the classifier.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{BugId, ChangeNumber, PatchNumber};

/// Which pipeline a failure was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
    Gate,
    Check,
}

/// One CI job that failed within a review event.
///
/// `bugs` starts empty and is append-only within one event's lifetime:
/// the classifier records matches, never retracts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailJob {
    pub name: String,
    pub url: String,
    pub bugs: BTreeSet<BugId>,
}

impl FailJob {
    /// Build a job record, deriving `short_build_uuid` from the URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            bugs: BTreeSet::new(),
        }
    }

    /// The last 7 characters of the job URL's path, used to scope
    /// searches to this specific build.
    pub fn short_build_uuid(&self) -> &str {
        let len = self.url.len();
        if len <= 7 {
            &self.url
        } else {
            &self.url[len - 7..]
        }
    }

    pub fn is_classified(&self) -> bool {
        !self.bugs.is_empty()
    }

    pub fn record_bug(&mut self, bug_id: BugId) {
        self.bugs.insert(bug_id);
    }
}

/// One gate/check failure on one review, with the set of jobs that
/// failed within it.
///
/// Invariant: `failed_jobs` is non-empty — events with no parsed jobs
/// are discarded upstream by the event source, never constructed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailEvent {
    pub change: ChangeNumber,
    pub rev: PatchNumber,
    pub project: String,
    pub url: String,
    pub queue: Queue,
    pub comment: String,
    pub failed_jobs: Vec<FailJob>,
}

impl FailEvent {
    /// The union of every job's matched bug ids.
    pub fn all_bugs(&self) -> BTreeSet<BugId> {
        self.failed_jobs
            .iter()
            .flat_map(|j| j.bugs.iter().cloned())
            .collect()
    }

    /// `true` iff every failed job has at least one matched bug.
    pub fn is_fully_classified(&self) -> bool {
        self.failed_jobs.iter().all(FailJob::is_classified)
    }
}
