//! Classifier (§4.F): runs the query catalog against a ready build and
//! collects the bug ids whose query matched.

use std::path::PathBuf;
use std::sync::Arc;

use recheckwatch_catalog::CatalogError;
use recheckwatch_model::BugId;
use recheckwatch_search::query_builder::single_patch;
use recheckwatch_search::LogIndexBackend;
use tracing::warn;

/// Optional external collaborator (§6 "Test-result database"): lets a
/// catalog entry narrow a match to builds where a specific test
/// actually failed, not just where the log text matched.
#[async_trait::async_trait]
pub trait TestResultDb: Send + Sync {
    async fn failing_test_ids_for_build(&self, build_uuid: &str) -> Vec<String>;
}

/// A `TestResultDb` that reports no failing tests for every build —
/// the default when the database is unconfigured, meaning catalog
/// entries that carry a `filters.test_ids` list are never confirmed.
pub struct NoTestResultDb;

#[async_trait::async_trait]
impl TestResultDb for NoTestResultDb {
    async fn failing_test_ids_for_build(&self, _build_uuid: &str) -> Vec<String> {
        Vec::new()
    }
}

pub struct Classifier {
    backend: Arc<dyn LogIndexBackend>,
    catalog_dir: PathBuf,
    test_result_db: Arc<dyn TestResultDb>,
}

impl Classifier {
    pub fn new(backend: Arc<dyn LogIndexBackend>, catalog_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            catalog_dir: catalog_dir.into(),
            test_result_db: Arc::new(NoTestResultDb),
        }
    }

    pub fn with_test_result_db(mut self, db: Arc<dyn TestResultDb>) -> Self {
        self.test_result_db = db;
        self
    }

    /// Reload the catalog and run every entry's single-patch query
    /// against this build, in catalog order. Per-entry search errors
    /// are logged and skipped — a bad query does not abort
    /// classification of the rest of the catalog.
    pub async fn classify(
        &self,
        change: u64,
        patch: u64,
        short_build_uuid: &str,
    ) -> Result<Vec<BugId>, CatalogError> {
        let catalog = recheckwatch_catalog::load(&self.catalog_dir)?;
        let mut matches = Vec::new();

        for entry in &catalog {
            let query = single_patch(&entry.effective_query(), change, patch, short_build_uuid);
            let result = match self.backend.search(&query, 10, true).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(bug_id = %entry.bug_id, error = %e, "classification query failed, skipping entry");
                    continue;
                }
            };

            if result.is_empty() {
                continue;
            }

            if entry.has_test_id_filter() {
                let failing = self.test_result_db.failing_test_ids_for_build(short_build_uuid).await;
                let wanted = &entry.filters.as_ref().unwrap().test_ids;
                if !wanted.iter().any(|t| failing.contains(t)) {
                    continue;
                }
            }

            matches.push(entry.bug_id.clone());
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recheckwatch_model::result::{Hit, ResultSet};
    use recheckwatch_search::SearchError;
    use serde_json::{json, Value};
    use std::fs;

    struct FakeBackend {
        /// Maps a substring of the query string to the hit count it
        /// should return.
        matches: Vec<(&'static str, usize)>,
    }

    #[async_trait]
    impl LogIndexBackend for FakeBackend {
        async fn search(&self, query: &Value, _size: u32, _recent: bool) -> Result<ResultSet, SearchError> {
            let raw = query["query"]["query_string"]["query"].as_str().unwrap_or("");
            for (needle, count) in &self.matches {
                if raw.contains(needle) {
                    let hits = (0..*count)
                        .map(|_| Hit::from_source("idx", json!({})))
                        .collect();
                    return Ok(ResultSet::new(hits));
                }
            }
            Ok(ResultSet::default())
        }
    }

    fn write_catalog(dir: &std::path::Path, bug_id: &str, query: &str) {
        fs::write(dir.join(format!("{bug_id}.yaml")), format!("query: '{query}'\n")).unwrap();
    }

    #[tokio::test]
    async fn matches_catalog_entries_with_hits_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), "1234567", "message:\"boom\"");
        write_catalog(dir.path(), "7654321", "message:\"other\"");

        let backend = Arc::new(FakeBackend {
            matches: vec![("boom", 1)],
        });
        let classifier = Classifier::new(backend, dir.path());

        let bugs = classifier.classify(47463, 3, "99bb8f6").await.unwrap();
        assert_eq!(bugs, vec!["1234567".to_string()]);
    }

    #[tokio::test]
    async fn empty_catalog_always_returns_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(FakeBackend { matches: vec![] });
        let classifier = Classifier::new(backend, dir.path());
        let bugs = classifier.classify(1, 1, "abcdefg").await.unwrap();
        assert!(bugs.is_empty());
    }

    #[tokio::test]
    async fn test_id_filter_blocks_a_match_without_a_configured_db() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("1234567.yaml"),
            "query: 'message:\"boom\"'\nfilters:\n  test_ids:\n    - tempest.api.compute.test_foo\n",
        )
        .unwrap();

        let backend = Arc::new(FakeBackend {
            matches: vec![("boom", 1)],
        });
        let classifier = Classifier::new(backend, dir.path());
        let bugs = classifier.classify(1, 1, "abcdefg").await.unwrap();
        assert!(bugs.is_empty());
    }

    #[tokio::test]
    async fn test_id_filter_confirms_a_match_via_the_db() {
        struct FakeDb;
        #[async_trait]
        impl TestResultDb for FakeDb {
            async fn failing_test_ids_for_build(&self, _build_uuid: &str) -> Vec<String> {
                vec!["tempest.api.compute.test_foo".to_string()]
            }
        }

        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("1234567.yaml"),
            "query: 'message:\"boom\"'\nfilters:\n  test_ids:\n    - tempest.api.compute.test_foo\n",
        )
        .unwrap();

        let backend = Arc::new(FakeBackend {
            matches: vec![("boom", 1)],
        });
        let classifier = Classifier::new(backend, dir.path()).with_test_result_db(Arc::new(FakeDb));
        let bugs = classifier.classify(1, 1, "abcdefg").await.unwrap();
        assert_eq!(bugs, vec!["1234567".to_string()]);
    }
}
