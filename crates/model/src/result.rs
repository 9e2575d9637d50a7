//! Search-result wrapper: flattened field access on individual hits,
//! and the recursive facet-bucket tree built on top of a `ResultSet`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// One document returned by the log-index backend.
///
/// Accessors probe three historical schema shapes in a fixed order —
/// top-level `attr`, `@attr`, then nested `@fields.attr` — and always
/// collapse a single-element array to its scalar.
#[derive(Debug, Clone)]
pub struct Hit {
    source: Value,
    index: String,
}

impl Hit {
    pub fn from_source(index: impl Into<String>, source: Value) -> Self {
        Self {
            source,
            index: index.into(),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Raw field lookup, flattening the three historical shapes and
    /// unwrapping a singleton array.
    pub fn field(&self, attr: &str) -> Option<&Value> {
        let at_attr = format!("@{attr}");
        let direct = self.source.get(attr);
        let at = self.source.get(&at_attr);
        let nested = self
            .source
            .get("@fields")
            .and_then(|fields| fields.get(attr));

        let found = direct.or(at).or(nested)?;
        Some(first(found))
    }

    pub fn field_str(&self, attr: &str) -> Option<&str> {
        self.field(attr).and_then(Value::as_str)
    }

    pub fn build_status(&self) -> Option<&str> {
        self.field_str("build_status")
    }

    pub fn build_uuid(&self) -> Option<&str> {
        self.field_str("build_uuid")
    }

    pub fn log_url(&self) -> Option<&str> {
        self.field_str("log_url")
    }

    pub fn project(&self) -> Option<&str> {
        self.field_str("project")
    }

    pub fn build_name(&self) -> Option<&str> {
        self.field_str("build_name")
    }

    pub fn message(&self) -> Option<&str> {
        self.field_str("message")
    }

    pub fn filename(&self) -> Option<&str> {
        self.field_str("filename")
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.field_str("timestamp")?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// `true` if `v` is a singleton array collapsed to its one element,
/// otherwise return `v` unchanged.
fn first(v: &Value) -> &Value {
    match v {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

/// One bucket in a terms facet: a field value and its hit count.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetTerm {
    pub term: String,
    pub count: u64,
}

/// A search response: the hits plus optional metadata (timing, facet
/// terms).
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    hits: Vec<Hit>,
    pub took_ms: u64,
    pub timed_out: bool,
    pub terms: Vec<FacetTerm>,
}

impl ResultSet {
    pub fn new(hits: Vec<Hit>) -> Self {
        Self {
            hits,
            took_ms: 0,
            timed_out: false,
            terms: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter()
    }

    /// Filenames returned by a `filename` terms facet, as produced by
    /// the files-ready query (§4.C-4).
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.term.as_str())
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// A recursive facet-bucket tree: `Internal` nodes partition on one
/// more field, `Leaf` nodes hold the hits that share every facet value
/// on the path down to them.
#[derive(Debug, Clone)]
pub enum FacetNode {
    Leaf(Vec<Hit>),
    Internal(BTreeMap<String, FacetNode>),
}

/// Floor a unix-epoch-millis timestamp to a bucket of `res` seconds,
/// matching the source's `floor(t/res)*res` histogram bucketing.
pub fn floor_bucket(timestamp: DateTime<Utc>, res_seconds: i64) -> DateTime<Utc> {
    let epoch = timestamp.timestamp();
    let floored = (epoch / res_seconds) * res_seconds;
    DateTime::from_timestamp(floored, 0).unwrap_or(timestamp)
}

/// Partition `hits` into a nested `FacetNode` tree keyed by the values
/// of `facets`, applied in order. A `timestamp` facet is bucketed via
/// [`floor_bucket`] with `res_seconds` resolution (default 3600).
pub fn detect_facets(hits: Vec<Hit>, facets: &[&str], res_seconds: i64) -> FacetNode {
    let Some((facet, rest)) = facets.split_first() else {
        return FacetNode::Leaf(hits);
    };

    let mut buckets: BTreeMap<String, Vec<Hit>> = BTreeMap::new();
    for hit in hits {
        let key = bucket_key(&hit, facet, res_seconds);
        buckets.entry(key).or_default().push(hit);
    }

    let mut nodes = BTreeMap::new();
    for (key, bucket_hits) in buckets {
        nodes.insert(key, detect_facets(bucket_hits, rest, res_seconds));
    }
    FacetNode::Internal(nodes)
}

fn bucket_key(hit: &Hit, facet: &str, res_seconds: i64) -> String {
    if facet == "timestamp" {
        if let Some(ts) = hit.timestamp() {
            return floor_bucket(ts, res_seconds).timestamp_millis().to_string();
        }
        return "unknown".to_string();
    }
    hit.field_str(facet).unwrap_or("unknown").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_probes_top_level_first() {
        let hit = Hit::from_source("idx", json!({"build_status": "FAILURE"}));
        assert_eq!(hit.build_status(), Some("FAILURE"));
    }

    #[test]
    fn field_falls_back_to_at_prefixed_key() {
        let hit = Hit::from_source("idx", json!({"@message": "boom"}));
        assert_eq!(hit.message(), Some("boom"));
    }

    #[test]
    fn field_falls_back_to_nested_fields() {
        let hit = Hit::from_source(
            "idx",
            json!({"@fields": {"build_name": "gate-keystone-python27"}}),
        );
        assert_eq!(hit.build_name(), Some("gate-keystone-python27"));
    }

    #[test]
    fn singleton_array_collapses_to_scalar() {
        let hit = Hit::from_source("idx", json!({"log_url": ["http://x/y"]}));
        assert_eq!(hit.log_url(), Some("http://x/y"));
    }

    #[test]
    fn floor_bucket_rounds_down_to_resolution() {
        let ts = DateTime::from_timestamp(3_661, 0).unwrap();
        assert_eq!(floor_bucket(ts, 3600).timestamp(), 3_600);
    }

    #[test]
    fn detect_facets_partitions_on_one_field() {
        let hits = vec![
            Hit::from_source("idx", json!({"filename": "console.html"})),
            Hit::from_source("idx", json!({"filename": "console.html"})),
            Hit::from_source("idx", json!({"filename": "syslog.txt"})),
        ];
        let tree = detect_facets(hits, &["filename"], 3600);
        match tree {
            FacetNode::Internal(buckets) => {
                assert_eq!(buckets.len(), 2);
                assert_eq!(buckets["console.html"].leaf_len(), 2);
            }
            FacetNode::Leaf(_) => panic!("expected internal node"),
        }
    }

    impl FacetNode {
        fn leaf_len(&self) -> usize {
            match self {
                FacetNode::Leaf(hits) => hits.len(),
                FacetNode::Internal(_) => 0,
            }
        }
    }
}
