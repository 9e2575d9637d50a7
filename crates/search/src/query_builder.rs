//! Query Builder (§4.C): pure functions producing backend query
//! documents for the four intents the classifier and readiness gate
//! need.

use serde_json::{json, Value};

/// One or several facet field names — Elasticsearch spells a single
/// facet field differently from a multi-field facet (`field` vs
/// `fields`), so this mirrors that split at the type level.
pub enum Facet<'a> {
    Single(&'a str),
    Multiple(&'a [&'a str]),
}

/// Base query builder: wraps `raw_query` with a timestamp-descending
/// sort and an optional terms facet.
pub fn generic(raw_query: &str, facet: Option<Facet<'_>>) -> Value {
    let mut query = json!({
        "sort": { "@timestamp": { "order": "desc" } },
        "query": { "query_string": { "query": raw_query } },
    });

    if let Some(facet) = facet {
        let data = match facet {
            Facet::Single(field) => json!({ "field": field, "size": 200 }),
            Facet::Multiple(fields) => json!({ "fields": fields, "size": 200 }),
        };
        query["facets"] = json!({ "tag": { "terms": data } });
    }

    query
}

/// A query matching the completion marker for a given
/// `(change, patch, job name, short build uuid)` in the console-log
/// artifact — used by the readiness gate's phase 1.
pub fn result_ready(review: u64, patch: u64, name: &str, short_build_uuid: &str) -> Value {
    let raw = format!(
        "filename:\"console.html\" AND \
         message:\"[SCP] Copying console log\" \
         AND build_status:\"FAILURE\" \
         AND build_change:\"{review}\" \
         AND build_patchset:\"{patch}\" \
         AND build_name:\"{name}\" \
         AND build_uuid:{short_build_uuid}*"
    );
    generic(&raw, None)
}

/// The same scope as [`result_ready`], faceted on filename — used by
/// the readiness gate's phase 2 to discover which files are indexed
/// so far.
pub fn files_ready(review: u64, patch: u64, name: &str, short_build_uuid: &str) -> Value {
    let raw = format!(
        "build_status:\"FAILURE\" \
         AND build_change:\"{review}\" \
         AND build_patchset:\"{patch}\" \
         AND build_name:\"{name}\" \
         AND build_uuid:{short_build_uuid}*"
    );
    generic(&raw, Some(Facet::Single("filename")))
}

/// Conjoin a catalog entry's (already voting-clause-augmented) query
/// with a scope restricting it to one build.
pub fn single_patch(raw_query: &str, review: u64, patch: u64, short_build_uuid: &str) -> Value {
    let raw = format!(
        "{} AND build_change:\"{review}\" AND build_patchset:\"{patch}\" AND build_uuid:{short_build_uuid}*",
        raw_query.trim_end()
    );
    generic(&raw, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_sorts_by_timestamp_descending() {
        let q = generic("message:\"boom\"", None);
        assert_eq!(q["sort"]["@timestamp"]["order"], "desc");
        assert_eq!(q["query"]["query_string"]["query"], "message:\"boom\"");
        assert!(q.get("facets").is_none());
    }

    #[test]
    fn single_facet_uses_field_key() {
        let q = generic("q", Some(Facet::Single("filename")));
        assert_eq!(q["facets"]["tag"]["terms"]["field"], "filename");
        assert_eq!(q["facets"]["tag"]["terms"]["size"], 200);
    }

    #[test]
    fn multi_facet_uses_fields_key() {
        let q = generic("q", Some(Facet::Multiple(&["build_name", "build_status"])));
        assert_eq!(
            q["facets"]["tag"]["terms"]["fields"],
            json!(["build_name", "build_status"])
        );
    }

    #[test]
    fn single_patch_conjoins_scope_clauses() {
        let q = single_patch("message:\"boom\" AND voting:1", 47463, 3, "99bb8f6");
        let raw = q["query"]["query_string"]["query"].as_str().unwrap();
        assert_eq!(
            raw,
            "message:\"boom\" AND voting:1 AND build_change:\"47463\" \
             AND build_patchset:\"3\" AND build_uuid:99bb8f6*"
        );
    }

    #[test]
    fn files_ready_facets_on_filename() {
        let q = files_ready(47463, 3, "gate-keystone-python27", "99bb8f6");
        assert_eq!(q["facets"]["tag"]["terms"]["field"], "filename");
    }
}
