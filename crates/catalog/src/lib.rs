//! Query catalog loader (§4.A): reads a directory of per-bug YAML
//! documents and exposes them as an in-memory, reloadable catalog.

use std::fs;
use std::path::{Path, PathBuf};

use recheckwatch_model::QueryEntry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog entry {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Load every `*.yaml` file in `dir` as a [`QueryEntry`], deriving each
/// entry's `bug_id` from its file stem.
///
/// Idempotent and side-effect free: callers reload on every
/// classification call (§4.A, §9 "Reloadable catalog").
pub fn load(dir: impl AsRef<Path>) -> Result<Vec<QueryEntry>, CatalogError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut catalog = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }

        let bug_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        let mut parsed: QueryEntry =
            serde_yaml::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;
        parsed.bug_id = bug_id;
        catalog.push(parsed);
    }

    catalog.sort_by(|a, b| a.bug_id.cmp(&b.bug_id));
    tracing::debug!(count = catalog.len(), dir = %dir.display(), "loaded query catalog");
    Ok(catalog)
}
