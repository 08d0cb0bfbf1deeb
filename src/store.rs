//! File-backed dedup store.
//!
//! Two JSON documents live in the store directory:
//!
//! ```text
//! store_dir/
//! ├── recorded.json   # { "<href>": ArticleData, ... }
//! └── excluded.json   # [ "<href>", ... ]
//! ```
//!
//! `recorded` holds every usable article. `excluded` holds every href that
//! must never be fetched again: recorded ones plus those that were fetched
//! but credited no known platform. `excluded` is always a superset of the
//! recorded keys.
//!
//! A run loads both files (a missing file is an empty set), merges what it
//! found with [`merge`] and writes both files back in full. Each file is
//! written to a temporary sibling and renamed over the original, so readers
//! never see half a document. Concurrent runs against one directory are not
//! supported.

use crate::error::{CrawlError, Result};
use crate::models::ArticleData;
use itertools::Itertools;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

pub const RECORDED_FILE: &str = "recorded.json";
pub const EXCLUDED_FILE: &str = "excluded.json";

pub type Recorded = HashMap<String, ArticleData>;
pub type Excluded = HashSet<String>;

/// In-memory state of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupStore {
    pub recorded: Recorded,
    pub excluded: Excluded,
}

impl DedupStore {
    /// Every href that must not be fetched again.
    pub fn seen(&self) -> HashSet<String> {
        self.excluded
            .iter()
            .chain(self.recorded.keys())
            .cloned()
            .collect()
    }

    /// Fold a run's findings into the store. See [`merge`].
    pub fn absorb(
        self,
        new_records: Vec<ArticleData>,
        newly_excluded: impl IntoIterator<Item = String>,
    ) -> Self {
        let (recorded, excluded) = merge(self.recorded, new_records, self.excluded, newly_excluded);
        DedupStore { recorded, excluded }
    }

    /// Load both documents from `dir`.
    ///
    /// # Errors
    ///
    /// [`CrawlError::Persistence`] when a file exists but is not valid JSON
    /// of the expected shape; [`CrawlError::Io`] on other read failures.
    #[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
    pub async fn load(dir: &Path) -> Result<Self> {
        let recorded: Recorded = read_json(&dir.join(RECORDED_FILE)).await?.unwrap_or_default();
        let excluded: Vec<String> = read_json(&dir.join(EXCLUDED_FILE)).await?.unwrap_or_default();

        let store = DedupStore {
            recorded,
            excluded: excluded.into_iter().collect(),
        };
        info!(
            recorded = store.recorded.len(),
            excluded = store.excluded.len(),
            "Loaded dedup store"
        );
        Ok(store)
    }

    /// Overwrite both documents in `dir`, creating it if needed.
    ///
    /// `excluded.json` is written sorted so successive runs diff cleanly.
    #[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
    pub async fn persist(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).await?;

        let excluded: Vec<&String> = self.excluded.iter().sorted().collect();
        write_json_atomic(&dir.join(RECORDED_FILE), &self.recorded).await?;
        write_json_atomic(&dir.join(EXCLUDED_FILE), &excluded).await?;

        info!(
            recorded = self.recorded.len(),
            excluded = self.excluded.len(),
            "Persisted dedup store"
        );
        Ok(())
    }
}

/// Merge a run's results into the previous store state.
///
/// - `recorded'` is `old_recorded` with each new record inserted under its
///   href, later entries overwriting earlier ones.
/// - `excluded'` is the union of `old_excluded`, the keys of `recorded'` and
///   `newly_excluded`.
///
/// Merging the same input twice gives the same state as merging it once.
pub fn merge(
    old_recorded: Recorded,
    new_records: Vec<ArticleData>,
    old_excluded: Excluded,
    newly_excluded: impl IntoIterator<Item = String>,
) -> (Recorded, Excluded) {
    let mut recorded = old_recorded;
    for record in new_records {
        recorded.insert(record.href.clone(), record);
    }

    let mut excluded = old_excluded;
    excluded.extend(recorded.keys().cloned());
    excluded.extend(newly_excluded);

    (recorded, excluded)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Store file missing; starting empty");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| CrawlError::Persistence {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CrawlError::Persistence {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let tmp = temp_path(path);
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), "Wrote store file");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
