use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    catalog,
    error::StoreError,
    management::{UploadStateStore, file},
    types::{FailureCategory, FailureRecord},
};

pub const FAILED_UPLOADS_FILE: &str = "failed_uploads.json";

/// When an older file lists the same path under several categories, the first
/// category in this order keeps it.
const LOAD_PRECEDENCE: [FailureCategory; 5] = [
    FailureCategory::TooLarge,
    FailureCategory::UnsupportedFormat,
    FailureCategory::ExifErrors,
    FailureCategory::AddToAlbumError,
    FailureCategory::UploadError,
];

const LEGACY_REASON: &str = "Imported from legacy failure log";

/// Legacy layout: `{ "<folder>": { "path": "...", "files": ["..."] } }`.
#[derive(Debug, Deserialize)]
struct LegacyFolder {
    path: PathBuf,
    #[serde(default)]
    files: Vec<String>,
}

/// Durable failure log, one ordered queue per [`FailureCategory`].
///
/// A path is held by at most one category at a time. Keys that are not a known
/// category are carried through load and save untouched.
#[derive(Debug)]
pub struct FailureStore {
    path: PathBuf,
    categories: BTreeMap<FailureCategory, Vec<FailureRecord>>,
    unknown: Map<String, Value>,
}

impl FailureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            categories: BTreeMap::new(),
            unknown: Map::new(),
        }
    }

    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let mut store = Self::new(path);
        store.reload().await?;
        Ok(store)
    }

    pub async fn reload(&mut self) -> Result<(), StoreError> {
        self.categories.clear();
        self.unknown.clear();

        let Some(json) = file::read_if_exists(&self.path).await? else {
            return Ok(());
        };

        let root: Value = serde_json::from_str(&json).map_err(|e| self.corrupt(e.to_string()))?;
        let Value::Object(root) = root else {
            return Err(self.corrupt("expected a JSON object at the top level".to_string()));
        };

        let mut parsed: BTreeMap<FailureCategory, Vec<FailureRecord>> = BTreeMap::new();
        for (key, value) in root {
            match key.parse::<FailureCategory>() {
                Ok(category) => {
                    let records = self.parse_category(category, value)?;
                    parsed.insert(category, records);
                }
                Err(_) => {
                    tracing::warn!(category = %key, "preserving unknown failure category");
                    self.unknown.insert(key, value);
                }
            }
        }

        let mut seen: HashSet<PathBuf> = HashSet::new();
        for category in LOAD_PRECEDENCE {
            let Some(records) = parsed.remove(&category) else {
                continue;
            };
            let mut kept = Vec::with_capacity(records.len());
            for record in records {
                if seen.insert(record.path.clone()) {
                    kept.push(record);
                } else {
                    tracing::warn!(
                        path = %record.path.display(),
                        %category,
                        "dropping duplicate failure record"
                    );
                }
            }
            if !kept.is_empty() {
                self.categories.insert(category, kept);
            }
        }

        Ok(())
    }

    pub async fn save(&self) -> Result<(), StoreError> {
        let mut root = Map::new();
        for category in FailureCategory::ALL {
            let value = serde_json::to_value(self.list_category(category)).map_err(|source| {
                StoreError::Serialize {
                    path: self.path.clone(),
                    source,
                }
            })?;
            root.insert(category.as_str().to_string(), value);
        }
        for (key, value) in &self.unknown {
            root.insert(key.clone(), value.clone());
        }

        file::write_json_atomic(&self.path, &root).await
    }

    /// Files `record` under `category`, first removing any earlier record for
    /// the same path from every category.
    pub fn record_failure(&mut self, category: FailureCategory, record: FailureRecord) {
        self.remove_everywhere(&record.path);
        self.categories.entry(category).or_default().push(record);
    }

    pub fn list_category(&self, category: FailureCategory) -> &[FailureRecord] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Removes the record for `path` from `category`. Returns `false` if there
    /// was nothing to remove.
    pub fn remove(&mut self, category: FailureCategory, path: &Path) -> bool {
        let Some(records) = self.categories.get_mut(&category) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| r.path != path);
        let removed = records.len() != before;
        if records.is_empty() {
            self.categories.remove(&category);
        }
        removed
    }

    pub fn remove_everywhere(&mut self, path: &Path) -> bool {
        let mut removed = false;
        for category in FailureCategory::ALL {
            removed |= self.remove(category, path);
        }
        removed
    }

    pub fn category_of(&self, path: &Path) -> Option<FailureCategory> {
        self.categories
            .iter()
            .find(|(_, records)| records.iter().any(|r| r.path == path))
            .map(|(category, _)| *category)
    }

    /// Drops records for files the state store already shows as uploaded.
    /// Returns the number of records removed.
    ///
    /// `ExifErrors` records are kept: an uploaded file can still be waiting
    /// for its capture date to be fixed.
    pub fn reconcile(&mut self, state: &UploadStateStore) -> usize {
        let mut removed = 0;
        for (category, records) in self.categories.iter_mut() {
            if *category == FailureCategory::ExifErrors {
                continue;
            }
            let before = records.len();
            records.retain(|r| {
                r.file_name()
                    .map(|name| !state.is_uploaded(&r.album, &name))
                    .unwrap_or(true)
            });
            removed += before - records.len();
        }
        self.categories.retain(|_, records| !records.is_empty());
        removed
    }

    pub fn count(&self, category: FailureCategory) -> usize {
        self.list_category(category).len()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unknown_categories(&self) -> Vec<&str> {
        self.unknown.keys().map(String::as_str).collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_category(
        &self,
        category: FailureCategory,
        value: Value,
    ) -> Result<Vec<FailureRecord>, StoreError> {
        match value {
            Value::Array(_) => serde_json::from_value(value)
                .map_err(|e| self.corrupt(format!("category {}: {}", category, e))),
            Value::Object(_) => {
                let folders: BTreeMap<String, LegacyFolder> = serde_json::from_value(value)
                    .map_err(|e| self.corrupt(format!("category {}: {}", category, e)))?;
                tracing::info!(%category, "migrating legacy failure entries");
                Ok(folders
                    .into_iter()
                    .flat_map(|(folder_name, folder)| {
                        let LegacyFolder { path, files } = folder;
                        let album = catalog::truncate_album_name(&folder_name);
                        files.into_iter().map(move |name| {
                            FailureRecord::new(path.join(name), album.clone(), LEGACY_REASON)
                        })
                    })
                    .collect())
            }
            Value::Null => Ok(Vec::new()),
            other => Err(self.corrupt(format!(
                "category {} holds unexpected value {}",
                category, other
            ))),
        }
    }

    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
