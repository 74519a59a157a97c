mod cached_record;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
pub use cached_record::{format_age, CacheRecord};
use chrono::{DateTime, TimeDelta, Utc};

use crate::util::{read_optional, write_to_file};

pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Downloaded source payloads plus their fetch metadata.
///
/// Everything here is best-effort: I/O failures are logged and the store
/// keeps working from whatever it has in memory.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    records: BTreeMap<String, CacheRecord>,
}

impl CacheStore {
    pub async fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::error!(dir = ?dir, "Failed to create the cache directory: {}", e);
        }

        let mut store = CacheStore {
            dir,
            records: BTreeMap::new(),
        };

        match store.read_metadata().await {
            Ok(records) => store.records = records,
            Err(e) => tracing::error!(path = ?store.metadata_path(), "Failed to load cache metadata: {:#}", e),
        }

        store
    }

    async fn read_metadata(&self) -> anyhow::Result<BTreeMap<String, CacheRecord>> {
        let Some(data) = read_optional(&self.metadata_path()).await? else {
            return Ok(BTreeMap::new());
        };

        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&data).context("malformed cache metadata")?;

        Ok(raw
            .into_iter()
            .filter_map(|(name, value)| match serde_json::from_value::<CacheRecord>(value) {
                Ok(record) => Some((name, record)),
                Err(e) => {
                    tracing::warn!(source = %name, "Ignoring a malformed cache record: {}", e);
                    None
                }
            })
            .collect())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE_NAME)
    }

    pub fn payload_path(&self, source_name: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", source_name))
    }

    pub fn get(&self, source_name: &str) -> Option<&CacheRecord> {
        self.records.get(source_name)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &CacheRecord)> {
        self.records.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn record(&mut self, source_name: impl Into<String>, record: CacheRecord) {
        self.records.insert(source_name.into(), record);
    }

    pub fn is_fresh(&self, source_name: &str, interval: TimeDelta) -> bool {
        self.is_fresh_at(source_name, interval, Utc::now())
    }

    /// A source that was never recorded is never fresh.
    pub fn is_fresh_at(&self, source_name: &str, interval: TimeDelta, now: DateTime<Utc>) -> bool {
        self.records
            .get(source_name)
            .is_some_and(|record| record.age_at(now) < interval)
    }

    pub fn age_label(&self, source_name: &str) -> String {
        self.age_label_at(source_name, Utc::now())
    }

    pub fn age_label_at(&self, source_name: &str, now: DateTime<Utc>) -> String {
        self.records
            .get(source_name)
            .map_or_else(|| "unknown".into(), |record| format_age(record.age_at(now)))
    }

    /// Writes the metadata file. Failures are logged and reported as `false`.
    pub async fn persist(&self) -> bool {
        match self.try_persist().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = ?self.metadata_path(), "Failed to save cache metadata: {:#}", e);
                false
            }
        }
    }

    async fn try_persist(&self) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(&self.records).context("failed to serialize cache metadata")?;
        write_to_file(&self.metadata_path(), data).await
    }

    pub async fn read_payload(&self, source_name: &str) -> anyhow::Result<Option<String>> {
        read_optional(&self.payload_path(source_name)).await
    }

    pub async fn write_payload(&self, source_name: &str, payload: &str) -> anyhow::Result<()> {
        write_to_file(&self.payload_path(source_name), payload).await
    }
}
