//! Dated Markdown document store.
//!
//! Every collector writes one document per day under its own service
//! directory. The layout is the only contract shared between collectors,
//! the HTTP API and the social poster:
//!
//! ```text
//! base_dir/
//! ├── hacker_news/
//! │   ├── 2025-05-06.md     # rendered document
//! │   └── 2025-05-06.json   # structured digest the document was rendered from
//! └── paper_summarizer/
//!     ├── 2025-05-06.md
//!     └── arxiv_ids-2025-05-06.txt   # processed-id ledger
//! ```
//!
//! Writes are plain overwrites without atomic rename; one writer per
//! service per day is assumed.

use crate::error::StoreError;
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Date format used in every file name.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filesystem-backed store keyed by `(service, date)`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    base_dir: PathBuf,
}

impl ContentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the Markdown document for `(service, date)`.
    pub fn document_path(&self, service: &str, date: NaiveDate) -> Result<PathBuf, StoreError> {
        Ok(self.service_dir(service)?.join(format!("{}.md", date.format(DATE_FORMAT))))
    }

    /// Persist `text` as the document for `(service, date)`, replacing any
    /// previous document. Creates the service directory on first use.
    #[instrument(level = "info", skip(self, text), fields(bytes = text.len()))]
    pub async fn write(
        &self,
        service: &str,
        date: NaiveDate,
        text: &str,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.service_dir(service)?;
        fs::create_dir_all(&dir).await?;
        let path = self.document_path(service, date)?;
        fs::write(&path, text).await?;
        info!(path = %path.display(), "Wrote document");
        Ok(path)
    }

    /// Read the document for `(service, date)`; `None` when it does not exist.
    #[instrument(level = "debug", skip(self))]
    pub async fn read(&self, service: &str, date: NaiveDate) -> Result<Option<String>, StoreError> {
        let path = self.document_path(service, date)?;
        read_optional(&path).await
    }

    /// Dates that have a document for `service`, newest first.
    ///
    /// Only `*.md` files are considered. Stems that are not a valid
    /// `YYYY-MM-DD` calendar date are skipped.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_dates(&self, service: &str) -> Result<Vec<NaiveDate>, StoreError> {
        let dir = self.service_dir(service)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dates = BTreeSet::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                Ok(date) => {
                    dates.insert(date);
                }
                Err(_) => debug!(file = %path.display(), "Skipping non-date document"),
            }
        }

        Ok(dates.into_iter().rev().collect())
    }

    /// Persist the structured form of a document next to its Markdown.
    #[instrument(level = "info", skip(self, value))]
    pub async fn write_structured<T: Serialize>(
        &self,
        service: &str,
        date: NaiveDate,
        value: &T,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.service_dir(service)?;
        fs::create_dir_all(&dir).await?;
        let path = self.structured_path(service, date)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).await?;
        info!(path = %path.display(), "Wrote structured sidecar");
        Ok(path)
    }

    /// Load the structured form of a document; `None` when absent.
    pub async fn read_structured<T: DeserializeOwned>(
        &self,
        service: &str,
        date: NaiveDate,
    ) -> Result<Option<T>, StoreError> {
        let path = self.structured_path(service, date)?;
        match read_optional(&path).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Ids recorded in the `<name>-<date>.txt` ledger of `service`.
    pub async fn load_ledger(
        &self,
        service: &str,
        name: &str,
        date: NaiveDate,
    ) -> Result<Vec<String>, StoreError> {
        let path = self.ledger_path(service, name, date)?;
        Ok(read_optional(&path)
            .await?
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Append `ids` to the ledger, keeping existing order and dropping
    /// duplicates. Returns the full ledger as written.
    #[instrument(level = "info", skip(self, ids), fields(new = ids.len()))]
    pub async fn append_ledger(
        &self,
        service: &str,
        name: &str,
        date: NaiveDate,
        ids: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let mut seen = BTreeSet::new();
        let all: Vec<String> = self
            .load_ledger(service, name, date)
            .await?
            .into_iter()
            .chain(ids.iter().cloned())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        fs::create_dir_all(self.service_dir(service)?).await?;
        let path = self.ledger_path(service, name, date)?;
        let mut body = String::new();
        for id in &all {
            body.push_str(id);
            body.push('\n');
        }
        fs::write(&path, body).await?;
        info!(path = %path.display(), total = all.len(), "Updated ledger");
        Ok(all)
    }

    fn service_dir(&self, service: &str) -> Result<PathBuf, StoreError> {
        validate_component(service)?;
        Ok(self.base_dir.join(service))
    }

    fn structured_path(&self, service: &str, date: NaiveDate) -> Result<PathBuf, StoreError> {
        Ok(self
            .service_dir(service)?
            .join(format!("{}.json", date.format(DATE_FORMAT))))
    }

    fn ledger_path(&self, service: &str, name: &str, date: NaiveDate) -> Result<PathBuf, StoreError> {
        validate_component(name)?;
        Ok(self
            .service_dir(service)?
            .join(format!("{}-{}.txt", name, date.format(DATE_FORMAT))))
    }
}

fn validate_component(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\']);
    if invalid {
        return Err(StoreError::InvalidService(name.to_string()));
    }
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
