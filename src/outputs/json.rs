//! Structured digest sidecar.
//!
//! The JSON form of a [`Digest`] sits next to its Markdown document so
//! consumers get typed items back instead of re-parsing rendered text.

use crate::error::StoreError;
use crate::models::Digest;
use crate::store::ContentStore;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{instrument, warn};

/// Write `digest` as `{data_dir}/{service}/{date}.json`.
#[instrument(level = "info", skip_all, fields(service = %digest.service, date = %digest.date))]
pub async fn write_digest(store: &ContentStore, digest: &Digest) -> Result<PathBuf, StoreError> {
    store
        .write_structured(&digest.service, digest.date, digest)
        .await
}

/// Read the digest stored for `(service, date)`, if any.
#[instrument(level = "info", skip(store))]
pub async fn read_digest(
    store: &ContentStore,
    service: &str,
    date: NaiveDate,
) -> Result<Option<Digest>, StoreError> {
    let digest: Option<Digest> = store.read_structured(service, date).await?;
    if digest.is_none() {
        warn!("No structured digest stored");
    }
    Ok(digest)
}
