//! Output generation for collected digests.
//!
//! A [`Digest`] is persisted twice under the same `(service, date)` key:
//!
//! - [`markdown`]: the human-readable document, a pure projection of the digest
//! - [`json`]: the structured sidecar the digest poster reads back
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! └── github_trending/
//!     ├── 2025-05-06.md
//!     └── 2025-05-06.json
//! ```

pub mod json;
pub mod markdown;

use crate::error::StoreError;
use crate::models::Digest;
use crate::store::ContentStore;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Render and store `digest`; returns the path of the Markdown document.
#[instrument(level = "info", skip_all, fields(service = %digest.service, date = %digest.date))]
pub async fn publish(store: &ContentStore, digest: &Digest) -> Result<PathBuf, StoreError> {
    let md = markdown::digest_to_markdown(digest);
    let path = store.write(&digest.service, digest.date, &md).await?;
    json::write_digest(store, digest).await?;
    info!(path = %path.display(), items = digest.item_count(), "Published digest");
    Ok(path)
}
