//! Writes one pretty-printed JSON document per successful platform run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mosaic_core::PlatformId;
use serde::Serialize;

use crate::error::ExtractError;

#[derive(Debug, Clone)]
pub struct ResultsStore {
    results_dir: PathBuf,
    staging_dir: PathBuf,
}

impl ResultsStore {
    /// `staging_dir` receives the file first; it is then moved into `results_dir`.
    #[must_use]
    pub fn new(results_dir: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Serialize `document` and store it under
    /// `{platform}_{identity}_{YYYYMMDDHHMMSS}.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Json`] if serialization fails or
    /// [`ExtractError::Io`] if a write, directory creation or move fails.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        platform: PlatformId,
        identity: &str,
        document: &T,
    ) -> Result<PathBuf, ExtractError> {
        let body = serde_json::to_string_pretty(document)?;
        let filename = document_filename(platform, identity, Utc::now());

        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|e| io_error(&self.staging_dir, e))?;
        let staged = self.staging_dir.join(&filename);
        tokio::fs::write(&staged, body)
            .await
            .map_err(|e| io_error(&staged, e))?;

        tokio::fs::create_dir_all(&self.results_dir)
            .await
            .map_err(|e| io_error(&self.results_dir, e))?;
        let destination = self.results_dir.join(&filename);

        move_staged(&staged, &destination).await?;

        tracing::debug!(platform = %platform, path = %destination.display(), "document stored");
        Ok(destination)
    }
}

/// Move a staged file into place. The staged copy never outlives this call.
async fn move_staged(staged: &Path, destination: &Path) -> Result<(), ExtractError> {
    if tokio::fs::rename(staged, destination).await.is_ok() {
        return Ok(());
    }

    // Cross-device moves cannot be renamed.
    let copied = tokio::fs::copy(staged, destination).await;
    if let Err(e) = tokio::fs::remove_file(staged).await {
        tracing::warn!(path = %staged.display(), error = %e, "failed to remove staged file");
    }
    copied.map(|_| ()).map_err(|e| io_error(destination, e))
}

fn io_error(path: &Path, source: std::io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// `{platform}_{identity}_{YYYYMMDDHHMMSS}.json`, with path separators in
/// the identity replaced by `_`.
#[must_use]
pub fn document_filename(platform: PlatformId, identity: &str, now: DateTime<Utc>) -> String {
    let safe_identity = identity.replace(['/', '\\'], "_");
    format!(
        "{}_{}_{}.json",
        platform.name(),
        safe_identity,
        now.format("%Y%m%d%H%M%S")
    )
}

/// ISO-8601 timestamp stamped into every document as `extraction_date`.
#[must_use]
pub fn extraction_timestamp() -> String {
    Utc::now().to_rfc3339()
}
