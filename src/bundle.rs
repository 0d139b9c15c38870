//! Deterministic, crash-safe bundling of a directory into an archive.
//!
//! The archive's bytes are a pure function of file contents, file modes,
//! relative paths, and enumeration order; modification timestamps are forced
//! to a fixed constant so content-equal trees always produce byte-identical
//! archives (and identical fingerprints). The archive is staged at a
//! temporary path and published with an atomic rename, so an interrupted
//! process never leaves a partial file at the destination.

use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{BundleError, Result};

/// Fixed modification timestamp for every archive entry.
const FIXED_MTIME: u64 = 0;

/// Maximum rename attempts when the destination is transiently busy.
const RENAME_ATTEMPTS: u32 = 5;

/// Backoff before the second rename attempt; doubles per attempt, jittered.
const RENAME_BACKOFF_MS: u64 = 100;

/// Receiver for bundling progress notifications.
pub trait ProgressSink: Send + Sync {
    /// Called with a human-readable progress message.
    fn notify(&self, message: &str);
}

/// Progress sink that discards all notifications.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn notify(&self, _message: &str) {}
}

/// Bundler producing deterministic, atomically-published tar archives.
#[derive(Debug, Default)]
pub struct AssetBundler;

impl AssetBundler {
    /// Creates a new bundler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Bundles `source` into an archive at `destination`.
    ///
    /// Files are enumerated in deterministic lexical order, following
    /// symbolic links and excluding directory entries themselves. Repeated
    /// calls with identical directory contents produce byte-identical
    /// archives regardless of filesystem timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing, any filesystem operation
    /// fails, or the atomic-publish rename stays blocked by a transient busy
    /// condition for all `RENAME_ATTEMPTS` attempts.
    pub async fn bundle(
        &self,
        source: &Path,
        destination: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let source_meta = match fs::metadata(source).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BundleError::SourceNotFound {
                    path: source.to_path_buf(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        if !source_meta.is_dir() {
            return Err(BundleError::SourceNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }

        info!(
            "Bundling {} into {}",
            source.display(),
            destination.display()
        );

        let archive = self.build_archive(source).await?;

        // Stage beside the destination, then publish atomically.
        let temp_path = destination.with_extension("tmp");
        write_staged(&temp_path, &archive).await?;
        publish(&temp_path, destination, progress, &TokioRenameFs).await?;

        debug!("Published archive: {}", destination.display());
        Ok(())
    }

    /// Computes the hex sha256 fingerprint of a published archive.
    ///
    /// Because archive bytes are content-deterministic, equal directory
    /// trees yield equal fingerprints.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read.
    pub async fn fingerprint(&self, archive_path: &Path) -> Result<String> {
        let bytes = fs::read(archive_path).await?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Builds the archive bytes for every file under `source`.
    async fn build_archive(&self, source: &Path) -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());

        for entry in WalkDir::new(source)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                BundleError::archive_io(source, format!("Failed to enumerate source: {e}"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| BundleError::archive_io(entry.path(), e.to_string()))?
                .to_path_buf();
            let metadata = entry.metadata().map_err(|e| {
                BundleError::archive_io(entry.path(), format!("Failed to stat file: {e}"))
            })?;
            let bytes = fs::read(entry.path()).await?;

            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(file_mode(&metadata));
            header.set_mtime(FIXED_MTIME);
            builder
                .append_data(&mut header, &relative, bytes.as_slice())
                .map_err(|e| BundleError::archive_io(&relative, e.to_string()))?;

            debug!("Archived {}", relative.display());
        }

        builder
            .into_inner()
            .map_err(|e| BundleError::archive_io(source, e.to_string()).into())
    }
}

/// Writes the staged archive and flushes it to disk.
async fn write_staged(temp_path: &Path, archive: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp_path).await.map_err(|e| {
        BundleError::archive_io(temp_path, format!("Failed to create staging file: {e}"))
    })?;
    file.write_all(archive).await.map_err(|e| {
        BundleError::archive_io(temp_path, format!("Failed to write staging file: {e}"))
    })?;
    file.sync_all().await.map_err(|e| {
        BundleError::archive_io(temp_path, format!("Failed to sync staging file: {e}"))
    })?;
    Ok(())
}

/// Rename seam for the atomic-publish step.
#[async_trait]
trait RenameFs: Send + Sync {
    /// Renames `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;
}

/// Production rename backed by the real filesystem.
struct TokioRenameFs;

#[async_trait]
impl RenameFs for TokioRenameFs {
    async fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        fs::rename(from, to).await
    }
}

/// Publishes the staged archive via atomic rename, retrying transient busy
/// failures with jittered doubling backoff.
async fn publish(
    temp_path: &Path,
    destination: &Path,
    progress: &dyn ProgressSink,
    renamer: &dyn RenameFs,
) -> Result<()> {
    let mut attempt = 1;
    loop {
        match renamer.rename(temp_path, destination).await {
            Ok(()) => return Ok(()),
            Err(e) if is_transient_rename_error(&e) => {
                if attempt >= RENAME_ATTEMPTS {
                    let _ = fs::remove_file(temp_path).await;
                    return Err(BundleError::RenameRetriesExhausted {
                        attempts: attempt,
                        path: destination.to_path_buf(),
                    }
                    .into());
                }
                let delay = backoff_delay(attempt);
                warn!(
                    "Destination busy, retrying publish of {} in {:?} (attempt {attempt} of {RENAME_ATTEMPTS})",
                    destination.display(),
                    delay
                );
                progress.notify(&format!(
                    "retrying publish of {} (attempt {attempt} of {RENAME_ATTEMPTS})",
                    destination.display()
                ));
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                let _ = fs::remove_file(temp_path).await;
                return Err(e.into());
            }
        }
    }
}

/// Returns true for the transient "resource busy/locked" rename failures
/// worth retrying (e.g. a concurrent scanner holding the file open).
fn is_transient_rename_error(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::ResourceBusy | ErrorKind::WouldBlock
    )
}

/// Jittered doubling backoff starting near `RENAME_BACKOFF_MS`.
fn backoff_delay(attempt: u32) -> Duration {
    let base = RENAME_BACKOFF_MS.saturating_mul(1_u64 << (attempt - 1));
    let jitter: f64 = rand::thread_rng().gen_range(0.5..1.5);
    Duration::from_millis((base as f64 * jitter) as u64)
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}

/// Staging path helper exposed for callers that need to clean up after an
/// aborted run.
#[must_use]
pub fn staging_path(destination: &Path) -> PathBuf {
    destination.with_extension("tmp")
}
