//! Temporary upload handling and collection id derivation.
//!
//! Uploaded PDFs are parked in a shared uploads directory for the duration of one
//! ingestion request and removed unconditionally afterwards via [`SavedUpload`]'s
//! `Drop` implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Derive the collection identifier for an uploaded file.
///
/// The id is `rag_{filename-stem}_{timestamp}` where the timestamp is the modification
/// time of the shared uploads directory in unix seconds, falling back to `0` when the
/// directory does not exist yet. Call this before creating the directory so the first
/// upload observes the fallback.
pub fn derive_collection_id(uploads_dir: &Path, filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = fs::metadata(uploads_dir)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format!("rag_{stem}_{timestamp}")
}

/// Handle to a file saved under the uploads directory.
///
/// The file is deleted when the handle is dropped, whether or not processing succeeded.
#[derive(Debug)]
pub struct SavedUpload {
    path: PathBuf,
}

impl SavedUpload {
    /// Path of the saved file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SavedUpload {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %error, "Failed to remove upload");
        }
    }
}

/// Persist uploaded bytes under the uploads directory, creating it if needed.
///
/// Only the final path component of `filename` is used, so caller-supplied names cannot
/// escape the uploads directory.
pub fn save_upload(uploads_dir: &Path, filename: &str, bytes: &[u8]) -> io::Result<SavedUpload> {
    fs::create_dir_all(uploads_dir)?;
    let name = Path::new(filename)
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty file name"))?;
    let path = uploads_dir.join(name);
    fs::write(&path, bytes)?;
    tracing::debug!(path = %path.display(), size = bytes.len(), "Saved upload");
    Ok(SavedUpload { path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collection_id_uses_zero_for_missing_directory() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("never-created");
        let id = derive_collection_id(&missing, "report.pdf");
        assert_eq!(id, "rag_report_0");
    }

    #[test]
    fn collection_id_uses_directory_mtime() {
        let dir = tempdir().expect("tempdir");
        let id = derive_collection_id(dir.path(), "Annual Report.pdf");
        let suffix = id
            .strip_prefix("rag_Annual Report_")
            .expect("expected rag_{stem}_{timestamp}");
        let timestamp: u64 = suffix.parse().expect("numeric timestamp");
        assert!(timestamp > 0);
    }

    #[test]
    fn saved_upload_is_removed_on_drop() {
        let dir = tempdir().expect("tempdir");
        let path = {
            let saved = save_upload(dir.path(), "doc.pdf", b"%PDF-1.4").expect("save");
            assert!(saved.path().exists());
            saved.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn save_upload_strips_path_components() {
        let dir = tempdir().expect("tempdir");
        let saved = save_upload(dir.path(), "../../etc/evil.pdf", b"data").expect("save");
        assert_eq!(saved.path().parent(), Some(dir.path()));
        assert_eq!(
            saved.path().file_name().and_then(|name| name.to_str()),
            Some("evil.pdf")
        );
    }
}
