//! Text extraction from uploaded PDFs.
//!
//! `pdf-extract` reads from a path, so the upload is written to a `NamedTempFile` inside the
//! upload directory. The file is created, parsed and removed on one blocking thread: it is
//! closed explicitly on success and dropped (which deletes it) on error or panic.

use super::AcquisitionError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `bytes` to a scoped temporary file and return the text of all pages in page order.
pub(super) async fn extract_upload(
    upload_dir: &Path,
    bytes: Vec<u8>,
) -> Result<String, AcquisitionError> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let dir = upload_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(dir, &bytes))
        .await
        .map_err(|error| AcquisitionError::Join(error.to_string()))?
}

fn extract_blocking(dir: PathBuf, bytes: &[u8]) -> Result<String, AcquisitionError> {
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".pdf")
        .tempfile_in(&dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    tracing::debug!(path = %file.path().display(), bytes = bytes.len(), "Upload staged");

    let pages = pdf_extract::extract_text_by_pages(file.path())
        .map_err(|error| AcquisitionError::Pdf(error.to_string()))?;
    file.close()?;

    tracing::debug!(pages = pages.len(), "PDF pages extracted");
    Ok(pages.concat())
}
