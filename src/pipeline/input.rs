//! Input stage: check the source PDF and load it into memory.
//!
//! The whole document is read at once; the service upload takes a single
//! body and PDFs sent for export are bounded by the service's own size limit.

use crate::error::ConversionError;
use std::path::Path;
use tracing::debug;

/// Fail with [`ConversionError::InputNotFound`] unless `path` is a readable
/// regular file.
pub async fn validate_source(path: &Path) -> Result<(), ConversionError> {
    let not_found = || ConversionError::InputNotFound {
        path: path.to_path_buf(),
    };

    let meta = tokio::fs::metadata(path).await.map_err(|_| not_found())?;
    if !meta.is_file() {
        return Err(not_found());
    }

    // Check read permission by attempting to open
    tokio::fs::File::open(path).await.map_err(|_| not_found())?;

    debug!("Validated source PDF: {}", path.display());
    Ok(())
}

/// Read the entire source file.
pub async fn read_source(path: &Path) -> Result<Vec<u8>, ConversionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ConversionError::io(path, e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}
