//! Output stage: write the downloaded workbook into the output directory.

use crate::error::ConversionError;
use std::path::Path;
use tracing::debug;

/// Write `bytes` to `path`, creating `path`'s directory (and any missing
/// parents) first.
///
/// An existing file at `path` is replaced. The bytes go to a temporary
/// sibling first and are renamed into place, so an interrupted write never
/// leaves a truncated workbook behind.
pub async fn persist(bytes: &[u8], path: &Path) -> Result<(), ConversionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ConversionError::io(parent, e))?;
    }

    let tmp_path = path.with_extension("xlsx.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| ConversionError::io(&tmp_path, e))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(ConversionError::io(path, e));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c/processed_Excel.xlsx");

        persist(b"PK\x03\x04", &target).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"PK\x03\x04");
    }

    #[tokio::test]
    async fn overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("processed_Excel.xlsx");

        persist(b"first run, longer content", &target).await.unwrap();
        persist(b"second", &target).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["processed_Excel.xlsx"]);
    }

    #[tokio::test]
    async fn parent_that_is_a_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = persist(b"x", &blocker.join("out.xlsx")).await.unwrap_err();
        assert!(matches!(err, ConversionError::Io { .. }));
    }
}
