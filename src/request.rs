//! The conversion request: which PDF to convert and where the result goes.
//!
//! Output-directory resolution follows three rules:
//!
//! 1. An explicit `--output` directory is used as given.
//! 2. Otherwise, if the input path has a directory component, the workbook is
//!    written next to the input.
//! 3. Otherwise (a bare file name) both the input and the output are resolved
//!    against the program's own directory.

use crate::config::OutputNaming;
use crate::error::ConversionError;
use std::path::{Path, PathBuf};

/// Input PDF and output directory for one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    source_path: PathBuf,
    output_directory: PathBuf,
}

impl ConversionRequest {
    /// Build a request from already-resolved paths.
    pub fn new(source_path: impl Into<PathBuf>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_directory: output_directory.into(),
        }
    }

    /// Build a request from CLI-style input, applying the resolution rules
    /// described in the module docs.
    pub fn resolve(file: impl AsRef<Path>, output: Option<&Path>, program_dir: &Path) -> Self {
        let file = file.as_ref();
        let bare = file.parent().map_or(true, |p| p.as_os_str().is_empty());

        let source_path = if bare && output.is_none() {
            program_dir.join(file)
        } else {
            file.to_path_buf()
        };

        let output_directory = match output {
            Some(dir) => dir.to_path_buf(),
            None if bare => program_dir.to_path_buf(),
            None => file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| program_dir.to_path_buf()),
        };

        Self {
            source_path,
            output_directory,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Full path of the workbook this request produces.
    pub fn output_path(&self, naming: OutputNaming) -> PathBuf {
        self.output_directory
            .join(naming.file_name(&self.source_path))
    }
}

/// Directory containing the running executable.
pub fn program_dir() -> Result<PathBuf, ConversionError> {
    let exe = std::env::current_exe()
        .map_err(|e| ConversionError::Unexpected(format!("cannot locate executable: {e}")))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ConversionError::Unexpected("executable has no parent directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_input_directory() {
        let req = ConversionRequest::resolve("docs/in/foo.pdf", None, Path::new("/opt/tool"));
        assert_eq!(req.source_path(), Path::new("docs/in/foo.pdf"));
        assert_eq!(req.output_directory(), Path::new("docs/in"));
    }

    #[test]
    fn bare_file_name_resolves_against_program_dir() {
        let req = ConversionRequest::resolve("foo.pdf", None, Path::new("/opt/tool"));
        assert_eq!(req.source_path(), Path::new("/opt/tool/foo.pdf"));
        assert_eq!(req.output_directory(), Path::new("/opt/tool"));
    }

    #[test]
    fn explicit_output_wins() {
        let req = ConversionRequest::resolve(
            "/data/foo.pdf",
            Some(Path::new("/tmp/out")),
            Path::new("/opt/tool"),
        );
        assert_eq!(req.source_path(), Path::new("/data/foo.pdf"));
        assert_eq!(req.output_directory(), Path::new("/tmp/out"));
    }

    #[test]
    fn explicit_output_leaves_bare_input_untouched() {
        let req = ConversionRequest::resolve("foo.pdf", Some(Path::new("out")), Path::new("/opt"));
        assert_eq!(req.source_path(), Path::new("foo.pdf"));
        assert_eq!(req.output_directory(), Path::new("out"));
    }

    #[test]
    fn output_path_uses_naming() {
        let req = ConversionRequest::new("/data/invoice.pdf", "/tmp/out");
        assert_eq!(
            req.output_path(OutputNaming::Fixed),
            Path::new("/tmp/out/processed_Excel.xlsx")
        );
        assert_eq!(
            req.output_path(OutputNaming::FromInput),
            Path::new("/tmp/out/invoice.xlsx")
        );
    }

    #[test]
    fn program_dir_is_a_directory() {
        let dir = program_dir().unwrap();
        assert!(dir.is_dir(), "{}", dir.display());
    }
}
