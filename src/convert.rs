//! One-call conversion entry points.
//!
//! These wrap [`ConversionJobRunner`] for callers that just want the
//! workbook: the real service, credentials from the process environment, and
//! events going to the caller's own subscriber. Build a runner directly to
//! substitute the service, the credential source, or the log sink.

use crate::config::ConversionConfig;
use crate::error::ConversionError;
use crate::request::ConversionRequest;
use crate::runner::ConversionJobRunner;
use std::path::{Path, PathBuf};

/// Convert `source` and write the workbook into `output_dir`.
///
/// # Returns
/// The path of the written workbook.
///
/// # Example
/// ```rust,no_run
/// use pdf2xlsx::{convert, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Reads PDF_SERVICES_CLIENT_ID / PDF_SERVICES_CLIENT_SECRET
/// let config = ConversionConfig::default();
/// let path = convert("statement.pdf", "out", &config).await?;
/// println!("saved {}", path.display());
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    source: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<PathBuf, ConversionError> {
    let request = ConversionRequest::new(source.as_ref(), output_dir.as_ref());
    ConversionJobRunner::new(config.clone()).run(&request).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary single-threaded tokio runtime internally.
pub fn convert_sync(
    source: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<PathBuf, ConversionError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ConversionError::Unexpected(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(source, output_dir, config))
}
