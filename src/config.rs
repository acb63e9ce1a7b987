//! Configuration types for PDF-to-Excel conversion.
//!
//! All run behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. The export parameters themselves are fixed
//! (XLSX, English OCR); what callers tune is where the service lives, how
//! long to wait for it, how the output file is named, and how failures are
//! reported to the invoking process.

use crate::error::ConversionError;
use crate::progress::ProgressCallback;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default PDF Services endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://pdf-services.adobe.io";

/// Output file name used by [`OutputNaming::Fixed`].
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "processed_Excel.xlsx";

/// Configuration for a single conversion run.
///
/// # Example
/// ```rust
/// use pdf2xlsx::{ConversionConfig, FailurePolicy, OutputNaming};
///
/// let config = ConversionConfig::builder()
///     .poll_interval_ms(500)
///     .poll_timeout_secs(300)
///     .output_naming(OutputNaming::FromInput)
///     .failure_policy(FailurePolicy::Silent)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Base URL of the PDF Services API. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Delay between job-status polls in milliseconds. Default: 2000.
    ///
    /// A `retry-after` header on the status response takes precedence.
    pub poll_interval_ms: u64,

    /// How long to wait for the export job before giving up, in seconds.
    /// Default: 600.
    pub poll_timeout_secs: u64,

    /// Per-HTTP-request timeout in seconds. Default: 120.
    pub request_timeout_secs: u64,

    /// Export job parameters. Always XLSX with en-US OCR.
    pub export: ExportParams,

    /// How the output file is named. Default: [`OutputNaming::Fixed`].
    pub output_naming: OutputNaming,

    /// How a failed run is reported to the invoking process.
    /// Default: [`FailurePolicy::Report`].
    pub failure_policy: FailurePolicy,

    /// Receives stage start/complete/error events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval_ms: 2000,
            poll_timeout_secs: 600,
            request_timeout_secs: 120,
            export: ExportParams::default(),
            output_naming: OutputNaming::default(),
            failure_policy: FailurePolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("endpoint", &self.endpoint)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("export", &self.export)
            .field("output_naming", &self.output_naming)
            .field("failure_policy", &self.failure_policy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(10);
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn output_naming(mut self, naming: OutputNaming) -> Self {
        self.config.output_naming = naming;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConversionError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(ConversionError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.poll_timeout_secs == 0 {
            return Err(ConversionError::InvalidConfig(
                "poll timeout must be ≥ 1 second".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(ConversionError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Document format the export job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TargetFormat {
    /// Excel workbook.
    #[default]
    #[serde(rename = "xlsx")]
    Xlsx,
}

impl TargetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Xlsx => "xlsx",
        }
    }
}

/// Language hint for OCR during export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OcrLocale {
    /// English (United States).
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
}

/// Parameters of the export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub target_format: TargetFormat,
    #[serde(rename = "ocrLang")]
    pub ocr_locale: OcrLocale,
}

/// How the output file inside the output directory is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// Always `processed_Excel.xlsx`; a later run overwrites an earlier one. (default)
    #[default]
    Fixed,
    /// `<input stem>.xlsx`, so converting several PDFs into one directory
    /// keeps every result.
    FromInput,
}

impl OutputNaming {
    /// File name for the output produced from `source`.
    pub fn file_name(self, source: &Path) -> String {
        match self {
            OutputNaming::Fixed => DEFAULT_OUTPUT_FILE_NAME.to_string(),
            OutputNaming::FromInput => match source.file_stem() {
                Some(stem) if !stem.is_empty() => format!(
                    "{}.{}",
                    stem.to_string_lossy(),
                    TargetFormat::Xlsx.extension()
                ),
                _ => DEFAULT_OUTPUT_FILE_NAME.to_string(),
            },
        }
    }
}

/// How the binary reports a failed run to its invoker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Exit with the error's [`ConversionError::exit_code`]. (default)
    #[default]
    Report,
    /// Log the failure and exit 0, for fire-and-forget scheduled runs.
    Silent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.poll_interval(), Duration::from_secs(2));
        assert_eq!(c.poll_timeout(), Duration::from_secs(600));
        assert_eq!(c.output_naming, OutputNaming::Fixed);
        assert_eq!(c.failure_policy, FailurePolicy::Report);
    }

    #[test]
    fn builder_strips_trailing_slash() {
        let c = ConversionConfig::builder()
            .endpoint("http://127.0.0.1:9000/")
            .build()
            .unwrap();
        assert_eq!(c.endpoint, "http://127.0.0.1:9000");
    }

    #[test]
    fn builder_rejects_non_http_endpoint() {
        let err = ConversionConfig::builder()
            .endpoint("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConversionError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeouts() {
        assert!(ConversionConfig::builder().poll_timeout_secs(0).build().is_err());
        assert!(ConversionConfig::builder().request_timeout_secs(0).build().is_err());
    }

    #[test]
    fn export_params_wire_format() {
        let json = serde_json::to_value(ExportParams::default()).unwrap();
        assert_eq!(json["targetFormat"], "xlsx");
        assert_eq!(json["ocrLang"], "en-US");
    }

    #[test]
    fn fixed_naming_ignores_input() {
        let name = OutputNaming::Fixed.file_name(Path::new("/data/report.pdf"));
        assert_eq!(name, "processed_Excel.xlsx");
    }

    #[test]
    fn input_naming_uses_stem() {
        let name = OutputNaming::FromInput.file_name(Path::new("/data/q3 report.pdf"));
        assert_eq!(name, "q3 report.xlsx");
    }
}
