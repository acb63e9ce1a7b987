//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to follow a
//! run as it moves through its stages. The `pdf2xlsx` binary uses this to
//! drive its terminal spinner; library callers can forward the events
//! anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf2xlsx::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl ConversionProgressCallback for PrintStages {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("{}…", stage.label());
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The steps of a conversion run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    ReadInput,
    Credentials,
    Authenticate,
    Upload,
    Submit,
    AwaitResult,
    Download,
    Persist,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 9] = [
        Stage::Validate,
        Stage::ReadInput,
        Stage::Credentials,
        Stage::Authenticate,
        Stage::Upload,
        Stage::Submit,
        Stage::AwaitResult,
        Stage::Download,
        Stage::Persist,
    ];

    /// Human-readable description shown by progress displays.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Validate => "Checking input file",
            Stage::ReadInput => "Reading PDF",
            Stage::Credentials => "Loading credentials",
            Stage::Authenticate => "Creating service client",
            Stage::Upload => "Uploading PDF",
            Stage::Submit => "Submitting export job",
            Stage::AwaitResult => "Waiting for export job",
            Stage::Download => "Downloading workbook",
            Stage::Persist => "Saving workbook",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the runner as it enters and leaves each [`Stage`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage fails. No further stages run afterwards.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the output file has been written.
    fn on_conversion_complete(&self, output_path: &Path) {
        let _ = output_path;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage:?}"));
        }

        fn on_stage_error(&self, stage: Stage, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {stage:?}: {error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Upload);
        cb.on_stage_complete(Stage::Upload);
        cb.on_stage_error(Stage::Submit, "rejected");
        cb.on_conversion_complete(Path::new("out.xlsx"));
    }

    #[test]
    fn defaults_let_partial_implementations_compile() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Validate);
        rec.on_stage_complete(Stage::Validate);
        rec.on_stage_error(Stage::ReadInput, "denied");
        assert_eq!(
            *rec.events.lock().unwrap(),
            vec!["start Validate", "error ReadInput: denied"]
        );
    }

    #[test]
    fn stages_are_listed_in_order_with_distinct_labels() {
        assert_eq!(Stage::ALL.first(), Some(&Stage::Validate));
        assert_eq!(Stage::ALL.last(), Some(&Stage::Persist));
        let mut labels: Vec<_> = Stage::ALL.iter().map(|s| s.label()).collect();
        labels.dedup();
        assert_eq!(labels.len(), Stage::ALL.len());
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::AwaitResult);
    }
}
