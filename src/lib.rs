//! # pdf2xlsx
//!
//! Convert a PDF document into an Excel workbook using the PDF Services
//! export API.
//!
//! The crate does no document processing of its own. It drives one export
//! job from start to finish and gets the bytes on and off disk:
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Validate     input is a readable regular file
//!  ├─ 2. Read         whole file into memory
//!  ├─ 3. Credentials  PDF_SERVICES_CLIENT_ID / PDF_SERVICES_CLIENT_SECRET
//!  ├─ 4. Connect      build the service client (no network yet)
//!  ├─ 5. Upload       POST /assets + PUT bytes as application/pdf
//!  ├─ 6. Submit       export job: XLSX, OCR locale en-US
//!  ├─ 7. Await        poll the job until done / failed / deadline
//!  ├─ 8. Download     fetch the produced workbook
//!  └─ 9. Persist      <output dir>/processed_Excel.xlsx (overwritten)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2xlsx::{ConversionConfig, ConversionJobRunner, ConversionRequest};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ConversionJobRunner::new(ConversionConfig::default());
//!     let request = ConversionRequest::new("invoices/march.pdf", "invoices");
//!     let path = runner.run(&request).await?;
//!     println!("saved {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2xlsx` binary (clap + anyhow + indicatif + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod runner;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ExportParams, FailurePolicy, OcrLocale,
    OutputNaming, TargetFormat, DEFAULT_ENDPOINT, DEFAULT_OUTPUT_FILE_NAME,
};
pub use convert::{convert, convert_sync};
pub use credentials::{Credentials, CLIENT_ID_VAR, CLIENT_SECRET_VAR};
pub use error::{ConversionError, FaultKind, ServiceFault};
pub use logging::{LogBuffer, RunLog};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use request::{program_dir, ConversionRequest};
pub use runner::{ConversionJobRunner, RunOutcome};
pub use service::{
    DocumentService, ExportResult, JobStatus, PdfServicesClient, PdfServicesConnector, RemoteAsset,
    RemoteJobLocation, ServiceConnector, PDF_MEDIA_TYPE,
};
