//! The conversion job runner: one PDF in, one workbook out.
//!
//! ## Steps
//!
//! ```text
//! validate ─▶ read ─▶ credentials ─▶ connect ─▶ upload ─▶ submit ─▶ await ─▶ download ─▶ persist
//! ```
//!
//! Each step either succeeds or ends the run; nothing is retried and there is
//! no partial success. [`ConversionJobRunner::run`] returns the failure as a
//! [`ConversionError`]. [`ConversionJobRunner::execute`] additionally logs it
//! under its category and folds it into a [`RunOutcome`], which is what the
//! binary turns into an exit code.
//!
//! Logging goes to the [`tracing::Dispatch`] given to
//! [`ConversionJobRunner::with_log`], attached to the run's own future. With
//! no dispatch the events go to whatever subscriber the caller has installed.

use crate::config::{ConversionConfig, FailurePolicy};
use crate::credentials::{process_env, Credentials, EnvLookup};
use crate::error::ConversionError;
use crate::pipeline::{input, output};
use crate::progress::Stage;
use crate::request::ConversionRequest;
use crate::service::{PdfServicesConnector, ServiceConnector, PDF_MEDIA_TYPE};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, Dispatch};

/// Orchestrates a single document conversion.
pub struct ConversionJobRunner {
    config: ConversionConfig,
    connector: Arc<dyn ServiceConnector>,
    env: EnvLookup,
    log: Option<Dispatch>,
}

impl ConversionJobRunner {
    /// A runner talking to the real service with credentials from the
    /// process environment.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            connector: Arc::new(PdfServicesConnector),
            env: process_env(),
            log: None,
        }
    }

    /// Use `connector` to build the service instead of the HTTP client.
    pub fn with_connector(mut self, connector: Arc<dyn ServiceConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Read credentials through `lookup` instead of the process environment.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Send this runner's log events to `dispatch`.
    pub fn with_log(mut self, dispatch: Dispatch) -> Self {
        self.log = Some(dispatch);
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Run the conversion, returning the path of the written workbook.
    pub async fn run(&self, request: &ConversionRequest) -> Result<PathBuf, ConversionError> {
        self.scoped(self.run_steps(request)).await
    }

    /// Run the conversion and log any failure instead of returning it.
    pub async fn execute(&self, request: &ConversionRequest) -> RunOutcome {
        self.scoped(async {
            match self.run_steps(request).await {
                Ok(path) => RunOutcome::Converted(path),
                Err(e) => {
                    error!("{}: {}", e.category(), e);
                    RunOutcome::Failed(e)
                }
            }
        })
        .await
    }

    async fn scoped<F: Future>(&self, fut: F) -> F::Output {
        match &self.log {
            Some(dispatch) => fut.with_subscriber(dispatch.clone()).await,
            None => fut.await,
        }
    }

    async fn run_steps(&self, request: &ConversionRequest) -> Result<PathBuf, ConversionError> {
        let source = request.source_path();
        info!("Starting PDF to Excel conversion with OCR");

        self.stage(Stage::Validate, input::validate_source(source))
            .await?;
        info!("Processing PDF file: {}", source.display());

        let content = self.stage(Stage::ReadInput, input::read_source(source)).await?;
        info!("PDF file read successfully ({} bytes)", content.len());

        let credentials = self
            .stage(Stage::Credentials, async {
                Credentials::from_lookup(|name| (self.env)(name))
            })
            .await?;
        info!("Credentials loaded for client {}", credentials.client_id());

        let service = self
            .stage(Stage::Authenticate, async {
                self.connector.connect(credentials, &self.config)
            })
            .await?;
        info!("PDF Services client created");

        info!("Uploading the PDF file to PDF Services");
        let asset = self
            .stage(Stage::Upload, service.upload(content, PDF_MEDIA_TYPE))
            .await?;
        info!("PDF file uploaded successfully");

        let params = self.config.export;
        info!(
            "Submitting export job (format {:?}, OCR locale {:?})",
            params.target_format, params.ocr_locale
        );
        let location = self
            .stage(Stage::Submit, service.submit(&asset, &params))
            .await?;
        info!("Job submitted successfully. Location: {location}");

        info!("Fetching the job result");
        let result = self
            .stage(Stage::AwaitResult, service.await_result(&location))
            .await?;
        info!("Job result fetched successfully");

        let workbook = self
            .stage(Stage::Download, service.get_content(result.asset()))
            .await?;
        info!("Content retrieved successfully ({} bytes)", workbook.len());

        let output_path = request.output_path(self.config.output_naming);
        self.stage(Stage::Persist, output::persist(&workbook, &output_path))
            .await?;
        info!("Excel file saved at: {}", output_path.display());

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_complete(&output_path);
        }
        Ok(output_path)
    }

    /// Await one step, reporting it to the progress callback.
    async fn stage<T, F>(&self, stage: Stage, step: F) -> Result<T, ConversionError>
    where
        F: Future<Output = Result<T, ConversionError>>,
    {
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_stage_start(stage);
        }
        let result = step.await;
        if let Some(cb) = cb {
            match &result {
                Ok(_) => cb.on_stage_complete(stage),
                Err(e) => cb.on_stage_error(stage, &e.to_string()),
            }
        }
        result
    }
}

/// What a run produced, as reported by [`ConversionJobRunner::execute`].
#[derive(Debug)]
pub enum RunOutcome {
    /// The workbook was written to this path.
    Converted(PathBuf),
    /// The run stopped at this error.
    Failed(ConversionError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Converted(_))
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            RunOutcome::Converted(path) => Some(path),
            RunOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ConversionError> {
        match self {
            RunOutcome::Converted(_) => None,
            RunOutcome::Failed(e) => Some(e),
        }
    }

    /// Process exit code for this outcome under `policy`.
    pub fn exit_code(&self, policy: FailurePolicy) -> u8 {
        match (self, policy) {
            (RunOutcome::Converted(_), _) | (_, FailurePolicy::Silent) => 0,
            (RunOutcome::Failed(e), FailurePolicy::Report) => e.exit_code(),
        }
    }

    pub fn into_result(self) -> Result<PathBuf, ConversionError> {
        match self {
            RunOutcome::Converted(path) => Ok(path),
            RunOutcome::Failed(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OcrLocale, OutputNaming, TargetFormat};
    use crate::credentials::{CLIENT_ID_VAR, CLIENT_SECRET_VAR};
    use crate::error::ServiceFault;
    use crate::logging::{LogBuffer, RunLog};
    use crate::progress::ConversionProgressCallback;
    use crate::service::{
        DocumentService, ExportResult, MockDocumentService, MockServiceConnector, RemoteAsset,
        RemoteJobLocation,
    };
    use std::sync::Mutex;
    use tracing_subscriber::filter::LevelFilter;

    const WORKBOOK: &[u8] = b"PK\x03\x04 fake workbook";

    fn with_credentials(name: &str) -> Option<String> {
        match name {
            CLIENT_ID_VAR => Some("client-id".into()),
            CLIENT_SECRET_VAR => Some("client-secret".into()),
            _ => None,
        }
    }

    fn pdf_in(dir: &Path) -> PathBuf {
        let path = dir.join("statement.pdf");
        std::fs::write(&path, b"%PDF-1.7 test").unwrap();
        path
    }

    fn happy_service() -> MockDocumentService {
        let mut service = MockDocumentService::new();
        service
            .expect_upload()
            .withf(|content, media_type| {
                content.as_slice() == b"%PDF-1.7 test" && media_type.to_string() == PDF_MEDIA_TYPE
            })
            .times(1)
            .returning(|_, _| Ok(RemoteAsset::new("asset-in")));
        service
            .expect_submit()
            .withf(|asset, params| {
                asset.asset_id() == "asset-in"
                    && params.target_format == TargetFormat::Xlsx
                    && params.ocr_locale == OcrLocale::EnUs
            })
            .times(1)
            .returning(|_, _| Ok(RemoteJobLocation::new("https://svc/status/1")));
        service
            .expect_await_result()
            .times(1)
            .returning(|_| Ok(ExportResult::new(RemoteAsset::new("asset-out"))));
        service
            .expect_get_content()
            .withf(|asset| asset.asset_id() == "asset-out")
            .times(1)
            .returning(|_| Ok(WORKBOOK.to_vec()));
        service
    }

    fn connector_for(service: MockDocumentService) -> Arc<MockServiceConnector> {
        let mut connector = MockServiceConnector::new();
        connector
            .expect_connect()
            .withf(|creds, _| creds.client_id() == "client-id")
            .times(1)
            .return_once(move |_, _| Ok(Arc::new(service) as Arc<dyn DocumentService>));
        Arc::new(connector)
    }

    #[tokio::test]
    async fn writes_downloaded_bytes_to_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(pdf_in(dir.path()), dir.path().join("out"));

        let runner = ConversionJobRunner::new(ConversionConfig::default())
            .with_connector(connector_for(happy_service()))
            .with_env_lookup(with_credentials);
        let path = runner.run(&request).await.unwrap();

        assert_eq!(path, dir.path().join("out/processed_Excel.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), WORKBOOK);
    }

    #[tokio::test]
    async fn input_naming_derives_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(pdf_in(dir.path()), dir.path());
        let config = ConversionConfig::builder()
            .output_naming(OutputNaming::FromInput)
            .build()
            .unwrap();

        let runner = ConversionJobRunner::new(config)
            .with_connector(connector_for(happy_service()))
            .with_env_lookup(with_credentials);
        let path = runner.run(&request).await.unwrap();

        assert_eq!(path, dir.path().join("statement.xlsx"));
    }

    #[tokio::test]
    async fn missing_credentials_never_connect() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(pdf_in(dir.path()), dir.path());

        let mut connector = MockServiceConnector::new();
        connector.expect_connect().never();

        let runner = ConversionJobRunner::new(ConversionConfig::default())
            .with_connector(Arc::new(connector))
            .with_env_lookup(|_| None);
        let err = runner.run(&request).await.unwrap_err();

        assert!(matches!(err, ConversionError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn submit_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(pdf_in(dir.path()), dir.path());

        let mut service = MockDocumentService::new();
        service
            .expect_upload()
            .returning(|_, _| Ok(RemoteAsset::new("asset-in")));
        service.expect_submit().returning(|_, _| {
            Err(ServiceFault::api(Some(400), Some("BAD_PDF".into()), "corrupt").into())
        });
        service.expect_await_result().never();
        service.expect_get_content().never();

        let runner = ConversionJobRunner::new(ConversionConfig::default())
            .with_connector(connector_for(service))
            .with_env_lookup(with_credentials);
        let err = runner.run(&request).await.unwrap_err();

        assert!(matches!(err, ConversionError::Service(_)));
        assert!(!dir.path().join("processed_Excel.xlsx").exists());
    }

    #[tokio::test]
    async fn timeout_is_reported_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(pdf_in(dir.path()), dir.path());

        let mut service = MockDocumentService::new();
        service
            .expect_upload()
            .returning(|_, _| Ok(RemoteAsset::new("asset-in")));
        service
            .expect_submit()
            .returning(|_, _| Ok(RemoteJobLocation::new("loc")));
        service.expect_await_result().returning(|_| {
            Err(ConversionError::ServiceTimeout {
                operation: "export job".into(),
                secs: 600,
            })
        });
        service.expect_get_content().never();

        let buffer = LogBuffer::new();
        let log = RunLog::to_writer(buffer.clone(), LevelFilter::INFO);
        let runner = ConversionJobRunner::new(ConversionConfig::default())
            .with_connector(connector_for(service))
            .with_env_lookup(with_credentials)
            .with_log(log.dispatch());

        let outcome = runner.execute(&request).await;

        assert!(matches!(
            outcome.error(),
            Some(ConversionError::ServiceTimeout { .. })
        ));
        assert_eq!(outcome.exit_code(FailurePolicy::Report), 7);
        assert_eq!(outcome.exit_code(FailurePolicy::Silent), 0);
        let logged = buffer.contents();
        assert!(logged.contains("ERROR"), "{logged}");
        assert!(logged.contains("PDF Services timeout"), "{logged}");
        assert!(logged.contains("Job submitted successfully"), "{logged}");
    }

    #[derive(Default)]
    struct StageLog(Mutex<Vec<String>>);

    impl ConversionProgressCallback for StageLog {
        fn on_stage_complete(&self, stage: Stage) {
            self.0.lock().unwrap().push(format!("ok {stage:?}"));
        }

        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.0.lock().unwrap().push(format!("err {stage:?}"));
        }
    }

    #[tokio::test]
    async fn progress_callback_sees_every_stage_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(pdf_in(dir.path()), dir.path());
        let stages = Arc::new(StageLog::default());
        let config = ConversionConfig::builder()
            .progress_callback(stages.clone())
            .build()
            .unwrap();

        ConversionJobRunner::new(config)
            .with_connector(connector_for(happy_service()))
            .with_env_lookup(with_credentials)
            .run(&request)
            .await
            .unwrap();

        let expected: Vec<String> = Stage::ALL.iter().map(|s| format!("ok {s:?}")).collect();
        assert_eq!(*stages.0.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn progress_callback_sees_failing_stage() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest::new(dir.path().join("absent.pdf"), dir.path());
        let stages = Arc::new(StageLog::default());
        let config = ConversionConfig::builder()
            .progress_callback(stages.clone())
            .build()
            .unwrap();

        let mut connector = MockServiceConnector::new();
        connector.expect_connect().never();
        let err = ConversionJobRunner::new(config)
            .with_connector(Arc::new(connector))
            .with_env_lookup(with_credentials)
            .run(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::InputNotFound { .. }));
        assert_eq!(*stages.0.lock().unwrap(), vec!["err Validate"]);
    }

    #[test]
    fn outcome_accessors() {
        let ok = RunOutcome::Converted(PathBuf::from("/out/processed_Excel.xlsx"));
        assert!(ok.is_success());
        assert_eq!(ok.exit_code(FailurePolicy::Report), 0);
        assert_eq!(
            ok.output_path(),
            Some(Path::new("/out/processed_Excel.xlsx"))
        );

        let failed = RunOutcome::Failed(ConversionError::InputNotFound {
            path: "x.pdf".into(),
        });
        assert!(!failed.is_success());
        assert_eq!(failed.exit_code(FailurePolicy::Report), 3);
        assert!(failed.into_result().is_err());
    }
}
