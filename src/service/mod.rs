//! The remote document-processing service, seen from the runner.
//!
//! The runner only ever talks to a [`DocumentService`]: upload bytes, submit
//! an export job, wait for it, download the result. [`ServiceConnector`]
//! turns [`Credentials`] into a service without touching the network, so
//! authentication failures surface on the first real call.
//!
//! [`pdf_services::PdfServicesClient`] implements the trait over HTTP; tests
//! substitute stubs.

pub mod pdf_services;

use crate::config::{ConversionConfig, ExportParams};
use crate::credentials::Credentials;
use crate::error::{ConversionError, ServiceFault};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use pdf_services::PdfServicesClient;

/// MIME type declared for every upload.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Service-side handle to an uploaded or produced asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    asset_id: String,
    download_uri: Option<String>,
}

impl RemoteAsset {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            download_uri: None,
        }
    }

    /// Attach the pre-signed URL the asset's bytes can be fetched from.
    pub fn with_download_uri(mut self, uri: impl Into<String>) -> Self {
        self.download_uri = Some(uri.into());
        self
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn download_uri(&self) -> Option<&str> {
        self.download_uri.as_deref()
    }
}

/// Where the status of a submitted job can be polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteJobLocation(String);

impl RemoteJobLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteJobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a submitted export job, as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Done(RemoteAsset),
    Failed(ServiceFault),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

/// Outcome of a completed export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    asset: RemoteAsset,
}

impl ExportResult {
    pub fn new(asset: RemoteAsset) -> Self {
        Self { asset }
    }

    /// The produced workbook.
    pub fn asset(&self) -> &RemoteAsset {
        &self.asset
    }
}

/// The four calls a conversion run makes against the remote service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Upload `content` declared as `media_type`.
    async fn upload(
        &self,
        content: Vec<u8>,
        media_type: &str,
    ) -> Result<RemoteAsset, ConversionError>;

    /// Submit an export job for an uploaded asset.
    async fn submit(
        &self,
        asset: &RemoteAsset,
        params: &ExportParams,
    ) -> Result<RemoteJobLocation, ConversionError>;

    /// Block until the job at `location` is finished.
    ///
    /// Fails with `Service` if the job failed and `ServiceTimeout` if it did
    /// not finish within the client's deadline.
    async fn await_result(
        &self,
        location: &RemoteJobLocation,
    ) -> Result<ExportResult, ConversionError>;

    /// Download the bytes of `asset`.
    async fn get_content(&self, asset: &RemoteAsset) -> Result<Vec<u8>, ConversionError>;
}

/// Builds a [`DocumentService`] from credentials. Must not perform network I/O.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceConnector: Send + Sync {
    fn connect(
        &self,
        credentials: Credentials,
        config: &ConversionConfig,
    ) -> Result<Arc<dyn DocumentService>, ConversionError>;
}

/// Connects to the real PDF Services API at `config.endpoint`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfServicesConnector;

impl ServiceConnector for PdfServicesConnector {
    fn connect(
        &self,
        credentials: Credentials,
        config: &ConversionConfig,
    ) -> Result<Arc<dyn DocumentService>, ConversionError> {
        let client = PdfServicesClient::new(credentials, config)?;
        Ok(Arc::new(client))
    }
}
