//! HTTP client for the PDF Services REST API.
//!
//! ## Call sequence
//!
//! ```text
//! POST /token                  form client_id, client_secret   → access_token
//! POST /assets                 {mediaType}                     → uploadUri, assetID
//! PUT  <uploadUri>             raw bytes
//! POST /operation/exportpdf    {assetID, targetFormat, ocrLang} → 201 + location
//! GET  <location>              … until status is "done" | "failed"
//! GET  <downloadUri>           raw bytes
//! ```
//!
//! Authenticated calls carry `Authorization: Bearer <token>` and
//! `x-api-key: <client id>`. The pre-signed upload and download URLs take no
//! auth headers. The token is fetched on first use and reused until it is
//! about to expire, so constructing a client never touches the network.

use super::{DocumentService, ExportResult, JobStatus, RemoteAsset, RemoteJobLocation};
use crate::config::{ConversionConfig, ExportParams};
use crate::credentials::Credentials;
use crate::error::{ConversionError, ServiceFault};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Refresh the token when it has less than this left.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Token lifetime assumed when the service omits `expires_in`.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Longest error body excerpt carried into a fault message.
const MAX_ERROR_BODY: usize = 500;

/// [`DocumentService`] backed by the PDF Services REST API.
pub struct PdfServicesClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    poll_interval: Duration,
    poll_timeout: Duration,
    request_timeout: Duration,
    token: Mutex<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl PdfServicesClient {
    /// Create a client. Performs no network I/O.
    pub fn new(credentials: Credentials, config: &ConversionConfig) -> Result<Self, ConversionError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceFault::sdk(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            credentials,
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            request_timeout: config.request_timeout(),
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn access_token(&self) -> Result<String, ConversionError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        info!("Requesting PDF Services access token");
        let request = self.http.post(self.url("/token")).form(&[
            ("client_id", self.credentials.client_id()),
            ("client_secret", self.credentials.client_secret()),
        ]);
        let response = self.send(request, "authentication").await?;
        let body: TokenResponse = decode(response, "authentication").await?;

        let ttl = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        *cached = Some(AccessToken {
            value: body.access_token.clone(),
            expires_at: token_expiry(Instant::now(), ttl),
        });
        Ok(body.access_token)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ConversionError> {
        let token = self.access_token().await?;
        Ok(request
            .bearer_auth(token)
            .header("x-api-key", self.credentials.client_id()))
    }

    /// Send `request`, turning transport failures and non-2xx answers into
    /// [`ConversionError`]s.
    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response, ConversionError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e, operation))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let fault = fault_from_body(status, &body);
        warn!(%status, "{operation} failed: {fault}");
        Err(fault.into())
    }

    fn transport_error(&self, e: reqwest::Error, operation: &str) -> ConversionError {
        if e.is_timeout() {
            ConversionError::ServiceTimeout {
                operation: operation.to_string(),
                secs: self.request_timeout.as_secs(),
            }
        } else {
            ServiceFault::sdk(format!("{operation}: {e}")).into()
        }
    }

    fn poll_timed_out(&self) -> ConversionError {
        ConversionError::ServiceTimeout {
            operation: "export job".to_string(),
            secs: self.poll_timeout.as_secs(),
        }
    }
}

#[async_trait]
impl DocumentService for PdfServicesClient {
    async fn upload(
        &self,
        content: Vec<u8>,
        media_type: &str,
    ) -> Result<RemoteAsset, ConversionError> {
        let request = self
            .authorized(self.http.post(self.url("/assets")))
            .await?
            .json(&AssetUploadRequest { media_type });
        let response = self.send(request, "asset upload").await?;
        let slot: AssetUploadResponse = decode(response, "asset upload").await?;
        debug!(asset_id = %slot.asset_id, bytes = content.len(), "Upload slot granted");

        let put = self
            .http
            .put(&slot.upload_uri)
            .header(CONTENT_TYPE, media_type)
            .body(content);
        self.send(put, "asset upload").await?;

        Ok(RemoteAsset::new(slot.asset_id))
    }

    async fn submit(
        &self,
        asset: &RemoteAsset,
        params: &ExportParams,
    ) -> Result<RemoteJobLocation, ConversionError> {
        let body = ExportJobRequest {
            asset_id: asset.asset_id(),
            params,
        };
        let request = self
            .authorized(self.http.post(self.url("/operation/exportpdf")))
            .await?
            .json(&body);
        let response = self.send(request, "job submission").await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ConversionError::from(ServiceFault::sdk(
                    "job submission: response carried no location header",
                ))
            })?;
        Ok(RemoteJobLocation::new(location))
    }

    async fn await_result(
        &self,
        location: &RemoteJobLocation,
    ) -> Result<ExportResult, ConversionError> {
        // None: the timeout is too large to represent, so poll without one.
        let deadline = Instant::now().checked_add(self.poll_timeout);

        loop {
            let request = self.authorized(self.http.get(location.as_str())).await?;
            let response = self.send(request, "job status").await?;
            let retry_after = retry_after(response.headers());
            let job: JobStatusResponse = decode(response, "job status").await?;

            match job.into_status()? {
                JobStatus::Done(asset) => return Ok(ExportResult::new(asset)),
                JobStatus::Failed(fault) => return Err(fault.into()),
                JobStatus::InProgress => debug!("Export job not finished yet"),
            }

            let mut wait = retry_after.unwrap_or(self.poll_interval);
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(self.poll_timed_out());
                }
                wait = wait.min(remaining);
            }
            tokio::time::sleep(wait).await;
        }
    }

    async fn get_content(&self, asset: &RemoteAsset) -> Result<Vec<u8>, ConversionError> {
        let uri = match asset.download_uri() {
            Some(uri) => uri.to_string(),
            None => {
                let path = format!("/assets/{}", asset.asset_id());
                let request = self.authorized(self.http.get(self.url(&path))).await?;
                let response = self.send(request, "asset lookup").await?;
                let doc: DownloadUriResponse = decode(response, "asset lookup").await?;
                doc.download_uri
            }
        };

        let response = self.send(self.http.get(&uri), "asset download").await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, "asset download"))?;
        Ok(bytes.to_vec())
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetUploadRequest<'a> {
    media_type: &'a str,
}

#[derive(Deserialize)]
struct AssetUploadResponse {
    #[serde(rename = "uploadUri")]
    upload_uri: String,
    #[serde(rename = "assetID")]
    asset_id: String,
}

#[derive(Serialize)]
struct ExportJobRequest<'a> {
    #[serde(rename = "assetID")]
    asset_id: &'a str,
    #[serde(flatten)]
    params: &'a ExportParams,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    asset: Option<AssetDocument>,
    #[serde(default)]
    error: Option<ErrorDocument>,
}

impl JobStatusResponse {
    fn into_status(self) -> Result<JobStatus, ConversionError> {
        match self.status.as_str() {
            "done" => {
                let asset = self.asset.ok_or_else(|| {
                    ConversionError::from(ServiceFault::sdk(
                        "job status: finished job has no output asset",
                    ))
                })?;
                let mut remote = RemoteAsset::new(asset.asset_id);
                if let Some(uri) = asset.download_uri {
                    remote = remote.with_download_uri(uri);
                }
                Ok(JobStatus::Done(remote))
            }
            "failed" => {
                let error = self.error.unwrap_or_default();
                let message = error
                    .message
                    .unwrap_or_else(|| "export job failed".to_string());
                Ok(JobStatus::Failed(ServiceFault::api(None, error.code, message)))
            }
            // "in progress", plus any state this client does not know yet
            _ => Ok(JobStatus::InProgress),
        }
    }
}

#[derive(Deserialize)]
struct AssetDocument {
    #[serde(rename = "assetID")]
    asset_id: String,
    #[serde(rename = "downloadUri", default)]
    download_uri: Option<String>,
}

#[derive(Deserialize)]
struct DownloadUriResponse {
    #[serde(rename = "downloadUri")]
    download_uri: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDocument {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn decode<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T, ConversionError> {
    response.json::<T>().await.map_err(|e| {
        ConversionError::from(ServiceFault::sdk(format!(
            "{operation}: malformed response: {e}"
        )))
    })
}

/// When a token issued at `now` with lifetime `ttl` expires. A lifetime past
/// what `Instant` can hold gets the default instead.
fn token_expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(DEFAULT_TOKEN_TTL))
        .unwrap_or(now)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pull code and message out of the error shapes the service uses:
/// `{"error": {"code", "message"}}`, `{"error": "code", "error_description"}`
/// and a flat `{"code", "message"}`.
fn parse_error_document(body: &str) -> ErrorDocument {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return ErrorDocument::default();
    };
    match value.get("error") {
        Some(inner @ serde_json::Value::Object(_)) => {
            serde_json::from_value(inner.clone()).unwrap_or_default()
        }
        Some(serde_json::Value::String(code)) => ErrorDocument {
            code: Some(code.clone()),
            message: value
                .get("error_description")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        },
        _ => serde_json::from_value(value).unwrap_or_default(),
    }
}

fn fault_from_body(status: StatusCode, body: &str) -> ServiceFault {
    let doc = parse_error_document(body);
    let message = doc.message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            trimmed.chars().take(MAX_ERROR_BODY).collect()
        }
    });

    if status == StatusCode::TOO_MANY_REQUESTS {
        ServiceFault::usage(Some(status.as_u16()), message)
    } else {
        ServiceFault::api(Some(status.as_u16()), doc.code, message)
    }
}
