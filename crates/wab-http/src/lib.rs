//! Backend REST adapter.
//!
//! Implements the core ports over the bot server's `/api/*` endpoints and
//! exposes the remaining endpoints (server contacts, scheduling, automation,
//! bot lifecycle, statistics) as plain methods.

pub mod wire;

use std::{path::Path, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use wab_core::{
    attachment::Attachment,
    automation::{AutoSendReport, AutoSendRequest, DashboardStats, ScanReport},
    config::Config,
    domain::{AttachmentRef, BotStatus},
    errors::Error,
    ports::{BotStatusProbe, SendRequest, SendService, UploadService},
    schedule::ScheduleRequest,
    Result,
};

use crate::wire::{
    decode, into_success, ImportReport, InitBody, LoginResponse, MessageResponse,
    NewContactBody, SendMessageBody, SettingsResponse, StatisticsResponse, UploadResponse,
};

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    // Uploads and the automated send can run for minutes.
    long_http: reqwest::Client,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        long_timeout: Duration,
    ) -> Result<Self> {
        let build = |timeout: Duration| {
            reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Config(format!("http client build failed: {e}")))
        };
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build(request_timeout)?,
            long_http: build(long_timeout)?,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.api_base_url, cfg.request_timeout, cfg.upload_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    // ============== Transport ==============

    async fn execute(&self, req: reqwest::RequestBuilder, path: &str) -> Result<Value> {
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{path}: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("{path}: {e}")))?;

        // Error responses still carry the JSON envelope; only fall back to the
        // status line when the body is not JSON.
        let v: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(_) => {
                return Err(Error::Transport(format!(
                    "{path}: HTTP {status}: {}",
                    body.chars().take(200).collect::<String>()
                )))
            }
        };
        tracing::debug!(path, %status, "backend response");
        into_success(v)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.execute(self.http.get(self.url(path)), path).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        self.execute(self.http.post(self.url(path)).json(body), path)
            .await
    }

    async fn post_file(&self, path: &str, file: &Path, mime: &str) -> Result<Value> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| Error::External(format!("multipart error: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        self.execute(self.long_http.post(self.url(path)).multipart(form), path)
            .await
    }

    // ============== Endpoints ==============

    /// Server-provided default country code, if it has one.
    pub async fn default_country_code(&self) -> Result<Option<String>> {
        let resp: SettingsResponse = decode(self.get("/api/settings").await?)?;
        Ok(resp.settings.country_code())
    }

    pub async fn check_login(&self) -> Result<LoginResponse> {
        decode(self.get("/api/check-login").await?)
    }

    pub async fn add_server_contact(&self, name: &str, phone: &str) -> Result<String> {
        let (name, phone) = (name.trim(), phone.trim());
        if name.is_empty() || phone.is_empty() {
            return Err(Error::validation("Name and phone are required"));
        }
        let v = self
            .post("/api/contacts", &NewContactBody { name, phone })
            .await?;
        Ok(decode::<MessageResponse>(v)?.message)
    }

    pub async fn delete_server_contact(&self, id: u64) -> Result<String> {
        let path = format!("/api/contacts/{id}");
        let v = self
            .execute(self.http.delete(self.url(&path)), &path)
            .await?;
        Ok(decode::<MessageResponse>(v)?.message)
    }

    pub async fn import_contacts_file(&self, file: &Path) -> Result<ImportReport> {
        let is_csv = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(Error::validation("Only CSV files are allowed"));
        }
        decode(self.post_file("/api/import-contacts", file, "text/csv").await?)
    }

    pub async fn schedule_message(&self, req: &ScheduleRequest) -> Result<String> {
        let v = self.post("/api/schedule-message", &req.body()).await?;
        Ok(decode::<MessageResponse>(v)?.message)
    }

    pub async fn scan_attachments(&self) -> Result<ScanReport> {
        decode(self.get("/api/scan-attachments").await?)
    }

    /// Runs the whole automated send server-side; returns when it is done.
    pub async fn auto_send_attachments(&self, req: &AutoSendRequest) -> Result<AutoSendReport> {
        let path = "/api/auto-send-attachments";
        let v = self
            .execute(self.long_http.post(self.url(path)).json(req), path)
            .await?;
        decode(v)
    }

    pub async fn initialize_bot(&self, headless: bool) -> Result<String> {
        let path = "/api/initialize-bot";
        let v = self
            .execute(
                self.long_http.post(self.url(path)).json(&InitBody { headless }),
                path,
            )
            .await?;
        Ok(decode::<MessageResponse>(v)?.message)
    }

    pub async fn close_bot(&self) -> Result<String> {
        let path = "/api/close-bot";
        let v = self.execute(self.http.post(self.url(path)), path).await?;
        Ok(decode::<MessageResponse>(v)?.message)
    }

    pub async fn statistics(&self) -> Result<DashboardStats> {
        let resp: StatisticsResponse = decode(self.get("/api/statistics").await?)?;
        Ok(resp.statistics)
    }
}

#[async_trait]
impl SendService for ApiClient {
    async fn send_message(&self, req: &SendRequest) -> Result<()> {
        let body = SendMessageBody {
            phone: &req.phone,
            message: &req.message,
            attachment_path: req.attachment.as_ref().map(|a| a.0.as_str()),
            file_type: req.file_type.map(|t| t.as_str()),
        };
        self.post("/api/send-message", &body).await?;
        Ok(())
    }
}

#[async_trait]
impl UploadService for ApiClient {
    async fn upload_attachment(&self, attachment: &Attachment) -> Result<AttachmentRef> {
        tracing::info!(
            file = %attachment.file_name,
            mime = %attachment.mime_type,
            bytes = attachment.size,
            "uploading attachment"
        );
        let v = self
            .post_file(
                "/api/upload-attachment",
                &attachment.path,
                &attachment.mime_type,
            )
            .await
            .map_err(|e| match e {
                Error::Rejected(m) | Error::Transport(m) => Error::Upload(m),
                other => Error::Upload(other.to_string()),
            })?;
        let resp: UploadResponse = decode(v).map_err(|e| Error::Upload(e.to_string()))?;
        Ok(AttachmentRef(resp.path))
    }
}

#[async_trait]
impl BotStatusProbe for ApiClient {
    async fn bot_status(&self) -> BotStatus {
        match self.check_login().await {
            Ok(resp) => resp.bot_status(),
            Err(e) => {
                tracing::debug!("status probe failed: {e}");
                BotStatus::ProbeFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let c = ApiClient::new(
            "http://127.0.0.1:5001/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(c.base_url(), "http://127.0.0.1:5001");
        assert_eq!(c.url("/api/settings"), "http://127.0.0.1:5001/api/settings");
    }

    #[tokio::test]
    async fn import_refuses_non_csv_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("contacts.xlsx");
        std::fs::write(&file, "name,phone").unwrap();

        // Port 9 (discard) is never contacted because validation fails first.
        let c = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), Duration::from_secs(1))
            .unwrap();
        let err = c.import_contacts_file(&file).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Only CSV files are allowed"));

        let err = c.add_server_contact(" ", "919876543210").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_reports_failed_status() {
        let c = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), Duration::from_secs(1))
            .unwrap();
        assert_eq!(c.bot_status().await, BotStatus::ProbeFailed);

        let err = c
            .send_message(&SendRequest {
                phone: "919876543210".to_string(),
                message: "hi".to_string(),
                attachment: None,
                file_type: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn upload_sends_the_attachment_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scan.tiff");
        std::fs::write(&file, b"II*\0").unwrap();
        let mut attachment = Attachment::from_path(&file).unwrap();
        assert_eq!(attachment.mime_type, "image/tiff");

        let c = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), Duration::from_secs(1))
            .unwrap();

        // A malformed type is caught while building the form, before connecting.
        attachment.mime_type = "not a mime".to_string();
        let err = c.upload_attachment(&attachment).await.unwrap_err();
        assert!(matches!(err, Error::Upload(ref m) if m.contains("multipart")), "{err}");

        attachment.mime_type = "image/tiff".to_string();
        let err = c.upload_attachment(&attachment).await.unwrap_err();
        assert!(matches!(err, Error::Upload(ref m) if !m.contains("multipart")), "{err}");
    }
}
