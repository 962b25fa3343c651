// src/appliance/client.rs

use std::path::Path;
use std::time::Instant;

use base64::{Engine as _, engine::general_purpose};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::appliance::wire::{
    Envelope, HeartbeatResults, ProfileEntry, SessionResults, StatusResults, UploadResponse,
};
use crate::appliance::{Appliance, ReportStatus, Session, TaskStatus, UploadResult, VmProfile};
use crate::config::ApplianceConfig;
use crate::errors::{AtdError, Result};

const API_ACCEPT: &str = "application/vnd.ve.v1.0+json";
const AUTH_HEADER: &str = "VE-SDK-API";

/// HTTP client for the appliance's REST API.
pub struct AtdClient {
    client: Client,
    config: ApplianceConfig,
    session: Option<Session>,
}

impl AtdClient {
    /// Builds a client honouring the TLS and timeout settings in `config`.
    pub fn new(config: ApplianceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.skip_tls)
            .user_agent(format!("atd-submit/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: ApplianceConfig) -> Self {
        Self {
            client,
            config,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/php/{}", self.config.base_url(), endpoint)
    }

    fn session_header(&self) -> Result<String> {
        let session = self.session.as_ref().ok_or(AtdError::NotConnected)?;
        Ok(encode_pair(&session.token, &session.user_id))
    }

    /// Sends a request and returns the response, whatever its status.
    async fn dispatch(&self, request: RequestBuilder, label: &str) -> Result<Response> {
        log::debug!("Calling appliance: {}", label);
        let start = Instant::now();
        let resp = request.header("Accept", API_ACCEPT).send().await?;
        log::debug!(
            "Appliance response for {}: {} ({}ms)",
            label,
            resp.status(),
            start.elapsed().as_millis()
        );
        Ok(resp)
    }

    /// Sends a request and fails on any non-2xx status.
    async fn send(&self, request: RequestBuilder, label: &str) -> Result<Response> {
        let resp = self.dispatch(request, label).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(AtdError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Unwraps the `results` of a `{"success": true, ...}` envelope.
    async fn results<T: DeserializeOwned>(&self, request: RequestBuilder, label: &str) -> Result<T> {
        let resp = self.send(request, label).await?;
        let body = resp.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(AtdError::ApiResponse(
                envelope.error_message.unwrap_or(body),
            ));
        }
        envelope
            .results
            .ok_or_else(|| AtdError::UnexpectedResponse(format!("{} response has no results", label)))
    }

    fn authed_get(&self, endpoint: &str) -> Result<RequestBuilder> {
        Ok(self
            .client
            .get(self.url(endpoint))
            .header(AUTH_HEADER, self.session_header()?)
            .header("Content-Type", "application/json"))
    }
}

fn encode_pair(left: &str, right: &str) -> String {
    general_purpose::STANDARD.encode(format!("{}:{}", left, right))
}

fn task_status_from(results: StatusResults) -> TaskStatus {
    match results.istate {
        1 | 2 => TaskStatus::Done,
        3 | 4 => TaskStatus::Running(results.status),
        -1 => TaskStatus::Failed(results.status),
        other => {
            log::warn!("Unknown task state {} ({}), treating as finished", other, results.status);
            TaskStatus::Done
        }
    }
}

fn report_status_from(status: StatusCode, body: String) -> Result<ReportStatus> {
    if status == StatusCode::BAD_REQUEST {
        return Ok(ReportStatus::NotAvailable(body));
    }
    if !status.is_success() {
        return Err(AtdError::ApiError {
            status: status.as_u16(),
            body,
        });
    }
    match serde_json::from_str::<serde_json::Value>(&body) {
        // Any JSON is a finished report; the verdict reader rejects odd shapes.
        Ok(report) => Ok(ReportStatus::Available(report)),
        Err(_) => Ok(ReportStatus::Pending(body.trim().to_string())),
    }
}

impl Appliance for AtdClient {
    async fn connect(&mut self, user: &str, password: &str) -> Result<Session> {
        let request = self
            .client
            .get(self.url("session.php"))
            .header(AUTH_HEADER, encode_pair(user, password))
            .header("Content-Type", "application/json");

        let results: SessionResults = self.results(request, "login").await?;
        let session = Session {
            token: results.session,
            user_id: results.user_id,
            version: results.matd_version,
        };
        log::info!("Connected to {} as user id {}", self.config.host, session.user_id);
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn heartbeat(&self) -> Result<serde_json::Value> {
        let request = self.authed_get("heartbeat.php")?;
        let results: HeartbeatResults = self.results(request, "heartbeat").await?;
        Ok(results.heart_beat)
    }

    async fn upload_file(&self, path: &Path, profile: &str) -> Result<UploadResult> {
        let auth = self.session_header()?;
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("sample")
            .to_string();
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let data = json!({
            "data": {
                "vmProfileList": profile,
                "submitType": "0",
                "messageId": "",
                "srcIp": "",
                "destIp": "",
                "url": "",
                "skipTaskId": "1",
                "analyzeAgain": "1"
            },
            "filePriorityQ": "run_now"
        });

        let form = Form::new()
            .part(
                "amas_filename",
                Part::bytes(bytes).file_name(file_name).mime_str(mime.as_ref())?,
            )
            .text("data", data.to_string());

        let request = self
            .client
            .post(self.url("fileupload.php"))
            .header(AUTH_HEADER, auth)
            .multipart(form);

        let resp = self.send(request, "upload").await?;
        let body = resp.text().await?;
        let upload: UploadResponse = serde_json::from_str(&body)?;

        if !upload.success {
            return Err(AtdError::ApiResponse(upload.error_message.unwrap_or(body)));
        }
        let job_id = upload
            .sub_id
            .ok_or_else(|| AtdError::UnexpectedResponse(format!("upload response has no subId: {}", body)))?;
        let uploaded = upload
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AtdError::UnexpectedResponse(format!("upload response has no results: {}", body)))?;

        Ok(UploadResult {
            job_id,
            task_id: uploaded.task_id,
            file: uploaded.file,
            md5: uploaded.md5,
            size: uploaded.size,
            mime_type: upload.mime_type.unwrap_or_default(),
        })
    }

    async fn check_status(&self, task_id: &str) -> Result<TaskStatus> {
        let request = self
            .authed_get("samplestatus.php")?
            .query(&[("iTaskId", task_id)]);
        let results: StatusResults = self.results(request, "sample status").await?;
        Ok(task_status_from(results))
    }

    async fn get_report(&self, job_id: &str) -> Result<ReportStatus> {
        let request = self
            .authed_get("showreport.php")?
            .query(&[("jobId", job_id), ("iType", "json")]);
        let resp = self.dispatch(request, "report").await?;
        let status = resp.status();
        let body = resp.text().await?;
        report_status_from(status, body)
    }

    async fn list_profiles(&self) -> Result<Vec<VmProfile>> {
        let request = self.authed_get("vmprofiles.php")?;
        let entries: Vec<ProfileEntry> = self.results(request, "vm profiles").await?;
        Ok(entries
            .into_iter()
            .map(|entry| VmProfile {
                id: entry.id,
                name: entry.name,
                description: entry.description,
            })
            .collect())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let request = self
            .client
            .delete(self.url("session.php"))
            .header(AUTH_HEADER, encode_pair(&session.token, &session.user_id));
        self.send(request, "logout").await?;
        log::info!("Disconnected from {}", self.config.host);
        Ok(())
    }
}
