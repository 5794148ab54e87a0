//! Outbound relay for uploaded payment proofs. The relay is a trait seam so
//! the HTTP layer and tests do not care which channel is behind it; the
//! production implementation forwards to a Telegram chat, matching the
//! organizer workflow this service backs.

use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ProofUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub caption: String,
}

#[derive(Debug)]
pub struct RelayError(pub String);

impl Display for RelayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RelayError {}

#[async_trait]
pub trait ProofRelay: Send + Sync + 'static {
    /// Delivery is at-least-once from the caller's point of view: a failure
    /// here blocks the status transition and the buyer retries the upload.
    async fn send_proof(&self, upload: ProofUpload) -> Result<(), RelayError>;
}

pub struct TelegramRelay {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramRelay {
    #[must_use]
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: "https://api.telegram.org".to_string(),
            bot_token,
            chat_id,
        }
    }

    /// Overrides the API host, for tests against a local stub.
    #[must_use]
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }
}

#[async_trait]
impl ProofRelay for TelegramRelay {
    async fn send_proof(&self, upload: ProofUpload) -> Result<(), RelayError> {
        let mut part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| RelayError(format!("invalid proof content type: {e}")))?;
        }
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", upload.caption)
            .part("document", part);
        let url = format!("{}/bot{}/sendDocument", self.api_base, self.bot_token);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError(format!("telegram request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(RelayError(format!(
                "telegram responded with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Used when no relay credentials are configured. Uploads fail cleanly and
/// the receipt keeps its current status.
pub struct DisabledRelay;

#[async_trait]
impl ProofRelay for DisabledRelay {
    async fn send_proof(&self, _upload: ProofUpload) -> Result<(), RelayError> {
        Err(RelayError("proof relay is not configured".to_string()))
    }
}

/// Test double: records every upload, optionally failing on demand.
#[derive(Default)]
pub struct FakeRelay {
    pub sent: Mutex<Vec<ProofUpload>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ProofRelay for FakeRelay {
    async fn send_proof(&self, upload: ProofUpload) -> Result<(), RelayError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(RelayError("relay outage (test)".to_string()));
        }
        self.sent.lock().await.push(upload);
        Ok(())
    }
}
