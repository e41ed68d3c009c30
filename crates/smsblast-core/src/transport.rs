use crate::error::{BlastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Something that can hand one SMS to a provider.
///
/// Returns the provider's message identifier on acceptance. Any rejection means
/// "not sent, try again on a later run".
pub trait Transport: Send + Sync {
    fn send(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> std::result::Result<String, TransportRejection>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> std::result::Result<String, TransportRejection> {
        (**self).send(from, to, body)
    }
}

/// A provider refused (or never received) a single send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportRejection {
    /// HTTP status, absent for network-level failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Provider error code, e.g. Twilio's 21211 for an invalid `To` number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,
    pub message: String,
}

impl TransportRejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.code) {
            (Some(s), Some(c)) => write!(f, "HTTP {s}, error {c}: {}", self.message),
            (Some(s), None) => write!(f, "HTTP {s}: {}", self.message),
            (None, Some(c)) => write!(f, "error {c}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportRejection {}

// ---------------------------------------------------------------------------
// Twilio
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    #[serde(default)]
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    #[serde(default)]
    code: Option<u64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    more_info: Option<String>,
}

/// Twilio Programmable Messaging over its REST API.
pub struct TwilioTransport {
    client: reqwest::blocking::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioTransport {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        api_base: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let account_sid = account_sid.into();
        let auth_token = auth_token.into();
        if account_sid.is_empty() || auth_token.is_empty() {
            return Err(BlastError::config("Twilio account SID and auth token are required"));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlastError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base
                .unwrap_or(TWILIO_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            account_sid,
            auth_token,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

impl Transport for TwilioTransport {
    fn send(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> std::result::Result<String, TransportRejection> {
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .map_err(|e| TransportRejection::new(format!("request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            let created: CreatedMessage = resp.json().map_err(|e| TransportRejection {
                status: Some(status.as_u16()),
                code: None,
                message: format!("unreadable response: {e}"),
            })?;
            return Ok(created.sid.unwrap_or_default());
        }

        let text = resp.text().unwrap_or_default();
        let rejection = match serde_json::from_str::<TwilioError>(&text) {
            Ok(err) => TransportRejection {
                status: Some(status.as_u16()),
                code: err.code,
                message: match (err.message, err.more_info) {
                    (Some(m), Some(info)) => format!("{m} ({info})"),
                    (Some(m), None) => m,
                    (None, _) => status.to_string(),
                },
            },
            Err(_) => TransportRejection {
                status: Some(status.as_u16()),
                code: None,
                message: if text.is_empty() { status.to_string() } else { text },
            },
        };
        Err(rejection)
    }
}
