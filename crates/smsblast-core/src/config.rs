use crate::error::{BlastError, Result};
use crate::sender::SenderIdentity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "smsblast.yaml";

/// Twilio rejects bodies longer than this.
pub const MAX_BODY_CHARS: usize = 1600;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            api_base: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TwilioConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphanumeric_id: Option<String>,
}

impl SenderConfig {
    /// `None` when neither field is set; an error when both are, or when the
    /// value is malformed.
    pub fn identity(&self) -> Result<Option<SenderIdentity>> {
        if self.mobile_number.is_none() && self.alphanumeric_id.is_none() {
            return Ok(None);
        }
        SenderIdentity::from_options(self.mobile_number.clone(), self.alphanumeric_id.clone())
            .map(Some)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub name: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<CampaignConfig>,
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: None,
            poll_interval_ms: default_poll_interval_ms(),
            twilio: TwilioConfig::default(),
            sender: SenderConfig::default(),
            campaign: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BlastError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.poll_interval_ms == 0 {
            warnings.push(ConfigWarning::error(
                "poll_interval_ms must be greater than zero",
            ));
        } else if self.poll_interval_ms > 60_000 {
            warnings.push(ConfigWarning::warning(format!(
                "poll_interval_ms is {}; state changes may sit unsaved for over a minute",
                self.poll_interval_ms
            )));
        }

        match self.sender.identity() {
            Ok(Some(_)) => {}
            Ok(None) => warnings.push(ConfigWarning::warning(
                "no sender configured; pass --from or --sender-id when running",
            )),
            Err(e) => warnings.push(ConfigWarning::error(format!("sender: {e}"))),
        }

        if self.twilio.auth_token.is_some() {
            warnings.push(ConfigWarning::warning(
                "twilio.auth_token is stored in the config file; prefer TWILIO_AUTH_TOKEN",
            ));
        }

        if let Some(base) = &self.twilio.api_base {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                warnings.push(ConfigWarning::error(format!(
                    "twilio.api_base '{base}' must be an http(s) URL"
                )));
            }
        }

        if self.twilio.timeout_secs == 0 {
            warnings.push(ConfigWarning::error(
                "twilio.timeout_secs must be greater than zero",
            ));
        }

        if let Some(campaign) = &self.campaign {
            if campaign.name.trim().is_empty() {
                warnings.push(ConfigWarning::error("campaign.name is empty"));
            }
            let chars = campaign.body.chars().count();
            if campaign.body.trim().is_empty() {
                warnings.push(ConfigWarning::error("campaign.body is empty"));
            } else if chars > MAX_BODY_CHARS {
                warnings.push(ConfigWarning::error(format!(
                    "campaign.body is {chars} characters; the limit is {MAX_BODY_CHARS}"
                )));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
