use crate::error::{BlastError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Who a campaign's messages come from: a verified mobile number or an
/// approved alphanumeric sender ID, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderIdentity {
    MobileNumber(String),
    AlphanumericId(String),
}

static E164_RE: OnceLock<Regex> = OnceLock::new();
static SHORT_CODE_RE: OnceLock<Regex> = OnceLock::new();
static ALPHANUMERIC_RE: OnceLock<Regex> = OnceLock::new();

fn e164_re() -> &'static Regex {
    E164_RE.get_or_init(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").unwrap())
}

fn short_code_re() -> &'static Regex {
    SHORT_CODE_RE.get_or_init(|| Regex::new(r"^[0-9]{5,6}$").unwrap())
}

fn alphanumeric_re() -> &'static Regex {
    ALPHANUMERIC_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9 ]{1,11}$").unwrap())
}

impl SenderIdentity {
    /// Build an identity from the two optional inputs. Exactly one must be set.
    pub fn from_options(
        mobile_number: Option<String>,
        alphanumeric_id: Option<String>,
    ) -> Result<Self> {
        match (mobile_number, alphanumeric_id) {
            (None, None) => Err(BlastError::config(
                "a mobile number or an alphanumeric sender ID is required",
            )),
            (Some(_), Some(_)) => Err(BlastError::config(
                "mobile number and alphanumeric sender ID cannot be used together",
            )),
            (Some(n), None) => Self::mobile_number(n),
            (None, Some(id)) => Self::alphanumeric_id(id),
        }
    }

    /// An E.164 number (`+15550001111`) or a 5-6 digit short code.
    pub fn mobile_number(number: impl Into<String>) -> Result<Self> {
        let number = number.into();
        if !e164_re().is_match(&number) && !short_code_re().is_match(&number) {
            return Err(BlastError::config(format!(
                "invalid sender number '{number}': expected E.164 like +15550001111 or a 5-6 digit short code"
            )));
        }
        Ok(SenderIdentity::MobileNumber(number))
    }

    /// Alphanumeric IDs are 1-11 characters of letters, digits and spaces, and
    /// must contain at least one letter.
    pub fn alphanumeric_id(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if !alphanumeric_re().is_match(&id) || !id.chars().any(|c| c.is_ascii_alphabetic()) {
            return Err(BlastError::config(format!(
                "invalid alphanumeric sender ID '{id}'"
            )));
        }
        Ok(SenderIdentity::AlphanumericId(id))
    }

    pub fn as_str(&self) -> &str {
        match self {
            SenderIdentity::MobileNumber(s) | SenderIdentity::AlphanumericId(s) => s,
        }
    }
}

impl fmt::Display for SenderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
