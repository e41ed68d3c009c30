use crate::sender::SenderIdentity;
use serde::Serialize;
use std::fmt;

/// Position of a message within a campaign pass. `total` is the pending count
/// when the pass started and does not shrink as sends complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.position, self.total)
    }
}

/// A single outbound SMS. Built per recipient and dropped after the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub from: SenderIdentity,
    pub to: Option<String>,
    pub body: String,
    pub progress: Option<Progress>,
}

impl Message {
    /// A message with no recipient yet.
    pub fn template(from: SenderIdentity, body: impl Into<String>) -> Self {
        Self {
            from,
            to: None,
            body: body.into(),
            progress: None,
        }
    }

    pub fn addressed(&self, to: impl Into<String>, progress: Progress) -> Self {
        Self {
            to: Some(to.into()),
            progress: Some(progress),
            ..self.clone()
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "From: {}, To: {}, Body: {}",
            self.from,
            self.to.as_deref().unwrap_or("-"),
            self.body
        )
    }
}
