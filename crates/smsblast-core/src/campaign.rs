use crate::error::{BlastError, Result};
use crate::message::{Message, Progress};
use crate::sender::SenderIdentity;
use crate::store::StateStore;
use crate::transport::{Transport, TransportRejection};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of one send attempt. A rejection leaves the recipient pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    Sent { sid: String },
    Rejected { reason: TransportRejection },
}

impl SendOutcome {
    pub fn sid(&self) -> Option<&str> {
        match self {
            SendOutcome::Sent { sid } => Some(sid),
            SendOutcome::Rejected { .. } => None,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub number: String,
    pub progress: Progress,
    #[serde(flatten)]
    pub outcome: SendOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub name: String,
    /// Pending recipients when the pass started.
    pub total: usize,
    pub results: Vec<SendResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CampaignReport {
    pub fn sent_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_sent()).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.results.len() - self.sent_count()
    }
}

// ---------------------------------------------------------------------------
// Marketer
// ---------------------------------------------------------------------------

/// Owns the transport and the sender identity; hands out campaigns.
pub struct Marketer<T: Transport> {
    transport: T,
    sender: Option<SenderIdentity>,
}

impl<T: Transport> Marketer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            sender: None,
        }
    }

    /// Set the sender from a mobile number or an alphanumeric sender ID.
    /// Exactly one of the two must be given.
    pub fn set_sender(
        &mut self,
        mobile_number: Option<String>,
        alphanumeric_id: Option<String>,
    ) -> Result<()> {
        self.sender = Some(SenderIdentity::from_options(mobile_number, alphanumeric_id)?);
        Ok(())
    }

    pub fn set_sender_identity(&mut self, identity: SenderIdentity) {
        self.sender = Some(identity);
    }

    pub fn sender(&self) -> Option<&SenderIdentity> {
        self.sender.as_ref()
    }

    /// Bind a campaign to `store` and start the store's watcher.
    ///
    /// Fails without touching the store if no sender identity is set.
    pub fn create_campaign<'a>(
        &'a self,
        name: impl Into<String>,
        store: &'a StateStore,
        body: impl Into<String>,
    ) -> Result<Campaign<'a, T>> {
        let Some(sender) = self.sender.clone() else {
            return Err(BlastError::config(
                "set a sender identity before creating a campaign",
            ));
        };
        store.start_watching()?;
        Ok(Campaign {
            name: name.into(),
            store,
            transport: &self.transport,
            template: Message::template(sender, body),
        })
    }
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

pub struct Campaign<'a, T: Transport> {
    name: String,
    store: &'a StateStore,
    transport: &'a T,
    template: Message,
}

impl<T: Transport> Campaign<'_, T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Message {
        &self.template
    }

    /// One pass over every pending number, in registry order.
    pub fn run(&self) -> CampaignReport {
        let started_at = Utc::now();
        let pending = self.store.pending();
        let total = pending.len();
        info!(campaign = %self.name, pending = total, "starting campaign");

        let results = pending
            .into_iter()
            .enumerate()
            .map(|(i, number)| {
                let progress = Progress {
                    position: i + 1,
                    total,
                };
                let message = self.template.addressed(number.clone(), progress);
                let outcome = self.send_one(&message);
                SendResult {
                    number,
                    progress,
                    outcome,
                }
            })
            .collect();

        let report = CampaignReport {
            name: self.name.clone(),
            total,
            results,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            campaign = %self.name,
            sent = report.sent_count(),
            rejected = report.rejected_count(),
            "campaign pass finished"
        );
        report
    }

    /// Send one message. Only a non-empty provider id marks the number sent.
    pub fn send_one(&self, message: &Message) -> SendOutcome {
        let Some(to) = message.to.as_deref() else {
            return SendOutcome::Rejected {
                reason: TransportRejection::new("message has no recipient"),
            };
        };

        let result = self
            .transport
            .send(message.from.as_str(), to, &message.body)
            .and_then(|sid| {
                if sid.is_empty() {
                    Err(TransportRejection::new("no message id received"))
                } else {
                    Ok(sid)
                }
            });

        match result {
            Ok(sid) => {
                match message.progress {
                    Some(p) => info!(%sid, "{p} sent: {message}"),
                    None => info!(%sid, "sent: {message}"),
                }
                self.store.mark_sent(to);
                SendOutcome::Sent { sid }
            }
            Err(reason) => {
                warn!(error = %reason, "send rejected: {message}");
                SendOutcome::Rejected { reason }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
