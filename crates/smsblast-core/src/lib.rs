pub mod campaign;
pub mod config;
pub mod error;
pub mod io;
pub mod message;
pub mod registry;
pub mod sender;
pub mod store;
pub mod transport;

pub use campaign::{Campaign, CampaignReport, Marketer, SendOutcome};
pub use error::{BlastError, Result};
pub use registry::DeliveryRegistry;
pub use sender::SenderIdentity;
pub use store::StateStore;
pub use transport::{Transport, TransportRejection, TwilioTransport};
