//! Outbound email: message assembly, inline images, and the relay seam.

pub mod client;
pub mod message;
pub mod relay;

pub use client::DispatchClient;
pub use message::build_message;
pub use relay::{MailRelay, OutboundAttachment, OutboundEmail, RelayCredentials, SmtpRelay};
