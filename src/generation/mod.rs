//! Draft generation: model call, JSON extraction, signature reattachment.

pub mod client;
pub mod draft;
pub mod extract;

pub use client::{GenerationClient, SIGNATURE_SEPARATOR};
pub use draft::{Draft, DraftEdit, DraftStatus};
