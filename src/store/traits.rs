//! Collaborator store traits — contacts, templates, and attachments.
//!
//! Persistence is owned by whoever implements these; the pipeline only reads
//! snapshots and performs the few writes listed here.

use async_trait::async_trait;

use crate::attachments::{Attachment, NewAttachment};
use crate::contacts::{Contact, NewContact};
use crate::error::StoreError;
use crate::templates::{NewTemplate, Template};

/// What a bulk insert did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkInsertOutcome {
    pub inserted: usize,
    pub skipped_duplicates: usize,
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// All contacts for an owner, ordered by company name then full name.
    async fn list(&self, owner_id: &str) -> Result<Vec<Contact>, StoreError>;

    /// Insert rows, skipping any whose primary email already exists for the
    /// owner (or earlier in the same batch). Existing rows are never modified.
    async fn bulk_insert(
        &self,
        owner_id: &str,
        rows: Vec<NewContact>,
    ) -> Result<BulkInsertOutcome, StoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list(&self, owner_id: &str) -> Result<Vec<Template>, StoreError>;

    async fn create(&self, owner_id: &str, template: NewTemplate) -> Result<Template, StoreError>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn list(&self, owner_id: &str) -> Result<Vec<Attachment>, StoreError>;

    async fn create(
        &self,
        owner_id: &str,
        bytes: Vec<u8>,
        meta: NewAttachment,
    ) -> Result<Attachment, StoreError>;

    /// Load the bytes behind an attachment's locator.
    async fn read(&self, attachment: &Attachment) -> Result<Vec<u8>, StoreError>;
}
