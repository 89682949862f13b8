//! In-memory implementation of every store trait.
//!
//! Used by the terminal session and the HTTP surface when no external storage
//! is wired in, and by tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::traits::{AttachmentStore, BulkInsertOutcome, ContactStore, TemplateStore};
use crate::attachments::{Attachment, NewAttachment, make_locator};
use crate::contacts::{Contact, NewContact};
use crate::error::StoreError;
use crate::templates::{NewTemplate, Template};

/// Owner-scoped collections held behind async locks.
#[derive(Default)]
pub struct InMemoryStore {
    contacts: RwLock<HashMap<String, Vec<Contact>>>,
    templates: RwLock<HashMap<String, Vec<Template>>>,
    attachments: RwLock<HashMap<String, Vec<Attachment>>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactStore for InMemoryStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Contact>, StoreError> {
        let contacts = self.contacts.read().await;
        let mut list = contacts.get(owner_id).cloned().unwrap_or_default();
        list.sort_by(|a, b| {
            a.fields
                .company_name
                .cmp(&b.fields.company_name)
                .then_with(|| a.fields.full_name.cmp(&b.fields.full_name))
        });
        Ok(list)
    }

    async fn bulk_insert(
        &self,
        owner_id: &str,
        rows: Vec<NewContact>,
    ) -> Result<BulkInsertOutcome, StoreError> {
        let mut contacts = self.contacts.write().await;
        let existing = contacts.entry(owner_id.to_string()).or_default();

        let mut seen: HashSet<String> = existing.iter().map(|c| c.fields.dedup_key()).collect();
        let mut outcome = BulkInsertOutcome::default();

        for row in rows {
            if !seen.insert(row.dedup_key()) {
                debug!(email = %row.email_address_1, "Skipping duplicate contact");
                outcome.skipped_duplicates += 1;
                continue;
            }
            existing.push(row.into_contact(owner_id));
            outcome.inserted += 1;
        }

        Ok(outcome)
    }
}

#[async_trait]
impl TemplateStore for InMemoryStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Template>, StoreError> {
        let templates = self.templates.read().await;
        Ok(templates.get(owner_id).cloned().unwrap_or_default())
    }

    async fn create(&self, owner_id: &str, template: NewTemplate) -> Result<Template, StoreError> {
        template
            .validate()
            .map_err(|e| StoreError::Constraint(e.to_string()))?;
        let stored = Template::from_new(owner_id, template);
        self.templates
            .write()
            .await
            .entry(owner_id.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl AttachmentStore for InMemoryStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Attachment>, StoreError> {
        let attachments = self.attachments.read().await;
        Ok(attachments.get(owner_id).cloned().unwrap_or_default())
    }

    async fn create(
        &self,
        owner_id: &str,
        bytes: Vec<u8>,
        meta: NewAttachment,
    ) -> Result<Attachment, StoreError> {
        let now = Utc::now();
        let mut locator = make_locator(owner_id, &meta.file_name, now);

        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(&locator) {
            // Same name within the same millisecond.
            locator = format!("{locator}-{}", Uuid::new_v4().simple());
        }

        let attachment = Attachment {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            file_name: meta.file_name,
            file_type: meta.file_type,
            locator: locator.clone(),
            size_bytes: bytes.len(),
            created_at: now,
        };
        blobs.insert(locator, bytes);
        drop(blobs);

        self.attachments
            .write()
            .await
            .entry(owner_id.to_string())
            .or_default()
            .push(attachment.clone());
        Ok(attachment)
    }

    async fn read(&self, attachment: &Attachment) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(&attachment.locator)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "attachment".to_string(),
                id: attachment.locator.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contacts_are_listed_by_company() {
        let store = InMemoryStore::new();
        store
            .bulk_insert(
                "o",
                vec![
                    NewContact::new("Zed", "z@x.io").with_company("Zeta"),
                    NewContact::new("Amy", "a@x.io").with_company("Alpha"),
                ],
            )
            .await
            .unwrap();
        let list = ContactStore::list(&store, "o").await.unwrap();
        assert_eq!(list[0].fields.full_name, "Amy");
        assert_eq!(list[1].fields.full_name, "Zed");
    }

    #[tokio::test]
    async fn duplicate_rows_never_overwrite() {
        let store = InMemoryStore::new();
        store
            .bulk_insert("o", vec![NewContact::new("First", "sam@x.io")])
            .await
            .unwrap();
        let outcome = store
            .bulk_insert("o", vec![NewContact::new("Second", "sam@x.io")])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.skipped_duplicates, 1);
        let list = ContactStore::list(&store, "o").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].fields.full_name, "First");
    }

    #[tokio::test]
    async fn template_create_validates() {
        let store = InMemoryStore::new();
        let bad = NewTemplate::new("", "s", "b");
        assert!(matches!(
            TemplateStore::create(&store, "o", bad).await,
            Err(StoreError::Constraint(_))
        ));
        let ok = NewTemplate::new("Intro", "s", "b");
        let created = TemplateStore::create(&store, "o", ok).await.unwrap();
        assert_eq!(TemplateStore::list(&store, "o").await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn attachment_bytes_round_trip_by_locator() {
        let store = InMemoryStore::new();
        let att = AttachmentStore::create(
            &store,
            "o",
            b"hello".to_vec(),
            NewAttachment::new("cv 2024.pdf", "application/pdf"),
        )
        .await
        .unwrap();
        assert!(att.locator.ends_with("cv_2024.pdf"));
        assert_eq!(att.size_bytes, 5);
        assert_eq!(store.read(&att).await.unwrap(), b"hello".to_vec());
    }
}
