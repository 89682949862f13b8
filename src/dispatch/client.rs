//! Dispatch client — turns an approved draft into one relay send.

use std::sync::Arc;

use tracing::{info, warn};

use super::message::{embed_inline_image, new_content_id};
use super::relay::{MailRelay, OutboundAttachment, OutboundEmail, RelayCredentials};
use crate::attachments::Attachment;
use crate::config::SenderIdentity;
use crate::error::DispatchError;
use crate::generation::Draft;
use crate::store::AttachmentStore;

pub struct DispatchClient {
    relay: Arc<dyn MailRelay>,
    attachments: Arc<dyn AttachmentStore>,
}

impl DispatchClient {
    pub fn new(relay: Arc<dyn MailRelay>, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self { relay, attachments }
    }

    async fn load(
        &self,
        attachment: &Attachment,
        content_id: Option<String>,
    ) -> Result<OutboundAttachment, DispatchError> {
        let bytes = self
            .attachments
            .read(attachment)
            .await
            .map_err(|e| DispatchError::Attachment {
                name: attachment.file_name.clone(),
                reason: e.to_string(),
            })?;
        Ok(OutboundAttachment {
            filename: attachment.file_name.clone(),
            content_type: attachment.file_type.clone(),
            bytes,
            content_id,
        })
    }

    /// Assemble the outbound message for `draft` without sending it.
    pub async fn compose(
        &self,
        draft: &Draft,
        sender: &SenderIdentity,
        credentials: &RelayCredentials,
        attachments: &[Attachment],
        inline_image: Option<&Attachment>,
    ) -> Result<OutboundEmail, DispatchError> {
        let mut html = draft.body.clone();
        let mut parts = Vec::with_capacity(attachments.len() + 1);

        if let Some(image) = inline_image {
            let cid = new_content_id();
            match embed_inline_image(&html, &cid, &image.file_name) {
                Some(embedded) => {
                    html = embedded;
                    parts.push(self.load(image, Some(cid)).await?);
                }
                None => {
                    warn!(
                        to = %draft.to,
                        image = %image.file_name,
                        "Inline image selected but body has no marker; attaching it instead"
                    );
                    parts.push(self.load(image, None).await?);
                }
            }
        }

        for attachment in attachments {
            parts.push(self.load(attachment, None).await?);
        }

        let from_name = sender
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| sender.email.clone())
            .unwrap_or_else(|| credentials.username.clone());

        Ok(OutboundEmail {
            from_name,
            from_address: credentials.username.trim().to_string(),
            to: draft.to.clone(),
            subject: draft.subject.clone(),
            html,
            attachments: parts,
        })
    }

    /// Compose and send `draft`. One relay attempt; failures are returned as-is.
    pub async fn dispatch(
        &self,
        draft: &Draft,
        sender: &SenderIdentity,
        credentials: &RelayCredentials,
        attachments: &[Attachment],
        inline_image: Option<&Attachment>,
    ) -> Result<(), DispatchError> {
        let email = self
            .compose(draft, sender, credentials, attachments, inline_image)
            .await?;
        info!(
            to = %email.to,
            attachments = email.attachments.len(),
            "Dispatching email"
        );
        self.relay.send(email, credentials).await
    }
}
