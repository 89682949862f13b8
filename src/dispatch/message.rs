//! Message assembly: inline-image embedding and MIME construction.

use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use uuid::Uuid;

use super::relay::OutboundEmail;
use crate::error::DispatchError;
use crate::templates::IMAGE_MARKER;

/// Fresh content id for an inline image.
pub fn new_content_id() -> String {
    format!("image-{}", Uuid::new_v4())
}

/// The `<img>` tag that replaces the marker.
pub fn inline_image_tag(content_id: &str, filename: &str) -> String {
    format!(
        "<img src=\"cid:{content_id}\" style=\"max-width: 500px; width: 100%; height: auto; \
         border-radius: 8px; margin-top: 16px; margin-bottom: 16px;\" alt=\"{filename}\" />"
    )
}

/// Replace every marker in `html` with an image tag bound to `content_id`.
/// Returns `None` when the body has no marker.
pub fn embed_inline_image(html: &str, content_id: &str, filename: &str) -> Option<String> {
    html.contains(IMAGE_MARKER)
        .then(|| html.replace(IMAGE_MARKER, &inline_image_tag(content_id, filename)))
}

fn parse_address(address: &str) -> Result<lettre::Address, DispatchError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| DispatchError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

fn content_type(part: &str, name: &str) -> Result<ContentType, DispatchError> {
    ContentType::parse(part).map_err(|e| DispatchError::Attachment {
        name: name.to_string(),
        reason: format!("bad media type '{part}': {e}"),
    })
}

/// Build the MIME message.
///
/// Layout is `multipart/mixed` holding a `multipart/related` (HTML body plus
/// inline images) followed by the regular attachments.
pub fn build_message(email: &OutboundEmail) -> Result<Message, DispatchError> {
    let from = Mailbox::new(
        Some(email.from_name.clone()),
        parse_address(&email.from_address)?,
    );
    let to = Mailbox::new(None, parse_address(&email.to)?);

    let mut related = MultiPart::related().singlepart(SinglePart::html(email.html.clone()));
    for part in email.inline_parts() {
        let Some(cid) = part.content_id.clone() else {
            continue;
        };
        related = related.singlepart(
            Attachment::new_inline(cid)
                .body(part.bytes.clone(), content_type(&part.content_type, &part.filename)?),
        );
    }

    let mut mixed = MultiPart::mixed().multipart(related);
    for part in email.regular_parts() {
        mixed = mixed.singlepart(
            Attachment::new(part.filename.clone())
                .body(part.bytes.clone(), content_type(&part.content_type, &part.filename)?),
        );
    }

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .multipart(mixed)
        .map_err(|e| DispatchError::Build(e.to_string()))
}
