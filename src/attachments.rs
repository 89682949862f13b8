//! Attachments — metadata records and directory registration.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::AttachmentStore;

/// Metadata supplied when registering a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttachment {
    pub file_name: String,
    /// Media type, e.g. `application/pdf`.
    pub file_type: String,
}

impl NewAttachment {
    pub fn new(file_name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: file_type.into(),
        }
    }
}

/// A stored attachment. `locator` is opaque outside the store that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub owner_id: String,
    pub file_name: String,
    pub file_type: String,
    pub locator: String,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    /// Whether this attachment can be shown inline as an image.
    pub fn is_image(&self) -> bool {
        self.file_type.starts_with("image/")
    }
}

/// Build a collision-resistant locator: `{owner}-{millis}-{name}` with
/// whitespace in the name replaced by `_`.
pub fn make_locator(owner_id: &str, file_name: &str, at: DateTime<Utc>) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{owner_id}-{}-{sanitized}", at.timestamp_millis())
}

/// Guess a media type from a file extension.
pub fn guess_media_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Register every regular file in `dir` with the attachment store, in name order.
pub async fn load_dir(
    store: &dyn AttachmentStore,
    owner_id: &str,
    dir: &Path,
) -> Result<Vec<Attachment>, StoreError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut registered = Vec::with_capacity(files.len());
    for path in files {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            continue;
        };
        let bytes = tokio::fs::read(&path).await?;
        let meta = NewAttachment::new(&file_name, guess_media_type(&file_name));
        registered.push(store.create(owner_id, bytes, meta).await?);
    }

    info!(dir = %dir.display(), count = registered.len(), "Registered attachments");
    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn locator_replaces_whitespace() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            make_locator("u1", "my cv final.pdf", at),
            "u1-1700000000000-my_cv_final.pdf"
        );
    }

    #[test]
    fn media_types() {
        assert_eq!(guess_media_type("CV.PDF"), "application/pdf");
        assert_eq!(guess_media_type("photo.jpeg"), "image/jpeg");
        assert_eq!(guess_media_type("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn load_dir_registers_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"png-bytes").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"pdf-bytes").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let store = InMemoryStore::new();
        let registered = load_dir(&store, "owner", dir.path()).await.unwrap();

        let names: Vec<_> = registered.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.png"]);
        assert!(registered[1].is_image());
        assert_eq!(store.read(&registered[0]).await.unwrap(), b"pdf-bytes");
    }
}
