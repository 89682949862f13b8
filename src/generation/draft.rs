//! Drafts — a generated subject/body pending human disposition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the draft's current content came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Exactly as produced by the model (plus the reattached signature).
    Generated,
    /// Changed by the reviewer after generation.
    Edited,
}

/// A generated email awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    pub to: String,
    pub subject: String,
    /// HTML body, fixed signature included.
    pub body: String,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            status: DraftStatus::Generated,
            created_at: Utc::now(),
        }
    }

    /// Apply a reviewer edit in place. Fields left `None` are unchanged.
    pub fn apply(&mut self, edit: DraftEdit) {
        let mut changed = false;
        if let Some(subject) = edit.subject {
            changed |= subject != self.subject;
            self.subject = subject;
        }
        if let Some(body) = edit.body {
            changed |= body != self.body;
            self.body = body;
        }
        if changed {
            self.status = DraftStatus::Edited;
        }
    }
}

/// A reviewer's change to the current draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEdit {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl DraftEdit {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.body.is_none()
    }
}
