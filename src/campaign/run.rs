//! Campaign run snapshot, per-recipient outcomes, and the views built from them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::CampaignState;
use crate::attachments::Attachment;
use crate::config::SenderIdentity;
use crate::contacts::Contact;
use crate::dispatch::RelayCredentials;
use crate::generation::Draft;
use crate::templates::Template;

/// What was selected when the run started.
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    /// Recipients, in sending order.
    pub contact_ids: Vec<Uuid>,
    pub template_id: Option<Uuid>,
    pub attachment_ids: Vec<Uuid>,
    pub inline_image_id: Option<Uuid>,
    pub credentials: Option<RelayCredentials>,
}

/// What happened to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    Sent,
    Skipped,
    GenerationFailed { reason: String },
    /// One failed send attempt. The recipient stays pending.
    DispatchFailed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub index: usize,
    pub contact_id: Uuid,
    pub email: String,
    #[serde(flatten)]
    pub kind: OutcomeKind,
    pub at: DateTime<Utc>,
}

/// Tallies over an outcome log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub sent: usize,
    pub skipped: usize,
    pub generation_failed: usize,
    pub dispatch_failures: usize,
}

impl OutcomeCounts {
    pub fn tally(outcomes: &[RecipientOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o.kind {
                OutcomeKind::Sent => acc.sent += 1,
                OutcomeKind::Skipped => acc.skipped += 1,
                OutcomeKind::GenerationFailed { .. } => acc.generation_failed += 1,
                OutcomeKind::DispatchFailed { .. } => acc.dispatch_failures += 1,
            }
            acc
        })
    }
}

/// The state of one run, owned by a single orchestrator.
///
/// Contacts, template and attachments are resolved values captured at start;
/// later store changes do not affect the run.
#[derive(Debug, Clone)]
pub struct CampaignRun {
    pub id: Uuid,
    pub contacts: Vec<Contact>,
    pub template: Template,
    pub attachments: Vec<Attachment>,
    pub inline_image: Option<Attachment>,
    pub sender: SenderIdentity,
    pub credentials: RelayCredentials,
    pub cursor: usize,
    pub draft: Option<Draft>,
    pub last_dispatch_error: Option<String>,
    pub outcomes: Vec<RecipientOutcome>,
    pub started_at: DateTime<Utc>,
}

impl CampaignRun {
    pub fn total(&self) -> usize {
        self.contacts.len()
    }

    pub fn record(&mut self, index: usize, kind: OutcomeKind) {
        let Some(contact) = self.contacts.get(index) else {
            return;
        };
        self.outcomes.push(RecipientOutcome {
            index,
            contact_id: contact.id,
            email: contact.primary_email().to_string(),
            kind,
            at: Utc::now(),
        });
    }

    pub fn report(&self, final_state: CampaignState) -> CampaignReport {
        CampaignReport {
            run_id: self.id,
            final_state,
            total: self.total(),
            counts: OutcomeCounts::tally(&self.outcomes),
            outcomes: self.outcomes.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub run_id: Uuid,
    pub final_state: CampaignState,
    pub total: usize,
    #[serde(flatten)]
    pub counts: OutcomeCounts,
    pub outcomes: Vec<RecipientOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Who the current draft is for.
#[derive(Debug, Clone, Serialize)]
pub struct RecipientView {
    pub contact_id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
}

impl From<&Contact> for RecipientView {
    fn from(c: &Contact) -> Self {
        Self {
            contact_id: c.id,
            name: c.display_name().to_string(),
            email: c.primary_email().to_string(),
            company: c.fields.company_name.clone(),
        }
    }
}

/// Snapshot returned by every orchestrator action.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStatus {
    pub state: CampaignState,
    pub cursor: Option<usize>,
    pub total: usize,
    pub draft: Option<Draft>,
    pub recipient: Option<RecipientView>,
    pub last_dispatch_error: Option<String>,
    #[serde(flatten)]
    pub counts: OutcomeCounts,
}

/// Cooperative cancellation flag, shareable across tasks.
///
/// Tripping it never interrupts an in-flight call; the orchestrator notices
/// between steps and discards any late result.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
