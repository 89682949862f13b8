//! Campaign orchestrator — drives one run through generate → review → send.
//!
//! Recipients are handled strictly one at a time. The only suspension points
//! are the generation and dispatch calls; while a draft awaits approval the
//! orchestrator does nothing until one of its public actions is called.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::run::{
    CampaignReport, CampaignRun, CampaignStatus, CancelHandle, OutcomeCounts, OutcomeKind,
    RecipientView, StartRequest,
};
use super::state::{CampaignState, MAX_TRANSITIONS, StateTransition};
use crate::config::SenderIdentity;
use crate::dispatch::DispatchClient;
use crate::error::{CampaignError, ValidationError};
use crate::generation::{DraftEdit, GenerationClient};
use crate::store::{AttachmentStore, ContactStore, TemplateStore};

/// Collaborators an orchestrator works against.
pub struct OrchestratorDeps {
    pub owner_id: String,
    pub sender: SenderIdentity,
    pub contacts: Arc<dyn ContactStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub generator: Arc<GenerationClient>,
    pub dispatcher: Arc<DispatchClient>,
}

pub struct Orchestrator {
    deps: OrchestratorDeps,
    state: CampaignState,
    run: Option<CampaignRun>,
    transitions: Vec<StateTransition>,
    last_report: Option<CampaignReport>,
    cancel: CancelHandle,
}

impl Orchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            deps,
            state: CampaignState::Idle,
            run: None,
            transitions: Vec::new(),
            last_report: None,
            cancel: CancelHandle::new(),
        }
    }

    pub fn state(&self) -> CampaignState {
        self.state
    }

    /// Shared flag that cancels the active run from any task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Report of the most recently finished run.
    pub fn last_report(&self) -> Option<&CampaignReport> {
        self.last_report.as_ref()
    }

    pub fn status(&self) -> CampaignStatus {
        match &self.run {
            Some(run) => CampaignStatus {
                state: self.state,
                cursor: self.state.cursor(),
                total: run.total(),
                draft: run.draft.clone(),
                recipient: self
                    .state
                    .cursor()
                    .and_then(|i| run.contacts.get(i))
                    .map(RecipientView::from),
                last_dispatch_error: run.last_dispatch_error.clone(),
                counts: OutcomeCounts::tally(&run.outcomes),
            },
            None => CampaignStatus {
                state: self.state,
                cursor: None,
                total: self.last_report.as_ref().map_or(0, |r| r.total),
                draft: None,
                recipient: None,
                last_dispatch_error: None,
                counts: self.last_report.as_ref().map(|r| r.counts).unwrap_or_default(),
            },
        }
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Snapshot the selection and begin generating for the first recipient.
    pub async fn start(&mut self, request: StartRequest) -> Result<CampaignStatus, CampaignError> {
        if self.state.is_active() {
            return Err(self.invalid("start"));
        }

        if request.contact_ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let template_id = request.template_id.ok_or(ValidationError::MissingTemplate)?;
        let credentials = request
            .credentials
            .ok_or(ValidationError::MissingCredentials)?;
        credentials.validate()?;

        let owner = self.deps.owner_id.as_str();

        let all_contacts = self.deps.contacts.list(owner).await?;
        let contacts = request
            .contact_ids
            .iter()
            .map(|id| {
                all_contacts
                    .iter()
                    .find(|c| c.id == *id)
                    .cloned()
                    .ok_or(ValidationError::UnknownContact(*id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let template = self
            .deps
            .templates
            .list(owner)
            .await?
            .into_iter()
            .find(|t| t.id == template_id)
            .ok_or(ValidationError::UnknownTemplate(template_id))?;

        let all_attachments = self.deps.attachments.list(owner).await?;
        let find_attachment = |id: Uuid| {
            all_attachments
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or(ValidationError::UnknownAttachment(id))
        };
        let attachments = request
            .attachment_ids
            .iter()
            .map(|id| find_attachment(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let inline_image = request.inline_image_id.map(find_attachment).transpose()?;
        if let Some(image) = inline_image.as_ref().filter(|a| !a.is_image()) {
            return Err(ValidationError::NotAnImage(image.file_name.clone()).into());
        }

        let run = CampaignRun {
            id: Uuid::new_v4(),
            contacts,
            template,
            attachments,
            inline_image,
            sender: self.deps.sender.clone(),
            credentials,
            cursor: 0,
            draft: None,
            last_dispatch_error: None,
            outcomes: Vec::new(),
            started_at: Utc::now(),
        };
        info!(
            run = %run.id,
            recipients = run.total(),
            template = %run.template.name,
            attachments = run.attachments.len(),
            inline_image = run.inline_image.is_some(),
            "Starting campaign"
        );

        self.cancel.reset();
        self.run = Some(run);
        self.transition(CampaignState::Generating(0), "start")?;
        self.drive().await;
        Ok(self.status())
    }

    /// Send the current draft.
    ///
    /// A dispatch failure is returned and the run goes back to awaiting
    /// approval for the same recipient with the same draft.
    pub async fn approve(&mut self) -> Result<CampaignStatus, CampaignError> {
        let index = self.awaiting("approve")?;
        if self.observe_cancel() {
            return Ok(self.status());
        }
        self.transition(CampaignState::Sending(index), "approve")?;

        let result = {
            let Some(run) = self.run.as_ref() else {
                return Err(self.invalid("approve"));
            };
            let Some(draft) = run.draft.as_ref() else {
                return Err(self.invalid("approve"));
            };
            self.deps
                .dispatcher
                .dispatch(
                    draft,
                    &run.sender,
                    &run.credentials,
                    &run.attachments,
                    run.inline_image.as_ref(),
                )
                .await
        };

        match result {
            Ok(()) => {
                if let Some(run) = self.run.as_mut() {
                    run.record(index, OutcomeKind::Sent);
                    run.draft = None;
                    run.last_dispatch_error = None;
                }
                if self.observe_cancel() {
                    return Ok(self.status());
                }
                self.advance(index, "sent")?;
                self.drive().await;
                Ok(self.status())
            }
            Err(e) => {
                warn!(index, error = %e, "Dispatch failed; draft kept for retry");
                if let Some(run) = self.run.as_mut() {
                    run.record(
                        index,
                        OutcomeKind::DispatchFailed {
                            reason: e.to_string(),
                        },
                    );
                    run.last_dispatch_error = Some(e.to_string());
                }
                if self.observe_cancel() {
                    return Ok(self.status());
                }
                self.transition(CampaignState::AwaitingApproval(index), "dispatch failed")?;
                Err(e.into())
            }
        }
    }

    /// Change the current draft in place. No state change.
    pub fn edit(&mut self, edit: DraftEdit) -> Result<CampaignStatus, CampaignError> {
        self.awaiting("edit")?;
        if let Some(draft) = self.run.as_mut().and_then(|r| r.draft.as_mut()) {
            draft.apply(edit);
        }
        Ok(self.status())
    }

    /// Discard the current draft and generate a new one for the same recipient.
    pub async fn regenerate(&mut self) -> Result<CampaignStatus, CampaignError> {
        let index = self.awaiting("regenerate")?;
        if let Some(run) = self.run.as_mut() {
            run.draft = None;
        }
        self.transition(CampaignState::Generating(index), "regenerate")?;
        self.drive().await;
        Ok(self.status())
    }

    /// Discard the current draft without sending and move to the next recipient.
    pub async fn skip(&mut self) -> Result<CampaignStatus, CampaignError> {
        let index = self.awaiting("skip")?;
        if let Some(run) = self.run.as_mut() {
            run.draft = None;
            run.record(index, OutcomeKind::Skipped);
        }
        self.advance(index, "skipped")?;
        self.drive().await;
        Ok(self.status())
    }

    /// Stop the active run. Nothing further is generated or sent.
    pub fn cancel(&mut self) -> Result<CampaignStatus, CampaignError> {
        if !self.state.is_active() {
            return Err(self.invalid("cancel"));
        }
        self.cancel.cancel();
        self.finish(CampaignState::Cancelled, "cancelled by user")?;
        Ok(self.status())
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Generate until a draft needs review or the run ends.
    async fn drive(&mut self) {
        while let CampaignState::Generating(index) = self.state {
            if self.observe_cancel() {
                return;
            }
            let Some(run) = self.run.as_ref() else {
                return;
            };
            let Some(contact) = run.contacts.get(index) else {
                let _ = self.finish(CampaignState::Done, "all recipients handled");
                return;
            };

            let result = self
                .deps
                .generator
                .generate(contact, &run.template, &run.sender)
                .await;

            if self.observe_cancel() {
                return;
            }

            let step = match result {
                Ok(draft) => {
                    if let Some(run) = self.run.as_mut() {
                        run.draft = Some(draft);
                    }
                    self.transition(CampaignState::AwaitingApproval(index), "draft ready")
                }
                Err(e) => {
                    warn!(index, error = %e, "Generation failed; moving to next recipient");
                    if let Some(run) = self.run.as_mut() {
                        run.record(
                            index,
                            OutcomeKind::GenerationFailed {
                                reason: e.to_string(),
                            },
                        );
                    }
                    self.advance(index, "generation failed")
                }
            };
            if let Err(e) = step {
                warn!(error = %e, "Campaign transition rejected");
                return;
            }
        }
    }

    /// Move past recipient `index`: the next one, or `Done` when none remain.
    fn advance(&mut self, index: usize, reason: &str) -> Result<(), CampaignError> {
        let next = index + 1;
        let total = self.run.as_ref().map_or(0, CampaignRun::total);
        if next >= total {
            self.finish(CampaignState::Done, reason)
        } else {
            self.transition(CampaignState::Generating(next), reason)
        }
    }

    /// Enter a terminal state and keep the run's report.
    fn finish(&mut self, to: CampaignState, reason: &str) -> Result<(), CampaignError> {
        self.transition(to, reason)?;
        if let Some(run) = self.run.take() {
            let report = run.report(to);
            info!(
                run = %report.run_id,
                state = %to,
                sent = report.counts.sent,
                skipped = report.counts.skipped,
                generation_failed = report.counts.generation_failed,
                dispatch_failures = report.counts.dispatch_failures,
                "Campaign finished"
            );
            self.last_report = Some(report);
        }
        Ok(())
    }

    /// If the cancel flag is up and a run is active, end it. Returns whether it did.
    fn observe_cancel(&mut self) -> bool {
        if !self.cancel.is_cancelled() {
            return false;
        }
        if self.state.is_active() {
            let _ = self.finish(CampaignState::Cancelled, "cancel requested");
        }
        true
    }

    fn awaiting(&self, action: &str) -> Result<usize, CampaignError> {
        match self.state {
            CampaignState::AwaitingApproval(i) => Ok(i),
            _ => Err(self.invalid(action)),
        }
    }

    fn invalid(&self, action: &str) -> CampaignError {
        CampaignError::InvalidTransition {
            state: self.state.to_string(),
            action: action.to_string(),
        }
    }

    fn transition(&mut self, to: CampaignState, reason: &str) -> Result<(), CampaignError> {
        if !self.state.can_transition_to(to) {
            return Err(self.invalid(&format!("move to {to}")));
        }

        info!(from = %self.state, to = %to, reason, "Campaign transition");
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            timestamp: Utc::now(),
            reason: Some(reason.to_string()),
        });
        if self.transitions.len() > MAX_TRANSITIONS {
            let drain_count = self.transitions.len() - MAX_TRANSITIONS;
            self.transitions.drain(..drain_count);
        }

        self.state = to;
        if let (Some(i), Some(run)) = (to.cursor(), self.run.as_mut()) {
            run.cursor = i;
            // A send failure belongs to the draft it was reported against.
            if matches!(to, CampaignState::Generating(_)) {
                run.last_dispatch_error = None;
            }
        }
        Ok(())
    }
}
