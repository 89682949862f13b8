//! Campaign state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a campaign run stands. Indexed states carry the recipient cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum CampaignState {
    /// No run has been started.
    Idle,
    /// Producing a draft for recipient `i`.
    Generating(usize),
    /// Draft for recipient `i` is waiting on a human decision.
    AwaitingApproval(usize),
    /// Handing the approved draft for recipient `i` to the relay.
    Sending(usize),
    /// Every recipient has been handled.
    Done,
    /// Stopped by the user.
    Cancelled,
}

impl CampaignState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: CampaignState) -> bool {
        use CampaignState::*;

        match (*self, target) {
            // Fresh run
            (Idle | Done | Cancelled, Generating(0)) => true,
            // Generation succeeded, or failed and moved on
            (Generating(i), AwaitingApproval(j)) => i == j,
            (Generating(i), Generating(j)) => j == i + 1,
            (Generating(_), Done) => true,
            // Human decisions: approve, regenerate, skip
            (AwaitingApproval(i), Sending(j)) => i == j,
            (AwaitingApproval(i), Generating(j)) => j == i || j == i + 1,
            (AwaitingApproval(_), Done) => true,
            // Send outcome
            (Sending(i), Generating(j)) => j == i + 1,
            (Sending(i), AwaitingApproval(j)) => i == j,
            (Sending(_), Done) => true,
            (from, Cancelled) => from.is_active(),
            _ => false,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// A run exists and has not finished.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Generating(_) | Self::AwaitingApproval(_) | Self::Sending(_)
        )
    }

    /// Recipient index for indexed states.
    pub fn cursor(&self) -> Option<usize> {
        match self {
            Self::Generating(i) | Self::AwaitingApproval(i) | Self::Sending(i) => Some(*i),
            _ => None,
        }
    }
}

impl std::fmt::Display for CampaignState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Generating(i) => write!(f, "generating({i})"),
            Self::AwaitingApproval(i) => write!(f, "awaiting_approval({i})"),
            Self::Sending(i) => write!(f, "sending({i})"),
            Self::Done => write!(f, "done"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A state transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: CampaignState,
    pub to: CampaignState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Transition history kept by an orchestrator; oldest entries are dropped.
pub const MAX_TRANSITIONS: usize = 200;
