//! Call conversation types: stages and per-call state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::objection::ObjectionKind;

/// Conversation stages for the outbound sales flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Call connected, opener not yet answered
    #[default]
    Intro,
    /// Asking about the current web presence
    Qualify,
    /// Pitching a new site to a business without one
    PitchNoSite,
    /// Pitching conversion improvements for an existing site
    PitchUpgrade,
    /// Agreeing on a follow-up slot
    Schedule,
    /// Conversation over, call should end
    Wrap,
}

impl Stage {
    /// Get stage display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Intro => "Intro",
            Stage::Qualify => "Qualify",
            Stage::PitchNoSite => "Pitch (no site)",
            Stage::PitchUpgrade => "Pitch (upgrade)",
            Stage::Schedule => "Schedule",
            Stage::Wrap => "Wrap",
        }
    }

    /// Wire name, as used in JSON and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intro => "intro",
            Stage::Qualify => "qualify",
            Stage::PitchNoSite => "pitch_no_site",
            Stage::PitchUpgrade => "pitch_upgrade",
            Stage::Schedule => "schedule",
            Stage::Wrap => "wrap",
        }
    }

    /// Whether this stage belongs to the pitch family
    pub fn is_pitch(&self) -> bool {
        matches!(self, Stage::PitchNoSite | Stage::PitchUpgrade)
    }

    /// Get all valid transitions from this stage
    ///
    /// Pitch stages may stay where they are across several turns; every other
    /// stage is left for good once the engine moves on.
    pub fn valid_transitions(&self) -> Vec<Stage> {
        match self {
            Stage::Intro => vec![Stage::Qualify, Stage::Wrap],
            Stage::Qualify => vec![Stage::PitchNoSite, Stage::PitchUpgrade, Stage::Wrap],
            Stage::PitchNoSite => vec![Stage::PitchNoSite, Stage::Schedule, Stage::Wrap],
            Stage::PitchUpgrade => vec![Stage::PitchUpgrade, Stage::Schedule, Stage::Wrap],
            Stage::Schedule => vec![Stage::Schedule, Stage::Wrap],
            Stage::Wrap => vec![],
        }
    }

    /// Check if transition to target stage is allowed
    pub fn can_transition_to(&self, target: Stage) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation state for one outbound call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallState {
    /// Unique call identifier, stable for the call's lifetime
    pub call_id: String,
    /// Company being called, used for personalization
    pub company_name: String,
    /// Current stage
    pub stage: Stage,
    /// Pitch-stage turns so far
    pub attempts: u32,
    /// Schedule-stage turns that named no time
    #[serde(default)]
    pub schedule_retries: u32,
    /// Objections heard, in order. Informational only.
    pub objections: Vec<ObjectionKind>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// True when this state was rebuilt after a store miss
    #[serde(default)]
    pub recovered: bool,
}

impl CallState {
    /// Fresh state for a call that is about to be placed
    pub fn new(call_id: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            company_name: company_name.into(),
            stage: Stage::Intro,
            attempts: 0,
            schedule_retries: 0,
            objections: Vec::new(),
            created_at: Utc::now(),
            recovered: false,
        }
    }

    /// Fresh state with a newly generated call id
    pub fn create(company_name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), company_name)
    }

    /// Default state used when a webhook references an unknown call id
    pub fn recovered(call_id: impl Into<String>, company_name: impl Into<String>, stage: Stage) -> Self {
        Self {
            stage,
            recovered: true,
            ..Self::new(call_id, company_name)
        }
    }

    /// Is the conversation over
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Wrap
    }
}
