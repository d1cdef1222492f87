//! Dialogue engine
//!
//! Decides what to say next given the current call state and the callee's
//! latest transcript.
//!
//! ```text
//! intro ──▶ qualify ──┬─▶ pitch_no_site ─┬─▶ schedule ──▶ wrap
//!                     └─▶ pitch_upgrade ─┤        ▲  │
//!                            ▲  │        └─▶ wrap │  └─(retry)
//!                            └──┘ (rebuttal, attempts += 1)
//! ```
//!
//! Every turn in a pitch stage counts as an attempt and has its objection
//! recorded, agreement included. After the third attempt the call is wrapped
//! up regardless of content; a refusal from the second attempt on wraps it up
//! early. Agreement is checked before refusal. The schedule stage re-asks
//! twice for a time; a third answer without one closes the call.

use serde::{Deserialize, Serialize};
use voicebot_config::DialogueScript;
use voicebot_core::{CallState, ObjectionKind, Stage};

use crate::catalog::ResponseCatalog;
use crate::classifier::{KeywordSet, UtteranceClassifier};
use crate::AgentError;

/// Pitch turns after which the call is wrapped up unconditionally
pub const MAX_PITCH_ATTEMPTS: u32 = 3;

/// Pitch turns after which an explicit refusal wraps up the call
pub const REFUSAL_EXIT_ATTEMPTS: u32 = 2;

/// Schedule re-prompts allowed before a call without a time is closed
pub const MAX_SCHEDULE_RETRIES: u32 = 2;

/// Webhook that receives the callee's next utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Answer,
    Qualify,
    Handle,
    Schedule,
}

impl Route {
    /// Path segment under `/voice/`
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Answer => "answer",
            Route::Qualify => "qualify",
            Route::Handle => "handle",
            Route::Schedule => "schedule",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the carrier should do after speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Gather speech and post it to the route
    Listen(Route),
    /// End the call
    Hangup,
}

/// Output of one conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Text to speak
    pub speech: String,
    /// Follow-up directive
    pub next: NextStep,
    /// Stage before the turn
    pub from: Stage,
    /// Stage after the turn
    pub to: Stage,
    /// Objection recorded during this turn
    pub objection: Option<ObjectionKind>,
}

impl Turn {
    fn new(speech: String, next: NextStep, from: Stage, to: Stage) -> Self {
        Self {
            speech,
            next,
            from,
            to,
            objection: None,
        }
    }

    fn with_objection(mut self, objection: Option<ObjectionKind>) -> Self {
        self.objection = objection;
        self
    }

    /// Does this turn end the call
    pub fn is_hangup(&self) -> bool {
        self.next == NextStep::Hangup
    }
}

/// Keyword sets used for stage transitions
#[derive(Debug, Clone)]
struct StageMatchers {
    no_website: KeywordSet,
    agreement: KeywordSet,
    refusal: KeywordSet,
    schedule_time: KeywordSet,
}

/// Stage machine driving the sales conversation
#[derive(Debug, Clone)]
pub struct DialogueEngine {
    classifier: UtteranceClassifier,
    catalog: ResponseCatalog,
    matchers: StageMatchers,
}

impl DialogueEngine {
    /// Compile the script's keyword sets and load its texts
    pub fn new(script: &DialogueScript) -> Result<Self, AgentError> {
        script.validate()?;

        let keywords = &script.keywords;
        let matchers = StageMatchers {
            no_website: KeywordSet::compile("keywords.no_website", &keywords.no_website)?,
            agreement: KeywordSet::compile("keywords.agreement", &keywords.agreement)?,
            refusal: KeywordSet::compile("keywords.refusal", &keywords.refusal)?,
            schedule_time: KeywordSet::compile("keywords.schedule_time", &keywords.schedule_time)?,
        };

        Ok(Self {
            classifier: UtteranceClassifier::new(keywords)?,
            catalog: ResponseCatalog::new(script.replies.clone()),
            matchers,
        })
    }

    pub fn classifier(&self) -> &UtteranceClassifier {
        &self.classifier
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    /// Opening line once the carrier connects a known call
    ///
    /// Restarts the conversation at `intro`; the reply goes to `qualify`.
    pub fn answer(&self, state: &mut CallState) -> Turn {
        let from = state.stage;
        state.stage = Stage::Intro;
        Turn::new(
            self.catalog.greeting(&state.company_name),
            NextStep::Listen(Route::Qualify),
            from,
            Stage::Intro,
        )
    }

    /// Opening line for a call id the store does not know
    pub fn answer_unknown(&self) -> Turn {
        Turn::new(
            self.catalog.greeting_unknown(),
            NextStep::Listen(Route::Qualify),
            Stage::Intro,
            Stage::Intro,
        )
    }

    /// An answering machine picked up: leave a short message and hang up
    pub fn machine_answered(&self, state: &mut CallState) -> Turn {
        let from = state.stage;
        state.stage = Stage::Wrap;
        Turn::new(
            self.catalog.machine_close(&state.company_name),
            NextStep::Hangup,
            from,
            Stage::Wrap,
        )
    }

    /// Advance the conversation by one callee utterance
    ///
    /// Mutates `state.stage`, the attempt counters and may append to
    /// `state.objections`. Deterministic given `(state, transcript)`.
    pub fn advance(&self, state: &mut CallState, transcript: &str) -> Turn {
        let from = state.stage;
        let text = transcript.trim().to_lowercase();

        let turn = match state.stage {
            Stage::Intro => {
                state.stage = Stage::Qualify;
                Turn::new(
                    self.catalog.qualify_question(&state.company_name),
                    NextStep::Listen(Route::Qualify),
                    from,
                    state.stage,
                )
            }
            Stage::Qualify => {
                let speech = if self.matchers.no_website.is_match(&text) {
                    state.stage = Stage::PitchNoSite;
                    self.catalog.pitch_no_site(&state.company_name)
                } else {
                    state.stage = Stage::PitchUpgrade;
                    self.catalog.pitch_upgrade(&state.company_name)
                };
                Turn::new(speech, NextStep::Listen(Route::Handle), from, state.stage)
            }
            Stage::PitchNoSite | Stage::PitchUpgrade => self.pitch_turn(state, &text),
            Stage::Schedule => {
                if self.matchers.schedule_time.is_match(&text) {
                    state.stage = Stage::Wrap;
                    Turn::new(
                        self.catalog.schedule_confirmed(),
                        NextStep::Hangup,
                        from,
                        state.stage,
                    )
                } else {
                    state.schedule_retries += 1;
                    if state.schedule_retries > MAX_SCHEDULE_RETRIES {
                        state.stage = Stage::Wrap;
                        Turn::new(self.catalog.soft_close(), NextStep::Hangup, from, state.stage)
                    } else {
                        Turn::new(
                            self.catalog.schedule_retry(),
                            NextStep::Listen(Route::Schedule),
                            from,
                            state.stage,
                        )
                    }
                }
            }
            Stage::Wrap => Turn::new(self.catalog.generic_close(), NextStep::Hangup, from, Stage::Wrap),
        };

        tracing::debug!(
            call_id = %state.call_id,
            from = %turn.from,
            to = %turn.to,
            attempts = state.attempts,
            objection = ?turn.objection,
            "Dialogue turn"
        );

        turn
    }

    fn pitch_turn(&self, state: &mut CallState, text: &str) -> Turn {
        let from = state.stage;
        let objection = self.classifier.classify(text);
        if let Some(kind) = objection {
            state.objections.push(kind);
        }
        state.attempts += 1;

        if self.matchers.agreement.is_match(text) {
            state.stage = Stage::Schedule;
            return Turn::new(
                self.catalog.schedule_proposal(),
                NextStep::Listen(Route::Schedule),
                from,
                state.stage,
            )
            .with_objection(objection);
        }

        if self.matchers.refusal.is_match(text) && state.attempts >= REFUSAL_EXIT_ATTEMPTS {
            state.stage = Stage::Wrap;
            return Turn::new(self.catalog.refusal_close(), NextStep::Hangup, from, state.stage)
                .with_objection(objection);
        }

        if state.attempts >= MAX_PITCH_ATTEMPTS {
            state.stage = Stage::Wrap;
            return Turn::new(self.catalog.soft_close(), NextStep::Hangup, from, state.stage)
                .with_objection(objection);
        }

        let rebuttal = self
            .catalog
            .reply(objection.unwrap_or(ObjectionKind::Generic))
            .to_string();
        Turn::new(rebuttal, NextStep::Listen(Route::Handle), from, state.stage)
            .with_objection(objection)
    }
}
