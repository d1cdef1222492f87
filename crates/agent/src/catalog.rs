//! Response catalog
//!
//! Deterministic lookup from stage outcome or objection category to the text
//! spoken to the callee.

use voicebot_config::Replies;
use voicebot_core::ObjectionKind;

const COMPANY_PLACEHOLDER: &str = "{company}";

/// Fixed reply texts
#[derive(Debug, Clone)]
pub struct ResponseCatalog {
    replies: Replies,
}

impl ResponseCatalog {
    pub fn new(replies: Replies) -> Self {
        Self { replies }
    }

    /// Rebuttal for an objection, falling back to the generic one
    pub fn reply(&self, kind: ObjectionKind) -> &str {
        self.replies
            .objections
            .get(&kind)
            .or_else(|| self.replies.objections.get(&ObjectionKind::Generic))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn greeting(&self, company: &str) -> String {
        personalize(&self.replies.greeting, company)
    }

    pub fn greeting_unknown(&self) -> String {
        self.replies.greeting_unknown.clone()
    }

    pub fn qualify_question(&self, company: &str) -> String {
        personalize(&self.replies.qualify_question, company)
    }

    pub fn pitch_no_site(&self, company: &str) -> String {
        personalize(&self.replies.pitch_no_site, company)
    }

    pub fn pitch_upgrade(&self, company: &str) -> String {
        personalize(&self.replies.pitch_upgrade, company)
    }

    pub fn schedule_proposal(&self) -> String {
        self.replies.schedule_proposal.clone()
    }

    pub fn schedule_retry(&self) -> String {
        self.replies.schedule_retry.clone()
    }

    pub fn schedule_confirmed(&self) -> String {
        self.replies.schedule_confirmed.clone()
    }

    pub fn refusal_close(&self) -> String {
        self.replies.refusal_close.clone()
    }

    pub fn soft_close(&self) -> String {
        self.replies.soft_close.clone()
    }

    pub fn generic_close(&self) -> String {
        self.replies.generic_close.clone()
    }

    pub fn machine_close(&self, company: &str) -> String {
        personalize(&self.replies.machine_close, company)
    }
}

impl Default for ResponseCatalog {
    fn default() -> Self {
        Self::new(Replies::default())
    }
}

fn personalize(template: &str, company: &str) -> String {
    template.replace(COMPANY_PLACEHOLDER, company)
}
