//! Utterance classification
//!
//! Maps a transcript to an objection category by evaluating keyword sets in
//! order. Matching is regex based and case-insensitive, with no stemming:
//! paraphrases the keyword sets do not cover are simply missed.

use regex::{RegexSet, RegexSetBuilder};
use voicebot_config::KeywordSets;
use voicebot_core::ObjectionKind;

use crate::AgentError;

/// A named set of keyword patterns, matched as a whole
#[derive(Debug, Clone)]
pub struct KeywordSet {
    name: String,
    set: RegexSet,
}

impl KeywordSet {
    /// Compile patterns once at startup
    pub fn compile(name: impl Into<String>, patterns: &[String]) -> Result<Self, AgentError> {
        let name = name.into();
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| AgentError::InvalidPattern {
                set: name.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { name, set })
    }

    /// Does any pattern match
    pub fn is_match(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered (category, keyword set) rules, first match wins
#[derive(Debug, Clone)]
pub struct UtteranceClassifier {
    rules: Vec<(ObjectionKind, KeywordSet)>,
}

impl UtteranceClassifier {
    /// Build from the configured objection keyword sets
    pub fn new(keywords: &KeywordSets) -> Result<Self, AgentError> {
        let rules = keywords
            .objections
            .iter()
            .map(|o| {
                KeywordSet::compile(format!("objections.{}", o.kind), &o.patterns)
                    .map(|set| (o.kind, set))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// First explicitly matching category, if any
    pub fn detect(&self, transcript: &str) -> Option<ObjectionKind> {
        let text = transcript.trim().to_lowercase();
        self.rules
            .iter()
            .find(|(_, set)| set.is_match(&text))
            .map(|(kind, _)| *kind)
    }

    /// Classify an utterance heard while an objection is possible
    ///
    /// `None` for empty input, `Generic` when something was said but no rule
    /// fired.
    pub fn classify(&self, transcript: &str) -> Option<ObjectionKind> {
        if transcript.trim().is_empty() {
            return None;
        }
        Some(self.detect(transcript).unwrap_or(ObjectionKind::Generic))
    }
}
