//! Dialogue script: keyword sets and spoken texts
//!
//! Everything the voicebot says and every keyword it listens for lives here,
//! so a deployment can swap language or wording with a YAML file. Keyword
//! entries are regular expressions matched case-insensitively; the built-in
//! script is Slovenian.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use voicebot_core::ObjectionKind;

use crate::ConfigError;

/// Complete dialogue script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueScript {
    /// Company name used when a webhook arrives for an unknown call
    #[serde(default = "default_fallback_company")]
    pub fallback_company_name: String,

    /// Keyword sets
    #[serde(default)]
    pub keywords: KeywordSets,

    /// Spoken texts
    #[serde(default)]
    pub replies: Replies,
}

fn default_fallback_company() -> String {
    "podjetje".to_string()
}

impl Default for DialogueScript {
    fn default() -> Self {
        Self {
            fallback_company_name: default_fallback_company(),
            keywords: KeywordSets::default(),
            replies: Replies::default(),
        }
    }
}

/// Keyword sets the engine and classifier match against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSets {
    /// Callee says they have no website (qualify stage)
    #[serde(default = "default_no_website")]
    pub no_website: Vec<String>,

    /// Callee agrees (pitch stages)
    #[serde(default = "default_agreement")]
    pub agreement: Vec<String>,

    /// Callee refuses (pitch stages)
    #[serde(default = "default_refusal")]
    pub refusal: Vec<String>,

    /// Callee names a day or time (schedule stage)
    #[serde(default = "default_schedule_time")]
    pub schedule_time: Vec<String>,

    /// Objection categories, evaluated in order, first match wins
    #[serde(default = "default_objections")]
    pub objections: Vec<ObjectionPatterns>,
}

/// Patterns for one objection category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectionPatterns {
    pub kind: ObjectionKind,
    pub patterns: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_no_website() -> Vec<String> {
    strings(&[r"\bnimamo\b", r"\bnimam\b", r"\bni\b", r"brez.*spletne"])
}

fn default_agreement() -> Vec<String> {
    strings(&[
        r"\bda\b",
        r"\bja\b",
        r"\blahko\b",
        r"\bok\b",
        r"\bokej\b",
        r"\buredu\b",
        r"\bv redu\b",
        r"dogovorjeno",
        r"\bsuper\b",
        r"zanimivo",
    ])
}

fn default_refusal() -> Vec<String> {
    strings(&[r"\bne\b", r"nikoli", r"ne zanima", r"pusti", r"hvala"])
}

fn default_schedule_time() -> Vec<String> {
    strings(&[
        r"jutri",
        r"ponedeljek",
        r"torek",
        r"sred[aoi]",
        r"četrtek",
        r"petek",
        r"dopoldne",
        r"popoldne",
        r"\b1[456]",
    ])
}

fn default_objections() -> Vec<ObjectionPatterns> {
    vec![
        ObjectionPatterns {
            kind: ObjectionKind::Time,
            patterns: strings(&[r"nimam časa", r"zaseden", r"trenutno ne"]),
        },
        ObjectionPatterns {
            kind: ObjectionKind::Price,
            patterns: strings(&[r"pre(drago|visoko)", r"\bcen[aeo]\b", r"proračun"]),
        },
        ObjectionPatterns {
            kind: ObjectionKind::HaveVendor,
            patterns: strings(&[r"že imamo", r"že delamo", r"partner", r"agencij"]),
        },
        ObjectionPatterns {
            kind: ObjectionKind::SendEmail,
            patterns: strings(&[r"pošljite.*mail", r"e-?pošt", r"e-?mail"]),
        },
        ObjectionPatterns {
            kind: ObjectionKind::NotInterested,
            patterns: strings(&[r"ne zanima", r"ne potrebujem", r"ni prioriteta"]),
        },
        ObjectionPatterns {
            kind: ObjectionKind::CallLater,
            patterns: strings(&[r"pokličite kasneje", r"kasneje", r"pozneje"]),
        },
    ]
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            no_website: default_no_website(),
            agreement: default_agreement(),
            refusal: default_refusal(),
            schedule_time: default_schedule_time(),
            objections: default_objections(),
        }
    }
}

/// Spoken texts. `{company}` is replaced with the called company's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replies {
    /// Opener for a known call
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Opener when the call id is unknown
    #[serde(default = "default_greeting_unknown")]
    pub greeting_unknown: String,

    /// Intro → qualify question about the current web presence
    #[serde(default = "default_qualify_question")]
    pub qualify_question: String,

    /// Pitch for businesses without a website
    #[serde(default = "default_pitch_no_site")]
    pub pitch_no_site: String,

    /// Pitch for businesses with a website
    #[serde(default = "default_pitch_upgrade")]
    pub pitch_upgrade: String,

    /// Two concrete slots after agreement
    #[serde(default = "default_schedule_proposal")]
    pub schedule_proposal: String,

    /// Schedule answer did not name a day or time
    #[serde(default = "default_schedule_retry")]
    pub schedule_retry: String,

    /// Slot accepted
    #[serde(default = "default_schedule_confirmed")]
    pub schedule_confirmed: String,

    /// Close after repeated refusal
    #[serde(default = "default_refusal_close")]
    pub refusal_close: String,

    /// Close after the pitch attempt cap
    #[serde(default = "default_soft_close")]
    pub soft_close: String,

    /// Close from any other stage
    #[serde(default = "default_generic_close")]
    pub generic_close: String,

    /// Close when an answering machine picked up
    #[serde(default = "default_machine_close")]
    pub machine_close: String,

    /// Rebuttal per objection category
    #[serde(default = "default_objection_replies")]
    pub objections: HashMap<ObjectionKind, String>,
}

fn default_greeting() -> String {
    "Dober dan pri telefonu. Kličem v podjetje {company}. Ali govorim z odgovorno osebo za spletno stran?".to_string()
}
fn default_greeting_unknown() -> String {
    "Pri aparatu. Ali govorim z odgovorno osebo za vašo spletno prisotnost?".to_string()
}
fn default_qualify_question() -> String {
    "Dober dan! Govorim z {company}? Jaz sem virtualni asistent. Hitro vprašanje: ali ste zadovoljni z vašo trenutno spletno stranjo in koliko vam prinaša novih strank?".to_string()
}
fn default_pitch_no_site() -> String {
    "Razumem. Prav zato vam lahko v nekaj dneh pripravimo preprosto, moderno spletno stran, ki vas predstavi in prinese povpraševanja. Če vam v 30 dneh ne prinese potencialnih strank, ne zaračunamo. Vas zanima kratka predstavitev?".to_string()
}
fn default_pitch_upgrade() -> String {
    "Super. Veliko podjetij ima spletno stran, ki pa ne prinaša dovolj povpraševanj. Mi izboljšamo vsebino, hitrost in vidnost v iskalnikih. Običajno to prinese 20–50% več klicev v 2–3 mesecih. Bi vam ustrezal kratek 10-min pogovor, da preverimo priložnosti?".to_string()
}
fn default_schedule_proposal() -> String {
    "Odlično! Predlagam, da uskladimo kratek termin. Kdaj vam bolj ustreza: jutri dopoldne ali v sredo po 14. uri?".to_string()
}
fn default_schedule_retry() -> String {
    "Razumem. Izberite vam primeren dan in uro, na primer jutri dopoldne ali sredo po 14. uri.".to_string()
}
fn default_schedule_confirmed() -> String {
    "Zapisal sem. Poslal bom koledarski termin in kratek povzetek. Hvala in lep dan!".to_string()
}
fn default_refusal_close() -> String {
    "Popolnoma razumem. Hvala za vaš čas. Če boste kdaj želeli brezplačen pregled spletne prisotnosti, smo na voljo. Lep dan!".to_string()
}
fn default_soft_close() -> String {
    "Da ne zadržujem, poslali bomo kratek povzetek na e-pošto, če želite. Hvala za pogovor in lep dan!".to_string()
}
fn default_generic_close() -> String {
    "Hvala za vaš čas. Lep dan!".to_string()
}
fn default_machine_close() -> String {
    "Dober dan, kličemo glede spletne strani podjetja {company}. Poklicali vas bomo ob drugi priložnosti. Lep dan!".to_string()
}

fn default_objection_replies() -> HashMap<ObjectionKind, String> {
    HashMap::from([
        (
            ObjectionKind::Time,
            "Popolnoma razumem. Potrebujemo le 30 sekund, da povem bistvo, in če ne vidite vrednosti, zaključimo. Se strinjate?".to_string(),
        ),
        (
            ObjectionKind::Price,
            "Razumem skrb glede cene. Za mala podjetja imamo začetni paket in plačilo vezano na rezultate. Najprej preverimo potencial, nato govorimo o številkah. Je to pošteno?".to_string(),
        ),
        (
            ObjectionKind::HaveVendor,
            "Odlično, da imate partnerja. Veliko strank nas uporabi kot drugi par oči za ideje, ki jih vaš partner lahko izvede. Lahko v 10 minutah delimo 2–3 konkretne priložnosti?".to_string(),
        ),
        (
            ObjectionKind::SendEmail,
            "Z veseljem pošljem povzetek. Da ne ostane pri emailu, predlagam kratek klic, kjer se osredotočimo na 1–2 področji z največjim učinkom. Kdaj bi vam ustrezalo?".to_string(),
        ),
        (
            ObjectionKind::NotInterested,
            "Razumem. Običajno se izkaže, da drobne izboljšave prinesejo merljiv učinek brez velikih vložkov. Če v 30 dneh ne vidite koristi, ne zaračunamo. Damo priložnost za hiter pregled?".to_string(),
        ),
        (
            ObjectionKind::CallLater,
            "Ni težava. Lahko uskladimo konkreten termin, da bomo učinkoviti, jutri dopoldne ali sreda po 14. uri?".to_string(),
        ),
        (
            ObjectionKind::Generic,
            "Razumem. Predlagam kratek, konkreten pregled vašega primera in možnosti za več povpraševanj. Bi to bilo smiselno?".to_string(),
        ),
    ])
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            greeting_unknown: default_greeting_unknown(),
            qualify_question: default_qualify_question(),
            pitch_no_site: default_pitch_no_site(),
            pitch_upgrade: default_pitch_upgrade(),
            schedule_proposal: default_schedule_proposal(),
            schedule_retry: default_schedule_retry(),
            schedule_confirmed: default_schedule_confirmed(),
            refusal_close: default_refusal_close(),
            soft_close: default_soft_close(),
            generic_close: default_generic_close(),
            machine_close: default_machine_close(),
            objections: default_objection_replies(),
        }
    }
}

impl DialogueScript {
    /// Load from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let script: Self = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        script.validate()?;
        Ok(script)
    }

    /// Validate configuration
    ///
    /// Every objection category needs a rebuttal, and every keyword set
    /// needs at least one pattern.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ObjectionKind::ALL {
            if !self.replies.objections.contains_key(&kind) {
                return Err(ConfigError::MissingField(format!("replies.objections.{}", kind)));
            }
        }

        let sets = [
            ("keywords.no_website", &self.keywords.no_website),
            ("keywords.agreement", &self.keywords.agreement),
            ("keywords.refusal", &self.keywords.refusal),
            ("keywords.schedule_time", &self.keywords.schedule_time),
        ];
        for (field, patterns) in sets {
            if patterns.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "keyword set is empty".to_string(),
                });
            }
        }

        if self
            .keywords
            .objections
            .iter()
            .any(|o| o.kind == ObjectionKind::Generic)
        {
            return Err(ConfigError::InvalidValue {
                field: "keywords.objections".to_string(),
                message: "generic is the fallback category and takes no patterns".to_string(),
            });
        }

        Ok(())
    }
}
