//! Voice markup
//!
//! The response to a voice webhook is a small tree of verbs. The tree is
//! built by the server from an engine turn and serialized here, so escaping
//! lives in one place.

/// Speech gathering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherOptions {
    /// URL the carrier posts the transcript to
    pub action: String,
    /// Seconds to wait for speech to start
    pub timeout_secs: u32,
    /// End-of-speech detection, `auto` or seconds
    pub speech_timeout: String,
    /// Recognition hint phrases
    pub hints: Option<String>,
}

impl GatherOptions {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            timeout_secs: 6,
            speech_timeout: "auto".to_string(),
            hints: None,
        }
    }

    pub fn with_timeout(mut self, secs: u32) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_speech_timeout(mut self, speech_timeout: impl Into<String>) -> Self {
        self.speech_timeout = speech_timeout.into();
        self
    }

    pub fn with_hints(mut self, hints: Option<String>) -> Self {
        self.hints = hints.filter(|h| !h.trim().is_empty());
        self
    }
}

/// One voice-markup instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// Speak text
    Say {
        text: String,
        language: String,
        voice: String,
    },
    /// Listen for speech, optionally speaking nested verbs meanwhile
    Gather {
        options: GatherOptions,
        children: Vec<Verb>,
    },
    /// Continue with the markup at another URL
    Redirect { url: String },
    /// Wait silently
    Pause { seconds: u32 },
    /// End the call
    Hangup,
}

/// Root `<Response>` document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn push(mut self, verb: Verb) -> Self {
        self.verbs.push(verb);
        self
    }

    pub fn say(self, text: impl Into<String>, language: impl Into<String>, voice: impl Into<String>) -> Self {
        self.push(Verb::Say {
            text: text.into(),
            language: language.into(),
            voice: voice.into(),
        })
    }

    pub fn gather(self, options: GatherOptions) -> Self {
        self.push(Verb::Gather {
            options,
            children: Vec::new(),
        })
    }

    pub fn redirect(self, url: impl Into<String>) -> Self {
        self.push(Verb::Redirect { url: url.into() })
    }

    pub fn hangup(self) -> Self {
        self.push(Verb::Hangup)
    }

    /// Serialize to an XML document
    pub fn to_xml(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for verb in &self.verbs {
            write_verb(&mut out, verb);
        }
        out.push_str("</Response>");
        out
    }
}

impl std::fmt::Display for VoiceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn write_verb(out: &mut String, verb: &Verb) {
    match verb {
        Verb::Say { text, language, voice } => out.push_str(&format!(
            r#"<Say language="{}" voice="{}">{}</Say>"#,
            escape(language),
            escape(voice),
            escape(text)
        )),
        Verb::Gather { options, children } => {
            out.push_str(&format!(
                r#"<Gather input="speech" timeout="{}" speechTimeout="{}" action="{}" method="POST" speechModel="phone_call""#,
                options.timeout_secs,
                escape(&options.speech_timeout),
                escape(&options.action)
            ));
            if let Some(hints) = &options.hints {
                out.push_str(&format!(r#" hints="{}""#, escape(hints)));
            }
            out.push('>');
            for child in children {
                write_verb(out, child);
            }
            out.push_str("</Gather>");
        }
        Verb::Redirect { url } => out.push_str(&format!(r#"<Redirect method="POST">{}</Redirect>"#, escape(url))),
        Verb::Pause { seconds } => out.push_str(&format!(r#"<Pause length="{}" />"#, seconds)),
        Verb::Hangup => out.push_str("<Hangup />"),
    }
}

/// Escape text for XML content and attribute values
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
