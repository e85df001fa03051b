//! Keyword trigger matching
//!
//! Decides whether a message is a request for one of the configured files.
//! Triggers are checked in configuration order; the first one that fires
//! wins, and a comment word on any matching trigger vetoes the whole match.

use chat_agent_config::{TriggerDefinition, TriggerSet};

/// Words that mark the message as a request for the file
pub const REQUEST_WORDS: &[&str] = &[
    "QUERO", "MANDA", "ENVIA", "ENVIE", "PASSA", "ME DA", "ME DÁ", "PRECISO", "NECESITO",
    "QUIERO", "ENVIAME", "MANDAME", "PASAME",
];

/// Words that mark the message as a comment about a file already received
pub const COMMENT_WORDS: &[&str] = &[
    "FIZ",
    "LI",
    "VI",
    "RECEBI",
    "JA TENHO",
    "YA TENGO",
    "YA LEI",
    "YA LO LEI",
    "HICE",
    "LEI O",
    "LEI EL",
    "SOBRE O",
    "SOBRE EL",
    "DO CHECKLIST",
    "DEL CHECKLIST",
];

/// Messages shorter than this that mention a keyword count as requests
pub const SHORT_MESSAGE_CHARS: usize = 30;

/// Why a trigger fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireReason {
    /// Message is exactly the keyword
    Exact,
    /// Message starts with the keyword
    Prefix,
    /// Message contains a request word
    RequestWord(&'static str),
    /// Short message mentioning the keyword
    ShortMessage,
}

/// Outcome of checking one trigger against a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Fire(FireReason),
    /// Comment word present: no trigger may fire for this message
    Suppress(&'static str),
    /// Keyword absent, or present without enough evidence
    Undecided,
}

/// Uppercase and trim, the form both sides are compared in
pub fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Check a normalized message against a normalized keyword
pub fn evaluate(message: &str, keyword: &str) -> TriggerDecision {
    if keyword.is_empty() || !message.contains(keyword) {
        return TriggerDecision::Undecided;
    }

    if message == keyword {
        return TriggerDecision::Fire(FireReason::Exact);
    }

    if message.starts_with(keyword) {
        return TriggerDecision::Fire(FireReason::Prefix);
    }

    if let Some(word) = REQUEST_WORDS.iter().copied().find(|w| message.contains(w)) {
        return TriggerDecision::Fire(FireReason::RequestWord(word));
    }

    if let Some(word) = COMMENT_WORDS.iter().copied().find(|w| message.contains(w)) {
        return TriggerDecision::Suppress(word);
    }

    if message.chars().count() < SHORT_MESSAGE_CHARS {
        return TriggerDecision::Fire(FireReason::ShortMessage);
    }

    TriggerDecision::Undecided
}

/// Find the trigger a message asks for, if any
pub fn match_trigger<'a>(text: &str, triggers: &'a TriggerSet) -> Option<&'a TriggerDefinition> {
    let message = normalize(text);

    for trigger in triggers.active() {
        let keyword = normalize(&trigger.name);
        match evaluate(&message, &keyword) {
            TriggerDecision::Fire(reason) => {
                tracing::debug!(trigger = %trigger.name, ?reason, "Trigger fired");
                return Some(trigger);
            }
            TriggerDecision::Suppress(word) => {
                tracing::debug!(trigger = %trigger.name, comment = word, "Trigger suppressed by comment");
                return None;
            }
            TriggerDecision::Undecided => {}
        }
    }

    None
}
