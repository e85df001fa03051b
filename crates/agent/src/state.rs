//! Dialogue state machine
//!
//! Every inbound message walks a short, acyclic path through these states.
//! The path is recorded so callers and tests can see where a message ended.

use serde::Serialize;

use crate::AgentError;

/// Processing state of one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Received,
    /// Passed the sender/address filters
    Filtered,
    /// Text available (typed or transcribed)
    Normalized,
    TriggerChecked,
    DeliveringFiles,
    ConsultingAi,
    RespondingText,
    RespondingAudio,
    Done,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Received => "received",
            DialogueState::Filtered => "filtered",
            DialogueState::Normalized => "normalized",
            DialogueState::TriggerChecked => "trigger_checked",
            DialogueState::DeliveringFiles => "delivering_files",
            DialogueState::ConsultingAi => "consulting_ai",
            DialogueState::RespondingText => "responding_text",
            DialogueState::RespondingAudio => "responding_audio",
            DialogueState::Done => "done",
        }
    }

    /// Get all valid transitions from this state
    pub fn valid_transitions(&self) -> &'static [DialogueState] {
        use DialogueState::*;

        match self {
            Received => &[Filtered, Done],
            Filtered => &[Normalized, Done],
            Normalized => &[TriggerChecked],
            TriggerChecked => &[DeliveringFiles, ConsultingAi],
            DeliveringFiles => &[Done],
            ConsultingAi => &[RespondingText, RespondingAudio, Done],
            RespondingText => &[Done],
            RespondingAudio => &[Done],
            Done => &[],
        }
    }

    pub fn can_transition_to(&self, target: DialogueState) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DialogueState::Done)
    }
}

impl std::fmt::Display for DialogueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus the path that led to it
#[derive(Debug, Clone)]
pub struct StateTracker {
    message_id: String,
    path: Vec<DialogueState>,
}

impl StateTracker {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            path: vec![DialogueState::Received],
        }
    }

    pub fn current(&self) -> DialogueState {
        self.path
            .last()
            .copied()
            .unwrap_or(DialogueState::Received)
    }

    /// Move to `next`, refusing transitions outside the table
    pub fn advance(&mut self, next: DialogueState) -> Result<(), AgentError> {
        let from = self.current();
        if !from.can_transition_to(next) {
            tracing::warn!(
                message_id = %self.message_id,
                from = %from,
                to = %next,
                "Rejected dialogue transition"
            );
            return Err(AgentError::InvalidTransition { from, to: next });
        }

        tracing::debug!(
            message_id = %self.message_id,
            from = %from,
            to = %next,
            "Dialogue transition"
        );
        self.path.push(next);
        Ok(())
    }

    /// Move to `Done` from wherever the message stopped
    pub fn finish(&mut self) {
        if !self.current().is_terminal() {
            // rejected transitions are already logged by advance
            let _ = self.advance(DialogueState::Done);
        }
    }

    pub fn path(&self) -> &[DialogueState] {
        &self.path
    }

    pub fn into_path(self) -> Vec<DialogueState> {
        self.path
    }
}
