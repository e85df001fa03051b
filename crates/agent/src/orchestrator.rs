//! Dialogue orchestrator
//!
//! Turns one inbound event into at most one response:
//!
//! ```text
//! Received -> Filtered -> Normalized -> TriggerChecked
//!     TriggerChecked -> DeliveringFiles -> Done
//!     TriggerChecked -> ConsultingAi -> RespondingText | RespondingAudio | Done
//! ```
//!
//! Collaborator failures never escape: transport errors are logged, media and
//! completion failures turn into the configured apology texts.

use std::path::Path;

use chat_agent_config::TriggerDefinition;
use chat_agent_core::{
    CallEvent, CallStatus, InboundEnvelope, InboundEvent, IncomingMessage, OutboundPayload,
    OutgoingResponse, PresenceState,
};

use crate::language_detect::detect_language;
use crate::state::{DialogueState, StateTracker};
use crate::trigger::match_trigger;
use crate::{AgentContext, AgentError};

const DOCUMENT_MIME: &str = "application/pdf";
const VOICE_NOTE_MIME: &str = "audio/mp4";

/// Result of processing one event
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub response: Option<OutgoingResponse>,
    /// States visited, starting at `Received` and ending at `Done`
    pub path: Vec<DialogueState>,
}

impl Dispatch {
    pub fn final_state(&self) -> DialogueState {
        self.path.last().copied().unwrap_or_default()
    }
}

/// Outcome of the normalization step
enum Normalization {
    Ready(IncomingMessage),
    /// Audio could not be turned into text; the apology is the response
    Apology(String),
    Dropped(&'static str),
}

pub struct Orchestrator {
    ctx: AgentContext,
}

impl Orchestrator {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// Process an event and return the response that was emitted
    pub async fn handle(&self, event: &InboundEvent) -> Option<OutgoingResponse> {
        self.process(event).await.response
    }

    /// Process an event, also reporting the states it went through
    pub async fn process(&self, event: &InboundEvent) -> Dispatch {
        metrics::counter!("chat_agent_messages_total").increment(1);

        let mut tracker = StateTracker::new(event.id.as_str());
        let response = match self.run(event, &mut tracker).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(message_id = %event.id, error = %e, "Message processing aborted");
                None
            }
        };
        tracker.finish();

        if let Some(response) = &response {
            metrics::counter!("chat_agent_replies_total", "kind" => response.kind()).increment(1);
        }

        Dispatch {
            response,
            path: tracker.into_path(),
        }
    }

    async fn run(
        &self,
        event: &InboundEvent,
        tracker: &mut StateTracker,
    ) -> Result<Option<OutgoingResponse>, AgentError> {
        if let Some(reason) = self.filter(event) {
            tracing::debug!(message_id = %event.id, from = %event.remote_address, reason, "Message ignored");
            return Ok(None);
        }
        tracker.advance(DialogueState::Filtered)?;

        tracing::info!(
            message_id = %event.id,
            from = %event.remote_address,
            name = event.sender_name(),
            "Message received"
        );

        let message = match self.normalize(event).await {
            Normalization::Ready(message) => message,
            Normalization::Apology(text) => {
                self.send_text(&event.remote_address, &text).await;
                return Ok(Some(OutgoingResponse::ApologyText { text }));
            }
            Normalization::Dropped(reason) => {
                tracing::debug!(message_id = %event.id, reason, "Message has no usable text");
                return Ok(None);
            }
        };
        tracker.advance(DialogueState::Normalized)?;

        let preview: String = message.raw_text.chars().take(100).collect();
        tracing::debug!(
            contact = %message.contact,
            from_audio = message.originated_from_audio,
            text = %preview,
            "Message normalized"
        );

        let trigger = match_trigger(&message.raw_text, &self.ctx.triggers);
        tracker.advance(DialogueState::TriggerChecked)?;

        if let Some(trigger) = trigger {
            tracker.advance(DialogueState::DeliveringFiles)?;
            metrics::counter!("chat_agent_triggers_fired_total").increment(1);
            let files = self.deliver_files(&message.contact, trigger).await;
            return Ok(Some(OutgoingResponse::FileDelivery { files }));
        }

        tracker.advance(DialogueState::ConsultingAi)?;
        self.presence(PresenceState::Composing, &message.contact)
            .await;

        let Some(reply) = self.ctx.ai.consult(&message.contact, &message.raw_text).await else {
            self.presence(PresenceState::Paused, &message.contact).await;
            let text = self.ctx.messages.ai_failure.clone();
            self.send_text(&message.contact, &text).await;
            return Ok(Some(OutgoingResponse::ApologyText { text }));
        };

        if message.originated_from_audio {
            tracker.advance(DialogueState::RespondingAudio)?;
            Ok(Some(self.respond_audio(&message.contact, reply).await))
        } else {
            tracker.advance(DialogueState::RespondingText)?;
            Ok(Some(self.respond_text(&message.contact, reply).await))
        }
    }

    /// Reason to ignore the event, if any
    fn filter(&self, event: &InboundEvent) -> Option<&'static str> {
        if event.from_me {
            return Some("sent by this account");
        }

        if event.is_group() {
            if self.ctx.bot.is_group_allowed(&event.remote_address) {
                tracing::info!(group = %event.remote_address, "Message from allow-listed group");
            } else if self.ctx.bot.ignore_groups {
                return Some("group");
            }
        }

        if event.is_broadcast() {
            return Some("broadcast");
        }

        if event.envelope.is_none() {
            return Some("no content");
        }

        None
    }

    async fn normalize(&self, event: &InboundEvent) -> Normalization {
        let (text, from_audio) = match &event.envelope {
            Some(InboundEnvelope::Text { text }) | Some(InboundEnvelope::ExtendedText { text }) => {
                (text.clone(), false)
            }
            Some(InboundEnvelope::Audio { .. }) => match self.transcribe_event(event).await {
                Ok(text) => (text, true),
                Err(apology) => return Normalization::Apology(apology),
            },
            Some(InboundEnvelope::Unsupported) => return Normalization::Dropped("unsupported"),
            None => return Normalization::Dropped("no content"),
        };

        if text.trim().is_empty() {
            return Normalization::Dropped("empty text");
        }

        Normalization::Ready(IncomingMessage {
            contact: event.remote_address.clone(),
            raw_text: text,
            originated_from_audio: from_audio,
            is_group: event.is_group(),
        })
    }

    /// Download and transcribe a voice note; the error is the apology to send
    async fn transcribe_event(&self, event: &InboundEvent) -> Result<String, String> {
        let path = match self.ctx.audio.download_audio(event).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(message_id = %event.id, error = %e, "Voice note download failed");
                return Err(self.ctx.messages.download_failure.clone());
            }
        };

        match self.ctx.audio.transcribe(&path).await {
            Some(text) => {
                tracing::info!(message_id = %event.id, chars = text.chars().count(), "Voice note transcribed");
                Ok(text)
            }
            None => Err(self.ctx.messages.transcription_failure.clone()),
        }
    }

    /// Send every file of the trigger that exists; returns the names sent
    async fn deliver_files(&self, contact: &str, trigger: &TriggerDefinition) -> Vec<String> {
        tracing::info!(contact = %contact, trigger = %trigger.name, "Trigger fired");

        let mut sent = Vec::with_capacity(trigger.files.len());
        for file_name in &trigger.files {
            let path = self.ctx.files_dir.join(file_name);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), "Trigger file missing, skipped");
                    continue;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to read trigger file");
                    continue;
                }
            };

            let payload = OutboundPayload::Document {
                bytes,
                file_name: file_name.clone(),
                mime_type: DOCUMENT_MIME.to_string(),
            };
            if self.send(contact, payload).await {
                tracing::info!(contact = %contact, file = %file_name, "File sent");
                sent.push(file_name.clone());
            }
        }

        sent
    }

    async fn respond_text(&self, contact: &str, reply: String) -> OutgoingResponse {
        tokio::time::sleep(self.ctx.humanize.text_delay()).await;
        self.presence(PresenceState::Paused, contact).await;
        self.send_text(contact, &reply).await;
        OutgoingResponse::TextReply { text: reply }
    }

    /// Voice reply, falling back to text when no audio can be produced
    async fn respond_audio(&self, contact: &str, reply: String) -> OutgoingResponse {
        self.presence(PresenceState::Recording, contact).await;

        let language = detect_language(&reply);
        let artifact = self.ctx.audio.synthesize(&reply, language).await;

        tokio::time::sleep(self.ctx.humanize.audio_delay()).await;
        self.presence(PresenceState::Paused, contact).await;

        let Some(path) = artifact else {
            tracing::warn!(contact = %contact, "Synthesis failed, replying with text");
            self.send_text(contact, &reply).await;
            return OutgoingResponse::TextReply { text: reply };
        };

        match self.send_voice_note(contact, &path).await {
            Ok(()) => {
                tracing::info!(contact = %contact, language = %language, "Replied with voice note");
                OutgoingResponse::AudioReply {
                    audio_path: path,
                    language,
                }
            }
            Err(e) => {
                tracing::warn!(contact = %contact, error = %e, "Voice note unavailable, replying with text");
                self.send_text(contact, &reply).await;
                OutgoingResponse::TextReply { text: reply }
            }
        }
    }

    /// Read the synthesized artifact (deleting it) and send it as a voice note
    async fn send_voice_note(&self, contact: &str, path: &Path) -> Result<(), AgentError> {
        let bytes = self.ctx.audio.take_artifact(path).await?;
        let payload = OutboundPayload::Audio {
            bytes,
            mime_type: VOICE_NOTE_MIME.to_string(),
            voice_note: true,
        };
        // a failed send is logged but not retried as text
        self.send(contact, payload).await;
        Ok(())
    }

    /// Reject an incoming call offer and tell the caller to write instead
    ///
    /// Returns whether the event was an offer.
    pub async fn handle_call(&self, call: &CallEvent) -> bool {
        if call.status != CallStatus::Offer {
            tracing::debug!(call_id = %call.id, status = ?call.status, "Call event ignored");
            return false;
        }

        tracing::info!(call_id = %call.id, from = %call.from, "Rejecting call");
        if let Err(e) = self.ctx.transport.reject_call(&call.id, &call.from).await {
            tracing::error!(call_id = %call.id, error = %e, "Failed to reject call");
        }
        self.send_text(&call.from, &self.ctx.messages.call_rejection)
            .await;
        true
    }

    async fn presence(&self, state: PresenceState, contact: &str) {
        if let Err(e) = self.ctx.transport.send_presence_update(state, contact).await {
            tracing::warn!(contact = %contact, state = state.as_str(), error = %e, "Presence update failed");
        }
    }

    async fn send_text(&self, contact: &str, text: &str) -> bool {
        self.send(contact, OutboundPayload::text(text)).await
    }

    async fn send(&self, contact: &str, payload: OutboundPayload) -> bool {
        match self.ctx.transport.send_message(contact, payload).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(contact = %contact, error = %e, "Failed to send message");
                false
            }
        }
    }
}
