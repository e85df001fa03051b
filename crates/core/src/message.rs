//! Message types crossing the transport boundary
//!
//! The transport hands over `InboundEvent`s whose envelope is decoded once
//! into a tagged variant. The orchestrator turns an event into an
//! `IncomingMessage` and produces exactly one `OutgoingResponse`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::Language;

/// Address used by the channel for status/broadcast updates
pub const BROADCAST_ADDRESS: &str = "status@broadcast";

/// Suffix identifying group conversation addresses
pub const GROUP_SUFFIX: &str = "@g.us";

/// Reference to downloadable media attached to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MediaRef {
    /// MIME type reported by the channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Duration in seconds, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u32>,
    /// Recorded as a voice note (push-to-talk)
    #[serde(default)]
    pub voice_note: bool,
}

/// Decoded message envelope, exactly one case per message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEnvelope {
    /// Plain conversation text
    Text { text: String },
    /// Text with extended metadata (quotes, link previews)
    ExtendedText { text: String },
    /// Voice or audio message
    Audio { media: MediaRef },
    /// Anything else (images, stickers, reactions, ...)
    #[serde(other)]
    Unsupported,
}

impl InboundEnvelope {
    /// Text carried directly by the envelope
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::ExtendedText { text } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio { .. })
    }
}

/// Inbound message event as emitted by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Channel message id
    pub id: String,
    /// Conversation address (contact or group)
    pub remote_address: String,
    /// Sent by this account
    #[serde(default)]
    pub from_me: bool,
    /// Display name of the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,
    /// Message content; `None` for protocol/empty messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<InboundEnvelope>,
}

impl InboundEvent {
    /// Create a text event
    pub fn text(
        id: impl Into<String>,
        remote_address: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            remote_address: remote_address.into(),
            from_me: false,
            push_name: None,
            envelope: Some(InboundEnvelope::Text { text: text.into() }),
        }
    }

    /// Create a voice-note event
    pub fn audio(id: impl Into<String>, remote_address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_address: remote_address.into(),
            from_me: false,
            push_name: None,
            envelope: Some(InboundEnvelope::Audio {
                media: MediaRef {
                    mime_type: Some("audio/ogg; codecs=opus".to_string()),
                    seconds: None,
                    voice_note: true,
                },
            }),
        }
    }

    pub fn is_group(&self) -> bool {
        self.remote_address.ends_with(GROUP_SUFFIX)
    }

    pub fn is_broadcast(&self) -> bool {
        self.remote_address == BROADCAST_ADDRESS
    }

    /// Display name or a placeholder
    pub fn sender_name(&self) -> &str {
        self.push_name.as_deref().unwrap_or("unknown")
    }
}

/// Normalized inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub contact: String,
    pub raw_text: String,
    pub originated_from_audio: bool,
    pub is_group: bool,
}

/// The single response produced for an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutgoingResponse {
    /// Trigger files sent as documents, no text
    FileDelivery { files: Vec<String> },
    /// Assistant reply sent as text
    TextReply { text: String },
    /// Assistant reply sent as a voice note
    AudioReply {
        audio_path: PathBuf,
        language: Language,
    },
    /// Fixed apology text
    ApologyText { text: String },
}

impl OutgoingResponse {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileDelivery { .. } => "file_delivery",
            Self::TextReply { .. } => "text_reply",
            Self::AudioReply { .. } => "audio_reply",
            Self::ApologyText { .. } => "apology_text",
        }
    }
}

/// Payload handed to `MessageTransport::send_message`
#[derive(Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Text {
        text: String,
    },
    Document {
        bytes: Vec<u8>,
        file_name: String,
        mime_type: String,
    },
    Audio {
        bytes: Vec<u8>,
        mime_type: String,
        voice_note: bool,
    },
}

impl OutboundPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

impl std::fmt::Debug for OutboundPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { text } => f.debug_struct("Text").field("text", text).finish(),
            Self::Document {
                bytes,
                file_name,
                mime_type,
            } => f
                .debug_struct("Document")
                .field("bytes", &bytes.len())
                .field("file_name", file_name)
                .field("mime_type", mime_type)
                .finish(),
            Self::Audio {
                bytes,
                mime_type,
                voice_note,
            } => f
                .debug_struct("Audio")
                .field("bytes", &bytes.len())
                .field("mime_type", mime_type)
                .field("voice_note", voice_note)
                .finish(),
        }
    }
}

/// Presence indicator shown to the contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Composing,
    Recording,
    Paused,
}

impl PresenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Composing => "composing",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

/// Call lifecycle status reported by the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Offer,
    Ringing,
    Accept,
    Reject,
    Timeout,
    Terminate,
    #[serde(other)]
    Other,
}

/// Incoming call event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub id: String,
    pub from: String,
    pub status: CallStatus,
}
