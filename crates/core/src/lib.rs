//! Core traits and types for the chat agent
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation turns and roles
//! - Reply languages (Portuguese, Spanish, English)
//! - Inbound/outbound message types decoded at the transport boundary
//! - Collaborator traits (transport, speech-to-text, text-to-speech)
//! - Error types

pub mod conversation;
pub mod error;
pub mod language;
pub mod message;
pub mod traits;

pub use conversation::{Turn, TurnRole, MAX_HISTORY_TURNS};
pub use error::{Error, Result};
pub use language::Language;
pub use message::{
    CallEvent, CallStatus, InboundEnvelope, InboundEvent, IncomingMessage, MediaRef,
    OutboundPayload, OutgoingResponse, PresenceState, BROADCAST_ADDRESS, GROUP_SUFFIX,
};

pub use traits::{MessageTransport, SpeechToText, TextToSpeech};
