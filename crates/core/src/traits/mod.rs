//! Core traits for the chat agent
//!
//! Every external collaborator sits behind one of these traits so that:
//! - backends can be swapped without touching orchestration logic
//! - the decision pipeline can be tested with mocks
//!
//! # Trait Hierarchy
//!
//! ```text
//! Transport:
//!   - MessageTransport: send messages/presence, reject calls, fetch media
//!
//! Speech Processing:
//!   - SpeechToText: audio file → text
//!   - TextToSpeech: text → audio file
//! ```

mod speech;
mod transport;

pub use speech::{SpeechToText, TextToSpeech};
pub use transport::MessageTransport;
