//! Messaging transport trait
//!
//! The channel itself (session, socket reconnection, pairing) lives outside
//! the decision pipeline. The pipeline only needs these operations.

use async_trait::async_trait;

use crate::{InboundEvent, OutboundPayload, PresenceState, Result};

/// Outbound side of the messaging channel
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    /// Deliver a message to a contact
    async fn send_message(&self, contact: &str, payload: OutboundPayload) -> Result<()>;

    /// Update the presence indicator shown to a contact
    async fn send_presence_update(&self, state: PresenceState, contact: &str) -> Result<()>;

    /// Reject an incoming call
    async fn reject_call(&self, call_id: &str, from: &str) -> Result<()>;

    /// Download the media attached to an inbound event
    async fn download_media(&self, event: &InboundEvent) -> Result<Vec<u8>>;
}
