//! Messaging gateway client
//!
//! The WhatsApp session runs in a separate gateway process exposing a small
//! REST surface. Binary payloads travel base64-encoded in JSON bodies.
//!
//! | call | route |
//! |------|-------|
//! | send message | `POST /messages` |
//! | presence | `POST /presence` |
//! | reject call | `POST /calls/reject` |
//! | media download | `GET /media/{message_id}` |
//! | connection status | `GET /status` |
//! | reconnect | `POST /connect` |

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use chat_agent_config::GatewayConfig;
use chat_agent_core::{InboundEvent, MessageTransport, OutboundPayload, PresenceState};

use crate::lifecycle::ConnectionUpdate;
use crate::ServerError;

/// Session control used by the lifecycle supervisor
#[async_trait]
pub trait GatewayControl: Send + Sync + 'static {
    /// Current connection status of the messaging session
    async fn status(&self) -> Result<ConnectionUpdate, ServerError>;

    /// Ask the gateway to (re)open the session
    async fn connect(&self) -> Result<(), ServerError>;
}

/// Outbound message body
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageBody<'a> {
    Text {
        to: &'a str,
        text: &'a str,
    },
    Document {
        to: &'a str,
        data: String,
        file_name: &'a str,
        mime_type: &'a str,
    },
    Audio {
        to: &'a str,
        data: String,
        mime_type: &'a str,
        ptt: bool,
    },
}

impl<'a> MessageBody<'a> {
    fn new(to: &'a str, payload: &'a OutboundPayload) -> Self {
        match payload {
            OutboundPayload::Text { text } => MessageBody::Text { to, text },
            OutboundPayload::Document {
                bytes,
                file_name,
                mime_type,
            } => MessageBody::Document {
                to,
                data: STANDARD.encode(bytes),
                file_name,
                mime_type,
            },
            OutboundPayload::Audio {
                bytes,
                mime_type,
                voice_note,
            } => MessageBody::Audio {
                to,
                data: STANDARD.encode(bytes),
                mime_type,
                ptt: *voice_note,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct PresenceBody<'a> {
    to: &'a str,
    state: PresenceState,
}

#[derive(Debug, Serialize)]
struct RejectBody<'a> {
    call_id: &'a str,
    from: &'a str,
}

#[derive(Debug, Deserialize)]
struct MediaBody {
    data: String,
}

/// REST client for the messaging gateway
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    client: Client,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, ServerError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        check_status(path, response).await
    }

    async fn get(&self, path: &str) -> Result<Response, ServerError> {
        let response = self.client.get(self.url(path)).send().await?;
        check_status(path, response).await
    }
}

async fn check_status(path: &str, response: Response) -> Result<Response, ServerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServerError::Gateway(format!("{} returned HTTP {}: {}", path, status, body)))
}

#[async_trait]
impl MessageTransport for GatewayClient {
    async fn send_message(&self, contact: &str, payload: OutboundPayload) -> chat_agent_core::Result<()> {
        self.post("messages", &MessageBody::new(contact, &payload))
            .await?;
        Ok(())
    }

    async fn send_presence_update(
        &self,
        state: PresenceState,
        contact: &str,
    ) -> chat_agent_core::Result<()> {
        self.post("presence", &PresenceBody { to: contact, state })
            .await?;
        Ok(())
    }

    async fn reject_call(&self, call_id: &str, from: &str) -> chat_agent_core::Result<()> {
        self.post("calls/reject", &RejectBody { call_id, from })
            .await?;
        Ok(())
    }

    async fn download_media(&self, event: &InboundEvent) -> chat_agent_core::Result<Vec<u8>> {
        let media: MediaBody = self
            .get(&format!("media/{}", event.id))
            .await?
            .json()
            .await
            .map_err(ServerError::from)?;

        STANDARD
            .decode(media.data.as_bytes())
            .map_err(|e| chat_agent_core::Error::Media(format!("invalid media encoding: {}", e)))
    }
}

#[async_trait]
impl GatewayControl for GatewayClient {
    async fn status(&self) -> Result<ConnectionUpdate, ServerError> {
        Ok(self.get("status").await?.json().await?)
    }

    async fn connect(&self) -> Result<(), ServerError> {
        self.post("connect", &serde_json::json!({})).await?;
        Ok(())
    }
}
