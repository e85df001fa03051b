//! Gateway connection lifecycle
//!
//! The gateway owns the messaging session; this side only tracks whether it
//! is usable and asks for a reconnect when it drops. A logged-out session
//! needs a new pairing, so `LoggedOut` is terminal.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::gateway::GatewayControl;
use crate::ServerError;

/// Connection state of the messaging session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    LoggedOut,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::LoggedOut => "logged_out",
        }
    }

    /// Get all valid transitions from this state
    pub fn valid_transitions(&self) -> &'static [ConnectionState] {
        use ConnectionState::*;

        match self {
            Disconnected => &[Connecting, Open, LoggedOut],
            Connecting => &[Open, Disconnected, LoggedOut],
            Open => &[Disconnected, LoggedOut],
            LoggedOut => &[],
        }
    }

    pub fn can_transition_to(&self, target: ConnectionState) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::LoggedOut)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection update as reported by the gateway (webhook or status poll)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionUpdate {
    /// `open`, `connecting` or `close`
    pub connection: String,
    /// Set with `close` when the session was logged out
    #[serde(default)]
    pub logged_out: bool,
}

impl ConnectionUpdate {
    pub fn open() -> Self {
        Self {
            connection: "open".to_string(),
            logged_out: false,
        }
    }

    pub fn closed(logged_out: bool) -> Self {
        Self {
            connection: "close".to_string(),
            logged_out,
        }
    }

    /// State this update asks for
    pub fn target(&self) -> Result<ConnectionState, ServerError> {
        match self.connection.as_str() {
            "open" => Ok(ConnectionState::Open),
            "connecting" => Ok(ConnectionState::Connecting),
            "close" | "closed" if self.logged_out => Ok(ConnectionState::LoggedOut),
            "close" | "closed" => Ok(ConnectionState::Disconnected),
            other => Err(ServerError::InvalidRequest(format!(
                "unknown connection state '{}'",
                other
            ))),
        }
    }
}

/// Shared connection state with change notification
#[derive(Debug)]
pub struct ConnectionLifecycle {
    tx: watch::Sender<ConnectionState>,
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionLifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Move to `next`; repeating the current state is a no-op
    pub fn transition(&self, next: ConnectionState) -> Result<ConnectionState, ServerError> {
        let mut outcome = Ok(next);
        self.tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            if !state.can_transition_to(next) {
                outcome = Err(ServerError::InvalidTransition {
                    from: *state,
                    to: next,
                });
                return false;
            }
            tracing::info!(from = %state, to = %next, "Connection state changed");
            *state = next;
            true
        });

        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Rejected connection transition");
        } else {
            metrics::gauge!("chat_agent_connection_open")
                .set(if next == ConnectionState::Open { 1.0 } else { 0.0 });
        }
        outcome
    }

    pub fn apply(&self, update: &ConnectionUpdate) -> Result<ConnectionState, ServerError> {
        self.transition(update.target()?)
    }

    /// Keep the session up until it is logged out
    ///
    /// Polls the gateway status, and whenever the connection is down waits
    /// `reconnect_delay` before asking the gateway to reconnect. Returns once
    /// the session reaches `LoggedOut`.
    pub async fn supervise(
        self: Arc<Self>,
        control: Arc<dyn GatewayControl>,
        reconnect_delay: Duration,
        poll_interval: Duration,
    ) -> ConnectionState {
        let mut changes = self.subscribe();
        self.poll(control.as_ref()).await;

        loop {
            match self.current() {
                ConnectionState::LoggedOut => {
                    tracing::error!("Session logged out, a new pairing is required");
                    return ConnectionState::LoggedOut;
                }
                ConnectionState::Disconnected => {
                    tracing::info!(delay_ms = reconnect_delay.as_millis() as u64, "Reconnecting");
                    tokio::time::sleep(reconnect_delay).await;
                    self.reconnect(control.as_ref()).await;
                    continue;
                }
                ConnectionState::Connecting | ConnectionState::Open => {}
            }

            tokio::select! {
                _ = changes.changed() => {}
                _ = tokio::time::sleep(poll_interval) => self.poll(control.as_ref()).await,
            }
        }
    }

    async fn poll(&self, control: &dyn GatewayControl) {
        match control.status().await {
            Ok(update) => {
                if let Err(e) = self.apply(&update) {
                    tracing::debug!(error = %e, "Status update not applied");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gateway status unavailable");
                if !matches!(
                    self.current(),
                    ConnectionState::Disconnected | ConnectionState::LoggedOut
                ) {
                    let _ = self.transition(ConnectionState::Disconnected);
                }
            }
        }
    }

    async fn reconnect(&self, control: &dyn GatewayControl) {
        if self.transition(ConnectionState::Connecting).is_err() {
            return;
        }
        if let Err(e) = control.connect().await {
            tracing::error!(error = %e, "Reconnect request failed");
            let _ = self.transition(ConnectionState::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_transition_table() {
        use ConnectionState::*;

        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Open));
        assert!(Open.can_transition_to(Disconnected));
        assert!(Open.can_transition_to(LoggedOut));
        assert!(!Open.can_transition_to(Connecting));
        assert!(LoggedOut.valid_transitions().is_empty());
        assert!(LoggedOut.is_terminal());
    }

    #[test]
    fn test_update_targets() {
        assert_eq!(
            ConnectionUpdate::open().target().unwrap(),
            ConnectionState::Open
        );
        assert_eq!(
            ConnectionUpdate::closed(false).target().unwrap(),
            ConnectionState::Disconnected
        );
        assert_eq!(
            ConnectionUpdate::closed(true).target().unwrap(),
            ConnectionState::LoggedOut
        );

        let update: ConnectionUpdate =
            serde_json::from_str(r#"{"connection":"connecting"}"#).unwrap();
        assert_eq!(update.target().unwrap(), ConnectionState::Connecting);

        let bogus = ConnectionUpdate {
            connection: "sideways".to_string(),
            logged_out: false,
        };
        assert!(matches!(bogus.target(), Err(ServerError::InvalidRequest(_))));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let lifecycle = ConnectionLifecycle::new();
        lifecycle.transition(ConnectionState::Open).unwrap();

        let err = lifecycle
            .transition(ConnectionState::Connecting)
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::InvalidTransition {
                from: ConnectionState::Open,
                to: ConnectionState::Connecting
            }
        ));
        assert_eq!(lifecycle.current(), ConnectionState::Open);
    }

    #[test]
    fn test_logged_out_is_terminal() {
        let lifecycle = ConnectionLifecycle::new();
        lifecycle.apply(&ConnectionUpdate::closed(true)).unwrap();
        assert!(lifecycle.apply(&ConnectionUpdate::open()).is_err());
        assert!(lifecycle
            .transition(ConnectionState::Disconnected)
            .is_err());
        assert_eq!(lifecycle.current(), ConnectionState::LoggedOut);
    }

    #[test]
    fn test_repeated_state_is_noop() {
        let lifecycle = ConnectionLifecycle::new();
        let mut rx = lifecycle.subscribe();
        lifecycle.transition(ConnectionState::Open).unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        lifecycle.transition(ConnectionState::Open).unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    /// Gateway whose status answers are scripted in order
    struct ScriptedGateway {
        statuses: Mutex<VecDeque<Result<ConnectionUpdate, ()>>>,
        connects: AtomicUsize,
        connect_result: Option<ConnectionUpdate>,
    }

    #[async_trait]
    impl GatewayControl for ScriptedGateway {
        async fn status(&self) -> Result<ConnectionUpdate, ServerError> {
            match self.statuses.lock().pop_front() {
                Some(Ok(update)) => Ok(update),
                Some(Err(())) => Err(ServerError::Gateway("unreachable".to_string())),
                None => Ok(self
                    .connect_result
                    .clone()
                    .unwrap_or_else(|| ConnectionUpdate::closed(true))),
            }
        }

        async fn connect(&self) -> Result<(), ServerError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_supervisor_reconnects_then_stops_on_logout() {
        let lifecycle = Arc::new(ConnectionLifecycle::new());
        let gateway = Arc::new(ScriptedGateway {
            statuses: Mutex::new(VecDeque::from(vec![
                Ok(ConnectionUpdate::closed(false)),
                Ok(ConnectionUpdate::open()),
                Err(()),
            ])),
            connects: AtomicUsize::new(0),
            connect_result: None,
        });

        let final_state = tokio::time::timeout(
            Duration::from_secs(5),
            lifecycle.clone().supervise(
                gateway.clone(),
                Duration::from_millis(5),
                Duration::from_millis(5),
            ),
        )
        .await
        .unwrap();

        assert_eq!(final_state, ConnectionState::LoggedOut);
        assert_eq!(lifecycle.current(), ConnectionState::LoggedOut);
        // one reconnect after the initial close, one after the failed poll
        assert_eq!(gateway.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_supervisor_follows_webhook_updates() {
        let lifecycle = Arc::new(ConnectionLifecycle::new());
        lifecycle.transition(ConnectionState::Open).unwrap();
        let gateway = Arc::new(ScriptedGateway {
            statuses: Mutex::new(VecDeque::new()),
            connects: AtomicUsize::new(0),
            connect_result: Some(ConnectionUpdate::open()),
        });

        let supervisor = tokio::spawn(lifecycle.clone().supervise(
            gateway.clone(),
            Duration::from_millis(5),
            Duration::from_secs(60),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        lifecycle.apply(&ConnectionUpdate::closed(true)).unwrap();

        let final_state = tokio::time::timeout(Duration::from_secs(1), supervisor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(final_state, ConnectionState::LoggedOut);
        assert_eq!(gateway.connects.load(Ordering::SeqCst), 0);
    }
}
