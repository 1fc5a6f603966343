// discord/runtime.rs

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use chrono::{Local, NaiveDateTime, Timelike};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::Error;
use crate::models::{AccountConfig, DiscordProfile};
use crate::platforms::discord::profile::fetch_profile;
use crate::platforms::{ConnectionStatus, PlatformIntegration};
use crate::window;

const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=9&encoding=json";

/// Fixed keepalive cadence once a session is up. The server-negotiated
/// heartbeat interval is honored only for the delay before the first beat;
/// after that the gateway tolerates this fixed rhythm.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(50);

/// Backoff between a failed session and the next connection attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long to wait for the gateway hello before giving up on a connection.
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The account's allowed-hours window closed; the supervisor goes back
    /// to gate-waiting with no backoff.
    WindowExited,
}

/// Local-time source. Swappable so gate decisions can be driven from a
/// fixed timestamp instead of the wall clock.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// One Discord account's presence runtime: the per-session gateway state
/// machine plus the outer supervise-and-retry loop around it.
pub struct DiscordPresencePlatform {
    pub config: AccountConfig,
    pub connection_status: ConnectionStatus,
    profile: Option<DiscordProfile>,
    gateway_url: String,
    clock: Clock,
}

impl DiscordPresencePlatform {
    pub fn new(config: AccountConfig) -> Self {
        Self {
            config,
            connection_status: ConnectionStatus::Disconnected,
            profile: None,
            gateway_url: GATEWAY_URL.to_string(),
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    /// Point the runtime at a different gateway endpoint.
    pub fn set_gateway_url(&mut self, url: impl Into<String>) {
        self.gateway_url = url.into();
    }

    /// Replace the wall clock used for window gating.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    fn window_active_now(&self) -> bool {
        self.config.active_at_hour((self.clock)().hour())
    }

    /// Block until the account's window is open, sleeping in bounded
    /// increments rather than one long stretch.
    async fn wait_for_window(&self) {
        let Some(win) = self.config.window else {
            return;
        };
        loop {
            let wait = win.wait_from((self.clock)());
            if wait.is_zero() {
                return;
            }
            info!(
                "[account {}] outside active window {}; sleeping {:?}",
                self.config.ordinal,
                win.describe(),
                window::poll_interval(wait)
            );
            sleep(window::poll_interval(wait)).await;
        }
    }

    /// Supervisor entrypoint. Resolves the display identity once, then runs
    /// sessions forever: window exit → re-gate immediately, error → fixed
    /// 5-second backoff. Never returns on its own.
    pub async fn start_loop(&mut self) -> Result<(), Error> {
        let ord = self.config.ordinal;

        let profile = fetch_profile(&self.config.token).await;
        info!(
            "[account {ord}] logged in as {profile}; status={}, window={}",
            self.config.status,
            self.config.describe_window()
        );
        self.profile = Some(profile);

        loop {
            self.wait_for_window().await;

            match self.run_session().await {
                Ok(SessionEnd::WindowExited) => {
                    info!("[account {ord}] active window closed; presence dropped until it reopens");
                    self.connection_status = ConnectionStatus::Disconnected;
                }
                Err(e) => {
                    let name = self
                        .profile
                        .as_ref()
                        .map(|p| p.username.as_str())
                        .unwrap_or("Unknown");
                    warn!("[account {ord}] ({name}) connection error: {e}");
                    warn!(
                        "[account {ord}] ({name}) reconnecting in {}s...",
                        RECONNECT_DELAY.as_secs()
                    );
                    self.connection_status = ConnectionStatus::Reconnecting;
                    sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// One full session: Connecting → Handshaking → Active → Closed.
    /// `Ok(WindowExited)` is the only non-error exit; every transport or
    /// protocol failure surfaces as `Err` and is retried by `start_loop`.
    pub async fn run_session(&mut self) -> Result<SessionEnd, Error> {
        let ord = self.config.ordinal;

        let (mut ws, _) = connect_async(&self.gateway_url)
            .await
            .map_err(|e| Error::Platform(format!("gateway connect failed: {e}")))?;
        self.connection_status = ConnectionStatus::Connected;

        let heartbeat_interval = timeout(HELLO_TIMEOUT, wait_for_hello(&mut ws)).await??;
        debug!("[account {ord}] hello received; heartbeat_interval={heartbeat_interval}ms");

        send_json(&mut ws, &identify_payload(&self.config)).await?;
        if !self.config.custom_status.is_empty() {
            send_json(&mut ws, &presence_update_payload(&self.config)).await?;
        }
        info!(
            "[account {ord}] identified; presence={}, first heartbeat in {heartbeat_interval}ms",
            self.config.status
        );

        // First beat carries a null marker, then a running sequence counter.
        let mut seq: Option<u64> = None;
        sleep(Duration::from_millis(heartbeat_interval)).await;

        loop {
            if !self.window_active_now() {
                let _ = ws.close(None).await;
                return Ok(SessionEnd::WindowExited);
            }
            send_json(&mut ws, &heartbeat_payload(seq)).await?;
            seq = Some(seq.map_or(1, |s| s + 1));
            sleep(KEEPALIVE_INTERVAL).await;
        }
    }
}

#[async_trait]
impl PlatformIntegration for DiscordPresencePlatform {
    async fn connect(&mut self) -> Result<(), Error> {
        if matches!(self.connection_status, ConnectionStatus::Connected) {
            return Ok(());
        }
        if self.config.token.is_empty() {
            return Err(Error::Auth("Discord presence: no token configured".into()));
        }
        // Nothing else to do here – the real socket loop starts in start_loop.
        self.connection_status = ConnectionStatus::Connecting;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        self.connection_status = ConnectionStatus::Disconnected;
        Ok(())
    }

    async fn get_connection_status(&self) -> Result<ConnectionStatus, Error> {
        Ok(self.connection_status.clone())
    }
}

/// Reads until the gateway hello arrives and yields its heartbeat interval
/// in milliseconds. Control frames are skipped; a close frame or a text
/// frame without the interval is an error.
async fn wait_for_hello(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<u64, Error> {
    while let Some(msg_res) = ws.next().await {
        let msg = msg_res.map_err(|e| Error::Platform(format!("ws error: {e}")))?;

        if msg.is_close() {
            return Err(Error::Platform("gateway closed before hello".into()));
        }
        if msg.is_ping() || msg.is_pong() {
            continue;
        }

        let Message::Text(txt) = msg else { continue };
        return parse_heartbeat_interval(txt.as_str());
    }

    Err(Error::Platform("gateway stream ended before hello".into()))
}

async fn send_json(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    payload: &Value,
) -> Result<(), Error> {
    ws.send(Message::text(payload.to_string()))
        .await
        .map_err(|e| Error::Platform(format!("ws send failed: {e}")))
}

/// Extract `d.heartbeat_interval` from the raw hello frame.
pub fn parse_heartbeat_interval(raw: &str) -> Result<u64, Error> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| Error::Platform(format!("bad gateway json: {e}")))?;

    parsed
        .pointer("/d/heartbeat_interval")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::Platform("hello frame missing d.heartbeat_interval".into()))
}

/// Identify (op 2): credential, synthetic client platform, desired presence.
pub fn identify_payload(config: &AccountConfig) -> Value {
    json!({
        "op": 2,
        "d": {
            "token": config.token,
            "properties": {
                "$os": "Windows 10",
                "$browser": "Google Chrome",
                "$device": "Windows",
            },
            "presence": {
                "status": config.status.as_str(),
                "afk": false,
            },
        },
        "s": null,
        "t": null,
    })
}

/// Presence update (op 3) carrying the custom-status activity. Sent exactly
/// once per session, immediately after identify, and only when a custom
/// status is configured.
pub fn presence_update_payload(config: &AccountConfig) -> Value {
    json!({
        "op": 3,
        "d": {
            "since": 0,
            "activities": [
                {
                    "type": 4,
                    "state": config.custom_status,
                    "name": "Custom Status",
                    "id": "custom",
                }
            ],
            "status": config.status.as_str(),
            "afk": false,
        },
    })
}

/// Heartbeat (op 1): `null` on the first beat, then the sequence counter.
pub fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": 1, "d": seq })
}
