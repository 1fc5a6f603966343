// tests/runtime_tests.rs

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use lurkbot_core::Error;
use lurkbot_core::config::account_from_parts;
use lurkbot_core::models::AccountConfig;
use lurkbot_core::platforms::discord::runtime::{
    DiscordPresencePlatform, SessionEnd, heartbeat_payload, identify_payload,
    parse_heartbeat_interval, presence_update_payload,
};
use lurkbot_core::platforms::{ConnectionStatus, PlatformIntegration};

fn account(custom_status: Option<&str>) -> AccountConfig {
    account_from_parts(1, "token-a".into(), Some("idle"), custom_status, None).unwrap()
}

/// Minimal stand-in for the gateway: accepts one websocket connection,
/// sends the given hello frame, then forwards every inbound text frame
/// (parsed as JSON) to the returned channel until the peer closes.
async fn spawn_fake_gateway(hello: &str) -> (String, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let hello = hello.to_string();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::text(hello)).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
            let Message::Text(txt) = msg else { continue };
            let frame = serde_json::from_str::<Value>(txt.as_str()).unwrap();
            if tx.send(frame).is_err() {
                break;
            }
        }
    });

    (url, rx)
}

async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a gateway frame")
        .expect("gateway stream ended early")
}

#[tokio::test]
async fn session_sends_identify_presence_then_first_heartbeat() {
    let (url, mut rx) =
        spawn_fake_gateway(r#"{"op":10,"d":{"heartbeat_interval":200}}"#).await;

    let mut platform = DiscordPresencePlatform::new(account(Some("brb lurking")));
    platform.set_gateway_url(&url);
    let driver = tokio::spawn(async move {
        let _ = platform.run_session().await;
    });

    let identify = recv_frame(&mut rx).await;
    let identified_at = Instant::now();
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "token-a");
    assert_eq!(identify["d"]["presence"]["status"], "idle");

    let presence = recv_frame(&mut rx).await;
    assert_eq!(presence["op"], 3);
    assert_eq!(presence["d"]["activities"][0]["state"], "brb lurking");

    // The first heartbeat waits out the negotiated interval (200ms here)
    // and carries the null marker.
    let heartbeat = recv_frame(&mut rx).await;
    assert_eq!(heartbeat["op"], 1);
    assert!(heartbeat["d"].is_null());
    assert!(
        identified_at.elapsed() >= Duration::from_millis(150),
        "first heartbeat arrived before the negotiated interval"
    );

    driver.abort();
}

#[tokio::test]
async fn session_without_custom_status_skips_the_presence_update() {
    let (url, mut rx) =
        spawn_fake_gateway(r#"{"op":10,"d":{"heartbeat_interval":50}}"#).await;

    let mut platform = DiscordPresencePlatform::new(account(None));
    platform.set_gateway_url(&url);
    let driver = tokio::spawn(async move {
        let _ = platform.run_session().await;
    });

    let identify = recv_frame(&mut rx).await;
    assert_eq!(identify["op"], 2);

    // Next frame is already the heartbeat; no op-3 in between.
    let heartbeat = recv_frame(&mut rx).await;
    assert_eq!(heartbeat["op"], 1);

    driver.abort();
}

#[tokio::test]
async fn session_closes_without_error_when_window_exits() {
    let (url, mut rx) =
        spawn_fake_gateway(r#"{"op":10,"d":{"heartbeat_interval":50}}"#).await;

    let config =
        account_from_parts(1, "token-a".into(), Some("idle"), None, Some("9-17")).unwrap();
    let mut platform = DiscordPresencePlatform::new(config);
    platform.set_gateway_url(&url);
    // Freeze the clock outside the allowed window; the first gate re-check
    // after identify must end the session as a window exit, not an error.
    platform.set_clock(Arc::new(|| {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }));

    let end = timeout(Duration::from_secs(5), platform.run_session())
        .await
        .expect("session did not close after the window exit")
        .expect("window exit surfaced as an error");
    assert_eq!(end, SessionEnd::WindowExited);

    // The session identified but never heartbeat before closing.
    let identify = recv_frame(&mut rx).await;
    assert_eq!(identify["op"], 2);
    let trailing = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("fake gateway did not observe the close");
    assert!(trailing.is_none(), "unexpected frame after window exit");
}

#[tokio::test]
async fn malformed_hello_fails_the_session() {
    let (url, _rx) = spawn_fake_gateway(r#"{"op":10,"d":{}}"#).await;

    let mut platform = DiscordPresencePlatform::new(account(None));
    platform.set_gateway_url(&url);

    let res = timeout(Duration::from_secs(5), platform.run_session())
        .await
        .expect("session did not fail on the malformed hello");
    assert!(matches!(res, Err(Error::Platform(_))));
}

#[test]
fn hello_frame_yields_heartbeat_interval() -> anyhow::Result<()> {
    let raw = r#"{"t":null,"s":null,"op":10,"d":{"heartbeat_interval":41250}}"#;
    assert_eq!(parse_heartbeat_interval(raw)?, 41250);
    Ok(())
}

#[test]
fn malformed_hello_frames_are_errors() {
    assert!(matches!(
        parse_heartbeat_interval("not json at all"),
        Err(Error::Platform(_))
    ));
    assert!(matches!(
        parse_heartbeat_interval(r#"{"op":10,"d":{}}"#),
        Err(Error::Platform(_))
    ));
    assert!(matches!(
        parse_heartbeat_interval(r#"{"op":10,"d":{"heartbeat_interval":"soon"}}"#),
        Err(Error::Platform(_))
    ));
}

#[test]
fn identify_carries_token_presence_and_platform() {
    let payload = identify_payload(&account(None));

    assert_eq!(payload["op"], 2);
    assert_eq!(payload["d"]["token"], "token-a");
    assert_eq!(payload["d"]["presence"]["status"], "idle");
    assert_eq!(payload["d"]["presence"]["afk"], false);
    assert_eq!(payload["d"]["properties"]["$os"], "Windows 10");
    assert_eq!(payload["d"]["properties"]["$browser"], "Google Chrome");
    assert_eq!(payload["d"]["properties"]["$device"], "Windows");
    assert!(payload["s"].is_null());
    assert!(payload["t"].is_null());
}

#[test]
fn presence_update_carries_one_custom_status_activity() {
    let payload = presence_update_payload(&account(Some("brb lurking")));

    assert_eq!(payload["op"], 3);
    assert_eq!(payload["d"]["since"], 0);
    assert_eq!(payload["d"]["status"], "idle");
    assert_eq!(payload["d"]["afk"], false);

    let activities = payload["d"]["activities"].as_array().unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["type"], 4);
    assert_eq!(activities[0]["state"], "brb lurking");
    assert_eq!(activities[0]["name"], "Custom Status");
    assert_eq!(activities[0]["id"], "custom");
}

#[test]
fn heartbeat_is_null_then_sequence_counter() {
    assert!(heartbeat_payload(None)["d"].is_null());
    assert_eq!(heartbeat_payload(None)["op"], 1);
    assert_eq!(heartbeat_payload(Some(1))["d"], 1);
    assert_eq!(heartbeat_payload(Some(42))["d"], 42);
}

#[tokio::test]
async fn platform_connect_disconnect_status_flow() -> Result<(), Error> {
    let mut platform = DiscordPresencePlatform::new(account(None));

    // Initially disconnected
    let status = platform.get_connection_status().await?;
    assert_eq!(status, ConnectionStatus::Disconnected);

    // connect() only validates and marks Connecting; the socket loop is
    // owned by start_loop.
    platform.connect().await?;
    let status = platform.get_connection_status().await?;
    assert_eq!(status, ConnectionStatus::Connecting);

    platform.disconnect().await?;
    let status = platform.get_connection_status().await?;
    assert_eq!(status, ConnectionStatus::Disconnected);

    Ok(())
}

#[tokio::test]
async fn connect_is_a_noop_when_already_connected() -> Result<(), Error> {
    let mut platform = DiscordPresencePlatform::new(account(None));
    platform.connection_status = ConnectionStatus::Connected;

    platform.connect().await?;
    let status = platform.get_connection_status().await?;
    assert_eq!(status, ConnectionStatus::Connected);

    Ok(())
}
