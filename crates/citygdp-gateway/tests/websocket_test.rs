//! Drives the gateway over a real WebSocket on a loopback port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, routing::post};
use serde_json::{Value, json};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use citygdp_api::auth::AppStateInner;
use citygdp_api::chatbot::{ChatClient, ChatConfig};
use citygdp_api::reports::ReportCatalog;
use citygdp_crypto::password::{HashCost, Hasher};
use citygdp_db::Database;
use citygdp_types::events::GatewayEvent;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    start_server_with_chat(None).await
}

async fn start_server_with_chat(chat: Option<ChatClient>) -> SocketAddr {
    let hasher = Hasher::new(HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let state = AppStateInner::new(
        Arc::new(Database::open_in_memory().unwrap()),
        hasher,
        ReportCatalog::new("https://reports.example/embed"),
        chat,
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, citygdp_gateway::routes(state))
            .await
            .unwrap();
    });
    addr
}

/// Completions endpoint that takes `delay` before echoing the prompt.
async fn slow_upstream(delay: Duration) -> ChatClient {
    let app = Router::new().route(
        "/v1/completions",
        post(move |Json(body): Json<Value>| async move {
            tokio::time::sleep(delay).await;
            let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
            Json(json!({ "choices": [{ "text": format!("echo[{}]", prompt) }] }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ChatClient::new(ChatConfig {
        api_url: format!("http://{}/v1/completions", addr),
        api_key: "test-key".into(),
        model: "test-model".into(),
    })
    .unwrap()
}

async fn connect(addr: SocketAddr) -> Client {
    let (mut ws, _) = connect_async(format!("ws://{}/gateway", addr)).await.unwrap();
    assert_eq!(next_event(&mut ws).await, GatewayEvent::Hello { authenticated: false });
    ws
}

async fn next_event(ws: &mut Client) -> GatewayEvent {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {:?}", other),
        }
    }
}

async fn send(ws: &mut Client, json: &str) -> GatewayEvent {
    ws.send(Message::Text(json.to_string().into())).await.unwrap();
    next_event(ws).await
}

#[tokio::test]
async fn session_follows_the_connection() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;

    let event = send(
        &mut ws,
        r#"{"type":"Register","data":{"username":"dan","email":"d@x.com","password":"secret"}}"#,
    )
    .await;
    assert!(matches!(event, GatewayEvent::Registered { .. }));

    let event = send(&mut ws, r#"{"type":"Login","data":{"email":"d@x.com","password":"secret"}}"#).await;
    assert!(matches!(event, GatewayEvent::LoggedIn { .. }));

    let event = send(&mut ws, r#"{"type":"Profile"}"#).await;
    match event {
        GatewayEvent::Profile { account } => assert_eq!(account.email, "d@x.com"),
        other => panic!("unexpected event {:?}", other),
    }

    // A second connection starts anonymous even though the first is logged in
    let mut other = connect(addr).await;
    let event = send(&mut other, r#"{"type":"Profile"}"#).await;
    assert!(matches!(event, GatewayEvent::Error { ref code, .. } if code == "unauthenticated"));

    // Reconnecting drops the session
    ws.close(None).await.unwrap();
    let mut again = connect(addr).await;
    let event = send(&mut again, r#"{"type":"Profile"}"#).await;
    assert!(matches!(event, GatewayEvent::Error { ref code, .. } if code == "unauthenticated"));
}

#[tokio::test]
async fn malformed_command_gets_error_reply() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;

    let event = send(&mut ws, r#"{"type":"Login","data":{"email":"d@x.com"}}"#).await;
    assert!(matches!(event, GatewayEvent::Error { ref code, .. } if code == "bad_command"));

    // The connection is still usable afterwards
    let event = send(&mut ws, r#"{"type":"Logout"}"#).await;
    assert_eq!(event, GatewayEvent::LoggedOut);
}

#[tokio::test]
async fn slow_chat_does_not_hold_up_the_connection() {
    let addr = start_server_with_chat(Some(slow_upstream(Duration::from_millis(300)).await)).await;
    let mut ws = connect(addr).await;

    send(
        &mut ws,
        r#"{"type":"Register","data":{"username":"gus","email":"g@x.com","password":"pw"}}"#,
    )
    .await;
    let event = send(&mut ws, r#"{"type":"Login","data":{"email":"g@x.com","password":"pw"}}"#).await;
    assert!(matches!(event, GatewayEvent::LoggedIn { .. }));

    ws.send(Message::Text(r#"{"type":"Chat","data":{"query":"GDP of Pune?"}}"#.into()))
        .await
        .unwrap();

    // Answered before the chat reply comes back
    let event = send(&mut ws, r#"{"type":"Profile"}"#).await;
    assert!(matches!(event, GatewayEvent::Profile { .. }));

    match next_event(&mut ws).await {
        GatewayEvent::ChatReply { reply, history } => {
            assert_eq!(reply, "echo[GDP of Pune?]");
            assert_eq!(history.len(), 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
}
