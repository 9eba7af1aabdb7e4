//! Session socket tests over a real listener
//!
//! The router is served on an ephemeral port and driven with a WebSocket
//! client, so frames go through the same decode/encode path as a browser.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use jamsync_common::config::FeedConfig;
use jamsync_common::events::{ClientEvent, ServerEvent, SessionSnapshot};
use jamsync_server::ingest::Ingestors;
use jamsync_server::sync::Hub;
use jamsync_server::{build_router, db, AppState};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> SocketAddr {
    let pool = db::connect_in_memory().await.unwrap();
    let ingestors = Ingestors::from_config(&FeedConfig::default()).unwrap();
    let app = build_router(AppState::new(pool, ingestors, Hub::spawn(80)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn open(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    client
}

async fn emit(client: &mut Client, event: ClientEvent) {
    client.send(Message::Text(event.to_json().unwrap())).await.unwrap();
}

async fn next_event(client: &mut Client) -> ServerEvent {
    loop {
        let message = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(frame) = message {
            return ServerEvent::from_json(&frame).unwrap();
        }
    }
}

fn join(session: &str, user: &str) -> ClientEvent {
    ClientEvent::JoinSession {
        session_id: session.to_string(),
        user_id: user.to_string(),
    }
}

#[tokio::test]
async fn test_undecodable_frames_leave_connection_open() {
    let addr = serve().await;
    let mut client = open(addr).await;

    client.send(Message::Text("not json".to_string())).await.unwrap();
    client
        .send(Message::Text(r#"{"event":"seize_power","data":{}}"#.to_string()))
        .await
        .unwrap();
    client
        .send(Message::Text(r#"{"event":"bpm_change","data":{"sessionId":"s1","bpm":"fast"}}"#.to_string()))
        .await
        .unwrap();

    emit(&mut client, join("s1", "A")).await;
    assert_eq!(
        next_event(&mut client).await,
        ServerEvent::SessionState(SessionSnapshot {
            current_line_index: 0,
            semitones: 0,
            bpm: 80,
            members: vec!["A".to_string()],
        })
    );
}

#[tokio::test]
async fn test_conductor_frames_reach_every_socket() {
    let addr = serve().await;
    let mut a = open(addr).await;
    let mut b = open(addr).await;

    emit(&mut a, join("s1", "A")).await;
    next_event(&mut a).await;
    emit(&mut b, join("s1", "B")).await;
    next_event(&mut b).await;
    assert_eq!(next_event(&mut a).await, ServerEvent::MemberJoined { user_id: "B".to_string() });

    emit(
        &mut b,
        ClientEvent::ConductorAdvance {
            session_id: "s1".to_string(),
            line_index: 3,
        },
    )
    .await;
    assert_eq!(next_event(&mut a).await, ServerEvent::LineChanged { line_index: 3 });
    assert_eq!(next_event(&mut b).await, ServerEvent::LineChanged { line_index: 3 });
}

#[tokio::test]
async fn test_socket_close_sends_member_left() {
    let addr = serve().await;
    let mut a = open(addr).await;
    let mut b = open(addr).await;

    emit(&mut a, join("s1", "A")).await;
    next_event(&mut a).await;
    emit(&mut b, join("s1", "B")).await;
    next_event(&mut b).await;
    next_event(&mut a).await;

    b.close(None).await.unwrap();
    assert_eq!(
        next_event(&mut a).await,
        ServerEvent::MemberLeft { participant_id: "B".to_string() }
    );

    // The session carries on with the remaining member
    emit(
        &mut a,
        ClientEvent::BpmChange {
            session_id: "s1".to_string(),
            bpm: 100,
        },
    )
    .await;
    match next_event(&mut a).await {
        ServerEvent::SessionState(snapshot) => {
            assert_eq!(snapshot.bpm, 100);
            assert_eq!(snapshot.members, ["A"]);
        }
        other => panic!("unexpected {:?}", other),
    }
}
