//! End-to-end tests over real TCP sockets
//!
//! Each test binds a server on an ephemeral port and talks to it with the
//! client API or with raw frames.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use object_exchange::error::ProtocolError;
use object_exchange::protocol::catalog::{Catalog, CatalogRecord, Category};
use object_exchange::protocol::message::{ControlMessage, ResultPayload, Status, StatusMessage};
use object_exchange::protocol::session::SessionContext;
use object_exchange::service::client::{connect, Connect};
use object_exchange::service::server::Server;
use object_exchange::transport::connection::Connection;
use tokio::net::TcpStream;

fn catalog() -> Catalog {
    let mut builder = Catalog::builder();
    builder
        .add(Category::Cat, "Mruczek")
        .add(Category::Cat, "Luna")
        .add(Category::Dog, "Reksio");
    builder.build()
}

async fn start(max_clients: usize) -> (SocketAddr, Arc<SessionContext>) {
    let ctx = Arc::new(SessionContext::new(catalog(), max_clients));
    let server = Server::bind_with_context("127.0.0.1:0", Arc::clone(&ctx))
        .await
        .expect("bind");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    (addr, ctx)
}

async fn admitted(addr: SocketAddr, client_id: i64) -> object_exchange::ClientSession {
    match connect(&addr.to_string(), client_id).await.expect("connect") {
        Connect::Admitted(session) => session,
        Connect::Refused => panic!("client {client_id} unexpectedly refused"),
    }
}

/// Poll until the active count settles, since release happens on the server task
async fn wait_for_active(ctx: &SessionContext, expected: usize) {
    for _ in 0..200 {
        if ctx.admission.active() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "active count stuck at {} (expected {expected})",
        ctx.admission.active()
    );
}

#[tokio::test]
async fn test_client_request_and_bye() {
    let (addr, ctx) = start(2).await;

    let mut session = admitted(addr, 1).await;
    assert_eq!(session.client_id(), 1);

    let cats = session.request(Category::Cat).await.expect("cats");
    let keys: Vec<_> = cats.iter().map(CatalogRecord::key).collect();
    assert_eq!(keys, ["cat_1", "cat_2"]);
    assert_eq!(cats[0].display_name, "Mruczek");

    session.bye().await.expect("bye");
    wait_for_active(&ctx, 0).await;
    assert_eq!(ctx.metrics.snapshot().sessions_admitted, 1);
}

#[tokio::test]
async fn test_full_server_refuses_then_admits_after_release() {
    let (addr, ctx) = start(1).await;

    let first = admitted(addr, 1).await;
    wait_for_active(&ctx, 1).await;

    assert!(matches!(
        connect(&addr.to_string(), 2).await.expect("connect"),
        Connect::Refused
    ));
    assert_eq!(ctx.admission.active(), 1);

    first.bye().await.expect("bye");
    wait_for_active(&ctx, 0).await;

    let third = admitted(addr, 3).await;
    third.bye().await.expect("bye");
    assert_eq!(ctx.metrics.snapshot().sessions_refused, 1);
}

#[tokio::test]
async fn test_dropped_client_frees_slot() {
    let (addr, ctx) = start(1).await;

    let session = admitted(addr, 5).await;
    wait_for_active(&ctx, 1).await;
    drop(session);

    wait_for_active(&ctx, 0).await;
    let again = admitted(addr, 6).await;
    again.bye().await.expect("bye");
}

#[tokio::test]
async fn test_unknown_class_returns_single_member() {
    let (addr, ctx) = start(1).await;
    let mut session = admitted(addr, 7).await;

    match session.request_raw("bird").await.expect("reply") {
        ResultPayload::Single(record) => assert!(ctx.catalog.contains(&record)),
        other => panic!("expected single record, got {other:?}"),
    }

    session.bye().await.expect("bye");
}

#[tokio::test]
async fn test_type_mismatch_keeps_session_usable() {
    let (addr, _ctx) = start(1).await;
    let mut session = admitted(addr, 8).await;

    // No humans in this catalog, so the reply is a random record
    let result = session.request(Category::Human).await;
    assert!(matches!(result, Err(ProtocolError::TypeMismatch(_))));
    assert!(result.unwrap_err().is_recoverable());

    let dogs = session.request(Category::Dog).await.expect("dogs");
    assert_eq!(dogs.len(), 1);

    session.bye().await.expect("bye");
}

#[tokio::test]
async fn test_raw_wire_exchange() {
    let (addr, _ctx) = start(1).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut conn = Connection::new(stream);

    conn.write_frame(br#"{"client_id": 42}"#.to_vec())
        .await
        .unwrap();
    let status: StatusMessage = conn.read_json().await.unwrap();
    assert_eq!(status.status, Status::Ok);

    conn.write_frame(br#"{"type": "GET", "class": "DOG"}"#.to_vec())
        .await
        .unwrap();
    let payload: ResultPayload = conn.read_bincode().await.unwrap();
    assert_eq!(payload.len(), 1);
    assert!(payload.is_collection());

    conn.write_json(&ControlMessage::bye()).await.unwrap();
    assert!(matches!(
        conn.read_frame().await,
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_garbage_connection_does_not_stop_server() {
    let (addr, ctx) = start(1).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut conn = Connection::new(stream);
    conn.write_frame(b"not a hello".to_vec()).await.unwrap();
    assert!(conn.read_frame().await.is_err());

    let session = admitted(addr, 9).await;
    session.bye().await.expect("bye");
    wait_for_active(&ctx, 0).await;
    assert_eq!(ctx.metrics.snapshot().protocol_errors, 1);
}
