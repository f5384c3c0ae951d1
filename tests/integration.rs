//! End-to-end tests against an in-process fake store
//!
//! Run with `RUST_LOG=shortkv=debug cargo test --test integration -- --nocapture`
//! to see connection lifecycle logs.

mod common;

use common::{init_tracing, FakeStore, FakeStoreConfig};
use shortkv::client::{with_client, ClientFactory, ClientProducer, StoreClient};
use shortkv::connection::ConnectionOptions;
use shortkv::error::{DialPhase, ErrorKind, HandshakeStep};
use shortkv::protocol::{Cmd, Frame};
use shortkv::{Error, LinkStore};
use std::time::Duration;

fn plain_factory() -> ClientFactory {
    ClientFactory::new(ConnectionOptions::default())
}

#[tokio::test]
async fn test_set_get_close() {
    init_tracing();
    let store = FakeStore::start().await;

    let client = plain_factory().new_client(&store.addr()).await.unwrap();
    client
        .exec(&Cmd::set("k", "v"))
        .await
        .unwrap()
        .expect_ok()
        .unwrap();
    let value = client.exec(&Cmd::get("k")).await.unwrap();
    assert_eq!(value.into_string().unwrap().as_deref(), Some("v"));

    client.close().await.unwrap();
    assert!(matches!(client.close().await, Err(Error::PoolClosed)));
    assert!(store.wait_all_closed().await);
}

#[tokio::test]
async fn test_announces_dialed_host() {
    init_tracing();
    let store = FakeStore::start().await;

    let client = plain_factory()
        .new_client(&store.localhost_addr())
        .await
        .unwrap();
    assert_eq!(
        store.admin_commands(),
        vec!["CONFIG SET cluster-announce-ip localhost"]
    );
    assert_eq!(store.connections(), 1);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_address_issues_no_commands() {
    init_tracing();

    let err = plain_factory().new_client("not-an-address").await.unwrap_err();
    assert!(matches!(err, Error::PoolInit { .. }), "{:?}", err);
    assert!(err.to_string().contains("not-an-address"));
}

#[tokio::test]
async fn test_zero_io_timeouts_rejected_before_dialing() {
    init_tracing();
    let store = FakeStore::start().await;

    for opts in [
        ConnectionOptions::builder()
            .dial_read_timeout(Duration::ZERO)
            .build(),
        ConnectionOptions::builder()
            .dial_write_timeout(Duration::ZERO)
            .build(),
    ] {
        let err = ClientFactory::new(opts)
            .new_client(&store.addr())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{:?}", err);
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
    assert_eq!(store.connections(), 0);
}

#[tokio::test]
async fn test_unreachable_address_is_dial_error() {
    init_tracing();
    let store = FakeStore::start().await;
    let addr = store.addr();
    drop(store);
    // Give the aborted listener time to release the port
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = plain_factory().new_client(&addr).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dial);
    match err {
        Error::PoolInit { source, .. } => assert!(matches!(
            *source,
            Error::Dial {
                phase: DialPhase::Tcp,
                ..
            }
        )),
        other => panic!("expected PoolInit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_acl_auth_and_masterauth() {
    init_tracing();
    let store = FakeStore::start_with(FakeStoreConfig {
        password: Some("pw".into()),
        ..FakeStoreConfig::default()
    })
    .await;

    let opts = ConnectionOptions::builder().acl("app", "pw").build();
    let client = ClientFactory::new(opts)
        .new_client(&store.addr())
        .await
        .unwrap();

    assert_eq!(
        store.commands(),
        vec![
            "AUTH app pw",
            "CONFIG SET cluster-announce-ip 127.0.0.1",
            "CONFIG SET masterauth pw",
        ]
    );
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_wrong_password_is_auth_phase() {
    init_tracing();
    let store = FakeStore::start_with(FakeStoreConfig {
        password: Some("pw".into()),
        ..FakeStoreConfig::default()
    })
    .await;

    let opts = ConnectionOptions::builder().acl("app", "nope").build();
    let err = ClientFactory::new(opts)
        .new_client(&store.addr())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Dial);
    assert!(err.to_string().contains("during auth"), "{}", err);
    assert!(!err.to_string().contains("nope"));
    assert!(store.admin_commands().is_empty());
}

#[tokio::test]
async fn test_announce_failure_rolls_back() {
    init_tracing();
    let store = FakeStore::start_with(FakeStoreConfig {
        reject_config: Some("cluster-announce-ip"),
        ..FakeStoreConfig::default()
    })
    .await;

    let err = plain_factory().new_client(&store.addr()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Handshake {
            step: HandshakeStep::AnnounceIp,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Handshake);
    assert_eq!(store.admin_commands().len(), 1);
    assert!(store.wait_all_closed().await, "pool left a connection open");
}

#[tokio::test]
async fn test_masterauth_failure_rolls_back() {
    init_tracing();
    let store = FakeStore::start_with(FakeStoreConfig {
        reject_config: Some("masterauth"),
        password: Some("pw".into()),
        ..FakeStoreConfig::default()
    })
    .await;

    let opts = ConnectionOptions::builder().acl("app", "pw").build();
    let err = ClientFactory::new(opts)
        .new_client(&store.addr())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Handshake {
            step: HandshakeStep::MasterAuth,
            ..
        }
    ));
    assert!(!err.to_string().contains("CONFIG SET masterauth pw"));
    assert_eq!(store.admin_commands().len(), 2);
    assert!(store.wait_all_closed().await, "pool left a connection open");
}

#[tokio::test]
async fn test_server_error_does_not_close_client() {
    init_tracing();
    let store = FakeStore::start().await;
    let client = plain_factory().new_client(&store.addr()).await.unwrap();

    let err = client.exec(&Cmd::new("FLUSHALL")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
    assert!(err.to_string().starts_with("failed to perform action FLUSHALL"));

    let reply = client.exec(&Cmd::ping()).await.unwrap();
    assert_eq!(reply, Frame::Simple("PONG".into()));
    assert_eq!(store.connections(), 1);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_reconnects_after_dropped_connection() {
    init_tracing();
    let store = FakeStore::start().await;
    let client = plain_factory().new_client(&store.addr()).await.unwrap();

    store.drop_next_reply();
    let err = client.exec(&Cmd::ping()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);

    // The next call waits for the background reconnect
    let reply = client
        .exec_within(&Cmd::ping(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(reply, Frame::Simple("PONG".into()));
    assert_eq!(store.connections(), 2);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_sequential_commands_keep_issue_order() {
    init_tracing();
    let store = FakeStore::start().await;
    let client = plain_factory().new_client(&store.addr()).await.unwrap();

    for i in 0..20 {
        client
            .exec(&Cmd::set("counter", i.to_string()))
            .await
            .unwrap();
    }
    assert_eq!(store.get("counter").as_deref(), Some("19"));
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_with_client_releases_connection() {
    init_tracing();
    let store = FakeStore::start().await;
    let factory = plain_factory();

    let reply = with_client(&factory, &store.addr(), |client| {
        Box::pin(async move { client.exec(&Cmd::ping()).await })
    })
    .await
    .unwrap();
    assert_eq!(reply, Frame::Simple("PONG".into()));
    assert!(store.wait_all_closed().await);
}

#[tokio::test]
async fn test_link_store_round_trip() {
    init_tracing();
    let store = FakeStore::start().await;
    let links = LinkStore::new(plain_factory(), store.addr());

    links.shorten("abc123", "https://example.com").await.unwrap();
    assert_eq!(
        links.resolve("abc123").await.unwrap().as_deref(),
        Some("https://example.com")
    );
    assert_eq!(links.resolve("missing").await.unwrap(), None);

    let err = links
        .shorten("abc123", "https://elsewhere.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ShortInUse(_)));
    assert_eq!(store.get("abc123").as_deref(), Some("https://example.com"));

    // Every operation acquired and released its own client
    assert_eq!(store.connections(), 4);
    assert!(store.wait_all_closed().await);
}
