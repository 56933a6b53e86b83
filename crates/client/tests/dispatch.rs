//! Dispatcher and session behaviour against a simulated daemon.

use std::sync::Arc;
use std::time::Duration;

use rcview_client::dashboard::{spawn_connectivity, spawn_dashboard};
use rcview_client::{command, Dispatch, RcClient, RcError, SessionRegistry};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_send_posts_json_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/operations/about"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .and(body_json(json!({"fs": "remote:"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 100, "free": 40})))
        .expect(1)
        .mount(&server)
        .await;

    let client = RcClient::new(&server.uri(), "admin", "secret").unwrap();
    let res = client
        .send(&command(json!({"fs": "remote:"})), "/operations/about", &CancellationToken::new())
        .await
        .unwrap();

    let about: rcview_types::About = res.decode().unwrap();
    assert_eq!(about.total, 100);
    assert_eq!(about.free, 40);
}

#[tokio::test]
async fn test_401_is_unauthorized_regardless_of_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"jobid": 1})))
        .mount(&server)
        .await;

    let client = RcClient::new(&server.uri(), "admin", "wrong").unwrap();
    let err = client
        .send(&command(json!({})), "/rc/noopauth", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let client = RcClient::new(&server.uri(), "", "").unwrap();
    let res = client
        .send(&command(json!({})), "/core/stats", &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(res.decode::<Value>(), Err(RcError::Decode(_))));
}

#[tokio::test]
async fn test_cancelled_token_aborts_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = RcClient::new(&server.uri(), "", "").unwrap();
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = client
        .send(&command(json!({})), "/sync/copy", &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_unreachable_daemon_is_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = RcClient::new(&format!("http://127.0.0.1:{port}"), "", "").unwrap();
    let err = client
        .send(&command(json!({})), "/core/version", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RcError::Transport(_)));
    assert!(!client.dial(Duration::from_millis(200)).await);
}

async fn daemon() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rc/noopauth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/core/version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"version": "v1.66.0", "arch": "arm64", "os": "linux"})),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_login_sets_current_session() {
    let server = daemon().await;
    let session = SessionRegistry::new();

    let user_info = session.login(&server.uri(), "admin", "secret").await.unwrap();
    assert!(user_info.starts_with("admin@127.0.0.1:"));

    let current = session.current().unwrap();
    assert_eq!(current.host(), server.uri());
    assert_eq!(session.hosts(), vec![server.uri()]);
    assert_eq!(session.version(false).await.unwrap().version, "v1.66.0");
}

#[tokio::test]
async fn test_login_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = SessionRegistry::new();
    let err = session.login(&server.uri(), "admin", "nope").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(session.current().is_err());
}

#[tokio::test]
async fn test_relogin_with_new_credentials_replaces_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rc/noopauth"))
        .and(header("authorization", "Basic YWxpY2U6cGE="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rc/noopauth"))
        .and(header("authorization", "Basic Ym9iOnBi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/core/version"))
        .and(header("authorization", "Basic Ym9iOnBi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "v1.66.0"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/core/version"))
        .and(header("authorization", "Basic YWxpY2U6cGE="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "v1.66.0"})))
        .mount(&server)
        .await;

    let session = SessionRegistry::new();
    let first = session.login(&server.uri(), "alice", "pa").await.unwrap();
    assert!(first.starts_with("alice@"));

    let second = session.login(&server.uri(), "bob", "pb").await.unwrap();
    assert!(second.starts_with("bob@"), "second login reported {second}");
    assert!(session.current().unwrap().has_credentials("bob", "pb"));
    assert_eq!(session.hosts(), vec![server.uri()]);

    // Same credentials again reuse the stored client.
    let current = session.current().unwrap();
    let reused = session.setup(&server.uri(), "bob", "pb").await.unwrap();
    assert!(Arc::ptr_eq(&reused, &current));
}

#[tokio::test]
async fn test_concurrent_login_is_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rc/noopauth"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/core/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "v1.66.0"})))
        .mount(&server)
        .await;

    let session = SessionRegistry::new();
    let uri = server.uri();
    let (first, second) = tokio::join!(
        session.login(&uri, "admin", "secret"),
        session.login(&uri, "admin", "secret"),
    );

    assert!(first.is_ok());
    match second {
        Err(RcError::Busy(message)) => assert_eq!(message, "Attempting to log in"),
        other => panic!("expected Busy, got {other:?}"),
    }

    // The slot is free again once the first login finished.
    assert!(session.login(&uri, "admin", "secret").await.is_ok());
}

#[tokio::test]
async fn test_dashboard_reports_stats_when_connected() {
    let server = daemon().await;
    Mock::given(method("POST"))
        .and(path("/core/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"bytes": 2048, "transfers": 3, "speed": 12.5})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/core/bwlimit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rate": "10M"})))
        .mount(&server)
        .await;

    let session = Arc::new(SessionRegistry::new());
    session.login(&server.uri(), "", "").await.unwrap();

    let cancel = CancellationToken::new();
    let (feeds, _conn) = spawn_connectivity(session.clone(), Duration::from_millis(20), cancel.clone());
    let (mut info_rx, _dash) = spawn_dashboard(session, feeds.dashboard, cancel.clone());

    let info = tokio::time::timeout(Duration::from_secs(5), info_rx.recv())
        .await
        .expect("dashboard tick")
        .expect("dashboard channel open");
    cancel.cancel();

    assert!(info.connected);
    assert_eq!(info.version.as_deref(), Some("v1.66.0 (arm64)"));
    assert_eq!(info.bandwidth.as_deref(), Some("10M"));
    assert_eq!(info.stats.unwrap().transfers, 3);
}
