//! Explorer and mount operations against a simulated daemon.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rcview_client::RcClient;
use rcview_jobs::{EngineConfig, JobEngine};
use rcview_operations::{Explorer, MountRequest, Mounts};
use rcview_types::{JobInfo, ListItem, RefreshAction};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn daemon() -> (MockServer, JobEngine, mpsc::Receiver<JobInfo>) {
    let server = MockServer::start().await;
    for endpoint in ["/core/stats", "/job/stop"] {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
    }

    let config = EngineConfig {
        poll_interval: Duration::from_millis(20),
        await_tick: Duration::from_millis(10),
        ..Default::default()
    };
    let client = RcClient::new(&server.uri(), "", "").unwrap();
    let (engine, status) = JobEngine::new(Arc::new(client), config);
    (server, engine, status)
}

/// `endpoint` starts job `jobid`, which finishes with `output`.
async fn async_job(server: &MockServer, endpoint: &str, jobid: i64, output: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobid": jobid })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/job/status"))
        .and(body_partial_json(json!({ "jobid": jobid })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": jobid, "finished": true, "success": true, "output": output
        })))
        .mount(server)
        .await;
}

fn explorer(engine: &JobEngine) -> Explorer {
    Explorer::new(engine.clone(), "0", CancellationToken::new())
}

#[tokio::test]
async fn test_list_annotates_entries() {
    let (server, engine, _status) = daemon().await;
    async_job(
        &server,
        "/operations/list",
        1,
        json!({"list": [
            {"Name": "a.txt", "Path": "docs/a.txt", "Size": 3, "IsDir": false, "ModTime": "2024-05-01T10:00:00Z"},
            {"Name": "old", "Path": "docs/old", "Size": -1, "IsDir": true}
        ]}),
    )
    .await;

    let listing = explorer(&engine).list("r:", "docs/").await.unwrap();
    assert_eq!(listing.path, "docs");
    assert_eq!(listing.items.len(), 2);
    assert!(listing.items.iter().all(|i| i.fs == "r:"));
    assert_eq!(listing.items[0].modified_unix, 1_714_557_600);
    assert!(!listing.items[1].has_known_size());

    // UI jobs never count as running work.
    assert_eq!(engine.queue().running_count(), 0);
}

#[tokio::test]
async fn test_mkdir_announces_new_directory() {
    let (server, engine, mut status) = daemon().await;
    async_job(&server, "/operations/mkdir", 4, json!({})).await;
    Mock::given(method("POST"))
        .and(path("/operations/stat"))
        .and(body_partial_json(json!({"fs": "r:", "remote": "docs/new"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item": {"Name": "new", "Path": "docs/new", "Size": 0, "IsDir": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = explorer(&engine).mkdir("r:", "docs", "new").await.unwrap();
    assert!(created.is_dir);
    assert_eq!(created.fs, "r:");

    let announced = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let info = status.recv().await.unwrap();
            if !info.refresh.is_empty() {
                return info;
            }
        }
    })
    .await
    .unwrap();
    assert!(announced.finished);
    assert_eq!(announced.category, "UI:Explorer:0");
    assert_eq!(announced.refresh[0].action, RefreshAction::Add);
    assert_eq!(announced.refresh[0].item.path, "docs/new");
    assert!(engine.queue().latest("UI:Explorer:0").is_none());
}

#[tokio::test]
async fn test_public_link() {
    let (server, engine, _status) = daemon().await;
    async_job(&server, "/operations/publiclink", 6, json!({"url": "https://share.example/abc"})).await;

    let item = ListItem {
        name: "a.txt".to_string(),
        ..Default::default()
    };
    let url = explorer(&engine).public_link("r:", "docs", &item).await.unwrap();
    assert_eq!(url, "https://share.example/abc");
}

#[tokio::test]
async fn test_public_link_without_url() {
    let (server, engine, _status) = daemon().await;
    async_job(&server, "/operations/publiclink", 7, json!({})).await;

    let err = explorer(&engine)
        .public_link("r:", "", &ListItem::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Public link could not be generated");
}

#[tokio::test]
async fn test_fsinfo_features_sorted() {
    let (server, engine, _status) = daemon().await;
    async_job(
        &server,
        "/operations/fsinfo",
        9,
        json!({"Name": "r", "Features": {"Purge": true, "Copy": true, "About": false}}),
    )
    .await;

    let detail = explorer(&engine).fsinfo("r:").await.unwrap();
    assert_eq!(detail.feature_list(), vec!["Copy".to_string(), "Purge".to_string()]);
}

#[tokio::test]
async fn test_about_and_remotes() {
    let (server, engine, _status) = daemon().await;
    Mock::given(method("POST"))
        .and(path("/operations/about"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 10, "used": 4, "free": 6})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/config/listremotes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"remotes": ["gdrive", "s3"]})))
        .mount(&server)
        .await;

    let explorer = explorer(&engine);
    assert_eq!(explorer.about("gdrive:").await.unwrap().free, 6);
    assert_eq!(explorer.list_remotes().await.unwrap(), vec!["gdrive", "s3"]);
}

#[tokio::test]
async fn test_mount_lifecycle() {
    let (server, engine, _status) = daemon().await;
    async_job(&server, "/mount/mount", 30, json!({})).await;
    async_job(&server, "/mount/unmount", 31, json!({})).await;
    Mock::given(method("POST"))
        .and(path("/mount/listmounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mountPoints": [{"Fs": "gdrive:", "MountPoint": "/mnt/gdrive", "MountedOn": "2024-05-01T10:00:00Z"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mount/types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mountTypes": ["mount", "cmount"]})))
        .mount(&server)
        .await;

    let mounts = Mounts::new(engine, CancellationToken::new());
    mounts.mount(&MountRequest::new("gdrive:", "/mnt/gdrive")).await.unwrap();

    let points = mounts.list_mounts().await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].mount_point, "/mnt/gdrive");
    assert_eq!(mounts.mount_types().await.unwrap(), vec!["mount", "cmount"]);

    mounts.unmount("/mnt/gdrive").await.unwrap();
}
