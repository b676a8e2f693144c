//! WebDAV 服务端到端测试
//!
//! 在随机端口上启动真实服务，通过 HTTP 客户端验证认证、读写与生命周期

use nas_dav::{Config, DavServer, ServerState};
use reqwest::{Client, Method, StatusCode};
use std::net::SocketAddr;
use tempfile::TempDir;

const USER: &str = "tester";
const PASS: &str = "secret";

/// 启动绑定在 127.0.0.1 随机端口上的服务
async fn start_server() -> (DavServer, SocketAddr, TempDir) {
    start_server_with_timeout(5_000).await
}

async fn start_server_with_timeout(timeout_ms: u64) -> (DavServer, SocketAddr, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.storage.root_path = temp_dir.path().to_path_buf();
    config.auth.username = USER.to_string();
    config.auth.password = PASS.to_string();
    config.auth.realm = "E2E".to_string();

    let server = DavServer::new(&config);
    server.storage().init().await.unwrap();
    let addr = server.start(0, timeout_ms).await.unwrap();
    (server, addr, temp_dir)
}

fn dav(name: &str) -> Method {
    Method::from_bytes(name.as_bytes()).unwrap()
}

#[tokio::test]
async fn test_options_and_auth_over_http() {
    let (server, addr, _temp_dir) = start_server().await;
    let client = Client::new();
    let base = format!("http://{}", addr);

    // OPTIONS 无需认证
    let resp = client
        .request(Method::OPTIONS, format!("{}/", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("dav").unwrap(), "1,2");
    assert!(
        resp.headers()
            .get("allow")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("PROPFIND")
    );

    // 未认证
    let resp = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers().get("www-authenticate").unwrap(),
        "Basic realm=\"E2E\""
    );

    // 密码错误
    let resp = client
        .get(format!("{}/", base))
        .basic_auth(USER, Some("nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn test_file_workflow_over_http() {
    let (server, addr, temp_dir) = start_server().await;
    let client = Client::new();
    let base = format!("http://{}", addr);

    // 创建集合并上传
    let resp = client
        .request(dav("MKCOL"), format!("{}/docs", base))
        .basic_auth(USER, Some(PASS))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let payload = vec![7u8; 256 * 1024];
    let resp = client
        .put(format!("{}/docs/blob.bin", base))
        .basic_auth(USER, Some(PASS))
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .get(format!("{}/docs/blob.bin", base))
        .basic_auth(USER, Some(PASS))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), payload.as_slice());

    // 列出集合
    let resp = client
        .request(dav("PROPFIND"), format!("{}/docs", base))
        .basic_auth(USER, Some(PASS))
        .header("Depth", "1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    let xml = resp.text().await.unwrap();
    assert_eq!(xml.matches("<D:response>").count(), 2);
    assert!(xml.contains("<D:href>/docs/blob.bin</D:href>"));

    // 以绝对 URL 作为目标移动
    let resp = client
        .request(dav("MOVE"), format!("{}/docs/blob.bin", base))
        .basic_auth(USER, Some(PASS))
        .header("Destination", format!("{}/moved.bin", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(temp_dir.path().join("moved.bin").exists());
    assert!(!temp_dir.path().join("docs/blob.bin").exists());

    let resp = client
        .delete(format!("{}/docs", base))
        .basic_auth(USER, Some(PASS))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(!temp_dir.path().join("docs").exists());

    server.stop().await;
}

#[tokio::test]
async fn test_stop_closes_listener() {
    let (server, addr, _temp_dir) = start_server().await;
    assert_eq!(server.state(), ServerState::Running);

    server.stop().await;
    assert_eq!(server.state(), ServerState::Stopped);

    let result = Client::new()
        .request(Method::OPTIONS, format!("http://{}/", addr))
        .send()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_zero_timeout_means_unbounded() {
    let (server, addr, temp_dir) = start_server_with_timeout(0).await;
    let client = Client::new();
    let base = format!("http://{}", addr);

    let resp = client
        .put(format!("{}/slow.txt", base))
        .basic_auth(USER, Some(PASS))
        .body("no deadline")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .get(format!("{}/slow.txt", base))
        .basic_auth(USER, Some(PASS))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "no deadline");
    assert_eq!(
        std::fs::read(temp_dir.path().join("slow.txt")).unwrap(),
        b"no deadline"
    );

    server.stop().await;
}
