//! Boots the full device wiring against a loopback listener and drives
//! `/api/status` over a raw socket, exercising the same path production
//! traffic takes without spawning a subprocess.

use pin::{build_app, Args};
use std::io::{Read, Write};
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn_boot_test_server() -> (std::net::SocketAddr, TempDir) {
    let data_dir = TempDir::new().expect("creating temp data dir");
    let args = Args {
        config: None,
        data_dir: data_dir.path().to_path_buf(),
        bind: "127.0.0.1:0".to_string(),
    };

    let (app, _shutdown) = build_app(&args).await.expect("building app");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("binding loopback listener");
    let addr = listener.local_addr().expect("reading local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serving test app");
    });
    (addr, data_dir)
}

fn http_get(addr: std::net::SocketAddr, path: &str) -> (u16, String) {
    let mut stream = std::net::TcpStream::connect(addr).expect("connecting to test server");
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).expect("writing request");
    let mut response = String::new();
    stream.read_to_string(&mut response).expect("reading response");
    let status_line = response.lines().next().unwrap_or_default();
    let status: u16 = status_line.split_whitespace().nth(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let body = response.split("\r\n\r\n").nth(1).unwrap_or_default().to_string();
    (status, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn status_endpoint_reports_firmware_version_after_boot() {
    let (addr, _data_dir) = spawn_boot_test_server().await;

    let (status, body) = http_get(addr, "/api/status");

    assert_eq!(status, 200);
    assert!(body.contains(env!("CARGO_PKG_VERSION")));
    assert!(body.contains("device_name"));
}

#[tokio::test(flavor = "multi_thread")]
async fn clock_plugin_is_registered_and_enabled_at_boot() {
    let (addr, _data_dir) = spawn_boot_test_server().await;

    let (status, body) = http_get(addr, "/api/plugins");

    assert_eq!(status, 200);
    assert!(body.contains("\"clock\""));
    assert!(body.contains("\"enabled\":true"));
}

#[tokio::test(flavor = "multi_thread")]
async fn settings_round_trip_over_http_after_boot() {
    let (addr, _data_dir) = spawn_boot_test_server().await;

    let get_before = http_get(addr, "/api/settings");
    assert_eq!(get_before.0, 200);
    assert_eq!(get_before.1, "{}");
}
