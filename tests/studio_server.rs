//! Runs the studio server on a real socket and talks to it like the page does.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use musicgen_studio_lib::backend::BackendReply;
use musicgen_studio_lib::local_server::start_server;
use musicgen_studio_lib::{
    CatalogLoadError, GenerationBackend, GenerationController, PresetCatalog, PromptBody,
    UiSnapshot,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

struct ToneBackend;

#[async_trait]
impl GenerationBackend for ToneBackend {
    async fn list_presets(&self) -> Result<PresetCatalog, CatalogLoadError> {
        Err(CatalogLoadError::Status(503))
    }

    async fn generate_music(&self, body: &PromptBody) -> Result<BackendReply, String> {
        Ok(BackendReply {
            status: 200,
            content_type: Some("audio/wav".into()),
            body: Bytes::from(format!("RIFF:{}", body.prompt)),
        })
    }

    async fn generate_from_preset(
        &self,
        _preset: &str,
        _duration_seconds: f64,
    ) -> Result<BackendReply, String> {
        Err("connection reset by peer".into())
    }
}

fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

async fn wait_until_up(client: &reqwest::Client, addr: SocketAddr) {
    for _ in 0..50 {
        if let Ok(res) = client.get(format!("http://{}/health", addr)).send().await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("studio server did not come up on {}", addr);
}

#[tokio::test]
async fn page_flow_over_http_and_websocket() {
    let controller = Arc::new(GenerationController::new(ToneBackend));
    let addr = free_addr();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(start_server(controller.clone(), addr, async move {
        let _ = stop_rx.await;
    }));

    let client = reqwest::Client::new();
    wait_until_up(&client, addr).await;

    controller.load_presets().await;
    let presets: serde_json::Value = client
        .get(format!("http://{}/api/presets", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(presets, serde_json::json!({ "presets": {} }));

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();
    let first = ws.next().await.unwrap().unwrap();
    let first: UiSnapshot = serde_json::from_str(first.to_text().unwrap()).unwrap();
    assert!(!first.loading);

    client
        .post(format!("http://{}/api/prompt", addr))
        .json(&serde_json::json!({ "text": "sine" }))
        .send()
        .await
        .unwrap();
    let state: UiSnapshot = client
        .post(format!("http://{}/api/generate", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let url = state.audio_url.unwrap();

    let audio = client
        .get(format!("http://{}{}", addr, url))
        .send()
        .await
        .unwrap();
    assert_eq!(audio.headers()["content-type"], "audio/wav");
    assert_eq!(audio.bytes().await.unwrap(), Bytes::from_static(b"RIFF:sine"));

    // prompt update, loading, finished
    let mut seen = Vec::new();
    while seen.len() < 3 {
        let msg = ws.next().await.unwrap().unwrap();
        seen.push(serde_json::from_str::<UiSnapshot>(msg.to_text().unwrap()).unwrap());
    }
    assert_eq!(seen[0].prompt, "sine");
    assert!(seen[1].loading);
    assert!(!seen[2].loading);
    assert_eq!(seen[2].audio_url.as_deref(), Some(url.as_str()));

    drop(ws);
    drop(client);
    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn transport_failure_reaches_the_page() {
    let controller = Arc::new(GenerationController::new(ToneBackend));
    let addr = free_addr();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(start_server(controller.clone(), addr, async move {
        let _ = stop_rx.await;
    }));

    let client = reqwest::Client::new();
    wait_until_up(&client, addr).await;

    client
        .post(format!("http://{}/api/preset", addr))
        .json(&serde_json::json!({ "key": "focus" }))
        .send()
        .await
        .unwrap();
    let state: UiSnapshot = client
        .post(format!("http://{}/api/generate", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(state.error.as_deref(), Some("connection reset by peer"));
    assert_eq!(state.audio_url, None);
    assert!(!state.loading);

    drop(client);
    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
