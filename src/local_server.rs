use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::backend::{GenerationBackend, PresetCatalog};
use crate::controller::GenerationController;
use crate::state::Draft;
use crate::websocket::forward_snapshots;

const INDEX_HTML: &str = include_str!("../ui/index.html");

#[derive(Debug, Deserialize)]
pub struct PromptInput {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PresetInput {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct DurationInput {
    pub seconds: f64,
}

#[derive(Debug, Deserialize)]
pub struct InstrumentalInput {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PresetsReply {
    pub presets: PresetCatalog,
}

fn with_controller<B: GenerationBackend + 'static>(
    controller: Arc<GenerationController<B>>,
) -> impl Filter<Extract = (Arc<GenerationController<B>>,), Error = Infallible> + Clone {
    warp::any().map(move || controller.clone())
}

/// All routes of the studio page.
pub fn routes<B: GenerationBackend + 'static>(
    controller: Arc<GenerationController<B>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(INDEX_HTML));

    let health = warp::path("health")
        .and(warp::path::end())
        .map(|| "Server is running");

    let state = warp::path!("api" / "state")
        .and(warp::get())
        .and(with_controller(controller.clone()))
        .map(|controller: Arc<GenerationController<B>>| {
            warp::reply::json(&controller.snapshot())
        });

    let presets = warp::path!("api" / "presets")
        .and(warp::get())
        .and(with_controller(controller.clone()))
        .map(|controller: Arc<GenerationController<B>>| {
            warp::reply::json(&PresetsReply {
                presets: controller.presets(),
            })
        });

    let prompt = warp::path!("api" / "prompt")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_controller(controller.clone()))
        .map(
            |input: PromptInput, controller: Arc<GenerationController<B>>| {
                controller.set_prompt_text(input.text);
                warp::reply::json(&controller.snapshot())
            },
        );

    let preset = warp::path!("api" / "preset")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_controller(controller.clone()))
        .map(
            |input: PresetInput, controller: Arc<GenerationController<B>>| {
                controller.select_preset(input.key);
                warp::reply::json(&controller.snapshot())
            },
        );

    let duration = warp::path!("api" / "duration")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_controller(controller.clone()))
        .map(
            |input: DurationInput, controller: Arc<GenerationController<B>>| {
                controller.set_duration(input.seconds);
                warp::reply::json(&controller.snapshot())
            },
        );

    let instrumental = warp::path!("api" / "instrumental")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_controller(controller.clone()))
        .map(
            |input: InstrumentalInput, controller: Arc<GenerationController<B>>| {
                controller.set_force_instrumental(input.enabled);
                warp::reply::json(&controller.snapshot())
            },
        );

    let generate = warp::path!("api" / "generate")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_controller(controller.clone()))
        .and_then(|body: Bytes, controller: Arc<GenerationController<B>>| {
            generate_handler(body, controller)
        });

    let audio = warp::path!("audio" / u64)
        .and(warp::get())
        .and(with_controller(controller.clone()))
        .map(|id: u64, controller: Arc<GenerationController<B>>| {
            match controller.audio_store().get(id) {
                Some(stored) => warp::reply::with_header(
                    stored.data.to_vec(),
                    "content-type",
                    stored.content_type,
                )
                .into_response(),
                None => warp::reply::with_status("Audio not found", StatusCode::NOT_FOUND)
                    .into_response(),
            }
        });

    let ws = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_controller(controller))
        .map(|ws: warp::ws::Ws, controller: Arc<GenerationController<B>>| {
            let rx = controller.subscribe();
            let initial = serde_json::to_string(&controller.snapshot()).unwrap_or_default();
            ws.on_upgrade(move |socket| forward_snapshots(socket, rx, initial))
        });

    index
        .or(health)
        .or(state)
        .or(presets)
        .or(prompt)
        .or(preset)
        .or(duration)
        .or(instrumental)
        .or(generate)
        .or(audio)
        .or(ws)
}

/// An optional JSON [`Draft`] body is applied before dispatching, so the
/// request carries exactly what the page showed when Generate was clicked.
///
/// The generation runs on its own task; a dropped HTTP connection does not
/// abandon the backend call.
async fn generate_handler<B: GenerationBackend + 'static>(
    body: Bytes,
    controller: Arc<GenerationController<B>>,
) -> Result<warp::reply::Response, Rejection> {
    if !body.is_empty() {
        match serde_json::from_slice::<Draft>(&body) {
            Ok(draft) => controller.set_draft(draft),
            Err(e) => {
                return Ok(warp::reply::with_status(
                    format!("Invalid draft: {}", e),
                    StatusCode::BAD_REQUEST,
                )
                .into_response())
            }
        }
    }

    let task_controller = controller.clone();
    let task = tokio::spawn(async move { task_controller.generate().await });

    match task.await {
        // The outcome is already part of the snapshot.
        Ok(_) => {}
        Err(e) => error!("Generation task failed: {}", e),
    }

    Ok(warp::reply::json(&controller.snapshot()).into_response())
}

/// Serves the studio until `shutdown` resolves.
pub async fn start_server<B, S>(
    controller: Arc<GenerationController<B>>,
    addr: SocketAddr,
    shutdown: S,
) -> anyhow::Result<()>
where
    B: GenerationBackend + 'static,
    S: Future<Output = ()> + Send + 'static,
{
    let (bound, server) =
        warp::serve(routes(controller)).try_bind_with_graceful_shutdown(addr, shutdown)?;

    info!("Starting server at http://{}", bound);
    server.await;
    info!("Server stopped");
    Ok(())
}
