mod gallery;
mod routes;

use anyhow::{anyhow, Context, Result};
use gallery::Gallery;
use rosterspin_core::{Clock, SystemClock, MAX_ICON_BYTES};
use rosterspin_data::{default_assets_dir, default_data_dir, load_roster};
use routes::{route, Reply, WebState};
use std::io::Read;
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Response, Server, StatusCode};

const DEFAULT_ADDR: &str = "0.0.0.0:7878";
const GALLERY_DIR: &str = "gallery";

fn main() -> Result<()> {
    init_logging();
    let addr = std::env::var("ROSTERSPIN_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let state = open_state()?;
    let server = Server::http(&addr).map_err(|err| anyhow!("start server on {addr}: {err}"))?;
    tracing::info!(%addr, "gallery server listening");
    let state = Arc::new(Mutex::new(state));
    for request in server.incoming_requests() {
        let state = state.clone();
        if let Err(err) = handle_request(request, state) {
            tracing::warn!(error = %err, "request error");
        }
    }
    Ok(())
}

fn init_logging() {
    let level = std::env::var("ROSTERSPIN_LOG")
        .ok()
        .and_then(|value| value.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

fn open_state() -> Result<WebState> {
    let assets_dir = default_assets_dir();
    let roster = load_roster(&assets_dir).context("load roster")?;
    let data_dir = default_data_dir()
        .context("no data directory: set ROSTERSPIN_DATA or HOME")?
        .join(GALLERY_DIR);
    let gallery = Gallery::open(&data_dir)
        .with_context(|| format!("open gallery at {}", data_dir.display()))?;
    tracing::info!(
        roster = roster.len(),
        records = gallery.records().len(),
        dir = %gallery.dir().display(),
        "gallery loaded"
    );
    Ok(WebState { gallery, roster })
}

fn handle_request(mut request: tiny_http::Request, state: Arc<Mutex<WebState>>) -> Result<()> {
    let url = request.url().to_string();
    let method = request.method().clone();
    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_ICON_BYTES as u64 + 1)
        .read_to_end(&mut body)
        .context("read request body")?;
    let reply = {
        let mut guard = state.lock().map_err(|_| anyhow!("gallery state poisoned"))?;
        route(&mut guard, &method, &url, &body, SystemClock::new().epoch_ms())
    };
    tracing::debug!(%method, %url, status = reply.status(), "handled");
    respond(request, reply)
}

fn respond(request: tiny_http::Request, reply: Reply) -> Result<()> {
    match reply {
        Reply::Json { status, body } => {
            let data = serde_json::to_vec_pretty(&body)?;
            let response = Response::from_data(data)
                .with_status_code(StatusCode(status))
                .with_header(content_type("application/json")?);
            request.respond(response)?;
        }
        Reply::Bytes { content_type: mime, data } => {
            let response = Response::from_data(data).with_header(content_type(mime)?);
            request.respond(response)?;
        }
        Reply::Empty(status) => request.respond(Response::empty(StatusCode(status)))?,
    }
    Ok(())
}

fn content_type(value: &str) -> Result<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes())
        .map_err(|()| anyhow!("invalid content type {value}"))
}
