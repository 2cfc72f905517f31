//! Local asset origin
//!
//! Serves audio under `/audio/{id}.mp3` and covers under
//! `/cover/image_{id}.jpeg`, with scripted failures, request counters and
//! per-class in-flight gauges.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use super::fixtures::{audio_payload, noisy_png};

#[derive(Default)]
struct AssetTable {
    bodies: HashMap<String, Vec<u8>>,
    /// Remaining forced failures per id, with the status to answer.
    failures: HashMap<String, (usize, StatusCode)>,
    requests: HashMap<String, usize>,
    referers: HashMap<String, Vec<Option<String>>>,
}

impl AssetTable {
    fn answer(&mut self, id: &str, headers: &HeaderMap, content_type: &'static str) -> Response {
        *self.requests.entry(id.to_string()).or_default() += 1;
        let referer = headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.referers.entry(id.to_string()).or_default().push(referer);

        if let Some((remaining, status)) = self.failures.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return (*status).into_response();
            }
        }

        match self.bodies.get(id) {
            Some(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type)],
                body.clone(),
            )
                .into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// Requests currently being answered, with the highest value seen.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard<'a>(&'a Gauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct OriginState {
    audio: Mutex<AssetTable>,
    covers: Mutex<AssetTable>,
    total_requests: AtomicUsize,
    audio_in_flight: Gauge,
    covers_in_flight: Gauge,
    /// Delay before every answer.
    latency: Mutex<Duration>,
}

impl OriginState {
    async fn pause(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

async fn audio(
    State(state): State<Arc<OriginState>>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.total_requests.fetch_add(1, Ordering::SeqCst);
    let _in_flight = state.audio_in_flight.enter();
    state.pause().await;
    let Some(id) = file.strip_suffix(".mp3") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    state
        .audio
        .lock()
        .unwrap()
        .answer(id, &headers, "audio/mpeg")
}

async fn cover(
    State(state): State<Arc<OriginState>>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.total_requests.fetch_add(1, Ordering::SeqCst);
    let _in_flight = state.covers_in_flight.enter();
    state.pause().await;
    let Some(id) = file
        .strip_prefix("image_")
        .and_then(|f| f.strip_suffix(".jpeg"))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    state
        .covers
        .lock()
        .unwrap()
        .answer(id, &headers, "image/png")
}

/// Test origin bound to a random local port
///
/// When dropped, the server shuts down.
pub struct TestOrigin {
    /// Base URL (e.g., "http://127.0.0.1:12345")
    pub base_url: String,
    state: Arc<OriginState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestOrigin {
    pub async fn spawn() -> Self {
        let state = Arc::new(OriginState::default());
        let app = Router::new()
            .route("/audio/{file}", get(audio))
            .route("/cover/{file}", get(cover))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Origin failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn audio_template(&self) -> String {
        format!("{}/audio/{{id}}.mp3", self.base_url)
    }

    pub fn cover_template(&self) -> String {
        format!("{}/cover/image_{{id}}.jpeg", self.base_url)
    }

    pub fn serve_audio(&self, id: &str, body: Vec<u8>) {
        self.state.audio.lock().unwrap().bodies.insert(id.to_string(), body);
    }

    pub fn serve_cover(&self, id: &str, body: Vec<u8>) {
        self.state.covers.lock().unwrap().bodies.insert(id.to_string(), body);
    }

    /// Serve generated audio and cover for `id`. Returns the audio body.
    pub fn serve_track(&self, id: &str) -> Vec<u8> {
        let seed = id.bytes().map(u64::from).sum::<u64>();
        let body = audio_payload(seed);
        self.serve_audio(id, body.clone());
        self.serve_cover(id, noisy_png(seed));
        body
    }

    /// Answer the next `times` audio requests for `id` with `status`.
    pub fn fail_audio(&self, id: &str, times: usize, status: StatusCode) {
        self.state
            .audio
            .lock()
            .unwrap()
            .failures
            .insert(id.to_string(), (times, status));
    }

    /// Answer the next `times` cover requests for `id` with `status`.
    pub fn fail_cover(&self, id: &str, times: usize, status: StatusCode) {
        self.state
            .covers
            .lock()
            .unwrap()
            .failures
            .insert(id.to_string(), (times, status));
    }

    pub fn audio_requests(&self, id: &str) -> usize {
        let table = self.state.audio.lock().unwrap();
        table.requests.get(id).copied().unwrap_or(0)
    }

    pub fn cover_requests(&self, id: &str) -> usize {
        let table = self.state.covers.lock().unwrap();
        table.requests.get(id).copied().unwrap_or(0)
    }

    /// `Referer` header of every cover request for `id`, in arrival order.
    pub fn cover_referers(&self, id: &str) -> Vec<Option<String>> {
        let table = self.state.covers.lock().unwrap();
        table.referers.get(id).cloned().unwrap_or_default()
    }

    pub fn total_requests(&self) -> usize {
        self.state.total_requests.load(Ordering::SeqCst)
    }

    /// Hold every answer for `latency`, so concurrent requests overlap.
    pub fn set_latency(&self, latency: Duration) {
        *self.state.latency.lock().unwrap() = latency;
    }

    /// Most audio requests ever answered at the same time.
    pub fn peak_audio_in_flight(&self) -> usize {
        self.state.audio_in_flight.peak()
    }

    /// Most cover requests ever answered at the same time.
    pub fn peak_cover_in_flight(&self) -> usize {
        self.state.covers_in_flight.peak()
    }
}
