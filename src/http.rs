use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, warn};

use crate::error::{LogQueryError, Result};
use crate::mcp::{process_request, RpcRequest};
use crate::model::{EpochQuery, LogsQuery, ReadableQuery};
use crate::service::QueryService;
use crate::tools::ToolFacade;

type Sessions = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Event>>>>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    pub tools: Arc<ToolFacade>,
    pub sessions: Sessions,
    next_session: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(service: Arc<QueryService>, tools: Arc<ToolFacade>) -> Self {
        Self {
            service,
            tools,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    fn open_session(&self) -> String {
        self.next_session.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// Event stream of one SSE session; dropping it (client gone) removes the
/// session from the map.
struct SessionStream {
    events: UnboundedReceiverStream<Event>,
    sessions: Sessions,
    session_id: String,
}

impl Stream for SessionStream {
    type Item = std::result::Result<Event, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().events)
            .poll_next(cx)
            .map(|event| event.map(Ok))
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(&self.session_id);
        }
        info!(session_id = %self.session_id, "sse session closed");
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ErrorResponse {
    fn bad_request(error: String) -> Self {
        Self { status: StatusCode::BAD_REQUEST, error }
    }

    /// Validation failures are the caller's fault; everything else is ours.
    fn from_error(context: &str, e: LogQueryError) -> Self {
        if e.is_validation() {
            return Self::bad_request(e.to_string());
        }
        error!(error = %e, "{context}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: format!("{context}: {e}"),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

async fn logs_handler(
    State(state): State<AppState>,
    q: std::result::Result<Query<LogsQuery>, QueryRejection>,
) -> Response {
    let q = match q {
        Ok(Query(q)) => q,
        Err(e) => return ErrorResponse::bad_request(format!("invalid query: {e}")).into_response(),
    };
    let result = state
        .service
        .get_logs(
            q.region.as_deref().unwrap_or_default(),
            q.start_date.as_deref().unwrap_or_default(),
            q.end_date.as_deref().unwrap_or_default(),
        )
        .await;
    match result {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => ErrorResponse::from_error("Failed to fetch logs", e).into_response(),
    }
}

async fn stats_handler(State(state): State<AppState>) -> Response {
    match state.service.get_stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => ErrorResponse::from_error("Failed to get stats", e).into_response(),
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(state.service.health())).into_response()
}

async fn epoch_handler(
    State(state): State<AppState>,
    q: std::result::Result<Query<EpochQuery>, QueryRejection>,
) -> Response {
    let q = match q {
        Ok(Query(q)) => q,
        Err(e) => return ErrorResponse::bad_request(format!("invalid query: {e}")).into_response(),
    };
    let result = state.service.to_epoch(
        q.year.as_deref().unwrap_or_default(),
        q.month.as_deref().unwrap_or_default(),
        q.day.as_deref().unwrap_or_default(),
        q.time.as_deref().unwrap_or_default(),
    );
    match result {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => ErrorResponse::from_error("Failed to convert date", e).into_response(),
    }
}

async fn readable_handler(
    State(state): State<AppState>,
    q: std::result::Result<Query<ReadableQuery>, QueryRejection>,
) -> Response {
    let q = match q {
        Ok(Query(q)) => q,
        Err(e) => return ErrorResponse::bad_request(format!("invalid query: {e}")).into_response(),
    };
    match state.service.to_readable(q.epoch_ms.as_deref().unwrap_or_default()) {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => ErrorResponse::from_error("Failed to convert epoch", e).into_response(),
    }
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = state.open_session();

    // Clients post JSON-RPC to this relative endpoint; replies come back on the stream.
    let endpoint_url = format!("/message?session_id={}", session_id);
    let _ = tx.send(Event::default().event("endpoint").data(endpoint_url));

    if let Ok(mut sessions) = state.sessions.write() {
        sessions.insert(session_id.clone(), tx);
    }
    info!(session_id = %session_id, "sse session opened");

    let stream = SessionStream {
        events: UnboundedReceiverStream::new(rx),
        sessions: state.sessions.clone(),
        session_id,
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn message_handler(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
    Json(req): Json<RpcRequest>,
) -> StatusCode {
    let sender = state
        .sessions
        .read()
        .ok()
        .and_then(|sessions| sessions.get(&q.session_id).cloned());

    let Some(sender) = sender else {
        return StatusCode::NOT_FOUND;
    };

    let tools = state.tools.clone();
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let Some(resp) = process_request(tools, req).await else {
            return;
        };
        if let Ok(json_str) = serde_json::to_string(&resp) {
            if sender.send(Event::default().event("message").data(json_str)).is_err() {
                warn!(session_id = %q.session_id, "sse session gone, dropping it");
                if let Ok(mut sessions) = sessions.write() {
                    sessions.remove(&q.session_id);
                }
            }
        }
    });
    StatusCode::ACCEPTED
}

pub fn build_router(service: Arc<QueryService>, tools: Arc<ToolFacade>) -> Router {
    router_with_state(AppState::new(service, tools))
}

fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/logs", get(logs_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/time/epoch", get(epoch_handler))
        .route("/time/readable", get(readable_handler))
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .with_state(state)
}

/// Bind the HTTP port up front so a taken port fails startup.
pub async fn bind_listener(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| LogQueryError::ConfigError(format!("bind {addr} failed: {e}")))
}

pub async fn serve_http(
    listener: TcpListener,
    service: Arc<QueryService>,
    tools: Arc<ToolFacade>,
) -> Result<()> {
    let router = build_router(service, tools);
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server listening on http://{}", addr);
    }
    axum::serve(listener, router).await.map_err(|e| e.into())
}
