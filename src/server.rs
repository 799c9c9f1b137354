//! HTTP presentation layer.
//!
//! Serves a single-page UI plus a small JSON API over the conversation
//! controller. Sessions are keyed by the `X-Session-Id` header; requests
//! without one share the `"default"` session, which matches the original
//! single-session tool.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Study Helper page (upload, summary, questions, transcript) |
//! | `POST` | `/upload` | Multipart PDF upload → summary |
//! | `POST` | `/ask` | `{"question": ...}` → grounded answer |
//! | `GET`  | `/transcript` | In-session transcript entries |
//! | `GET`  | `/history/file` | Raw `chat_history.txt`, read fresh from disk |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses use `{ "error": { "code": ..., "message": ... } }` with
//! codes `bad_request` (400), `extraction_failed` (400), and `internal`
//! (500). A non-200 answer from the model endpoint is NOT an error here: it
//! comes back as a normal reply body with `ok: false` and the legacy
//! `Error: <status> - ...` text, which the page renders like an answer.

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::extract::{is_pdf_filename, ExtractError};
use crate::model::ModelClient;
use crate::session::{SessionContext, TranscriptEntry};
use crate::storage::{Storage, CHAT_HISTORY_FILE};

/// Session id used when the client sends no `X-Session-Id` header.
const DEFAULT_SESSION: &str = "default";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    storage: Storage,
    model: Arc<ModelClient>,
    /// One conversation context per session id. The mutex serializes all
    /// controller work — one blocking sequence per user action, as in the
    /// original tool.
    sessions: Arc<Mutex<HashMap<String, SessionContext>>>,
}

/// Starts the Study Helper HTTP server on the configured bind address.
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let storage = Storage::new(&config.storage.dir)?;
    let model = Arc::new(ModelClient::new(&config.model)?);

    let state = AppState {
        storage,
        model,
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    println!("Study Helper listening on http://{}", config.server.bind);
    println!("Model endpoint: {} ({})", config.model.url, config.model.name);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/upload", post(handle_upload))
        .route("/ask", post(handle_ask))
        .route("/transcript", get(handle_transcript))
        .route("/history/file", get(handle_history_file))
        .route("/health", get(handle_health))
        .with_state(state)
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Extraction failures are the one controller error with a dedicated code;
/// everything else (file I/O, transport failure to the model endpoint)
/// stays a 500.
fn classify_upload_error(err: anyhow::Error) -> AppError {
    if err.downcast_ref::<ExtractError>().is_some() {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "extraction_failed".to_string(),
            message: err.to_string(),
        }
    } else {
        internal(err.to_string())
    }
}

// ============ GET / ============

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ============ POST /upload ============

/// JSON response body for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    summary: String,
    /// False when a stored summary was re-displayed without recomputation.
    freshly_computed: bool,
    /// False when `summary` is the legacy model-service error string.
    ok: bool,
    /// HTTP status from the model endpoint when `ok` is false.
    service_status: Option<u16>,
    /// Malformed model-response lines dropped during assembly.
    skipped_lines: usize,
}

/// Handler for `POST /upload`. Expects a multipart form with a `file`
/// field holding the PDF. Repeated uploads in one session re-display the
/// stored summary.
async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut pdf_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if let Some(filename) = field.file_name() {
            if !is_pdf_filename(filename) {
                return Err(bad_request(format!(
                    "only PDF uploads are accepted, got '{}'",
                    filename
                )));
            }
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
        pdf_bytes = Some(bytes.to_vec());
    }

    let pdf_bytes = pdf_bytes.ok_or_else(|| bad_request("multipart field 'file' is required"))?;

    let id = session_id(&headers);
    let mut sessions = state.sessions.lock().await;
    let session = sessions.entry(id).or_insert_with(SessionContext::new);

    let result = session
        .handle_upload(&pdf_bytes, &state.storage, state.model.as_ref())
        .await
        .map_err(classify_upload_error)?;

    if result.skipped_lines > 0 {
        eprintln!(
            "warning: dropped {} malformed model response line(s)",
            result.skipped_lines
        );
    }

    Ok(Json(UploadResponse {
        summary: result.summary,
        freshly_computed: result.freshly_computed,
        ok: result.ok,
        service_status: result.service_status,
        skipped_lines: result.skipped_lines,
    }))
}

// ============ POST /ask ============

/// JSON request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

/// JSON response body for `POST /ask`.
#[derive(Serialize)]
struct AskResponse {
    answer: String,
    /// False when `answer` is the legacy model-service error string.
    ok: bool,
    /// HTTP status from the model endpoint when `ok` is false.
    service_status: Option<u16>,
    skipped_lines: usize,
}

/// Handler for `POST /ask`. The question is answered against the session's
/// document content — even when no document has been uploaded yet (the
/// content is then empty, and the model answers unanchored).
async fn handle_ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let id = session_id(&headers);
    let mut sessions = state.sessions.lock().await;
    let session = sessions.entry(id).or_insert_with(SessionContext::new);

    let result = session
        .handle_question(&req.question, &state.storage, state.model.as_ref())
        .await
        .map_err(|e| internal(e.to_string()))?;

    if result.skipped_lines > 0 {
        eprintln!(
            "warning: dropped {} malformed model response line(s)",
            result.skipped_lines
        );
    }

    Ok(Json(AskResponse {
        answer: result.answer,
        ok: result.ok,
        service_status: result.service_status,
        skipped_lines: result.skipped_lines,
    }))
}

// ============ GET /transcript ============

/// JSON response body for `GET /transcript`.
#[derive(Serialize)]
struct TranscriptResponse {
    entries: Vec<TranscriptEntry>,
}

/// Handler for `GET /transcript`. Returns the in-session transcript in
/// arrival order.
async fn handle_transcript(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<TranscriptResponse> {
    let id = session_id(&headers);
    let sessions = state.sessions.lock().await;
    let entries = sessions
        .get(&id)
        .map(|s| s.transcript.clone())
        .unwrap_or_default();
    Json(TranscriptResponse { entries })
}

// ============ GET /history/file ============

/// JSON response body for `GET /history/file`.
#[derive(Serialize)]
struct HistoryFileResponse {
    exists: bool,
    /// Raw file contents; may diverge from the in-session transcript
    /// (e.g. entries from a previous process).
    contents: String,
}

/// Handler for `GET /history/file`. Reads `chat_history.txt` fresh from
/// disk on every call, independent of session state.
async fn handle_history_file(
    State(state): State<AppState>,
) -> Result<Json<HistoryFileResponse>, AppError> {
    let contents = state
        .storage
        .read_text_opt(CHAT_HISTORY_FILE)
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(HistoryFileResponse {
        exists: contents.is_some(),
        contents: contents.unwrap_or_default(),
    }))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Page ============

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Study Helper</title>
<style>
  body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
  textarea { width: 100%; box-sizing: border-box; }
  .panel { margin-top: 1.5rem; }
  .error { color: #b00; }
</style>
</head>
<body>
<h1>Study Helper Chatbot</h1>

<div class="panel">
  <input type="file" id="file" accept=".pdf">
  <button id="upload">Upload PDF</button>
  <span id="upload-status"></span>
</div>

<div class="panel" id="summary-panel" hidden>
  <h2>Document Summary and Key Points</h2>
  <textarea id="summary" rows="12" readonly></textarea>
</div>

<div class="panel">
  <h2>Chat with the Study Helper</h2>
  <input type="text" id="question" size="60" placeholder="Ask your study-related questions here">
  <button id="ask">Ask</button>
</div>

<div class="panel" id="answer-panel" hidden>
  <h3>Chatbot's Response</h3>
  <textarea id="answer" rows="8" readonly></textarea>
</div>

<div class="panel" id="transcript-panel" hidden>
  <h3>Chat History</h3>
  <textarea id="transcript" rows="12" readonly></textarea>
</div>

<div class="panel">
  <button id="view-history">View Chat History File</button>
  <textarea id="history-file" rows="12" readonly hidden></textarea>
</div>

<script>
async function api(path, opts) {
  const res = await fetch(path, opts);
  const body = await res.json();
  if (!res.ok) throw new Error(body.error ? body.error.message : res.statusText);
  return body;
}

document.getElementById('upload').onclick = async () => {
  const status = document.getElementById('upload-status');
  const input = document.getElementById('file');
  if (!input.files.length) { status.textContent = 'Choose a PDF first.'; return; }
  status.textContent = 'Extracting and summarizing...';
  const form = new FormData();
  form.append('file', input.files[0]);
  try {
    const body = await api('/upload', { method: 'POST', body: form });
    document.getElementById('summary').value = body.summary;
    document.getElementById('summary-panel').hidden = false;
    status.textContent = body.freshly_computed ? 'Summary saved.' : 'Showing stored summary.';
  } catch (e) {
    status.textContent = e.message;
    status.className = 'error';
  }
};

document.getElementById('ask').onclick = async () => {
  const question = document.getElementById('question').value;
  if (!question.trim()) return;
  try {
    const body = await api('/ask', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ question }),
    });
    document.getElementById('answer').value = body.answer;
    document.getElementById('answer-panel').hidden = false;
    const t = await api('/transcript');
    document.getElementById('transcript').value =
      t.entries.map(e => 'User: ' + e.question + '\nChatbot: ' + e.answer + '\n').join('\n');
    document.getElementById('transcript-panel').hidden = false;
  } catch (e) {
    document.getElementById('answer').value = e.message;
    document.getElementById('answer-panel').hidden = false;
  }
};

document.getElementById('view-history').onclick = async () => {
  const area = document.getElementById('history-file');
  const body = await api('/history/file');
  area.value = body.exists ? body.contents : 'Chat history file not found.';
  area.hidden = false;
};
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_defaults_when_header_missing() {
        let headers = HeaderMap::new();
        assert_eq!(session_id(&headers), "default");
    }

    #[test]
    fn session_id_reads_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", "abc".parse().unwrap());
        assert_eq!(session_id(&headers), "abc");
    }

    #[test]
    fn empty_session_header_falls_back_to_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", "".parse().unwrap());
        assert_eq!(session_id(&headers), "default");
    }

    #[test]
    fn extraction_errors_map_to_dedicated_code() {
        let err = anyhow::Error::new(ExtractError::Pdf("bad xref".to_string()));
        let mapped = classify_upload_error(err);
        assert_eq!(mapped.status, StatusCode::BAD_REQUEST);
        assert_eq!(mapped.code, "extraction_failed");

        let other = classify_upload_error(anyhow::anyhow!("disk full"));
        assert_eq!(other.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(other.code, "internal");
    }
}
