use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use docqa::error::{configuration_failure, generation_failure, MISSING_KEY_NOTICE};
use docqa::{
    relay, ChannelSink, DocQaError, DocumentProcessor, ErrorResponse, GeminiService, QueryService,
    RelayOutcome,
};
use futures::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ask_event::AskEvent;
use crate::ask_request::AskRequest;
use crate::page;
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/ask", post(ask))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(page::render(state.settings.api_key.is_some()))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.settings.model,
    }))
}

fn bad_request(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            error: message.into(),
        }),
    )
        .into_response()
}

fn sse_event(event: &AskEvent) -> Event {
    Event::default().json_data(event).unwrap_or_default()
}

fn single_event(event: AskEvent) -> Response {
    let stream: SseStream = Box::pin(async_stream::stream! {
        yield Ok::<_, Infallible>(sse_event(&event));
    });
    Sse::new(stream).into_response()
}

/// POST /api/ask: answer a question about an uploaded document (multipart, SSE reply).
async fn ask(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let request_id = Uuid::new_v4();

    let request = match AskRequest::from_multipart(multipart).await {
        Ok(request) => request,
        Err(e) => {
            log::warn!("[{}] unreadable ask form: {}", request_id, e);
            // Covers uploads over the body limit (413) as well as malformed forms.
            return error_response(e.status(), e.body_text());
        }
    };

    let Some(api_key) = state.resolve_api_key(request.api_key.as_deref()) else {
        log::info!("[{}] no API key, nothing sent", request_id);
        return single_event(AskEvent::Info {
            message: MISSING_KEY_NOTICE.to_string(),
        });
    };

    let Some(upload) = request.document else {
        return bad_request("Upload a document first.");
    };
    let document = match DocumentProcessor::new().process_upload(&upload.filename, upload.bytes) {
        Ok(document) => document,
        Err(e) => {
            log::warn!("[{}] rejected upload {:?}: {}", request_id, upload.filename, e);
            return bad_request(e.to_string());
        }
    };

    let question = request.question.unwrap_or_default();
    if question.trim().is_empty() {
        return bad_request(DocQaError::EmptyQuestion.to_string());
    }

    log::info!(
        "[{}] question about {} ({} bytes)",
        request_id,
        document.filename,
        document.content.len()
    );

    let stream: SseStream = Box::pin(async_stream::stream! {
        let gemini_service = match GeminiService::configure(state.client.clone(), &api_key, &state.settings).await {
            Ok(service) => service,
            Err(e) => {
                log::error!("[{}] configuration failed: {}", request_id, e);
                yield Ok::<_, Infallible>(sse_event(&AskEvent::Error { message: configuration_failure(&e) }));
                return;
            }
        };

        let query_service = QueryService::new(Arc::new(gemini_service));
        let answer = match query_service.stream_answer(&document, &question) {
            Ok(answer) => answer,
            Err(e) => {
                yield Ok(sse_event(&AskEvent::Error { message: generation_failure(&e) }));
                return;
            }
        };

        // Dropping this stream closes the receiver, which ends the relay task.
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let relay_task = tokio::spawn(async move {
            relay(answer, &mut ChannelSink::new(sender)).await
        });

        while let Some(content) = receiver.recv().await {
            yield Ok(sse_event(&AskEvent::Token { content }));
        }

        let event = match relay_task.await {
            Ok(RelayOutcome { error: Some(e), .. }) => AskEvent::Error { message: generation_failure(&e) },
            Ok(outcome) => {
                log::info!("[{}] answered in {} fragments", request_id, outcome.fragments);
                AskEvent::Done { fragments: outcome.fragments }
            }
            Err(e) => {
                log::error!("[{}] relay task failed: {}", request_id, e);
                AskEvent::Error { message: generation_failure(&DocQaError::Generation(e.to_string())) }
            }
        };
        yield Ok(sse_event(&event));
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
