//! Turning a Gemini `alt=sse` response body into text fragments.

use crate::error::{DocQaError, Result};
use crate::models::GeminiResponse;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Lazy, finite sequence of answer fragments. At most one `Err` is yielded,
/// and it is always the last item.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Finish reasons that end a candidate without usable text.
const STOPPED_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Interprets one streamed chunk. `Ok(None)` means the chunk carried no text.
pub fn fragment_from_payload(payload: &str) -> Result<Option<String>> {
    let chunk: GeminiResponse = serde_json::from_str(payload)
        .map_err(|e| DocQaError::Generation(format!("malformed response chunk: {e}")))?;

    if let Some(error) = &chunk.error {
        return Err(DocQaError::Generation(error.to_string()));
    }

    if let Some(reason) = chunk
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(DocQaError::Generation(format!(
            "the prompt was blocked: {reason}"
        )));
    }

    let text = chunk.text();
    if !text.is_empty() {
        return Ok(Some(text));
    }

    match chunk.finish_reason() {
        Some(reason) if STOPPED_REASONS.contains(&reason) => Err(DocQaError::Generation(
            format!("the response was stopped: {reason}"),
        )),
        _ => Ok(None),
    }
}

/// Adapts a server-sent events response body into answer fragments.
pub fn answer_fragments<S, B, E>(body: S) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut events = Box::pin(body.eventsource());

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(EventStreamError::Transport(e)) => {
                    yield Err(DocQaError::Generation(format!("stream read error: {e}")));
                    return;
                }
                Err(e) => {
                    yield Err(DocQaError::Generation(format!("malformed event stream: {e}")));
                    return;
                }
            };

            if event.data.is_empty() {
                continue;
            }

            match fragment_from_payload(&event.data) {
                Ok(Some(text)) => yield Ok(text),
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    }
}
