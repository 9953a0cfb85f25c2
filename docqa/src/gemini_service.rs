use crate::config::Settings;
use crate::error::{DocQaError, Result};
use crate::models::*;
use crate::stream::{answer_fragments, AnswerStream};
use futures::StreamExt;
use reqwest::{Client, Response};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiService {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    generation_config: Option<GeminiGenerationConfig>,
}

impl GeminiService {
    /// Builds a client for `api_key` without touching the network.
    pub fn new(client: Client, api_key: &str, settings: &Settings) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(DocQaError::MissingApiKey);
        }

        let generation_config = if settings.temperature.is_some() || settings.max_output_tokens.is_some() {
            Some(GeminiGenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_output_tokens,
            })
        } else {
            None
        };

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            generation_config,
        })
    }

    /// Builds the client and checks that Gemini accepts the key.
    pub async fn configure(client: Client, api_key: &str, settings: &Settings) -> Result<Self> {
        let service = Self::new(client, api_key, settings)?;
        service.verify_key().await?;
        Ok(service)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Looks up the configured model, which fails fast on a rejected key.
    pub async fn verify_key(&self) -> Result<()> {
        let url = format!("{}/v1beta/models/{}", self.api_base, self.model);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| DocQaError::Configuration(format!("could not reach Gemini API: {}", e.without_url())))?;

        if !response.status().is_success() {
            let message = api_error_message(response).await;
            log::error!("Gemini rejected the configuration: {}", message);
            return Err(DocQaError::Configuration(message));
        }

        log::info!("Gemini client configured for model {}", self.model);
        Ok(())
    }

    /// Requests a streamed completion for `prompt`.
    ///
    /// Nothing is sent until the returned stream is first polled.
    pub fn stream_content(&self, prompt: &str) -> AnswerStream {
        let client = self.client.clone();
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base, self.model
        );
        let api_key = self.api_key.clone();
        let request = GeminiRequest::from_prompt(prompt, self.generation_config.clone());

        Box::pin(async_stream::stream! {
            log::debug!("Streaming from {} ({} prompt bytes)", url, request.contents[0].parts[0].text.len());

            let response = match client
                .post(&url)
                .header(API_KEY_HEADER, &api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    yield Err(DocQaError::Generation(format!("request failed: {}", e.without_url())));
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(DocQaError::Generation(api_error_message(response).await));
                return;
            }

            let mut fragments = Box::pin(answer_fragments(response.bytes_stream()));
            while let Some(fragment) = fragments.next().await {
                yield fragment;
            }
        })
    }

    /// Requests a complete answer in one response.
    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest::from_prompt(prompt, self.generation_config.clone());
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocQaError::Generation(format!("request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(DocQaError::Generation(api_error_message(response).await));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| DocQaError::Generation(format!("malformed response: {}", e.without_url())))?;

        if let Some(error) = &gemini_response.error {
            return Err(DocQaError::Generation(error.to_string()));
        }
        if let Some(reason) = gemini_response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(DocQaError::Generation(format!("the prompt was blocked: {reason}")));
        }

        Ok(gemini_response.text())
    }
}

/// Extracts the provider's message from a failed response.
async fn api_error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<GeminiErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.to_string(),
        _ if body.trim().is_empty() => format!("Gemini API error {status}"),
        _ => format!("Gemini API error {status}: {}", body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const VALID_KEY: &str = "test-key-123";

    /// Minimal stand-in for the Gemini REST API.
    #[derive(Clone, Default)]
    struct FakeGemini {
        key_checks: Arc<AtomicUsize>,
        generations: Arc<AtomicUsize>,
        events: Arc<Vec<String>>,
        last_body: Arc<Mutex<Option<serde_json::Value>>>,
    }

    async fn fake_handler(
        State(fake): State<FakeGemini>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> AxumResponse {
        let path = uri.path().to_string();
        let generating = path.ends_with(":streamGenerateContent") || path.ends_with(":generateContent");
        if generating {
            fake.generations.fetch_add(1, Ordering::SeqCst);
            *fake.last_body.lock().unwrap() = serde_json::from_str(&body).ok();
        } else if method == Method::GET {
            fake.key_checks.fetch_add(1, Ordering::SeqCst);
        }

        let key = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if key != VALID_KEY || uri.query().map_or(false, |q| q.contains("key=")) {
            return (
                StatusCode::BAD_REQUEST,
                r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#,
            )
                .into_response();
        }

        if path.ends_with(":streamGenerateContent") {
            let body: String = fake.events.iter().map(|e| format!("data: {e}\r\n\r\n")).collect();
            return ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response();
        }
        if path.ends_with(":generateContent") {
            let body = r#"{"candidates":[{"content":{"parts":[{"text":"Full "},{"text":"answer"}]}}]}"#;
            return ([(header::CONTENT_TYPE, "application/json")], body).into_response();
        }
        if method == Method::GET && path.starts_with("/v1beta/models/") {
            return ([(header::CONTENT_TYPE, "application/json")], r#"{"name":"models/gemini-test"}"#)
                .into_response();
        }
        StatusCode::NOT_FOUND.into_response()
    }

    async fn spawn_fake(events: &[&str]) -> (FakeGemini, Settings) {
        let fake = FakeGemini {
            events: Arc::new(events.iter().map(|e| e.to_string()).collect()),
            ..FakeGemini::default()
        };
        let app = Router::new().fallback(fake_handler).with_state(fake.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let settings = Settings {
            api_base: format!("http://{addr}"),
            model: "gemini-test".to_string(),
            ..Settings::default()
        };
        (fake, settings)
    }

    fn text_chunk(text: &str) -> String {
        serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string()
    }

    #[test]
    fn blank_key_is_missing_without_network() {
        let result = GeminiService::new(Client::new(), "   ", &Settings::default());
        assert!(matches!(result, Err(DocQaError::MissingApiKey)));
    }

    #[tokio::test]
    async fn blank_key_never_reaches_the_api() {
        let (fake, settings) = spawn_fake(&[]).await;
        let result = GeminiService::configure(Client::new(), "", &settings).await;

        assert!(matches!(result, Err(DocQaError::MissingApiKey)));
        assert_eq!(fake.key_checks.load(Ordering::SeqCst), 0);
        assert_eq!(fake.generations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_key_fails_configuration() {
        let (fake, settings) = spawn_fake(&[]).await;
        let err = GeminiService::configure(Client::new(), "wrong-key", &settings)
            .await
            .err()
            .unwrap();

        match err {
            DocQaError::Configuration(message) => assert_eq!(
                message,
                "API key not valid. Please pass a valid API key. (INVALID_ARGUMENT)"
            ),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fake.key_checks.load(Ordering::SeqCst), 1);
        assert_eq!(fake.generations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_api_fails_configuration() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = Settings {
            api_base: format!("http://{addr}"),
            ..Settings::default()
        };
        let err = GeminiService::configure(Client::new(), VALID_KEY, &settings)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DocQaError::Configuration(m) if m.starts_with("could not reach Gemini API")));
    }

    #[tokio::test]
    async fn streams_fragments_in_order() {
        let events = [text_chunk("Hello"), text_chunk(", "), text_chunk("world")];
        let events: Vec<&str> = events.iter().map(String::as_str).collect();
        let (fake, settings) = spawn_fake(&events).await;

        let service = GeminiService::configure(Client::new(), VALID_KEY, &settings)
            .await
            .unwrap();
        let fragments: Vec<String> = service
            .stream_content("prompt text")
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["Hello", ", ", "world"]);
        assert_eq!(fake.generations.load(Ordering::SeqCst), 1);

        let body = fake.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt text");
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn stream_is_lazy_until_polled() {
        let (fake, settings) = spawn_fake(&[]).await;
        let service = GeminiService::new(Client::new(), VALID_KEY, &settings).unwrap();

        let stream = service.stream_content("prompt");
        drop(stream);
        assert_eq!(fake.generations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_config_is_sent_when_set() {
        let chunk = text_chunk("ok");
        let (fake, mut settings) = spawn_fake(&[chunk.as_str()]).await;
        settings.temperature = Some(0.5);
        settings.max_output_tokens = Some(256);

        let service = GeminiService::new(Client::new(), VALID_KEY, &settings).unwrap();
        let _: Vec<_> = service.stream_content("p").collect().await;

        let body = fake.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_earlier_fragments() {
        let first = text_chunk("Partial answer");
        let failure = r#"{"error":{"code":500,"message":"Internal error","status":"INTERNAL"}}"#;
        let (_fake, settings) = spawn_fake(&[first.as_str(), failure]).await;

        let service = GeminiService::new(Client::new(), VALID_KEY, &settings).unwrap();
        let items: Vec<Result<String>> = service.stream_content("p").collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Partial answer");
        assert_eq!(
            items[1].as_ref().unwrap_err().to_string(),
            "Internal error (INTERNAL)"
        );
    }

    #[tokio::test]
    async fn http_failure_becomes_a_single_generation_error() {
        let (_fake, settings) = spawn_fake(&[]).await;
        // Skip configure so the bad key reaches the generation call.
        let service = GeminiService::new(Client::new(), "wrong-key", &settings).unwrap();
        let items: Vec<Result<String>> = service.stream_content("p").collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(DocQaError::Generation(m)) if m.contains("API key not valid")));
    }

    #[tokio::test]
    async fn non_streaming_generation_returns_whole_text() {
        let (_fake, settings) = spawn_fake(&[]).await;
        let service = GeminiService::new(Client::new(), VALID_KEY, &settings).unwrap();

        assert_eq!(service.generate_content("p").await.unwrap(), "Full answer");
    }
}
