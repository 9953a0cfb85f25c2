use crate::error::{DocQaError, Result};
use crate::gemini_service::GeminiService;
use crate::models::Document;
use crate::stream::AnswerStream;
use std::sync::Arc;

pub struct QueryService {
    gemini_service: Arc<GeminiService>,
}

impl QueryService {
    pub fn new(gemini_service: Arc<GeminiService>) -> Self {
        Self { gemini_service }
    }

    /// Streams an answer to `question` about `document`.
    pub fn stream_answer(&self, document: &Document, question: &str) -> Result<AnswerStream> {
        let prompt = self.prepare(document, question)?;
        Ok(self.gemini_service.stream_content(&prompt))
    }

    /// Same as [`stream_answer`](Self::stream_answer), but waits for the whole answer.
    pub async fn answer(&self, document: &Document, question: &str) -> Result<String> {
        let prompt = self.prepare(document, question)?;
        self.gemini_service.generate_content(&prompt).await
    }

    fn prepare(&self, document: &Document, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(DocQaError::EmptyQuestion);
        }

        log::info!(
            "Asking {} about document {} ({} bytes, question {} bytes)",
            self.gemini_service.model(),
            document.id,
            document.content.len(),
            question.len()
        );
        Ok(build_prompt(&document.content, question))
    }
}

pub fn build_prompt(document: &str, question: &str) -> String {
    format!(
        "Here's a document: {document}\n\n---\n\nBased on this document, please answer the following question: {question}"
    )
}
