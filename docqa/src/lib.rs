pub mod config;
pub mod document_processor;
pub mod error;
pub mod gemini_service;
pub mod models;
pub mod query_service;
pub mod relay;
pub mod stream;

pub use config::Settings;
pub use document_processor::DocumentProcessor;
pub use error::{DocQaError, Result};
pub use gemini_service::GeminiService;
pub use models::*;
pub use query_service::{build_prompt, QueryService};
pub use relay::{relay, AnswerSink, ChannelSink, RelayOutcome, WriterSink};
pub use stream::AnswerStream;
