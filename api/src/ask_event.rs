use serde::{Deserialize, Serialize};

/// One server-sent event on the ask stream.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AskEvent {
    Info { message: String },
    Token { content: String },
    Error { message: String },
    Done { fragments: usize },
}
