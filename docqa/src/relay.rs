//! Forwarding streamed fragments to whatever displays them.

use crate::error::DocQaError;
use crate::stream::AnswerStream;
use futures::StreamExt;
use std::io::Write;
use tokio::sync::mpsc::UnboundedSender;

/// Destination for answer fragments.
pub trait AnswerSink {
    fn write_fragment(&mut self, fragment: &str) -> std::io::Result<()>;
}

impl AnswerSink for Vec<String> {
    fn write_fragment(&mut self, fragment: &str) -> std::io::Result<()> {
        self.push(fragment.to_string());
        Ok(())
    }
}

/// Writes each fragment to an `io::Write` and flushes it immediately.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> AnswerSink for WriterSink<W> {
    fn write_fragment(&mut self, fragment: &str) -> std::io::Result<()> {
        self.writer.write_all(fragment.as_bytes())?;
        self.writer.flush()
    }
}

/// Hands fragments to another task. Fails once the receiving side is gone,
/// which stops the relay and drops the upstream request.
pub struct ChannelSink {
    sender: UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl AnswerSink for ChannelSink {
    fn write_fragment(&mut self, fragment: &str) -> std::io::Result<()> {
        self.sender.send(fragment.to_string()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "answer receiver closed")
        })
    }
}

#[derive(Debug, Default)]
pub struct RelayOutcome {
    /// Everything that reached the sink.
    pub text: String,
    pub fragments: usize,
    /// Set when the stream or the sink failed. Already written output stays.
    pub error: Option<DocQaError>,
}

impl RelayOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Drains `stream` into `sink` in arrival order, stopping at the first error.
pub async fn relay<S: AnswerSink>(mut stream: AnswerStream, sink: &mut S) -> RelayOutcome {
    let mut outcome = RelayOutcome::default();

    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) => {
                if let Err(e) = sink.write_fragment(&fragment) {
                    outcome.error = Some(DocQaError::Io(e));
                    break;
                }
                outcome.text.push_str(&fragment);
                outcome.fragments += 1;
            }
            Err(e) => {
                log::error!("Answer stream failed after {} fragments: {}", outcome.fragments, e);
                outcome.error = Some(e);
                break;
            }
        }
    }

    outcome
}
