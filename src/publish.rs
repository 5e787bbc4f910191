//! Event publishing
//!
//! Forwards downloaded object content downstream, one event per line.

use crate::error::{Error, Result};
use crate::source::ObjectInfo;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

/// One line of object content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Source object name
    pub object: String,
    /// Zero-based line number within the object
    pub line: usize,
    /// Byte offset of the line within the object
    pub offset: usize,
    /// Line content without the terminator
    pub message: String,
}

/// Downstream receiver of object content
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish an object's content, returning the number of events sent
    async fn publish(&self, object: &ObjectInfo, body: Bytes) -> Result<usize>;
}

/// Split object content into line events
///
/// `\n` terminates a line and a trailing `\r` is trimmed. A final empty
/// line is not an event.
pub fn split_events(object: &str, body: &[u8]) -> Vec<Event> {
    let mut events = Vec::new();
    let mut offset = 0;

    for (line, chunk) in body.split(|b| *b == b'\n').enumerate() {
        let consumed = chunk.len() + 1;
        if offset + chunk.len() >= body.len() && chunk.is_empty() {
            break;
        }

        let content = chunk.strip_suffix(b"\r").unwrap_or(chunk);
        events.push(Event {
            object: object.to_string(),
            line,
            offset,
            message: String::from_utf8_lossy(content).into_owned(),
        });
        offset += consumed;
    }

    events
}

// ============================================================================
// Writer Publisher
// ============================================================================

/// Writes events as NDJSON to any async writer
pub struct WriterPublisher<W> {
    writer: Mutex<W>,
}

/// Publisher writing NDJSON to stdout
pub type StdoutPublisher = WriterPublisher<tokio::io::Stdout>;

impl StdoutPublisher {
    /// Publisher for the process stdout
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> WriterPublisher<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Publisher for WriterPublisher<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, object: &ObjectInfo, body: Bytes) -> Result<usize> {
        let events = split_events(&object.name, &body);

        let mut buf = Vec::with_capacity(body.len() + events.len() * 64);
        for event in &events {
            serde_json::to_writer(&mut buf, event)?;
            buf.push(b'\n');
        }

        // One write per object keeps concurrent workers from interleaving lines
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&buf)
            .await
            .map_err(|e| Error::publish(format!("Failed to write events: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::publish(format!("Failed to flush events: {e}")))?;

        Ok(events.len())
    }
}

// ============================================================================
// Channel Publisher
// ============================================================================

/// Sends events into a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<Event>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, object: &ObjectInfo, body: Bytes) -> Result<usize> {
        let events = split_events(&object.name, &body);
        let count = events.len();

        for event in events {
            self.sender
                .send(event)
                .await
                .map_err(|_| Error::publish("event channel closed"))?;
        }

        Ok(count)
    }
}
