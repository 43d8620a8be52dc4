//! Per-run message bus.
//!
//! The streaming worker (and any element) posts [`BusMessage`]s through a
//! [`BusPoster`]; the pipeline owner consumes them from the [`Bus`] inside
//! its dispatch loop.  One bus is created per run, so messages from an
//! earlier run can never leak into a later one.

use std::fmt;

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// MessageKind / MessageBody
// ---------------------------------------------------------------------------

/// Discriminant of a [`MessageBody`], used as the dispatch-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    StreamStart,
    Eos,
    Error,
    Warning,
    Info,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::StreamStart => "stream-start",
            MessageKind::Eos => "eos",
            MessageKind::Error => "error",
            MessageKind::Warning => "warning",
            MessageKind::Info => "info",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Elements are instantiated and data is about to flow.
    StreamStart,
    /// The sink consumed the last buffer.
    Eos,
    /// Unrecoverable failure; the run is over.
    Error { message: String, detail: String },
    Warning { message: String, detail: String },
    Info { message: String },
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::StreamStart => MessageKind::StreamStart,
            MessageBody::Eos => MessageKind::Eos,
            MessageBody::Error { .. } => MessageKind::Error,
            MessageBody::Warning { .. } => MessageKind::Warning,
            MessageBody::Info { .. } => MessageKind::Info,
        }
    }
}

/// A message plus the name of the element (or pipeline) that posted it.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub source: String,
    pub body: MessageBody,
}

impl BusMessage {
    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}

// ---------------------------------------------------------------------------
// Bus / BusPoster
// ---------------------------------------------------------------------------

/// Create a connected poster/bus pair.
pub fn channel() -> (BusPoster, Bus) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BusPoster { tx }, Bus { rx })
}

/// Sending half; cheap to clone and usable from any thread.
#[derive(Debug, Clone)]
pub struct BusPoster {
    tx: mpsc::UnboundedSender<BusMessage>,
}

impl BusPoster {
    /// Post a message.  Messages posted after the bus was dropped are
    /// discarded.
    pub fn post(&self, source: impl Into<String>, body: MessageBody) {
        let _ = self.tx.send(BusMessage {
            source: source.into(),
            body,
        });
    }

    pub fn warning(&self, source: impl Into<String>, message: impl Into<String>, detail: impl Into<String>) {
        self.post(
            source,
            MessageBody::Warning {
                message: message.into(),
                detail: detail.into(),
            },
        );
    }

    pub fn info(&self, source: impl Into<String>, message: impl Into<String>) {
        self.post(
            source,
            MessageBody::Info {
                message: message.into(),
            },
        );
    }
}

/// Receiving half, owned by the pipeline for the duration of one run.
#[derive(Debug)]
pub struct Bus {
    rx: mpsc::UnboundedReceiver<BusMessage>,
}

impl Bus {
    /// Wait for the next message.  `None` once every poster is gone and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<BusMessage> {
        self.rx.try_recv().ok()
    }
}
