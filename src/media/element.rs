//! Element instances and the context they are created with.
//!
//! Elements live entirely on the streaming thread.  The worker assembles
//! them into a pull chain:
//!
//! ```text
//! Source ──▶ Chained(Transform) ──▶ Wrap(decoder) ──▶ … ──▶ Sink
//!   pull()        pull()               pull()                render()
//! ```
//!
//! A [`Transform`] is driven buffer by buffer; a [`Element::Wrap`] receives
//! the whole upstream chain and returns a new [`Source`] (decoders need to
//! read their input as a byte stream rather than buffer by buffer).

use std::collections::VecDeque;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::buffer::Buffer;
use super::bus::BusPoster;
use super::caps::AudioCaps;
use super::error::FlowError;
use super::props::StageProps;

// ---------------------------------------------------------------------------
// Element traits
// ---------------------------------------------------------------------------

/// Produces buffers.  `Ok(None)` means end of stream.
pub trait Source: Send {
    fn pull(&mut self) -> Result<Option<Buffer>, FlowError>;

    /// Format hint for decoders downstream: a file extension (`"mp3"`) or a
    /// mime type (`"audio/mpeg"`).
    fn media_hint(&self) -> Option<String> {
        None
    }
}

/// Maps input buffers to zero or more output buffers.
pub trait Transform: Send {
    fn chain(&mut self, buffer: Buffer, out: &mut Vec<Buffer>) -> Result<(), FlowError>;

    /// Emit anything still held back at end of stream.
    fn drain(&mut self, _out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        Ok(())
    }
}

/// Consumes buffers.  Sinks need not be `Send`: they are created and
/// dropped on the streaming thread.
pub trait Sink {
    fn render(&mut self, buffer: Buffer) -> Result<(), FlowError>;

    /// Flush and release.  Called once after the last buffer; EOS is posted
    /// only after this returns `Ok`.
    fn finish(&mut self) -> Result<(), FlowError> {
        Ok(())
    }
}

pub type Wrapper = Box<dyn FnOnce(Box<dyn Source>) -> Result<Box<dyn Source>, FlowError>>;

/// What a factory hands to the streaming worker.
pub enum Element {
    Source(Box<dyn Source>),
    Transform(Box<dyn Transform>),
    Wrap(Wrapper),
    Sink(Box<dyn Sink>),
}

impl Element {
    pub fn source(source: impl Source + 'static) -> Self {
        Element::Source(Box::new(source))
    }

    pub fn transform(transform: impl Transform + 'static) -> Self {
        Element::Transform(Box::new(transform))
    }

    pub fn sink(sink: impl Sink + 'static) -> Self {
        Element::Sink(Box::new(sink))
    }
}

// ---------------------------------------------------------------------------
// ElementContext
// ---------------------------------------------------------------------------

/// Everything an element may need while it is being created.
#[derive(Debug, Clone)]
pub struct ElementContext {
    /// Instance name, e.g. `filesrc0`.
    pub name: String,
    pub props: StageProps,
    /// First downstream caps constraint in this stage's audio run.
    pub caps: Option<AudioCaps>,
    pub cancel: CancellationToken,
    /// Runtime for network I/O.  The streaming thread is not a runtime
    /// thread, so `block_on` is allowed there.
    pub handle: Handle,
    pub bus: BusPoster,
}

impl ElementContext {
    pub fn failed(&self, message: impl Into<String>, detail: impl Into<String>) -> FlowError {
        FlowError::failed(&self.name, message, detail)
    }

    /// `Err(Flushing)` once the run is cancelled.
    pub fn check_cancelled(&self) -> Result<(), FlowError> {
        if self.cancel.is_cancelled() {
            Err(FlowError::Flushing)
        } else {
            Ok(())
        }
    }

    /// Sleep on the streaming thread, waking early with `Flushing` when the
    /// run is cancelled.
    pub fn sleep(&self, duration: std::time::Duration) -> Result<(), FlowError> {
        let cancel = self.cancel.clone();
        self.handle.block_on(async move {
            tokio::select! {
                _ = cancel.cancelled() => Err(FlowError::Flushing),
                _ = tokio::time::sleep(duration) => Ok(()),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Chained
// ---------------------------------------------------------------------------

/// Adapts a [`Transform`] into a [`Source`] by pulling from `upstream`.
pub(crate) struct Chained {
    upstream: Box<dyn Source>,
    transform: Box<dyn Transform>,
    pending: VecDeque<Buffer>,
    scratch: Vec<Buffer>,
    drained: bool,
}

impl Chained {
    pub(crate) fn new(upstream: Box<dyn Source>, transform: Box<dyn Transform>) -> Self {
        Self {
            upstream,
            transform,
            pending: VecDeque::new(),
            scratch: Vec::new(),
            drained: false,
        }
    }
}

impl Source for Chained {
    fn pull(&mut self) -> Result<Option<Buffer>, FlowError> {
        loop {
            if let Some(buffer) = self.pending.pop_front() {
                return Ok(Some(buffer));
            }
            if self.drained {
                return Ok(None);
            }

            match self.upstream.pull()? {
                Some(buffer) => self.transform.chain(buffer, &mut self.scratch)?,
                None => {
                    self.transform.drain(&mut self.scratch)?;
                    self.drained = true;
                }
            }
            self.pending.extend(self.scratch.drain(..));
        }
    }

    fn media_hint(&self) -> Option<String> {
        self.upstream.media_hint()
    }
}
