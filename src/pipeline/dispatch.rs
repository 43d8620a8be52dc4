//! Message dispatch table used by the completion loop.
//!
//! Handlers are keyed by [`MessageKind`].  A handler either lets the loop
//! continue or resolves it with a [`TerminationEvent`].  The defaults are:
//!
//! | kind | default handler |
//! |---|---|
//! | `Eos` | resolve with `EndOfStream` |
//! | `Error` | resolve with `Error { message, detail }` |
//! | `Warning` | `log::warn!` |
//! | `StreamStart`, `Info` | `log::debug!` |

use std::collections::HashMap;

use crate::media::{BusMessage, MessageBody, MessageKind};

use super::state::TerminationEvent;

/// What the loop should do after a handler ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Resolve(TerminationEvent),
}

pub type Handler = Box<dyn FnMut(&BusMessage) -> Flow + Send>;

pub struct Dispatcher {
    table: HashMap<MessageKind, Vec<Handler>>,
    any: Vec<Handler>,
}

impl Dispatcher {
    /// A dispatcher with no handlers at all.  Its loop only ends on
    /// cancellation or when the worker goes away.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
            any: Vec::new(),
        }
    }

    /// Register `handler` for one message kind.  Handlers run in
    /// registration order, after the defaults.
    pub fn connect<F>(&mut self, kind: MessageKind, handler: F) -> &mut Self
    where
        F: FnMut(&BusMessage) -> Flow + Send + 'static,
    {
        self.table.entry(kind).or_default().push(Box::new(handler));
        self
    }

    /// Register `handler` for every message.  These run before the
    /// kind-specific handlers.
    pub fn connect_any<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&BusMessage) -> Flow + Send + 'static,
    {
        self.any.push(Box::new(handler));
        self
    }

    /// Run every matching handler; the first `Resolve` wins.
    pub fn dispatch(&mut self, message: &BusMessage) -> Option<TerminationEvent> {
        let mut resolved = None;
        let kind_handlers = self.table.get_mut(&message.kind());
        let handlers = self
            .any
            .iter_mut()
            .chain(kind_handlers.into_iter().flatten());

        for handler in handlers {
            if let Flow::Resolve(event) = handler(message) {
                resolved.get_or_insert(event);
            }
        }
        resolved
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher
            .connect(MessageKind::Eos, |msg| {
                log::debug!("pipeline: end of stream from {}", msg.source);
                Flow::Resolve(TerminationEvent::EndOfStream)
            })
            .connect(MessageKind::Error, |msg| match &msg.body {
                MessageBody::Error { message, detail } => {
                    let detail = if detail.is_empty() {
                        msg.source.clone()
                    } else {
                        format!("{}: {detail}", msg.source)
                    };
                    Flow::Resolve(TerminationEvent::Error {
                        message: message.clone(),
                        detail,
                    })
                }
                _ => Flow::Continue,
            })
            .connect(MessageKind::Warning, |msg| {
                if let MessageBody::Warning { message, detail } = &msg.body {
                    log::warn!("pipeline: {}: {message} {detail}", msg.source);
                }
                Flow::Continue
            })
            .connect(MessageKind::StreamStart, |msg| {
                log::debug!("pipeline: stream started in {}", msg.source);
                Flow::Continue
            })
            .connect(MessageKind::Info, |msg| {
                if let MessageBody::Info { message } = &msg.body {
                    log::debug!("pipeline: {}: {message}", msg.source);
                }
                Flow::Continue
            });
        dispatcher
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self
            .table
            .iter()
            .map(|(k, v)| (k.to_string(), v.len()))
            .collect();
        kinds.sort();
        f.debug_struct("Dispatcher")
            .field("handlers", &kinds)
            .field("any", &self.any.len())
            .finish()
    }
}
