//! The streaming worker: one OS thread per run.
//!
//! ```text
//! spawn ─▶ create elements (in order) ─▶ StreamStart
//!       ─▶ loop { pull ─▶ render } until None ─▶ sink.finish ─▶ Eos
//!       any FlowError::Failed ─▶ Error        cancellation ─▶ (silent)
//! ```
//!
//! Elements are created on the worker, so opening files, connecting to
//! servers or devices never blocks the caller; failures arrive as bus
//! messages instead.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::bus::{self, Bus, BusPoster, MessageBody};
use super::element::{Chained, Element, ElementContext, Sink, Source};
use super::error::FlowError;
use super::plan::Plan;
use super::props::PropertyTable;

/// A running (or finished) worker and the bus it posts to.
pub struct Session {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
    bus: Bus,
}

impl Session {
    /// Start a worker thread for `plan`.
    pub fn spawn(
        pipeline: &str,
        plan: Arc<Plan>,
        table: PropertyTable,
        handle: Handle,
    ) -> std::io::Result<Self> {
        let cancel = CancellationToken::new();
        let (poster, bus) = bus::channel();

        let worker_cancel = cancel.clone();
        let name = pipeline.to_string();
        let join = std::thread::Builder::new()
            .name(format!("{pipeline}:src"))
            .spawn(move || stream(&name, &plan, table, handle, worker_cancel, poster))?;

        Ok(Self {
            cancel,
            join: Some(join),
            bus,
        })
    }

    pub fn bus(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel the run and wait for the worker to release its elements.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("streaming: worker thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Worker body
// ---------------------------------------------------------------------------

fn stream(
    pipeline: &str,
    plan: &Plan,
    table: PropertyTable,
    handle: Handle,
    cancel: CancellationToken,
    poster: BusPoster,
) {
    log::debug!("streaming: {pipeline} worker started");

    match run_chain(pipeline, plan, &table, &handle, &cancel, &poster) {
        Ok(()) => {
            log::debug!("streaming: {pipeline} reached end of stream");
            poster.post(pipeline, MessageBody::Eos);
        }
        Err(FlowError::Flushing) => {
            log::debug!("streaming: {pipeline} flushed");
        }
        Err(FlowError::Failed {
            element,
            message,
            detail,
        }) => {
            log::debug!("streaming: {pipeline} failed in {element}: {message}");
            poster.post(element, MessageBody::Error { message, detail });
        }
    }
}

fn run_chain(
    pipeline: &str,
    plan: &Plan,
    table: &PropertyTable,
    handle: &Handle,
    cancel: &CancellationToken,
    poster: &BusPoster,
) -> Result<(), FlowError> {
    let mut source: Option<Box<dyn Source>> = None;
    let mut sink: Option<Box<dyn Sink>> = None;

    for (index, stage) in plan.stages.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(FlowError::Flushing);
        }

        let ctx = ElementContext {
            name: stage.name.clone(),
            props: table.stage(index),
            caps: stage.caps,
            cancel: cancel.clone(),
            handle: handle.clone(),
            bus: poster.clone(),
        };

        let element = stage.factory.create(&ctx)?;
        source = match element {
            Element::Source(s) => Some(s),
            Element::Transform(t) => Some(Box::new(Chained::new(upstream(&ctx, source)?, t))),
            Element::Wrap(wrap) => Some(wrap(upstream(&ctx, source)?)?),
            Element::Sink(s) => {
                sink = Some(s);
                source
            }
        };
    }

    let (Some(mut source), Some(mut sink)) = (source, sink) else {
        return Err(FlowError::failed(
            pipeline,
            "Internal data stream error.",
            "pipeline has no source or no sink",
        ));
    };

    poster.post(pipeline, MessageBody::StreamStart);

    loop {
        if cancel.is_cancelled() {
            return Err(FlowError::Flushing);
        }
        match source.pull()? {
            Some(buffer) => sink.render(buffer)?,
            None => break,
        }
    }

    sink.finish()
}

fn upstream(
    ctx: &ElementContext,
    source: Option<Box<dyn Source>>,
) -> Result<Box<dyn Source>, FlowError> {
    source.ok_or_else(|| ctx.failed("Internal data stream error.", "element has no upstream"))
}
