//! Pipeline lifecycle: build, start, await termination, stop.
//!
//! This module is the only place that drives runs.  It knows nothing about
//! what a stage does; it builds descriptions through a
//! [`MediaRuntime`](crate::media::MediaRuntime), starts the streaming worker
//! and consumes the run's bus until a [`TerminationEvent`] resolves.
//!
//! # Architecture
//!
//! ```text
//! PipelineRunner ──build──▶ Pipeline ──start──▶ Session (streaming thread)
//!       │                      ▲                     │
//!       │    set_live_property │                     │ bus
//!       │    PipelineController┘                     ▼
//!       └──await_completion(cancel) ◀── Dispatcher (kind → handler)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pipeplay::media::MediaRuntime;
//! use pipeplay::pipeline::PipelineRunner;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), pipeplay::pipeline::PipelineError> {
//! let mut runner = PipelineRunner::new(MediaRuntime::with_defaults(
//!     tokio::runtime::Handle::current(),
//! ));
//! let mut pipeline = runner.build(&"playbin uri=file:///tmp/a.mp3".parse()?)?;
//! let cancel = CancellationToken::new();
//!
//! runner.run(&mut pipeline, &cancel).await?.into_result()?;
//! pipeline.set_live_property("uri", "file:///tmp/b.mp3")?;
//! runner.run(&mut pipeline, &cancel).await?.into_result()?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use dispatch::{Dispatcher, Flow, Handler};
pub use runner::{Pipeline, PipelineController, PipelineError, PipelineRunner};
pub use state::{PipelineState, TerminationEvent};
