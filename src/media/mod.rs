//! In-process media framework.
//!
//! Pipelines are linear chains of named stages described in gst-launch
//! syntax.  This module owns everything below the pipeline lifecycle: the
//! description language, the element registry, validation into a [`Plan`],
//! the per-run [`Bus`] and the streaming worker that moves buffers.
//!
//! # Architecture
//!
//! ```text
//! PipelineDescription ──MediaRuntime::plan──▶ Plan (validated, named stages)
//!                                               │
//!                              Session::spawn   ▼
//!                  ┌──────── streaming thread ────────┐
//!                  │ Source ─▶ Transform … ─▶ Sink    │──▶ Bus (StreamStart,
//!                  └──────────────────────────────────┘        Eos, Error, …)
//!                        ▲ reads live values
//!                  PropertyTable (Arc<Mutex<…>>)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pipeplay::media::{MediaRuntime, PipelineDescription};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let media = MediaRuntime::with_defaults(tokio::runtime::Handle::current());
//! let desc: PipelineDescription = "audiotestsrc num-buffers=10 ! autoaudiosink".parse()?;
//! let plan = media.plan(&desc)?;
//! assert_eq!(plan.stages.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod bus;
pub mod caps;
pub mod description;
pub mod dsp;
pub mod element;
pub mod elements;
pub mod error;
pub mod plan;
pub mod props;
pub mod registry;
pub mod runtime;
pub mod streaming;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use buffer::{AudioBuffer, Buffer};
pub use bus::{Bus, BusMessage, BusPoster, MessageBody, MessageKind};
pub use caps::{AudioCaps, SampleFormat};
pub use description::{ParamValue, Params, PipelineDescription, StageSpec};
pub use element::{Element, ElementContext, Sink, Source, Transform};
pub use error::{ConstructionError, FlowError, ValidationError};
pub use plan::{Plan, PlannedStage};
pub use props::{PropertyTable, StageProps};
pub use registry::{ElementFactory, PadKind, PropKind, PropertySpec, Registry};
pub use runtime::MediaRuntime;
pub use streaming::Session;
