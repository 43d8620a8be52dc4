//! pipeplay: small media-pipeline demonstrations.
//!
//! ```text
//! config ──▶ speech / radio / transcode (demos)
//!                  │
//!                  ▼
//!            pipeline (PipelineRunner: build, start, await, stop)
//!                  │
//!                  ▼
//!            media (description parser, registry, elements, streaming)
//!
//! probe ──▶ speech (cloud or local route)
//! ```

pub mod config;
pub mod interrupt;
pub mod media;
pub mod pipeline;
pub mod probe;
pub mod radio;
pub mod speech;
pub mod templates;
pub mod transcode;
