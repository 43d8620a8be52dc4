//! Pipeline lifecycle state and the result of waiting on a run.
//!
//! [`PipelineState`] is the state machine every [`Pipeline`] moves through;
//! [`TerminationEvent`] is what
//! [`PipelineRunner::await_completion`] hands back exactly once per run.
//!
//! [`Pipeline`]: super::Pipeline
//! [`PipelineRunner::await_completion`]: super::PipelineRunner::await_completion

use std::fmt;

use super::runner::PipelineError;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of one pipeline.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──start──▶ Running ──EndOfStream / Cancelled──▶ Stopped
///                         ──Error──────────────────────▶ Failed
/// Stopped / Failed ──set_live_property──▶ Idle
/// Idle / Stopped / Failed ──start──▶ Running
/// any state ──stop──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Built (or re-armed) and not yet started.
    #[default]
    Idle,

    /// A streaming worker is attached and data may be flowing.
    Running,

    /// The last run ended (or was never started) and its resources are
    /// released.
    Stopped,

    /// The last run ended with an error.  Resources are released, so the
    /// pipeline may be started again.
    Failed,
}

impl PipelineState {
    /// Returns `true` only while a streaming worker is attached.
    ///
    /// ```
    /// use pipeplay::pipeline::PipelineState;
    ///
    /// assert!(PipelineState::Running.is_running());
    /// assert!(!PipelineState::Idle.is_running());
    /// assert!(!PipelineState::Stopped.is_running());
    /// assert!(!PipelineState::Failed.is_running());
    /// ```
    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Running)
    }

    /// Whether `start` is allowed from this state.
    pub fn can_start(&self) -> bool {
        !self.is_running()
    }

    /// A short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Running => "Running",
            PipelineState::Stopped => "Stopped",
            PipelineState::Failed => "Failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// TerminationEvent
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationEvent {
    /// All data was processed.
    EndOfStream,

    /// Unrecoverable failure; `detail` names the element that raised it.
    Error { message: String, detail: String },

    /// The caller's cancellation token fired first.
    Cancelled,
}

impl TerminationEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, TerminationEvent::Error { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TerminationEvent::Cancelled)
    }

    /// `Ok` for end-of-stream and cancellation, [`PipelineError::Runtime`]
    /// for an error.
    pub fn into_result(self) -> Result<(), PipelineError> {
        match self {
            TerminationEvent::EndOfStream | TerminationEvent::Cancelled => Ok(()),
            TerminationEvent::Error { message, detail } => {
                Err(PipelineError::Runtime { message, detail })
            }
        }
    }
}

impl fmt::Display for TerminationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationEvent::EndOfStream => f.write_str("end of stream"),
            TerminationEvent::Error { message, detail } if detail.is_empty() => {
                write!(f, "error: {message}")
            }
            TerminationEvent::Error { message, detail } => write!(f, "error: {message} ({detail})"),
            TerminationEvent::Cancelled => f.write_str("cancelled"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
    }

    #[test]
    fn only_running_refuses_start() {
        assert!(PipelineState::Idle.can_start());
        assert!(PipelineState::Stopped.can_start());
        assert!(PipelineState::Failed.can_start());
        assert!(!PipelineState::Running.can_start());
    }

    #[test]
    fn labels() {
        assert_eq!(PipelineState::Failed.to_string(), "Failed");
        assert_eq!(PipelineState::Running.label(), "Running");
    }

    #[test]
    fn error_event_maps_to_runtime_error() {
        let event = TerminationEvent::Error {
            message: "Resource not found.".into(),
            detail: "filesrc0".into(),
        };
        assert!(event.is_error());
        assert_eq!(
            event.into_result(),
            Err(PipelineError::Runtime {
                message: "Resource not found.".into(),
                detail: "filesrc0".into()
            })
        );
    }

    #[test]
    fn eos_and_cancel_are_ok() {
        assert!(TerminationEvent::EndOfStream.into_result().is_ok());
        assert!(TerminationEvent::Cancelled.into_result().is_ok());
        assert!(TerminationEvent::Cancelled.is_cancelled());
    }

    #[test]
    fn display_includes_detail() {
        let event = TerminationEvent::Error {
            message: "boom".into(),
            detail: "volume0".into(),
        };
        assert_eq!(event.to_string(), "error: boom (volume0)");
    }
}
