//! Error types for the media framework.
//!
//! * [`ConstructionError`] — a description could not be turned into a plan.
//! * [`ValidationError`] — a live property write or argument was rejected.
//! * [`FlowError`] — an element failed (or was flushed) while streaming.

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConstructionError
// ---------------------------------------------------------------------------

/// Errors raised while parsing a description or building a plan from it.
///
/// Construction failures are final for that attempt; nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    /// The textual description is malformed.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// The description contains no stages.
    #[error("empty pipeline description")]
    EmptyPipeline,

    /// No factory is registered under this stage name.
    #[error("no element \"{0}\"")]
    UnknownElement(String),

    /// The element has no property with this name.
    #[error("no property \"{property}\" in element \"{element}\"")]
    UnknownProperty { element: String, property: String },

    /// The property exists but the supplied value is unusable.
    #[error("invalid value for {element}.{property}: {reason}")]
    InvalidValue {
        element: String,
        property: String,
        reason: String,
    },

    /// Two adjacent stages cannot be linked.
    #[error("could not link {upstream} to {downstream}: {reason}")]
    LinkFailed {
        upstream: String,
        downstream: String,
        reason: String,
    },

    /// The first stage does not produce data.
    #[error("pipeline must start with a source, found \"{0}\"")]
    MissingSource(String),

    /// The last stage does not consume data.
    #[error("pipeline must end with a sink, found \"{0}\"")]
    MissingSink(String),

    /// The runtime was shut down before the build.
    #[error("media runtime has been shut down")]
    RuntimeClosed,
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A value supplied at run time (live property, CLI argument) was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// No stage of the pipeline exposes this live property.
    #[error("no live property \"{0}\" in this pipeline")]
    UnknownProperty(String),

    /// The value has the wrong type for the property.
    #[error("property \"{key}\" expects {expected}")]
    WrongType { key: String, expected: &'static str },

    /// The numeric value lies outside the accepted range.
    #[error("property \"{key}\" value {value} is outside {min}..={max}")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A free-form argument failed validation.
    #[error("{0}")]
    InvalidArgument(String),
}

// ---------------------------------------------------------------------------
// FlowError
// ---------------------------------------------------------------------------

/// Outcome of a failed `pull` / `chain` / `render` on the streaming thread.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// The run was cancelled; the worker unwinds without posting anything.
    #[error("flushing")]
    Flushing,

    /// An element failed; posted on the bus as an `Error` message.
    #[error("{element}: {message}")]
    Failed {
        element: String,
        message: String,
        detail: String,
    },
}

impl FlowError {
    /// Convenience constructor used by every element.
    pub fn failed(
        element: impl Into<String>,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        FlowError::Failed {
            element: element.into(),
            message: message.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_element_names_the_stage() {
        let e = ConstructionError::UnknownElement("bogus_stage".into());
        assert!(e.to_string().contains("bogus_stage"));
    }

    #[test]
    fn out_of_range_display_mentions_bounds() {
        let e = ValidationError::OutOfRange {
            key: "volume".into(),
            value: 101.0,
            min: 0.0,
            max: 100.0,
        };
        let text = e.to_string();
        assert!(text.contains("volume"));
        assert!(text.contains("101"));
        assert!(text.contains("100"));
    }

    #[test]
    fn flow_error_failed_carries_fields() {
        let e = FlowError::failed("filesrc0", "Resource not found.", "/nope.mp3");
        match e {
            FlowError::Failed {
                element,
                message,
                detail,
            } => {
                assert_eq!(element, "filesrc0");
                assert_eq!(message, "Resource not found.");
                assert_eq!(detail, "/nope.mp3");
            }
            FlowError::Flushing => panic!("expected Failed"),
        }
    }
}
