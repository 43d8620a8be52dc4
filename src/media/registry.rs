//! Element factories and the registry that looks them up by name.
//!
//! A factory declares everything the planner needs to validate a stage
//! without instantiating it: pad kinds, property specs and (for bins) an
//! expansion into child stages.  Instances are created later, on the
//! streaming thread, via [`ElementFactory::create`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::description::{ParamValue, Params, StageSpec};
use super::element::{Element, ElementContext};
use super::error::{ConstructionError, FlowError, ValidationError};

// ---------------------------------------------------------------------------
// PadKind
// ---------------------------------------------------------------------------

/// The kind of data a pad carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadKind {
    /// No pad on this side (sources have no sink pad, sinks no src pad).
    None,
    /// Encoded bytes.
    Bytes,
    /// Decoded audio.
    Audio,
    /// Whatever arrives is passed on unchanged.
    Any,
}

impl PadKind {
    /// Whether data of kind `self` may flow into a sink pad of kind `input`.
    pub fn links_to(self, input: PadKind) -> bool {
        match (self, input) {
            (PadKind::None, _) | (_, PadKind::None) => false,
            (PadKind::Any, _) | (_, PadKind::Any) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for PadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PadKind::None => "none",
            PadKind::Bytes => "bytes",
            PadKind::Audio => "audio/x-raw",
            PadKind::Any => "ANY",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// PropertySpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Str,
    Int,
    Bool,
    /// Accepts integers too; they are stored as floats.
    Float,
}

impl PropKind {
    fn expected(self) -> &'static str {
        match self {
            PropKind::Str => "a string",
            PropKind::Int => "an integer",
            PropKind::Bool => "a boolean",
            PropKind::Float => "a number",
        }
    }
}

/// Declaration of one element property.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub name: &'static str,
    pub kind: PropKind,
    /// May be changed on a built pipeline.
    pub live: bool,
    pub range: Option<(f64, f64)>,
    pub default: Option<ParamValue>,
    /// Allowed values for string properties (empty = unrestricted).
    pub choices: &'static [&'static str],
    /// Extra validation for string properties.
    pub check: Option<fn(&str) -> Result<(), String>>,
}

impl PropertySpec {
    fn new(name: &'static str, kind: PropKind) -> Self {
        Self {
            name,
            kind,
            live: false,
            range: None,
            default: None,
            choices: &[],
            check: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, PropKind::Str)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, PropKind::Int)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, PropKind::Bool)
    }

    pub fn float(name: &'static str) -> Self {
        Self::new(name, PropKind::Float)
    }

    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }

    pub fn check(mut self, check: fn(&str) -> Result<(), String>) -> Self {
        self.check = Some(check);
        self
    }

    /// Type-check, range-check and normalise a value for this property.
    pub fn coerce(&self, value: &ParamValue) -> Result<ParamValue, ValidationError> {
        let wrong_type = || ValidationError::WrongType {
            key: self.name.to_string(),
            expected: self.kind.expected(),
        };

        let value = match (self.kind, value) {
            (PropKind::Str, ParamValue::Str(_)) => value.clone(),
            // Unquoted numbers in a description are still valid strings.
            (PropKind::Str, ParamValue::Int(_) | ParamValue::Float(_) | ParamValue::Bool(_)) => {
                ParamValue::Str(value.to_string())
            }
            (PropKind::Int, ParamValue::Int(_)) => value.clone(),
            (PropKind::Bool, ParamValue::Bool(_)) => value.clone(),
            (PropKind::Float, ParamValue::Int(v)) => ParamValue::Float(*v as f64),
            (PropKind::Float, ParamValue::Float(_)) => value.clone(),
            _ => return Err(wrong_type()),
        };

        if let (Some((min, max)), Some(v)) = (self.range, value.as_f64()) {
            if !(min..=max).contains(&v) {
                return Err(ValidationError::OutOfRange {
                    key: self.name.to_string(),
                    value: v,
                    min,
                    max,
                });
            }
        }

        if let ParamValue::Str(s) = &value {
            if !self.choices.is_empty() && !self.choices.contains(&s.as_str()) {
                return Err(ValidationError::InvalidArgument(format!(
                    "property \"{}\" must be one of {}, got \"{s}\"",
                    self.name,
                    self.choices.join(", ")
                )));
            }
            if let Some(check) = self.check {
                check(s).map_err(|reason| {
                    ValidationError::InvalidArgument(format!(
                        "property \"{}\": {reason}",
                        self.name
                    ))
                })?;
            }
        }

        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// ElementFactory
// ---------------------------------------------------------------------------

/// A named element type.
pub trait ElementFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-line description for listings.
    fn description(&self) -> &'static str {
        ""
    }

    fn sink_pad(&self) -> PadKind;

    fn src_pad(&self) -> PadKind;

    fn properties(&self) -> Vec<PropertySpec> {
        Vec::new()
    }

    /// Bins return their child stages; plain elements return `None`.
    /// `params` are already validated against [`properties`](Self::properties).
    fn expand(&self, _params: &Params) -> Result<Option<Vec<StageSpec>>, ConstructionError> {
        Ok(None)
    }

    /// Instantiate on the streaming thread.
    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name → factory map.
#[derive(Clone, Default)]
pub struct Registry {
    factories: BTreeMap<String, Arc<dyn ElementFactory>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every bundled element.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        super::elements::register_defaults(&mut registry);
        registry
    }

    /// Add (or replace) a factory under its own name.
    pub fn register(&mut self, factory: impl ElementFactory + 'static) -> &mut Self {
        let name = factory.name().to_string();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            log::debug!("registry: replaced factory \"{name}\"");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ElementFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_links() {
        assert!(PadKind::Bytes.links_to(PadKind::Bytes));
        assert!(PadKind::Audio.links_to(PadKind::Any));
        assert!(PadKind::Any.links_to(PadKind::Bytes));
        assert!(!PadKind::Bytes.links_to(PadKind::Audio));
        assert!(!PadKind::None.links_to(PadKind::Any));
        assert!(!PadKind::Audio.links_to(PadKind::None));
    }

    #[test]
    fn float_property_accepts_integers() {
        let spec = PropertySpec::float("volume").range(0.0, 100.0);
        assert_eq!(spec.coerce(&ParamValue::Int(40)), Ok(ParamValue::Float(40.0)));
    }

    #[test]
    fn range_boundaries_are_inclusive() {
        let spec = PropertySpec::float("volume").range(0.0, 100.0);
        assert!(spec.coerce(&ParamValue::Int(0)).is_ok());
        assert!(spec.coerce(&ParamValue::Int(100)).is_ok());
        assert!(matches!(
            spec.coerce(&ParamValue::Int(-1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            spec.coerce(&ParamValue::Int(101)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn wrong_type_is_reported() {
        let spec = PropertySpec::boolean("mute");
        assert_eq!(
            spec.coerce(&ParamValue::from("yes")),
            Err(ValidationError::WrongType {
                key: "mute".into(),
                expected: "a boolean"
            })
        );
    }

    #[test]
    fn string_property_stringifies_scalars() {
        let spec = PropertySpec::string("location");
        assert_eq!(spec.coerce(&ParamValue::Int(42)), Ok(ParamValue::from("42")));
    }

    #[test]
    fn choices_are_enforced() {
        let spec = PropertySpec::string("wave").choices(&["sine", "square"]);
        assert!(spec.coerce(&ParamValue::from("sine")).is_ok());
        assert!(matches!(
            spec.coerce(&ParamValue::from("saw")),
            Err(ValidationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn default_registry_has_the_bundled_elements() {
        let registry = Registry::with_defaults();
        for name in [
            "filesrc",
            "urisrc",
            "souphttpsrc",
            "audiotestsrc",
            "espeak",
            "decodebin",
            "audioconvert",
            "audioresample",
            "capsfilter",
            "volume",
            "queue",
            "wavenc",
            "filesink",
            "fakesink",
            "autoaudiosink",
            "alsasink",
            "pulsesink",
            "playbin",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(!registry.contains("bogus_stage"));
    }
}
