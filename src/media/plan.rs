//! Turning a [`PipelineDescription`] into a validated [`Plan`].
//!
//! ```text
//! description ──expand bins──▶ stages ──validate props──▶ link check
//!             ──name instances──▶ caps hints ──▶ Plan
//! ```
//!
//! Everything that can be checked without opening a file, a socket or a
//! device is checked here, so a description that plans successfully only
//! fails later for environmental reasons.

use std::collections::HashMap;
use std::sync::Arc;

use super::caps::AudioCaps;
use super::description::{ParamValue, Params, PipelineDescription, StageSpec};
use super::error::ConstructionError;
use super::registry::{ElementFactory, PadKind, PropertySpec, Registry};

/// Bins may contain bins, but not endlessly.
const MAX_EXPANSION_DEPTH: usize = 4;

/// One stage after expansion and validation.
#[derive(Clone)]
pub struct PlannedStage {
    /// Instance name (`filesrc0`, `volume1`, …).
    pub name: String,
    pub factory: Arc<dyn ElementFactory>,
    pub specs: Vec<PropertySpec>,
    /// Nearest downstream `capsfilter` constraint within this audio run.
    pub caps: Option<AudioCaps>,
}

impl PlannedStage {
    pub fn factory_name(&self) -> &'static str {
        self.factory.name()
    }

    pub fn spec(&self, key: &str) -> Option<&PropertySpec> {
        self.specs.iter().find(|s| s.name == key)
    }
}

impl std::fmt::Debug for PlannedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedStage")
            .field("name", &self.name)
            .field("caps", &self.caps)
            .finish()
    }
}

/// A linear chain ready to be instantiated.
#[derive(Debug, Clone)]
pub struct Plan {
    pub stages: Vec<PlannedStage>,
    /// Validated parameters (defaults filled in), one map per stage.
    pub params: Vec<Params>,
}

impl Plan {
    /// Validate `description` against `registry`.
    pub fn build(
        registry: &Registry,
        description: &PipelineDescription,
    ) -> Result<Self, ConstructionError> {
        if description.is_empty() {
            return Err(ConstructionError::EmptyPipeline);
        }

        let mut flat: Vec<(Arc<dyn ElementFactory>, Vec<PropertySpec>, Params)> = Vec::new();
        for stage in description.stages() {
            expand_stage(registry, stage, 0, &mut flat)?;
        }

        check_links(&flat)?;

        let mut counters: HashMap<&'static str, usize> = HashMap::new();
        let mut stages = Vec::with_capacity(flat.len());
        let mut params = Vec::with_capacity(flat.len());
        for (factory, specs, stage_params) in flat {
            let n = counters.entry(factory.name()).or_insert(0);
            let name = format!("{}{}", factory.name(), n);
            *n += 1;
            stages.push(PlannedStage {
                name,
                factory,
                specs,
                caps: None,
            });
            params.push(stage_params);
        }

        assign_caps_hints(&mut stages, &params);

        Ok(Self { stages, params })
    }

    /// Index and spec of the first stage that declares `key` live.
    pub fn live_slot(&self, key: &str) -> Option<(usize, &PropertySpec)> {
        self.stages.iter().enumerate().find_map(|(i, stage)| {
            stage
                .spec(key)
                .filter(|spec| spec.live)
                .map(|spec| (i, spec))
        })
    }
}

fn expand_stage(
    registry: &Registry,
    stage: &StageSpec,
    depth: usize,
    out: &mut Vec<(Arc<dyn ElementFactory>, Vec<PropertySpec>, Params)>,
) -> Result<(), ConstructionError> {
    let factory = registry
        .get(&stage.name)
        .ok_or_else(|| ConstructionError::UnknownElement(stage.name.clone()))?;
    let specs = factory.properties();
    let params = validate_params(&stage.name, &specs, &stage.params)?;

    match factory.expand(&params)? {
        Some(children) => {
            if depth >= MAX_EXPANSION_DEPTH {
                return Err(ConstructionError::InvalidValue {
                    element: stage.name.clone(),
                    property: String::new(),
                    reason: "bin nesting too deep".into(),
                });
            }
            log::debug!(
                "plan: {} expands to {}",
                stage.name,
                children
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" ! ")
            );
            for child in &children {
                expand_stage(registry, child, depth + 1, out)?;
            }
        }
        None => out.push((factory, specs, params)),
    }

    Ok(())
}

fn validate_params(
    element: &str,
    specs: &[PropertySpec],
    given: &Params,
) -> Result<Params, ConstructionError> {
    let mut params = Params::new();

    for (key, value) in given {
        let spec = specs.iter().find(|s| s.name == key).ok_or_else(|| {
            ConstructionError::UnknownProperty {
                element: element.to_string(),
                property: key.clone(),
            }
        })?;
        let value = spec
            .coerce(value)
            .map_err(|e| ConstructionError::InvalidValue {
                element: element.to_string(),
                property: key.clone(),
                reason: e.to_string(),
            })?;
        params.insert(key.clone(), value);
    }

    for spec in specs {
        if let Some(default) = &spec.default {
            params
                .entry(spec.name.to_string())
                .or_insert_with(|| default.clone());
        }
    }

    Ok(params)
}

fn check_links(
    flat: &[(Arc<dyn ElementFactory>, Vec<PropertySpec>, Params)],
) -> Result<(), ConstructionError> {
    let (Some((first, ..)), Some((last, ..))) = (flat.first(), flat.last()) else {
        return Err(ConstructionError::EmptyPipeline);
    };

    if first.sink_pad() != PadKind::None || first.src_pad() == PadKind::None {
        return Err(ConstructionError::MissingSource(first.name().to_string()));
    }
    if last.src_pad() != PadKind::None || flat.len() < 2 {
        return Err(ConstructionError::MissingSink(last.name().to_string()));
    }

    // `Any` pads pass the upstream kind through.
    let mut flowing = first.src_pad();
    for pair in flat.windows(2) {
        let (up, down) = (&pair[0].0, &pair[1].0);
        if !flowing.links_to(down.sink_pad()) {
            return Err(ConstructionError::LinkFailed {
                upstream: up.name().to_string(),
                downstream: down.name().to_string(),
                reason: format!(
                    "{} output cannot feed a {} input",
                    flowing,
                    down.sink_pad()
                ),
            });
        }
        match down.src_pad() {
            PadKind::Any => {}
            kind => flowing = kind,
        }
    }

    Ok(())
}

fn assign_caps_hints(stages: &mut [PlannedStage], params: &[Params]) {
    for i in 0..stages.len() {
        let mut hint = None;
        if !matches!(stages[i].factory.src_pad(), PadKind::Audio | PadKind::Any) {
            stages[i].caps = None;
            continue;
        }
        for j in (i + 1)..stages.len() {
            let stage = &stages[j];
            if stage.factory_name() == "capsfilter" {
                hint = params[j]
                    .get("caps")
                    .and_then(ParamValue::as_str)
                    .and_then(|c| AudioCaps::parse(c).ok());
                break;
            }
            // Stop at the end of the raw-audio run.
            if !matches!(stage.factory.src_pad(), PadKind::Audio | PadKind::Any) {
                break;
            }
        }
        stages[i].caps = hint;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
