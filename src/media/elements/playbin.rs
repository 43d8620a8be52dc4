//! `playbin`: one-stage player for any supported URI.
//!
//! Expands at plan time into
//!
//! ```text
//! urisrc uri=… ! decodebin ! audioconvert ! volume volume=… mute=… ! <audio-sink>
//! ```
//!
//! so its live properties (`uri`, `volume`, `mute`) resolve to the child
//! stages that declare them.  `audio-sink` is itself a one-stage description
//! (`fakesink`, `"alsasink device=hw:1"`, …).

use crate::media::description::{ParamValue, Params, PipelineDescription, StageSpec};
use crate::media::element::{Element, ElementContext};
use crate::media::error::{ConstructionError, FlowError};
use crate::media::registry::{ElementFactory, PadKind, PropertySpec};

const DEFAULT_AUDIO_SINK: &str = "autoaudiosink";

pub struct PlayBin;

impl ElementFactory for PlayBin {
    fn name(&self) -> &'static str {
        "playbin"
    }

    fn description(&self) -> &'static str {
        "Play a URI through the default audio path"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::None
    }

    fn src_pad(&self) -> PadKind {
        PadKind::None
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![
            PropertySpec::string("uri").live(),
            PropertySpec::float("volume")
                .live()
                .range(0.0, 100.0)
                .default_value(100.0),
            PropertySpec::boolean("mute").live().default_value(false),
            PropertySpec::string("audio-sink").default_value(DEFAULT_AUDIO_SINK),
            PropertySpec::string("video-sink"),
        ]
    }

    fn expand(&self, params: &Params) -> Result<Option<Vec<StageSpec>>, ConstructionError> {
        let sink_text = params
            .get("audio-sink")
            .and_then(ParamValue::as_str)
            .unwrap_or(DEFAULT_AUDIO_SINK);
        let sink_desc = PipelineDescription::parse(sink_text)?;
        let [sink] = sink_desc.stages() else {
            return Err(ConstructionError::InvalidValue {
                element: "playbin".into(),
                property: "audio-sink".into(),
                reason: format!("expected a single stage, got \"{sink_text}\""),
            });
        };

        if params.contains_key("video-sink") {
            log::warn!("playbin: video-sink is ignored, only audio is played");
        }

        let mut source = StageSpec::new("urisrc");
        if let Some(uri) = params.get("uri") {
            source = source.with("uri", uri.clone());
        }

        let mut volume = StageSpec::new("volume");
        for key in ["volume", "mute"] {
            if let Some(value) = params.get(key) {
                volume = volume.with(key, value.clone());
            }
        }

        Ok(Some(vec![
            source,
            StageSpec::new("decodebin"),
            StageSpec::new("audioconvert"),
            volume,
            sink.clone(),
        ]))
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        // Never reached: the planner replaces bins with their children.
        Err(ctx.failed("playbin cannot be instantiated directly.", ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, ParamValue)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn expands_with_default_sink() {
        let children = PlayBin
            .expand(&params(&[
                ("uri", ParamValue::from("file:///tmp/a.mp3")),
                ("audio-sink", ParamValue::from(DEFAULT_AUDIO_SINK)),
            ]))
            .unwrap()
            .unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["urisrc", "decodebin", "audioconvert", "volume", "autoaudiosink"]
        );
        assert_eq!(
            children[0].param("uri"),
            Some(&ParamValue::from("file:///tmp/a.mp3"))
        );
    }

    #[test]
    fn sink_description_may_carry_properties() {
        let children = PlayBin
            .expand(&params(&[(
                "audio-sink",
                ParamValue::from("fakesink sync=true"),
            )]))
            .unwrap()
            .unwrap();
        assert_eq!(children[4].name, "fakesink");
        assert_eq!(children[4].param("sync"), Some(&ParamValue::Bool(true)));
        assert!(children[0].param("uri").is_none());
    }

    #[test]
    fn multi_stage_sink_is_rejected() {
        let err = PlayBin
            .expand(&params(&[(
                "audio-sink",
                ParamValue::from("volume ! fakesink"),
            )]))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::InvalidValue { .. }));
    }

    #[test]
    fn volume_and_mute_move_to_the_volume_stage() {
        let children = PlayBin
            .expand(&params(&[
                ("volume", ParamValue::Float(30.0)),
                ("mute", ParamValue::Bool(true)),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(children[3].param("volume"), Some(&ParamValue::Float(30.0)));
        assert_eq!(children[3].param("mute"), Some(&ParamValue::Bool(true)));
    }
}
