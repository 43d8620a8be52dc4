//! The pipeline descriptions the demos run.
//!
//! | template | description |
//! |---|---|
//! | [`transcode`] | `filesrc ! decodebin ! audioresample ! audioconvert ! audio/x-raw,format=…,rate=… ! wavenc ! filesink` |
//! | [`playbin`] | `playbin uri=… audio-sink=…` |
//! | [`speech_local`] | `espeak text=… rate=… pitch=… voice=… gap=… track=… ! <sink>` |
//! | [`phrase`] | `urisrc uri=… ! queue ! filesink location=…` |
//! | [`camera_local`] / [`camera_browser`] | video chains, buildable only with video elements registered |
//!
//! Values that come from users (paths, text, URIs) are set through
//! [`StageSpec::with`] rather than spliced into launch text, so quoting never
//! matters.

use std::path::Path;

use crate::config::EspeakConfig;
use crate::media::{ConstructionError, PipelineDescription, SampleFormat, StageSpec};

/// Decode any supported file and write it as WAV.
pub fn transcode(
    input: &Path,
    output: &Path,
    format: SampleFormat,
    rate: u32,
) -> PipelineDescription {
    PipelineDescription::new()
        .stage(StageSpec::new("filesrc").with("location", input))
        .stage(StageSpec::new("decodebin"))
        .stage(StageSpec::new("audioresample"))
        .stage(StageSpec::new("audioconvert"))
        .stage(StageSpec::caps(format!(
            "audio/x-raw,format={},rate={rate}",
            format.name()
        )))
        .stage(StageSpec::new("wavenc"))
        .stage(StageSpec::new("filesink").with("location", output))
}

/// Play `uri` through `audio_sink` (a one-stage description).
pub fn playbin(uri: &str, audio_sink: &str) -> Result<PipelineDescription, ConstructionError> {
    sink_stage(audio_sink)?;
    Ok(PipelineDescription::new().stage(
        StageSpec::new("playbin")
            .with("uri", uri)
            .with("audio-sink", audio_sink),
    ))
}

/// Speak `text` with the local engine.
pub fn speech_local(
    text: &str,
    espeak: &EspeakConfig,
    audio_sink: &str,
) -> Result<PipelineDescription, ConstructionError> {
    let sink = sink_stage(audio_sink)?;
    Ok(PipelineDescription::new()
        .stage(
            StageSpec::new("espeak")
                .with("text", text)
                .with("rate", espeak.rate)
                .with("pitch", espeak.pitch)
                .with("voice", espeak.voice.as_str())
                .with("gap", espeak.gap)
                .with("track", espeak.track)
                .with("program", espeak.program.as_str()),
        )
        .stage(sink))
}

/// Save the bytes behind `uri` to `output` unchanged.
pub fn phrase(uri: &str, output: &Path) -> PipelineDescription {
    PipelineDescription::new()
        .stage(StageSpec::new("urisrc").with("uri", uri))
        .stage(StageSpec::new("queue"))
        .stage(StageSpec::new("filesink").with("location", output))
}

/// Camera preview with a clock overlay in a local window.
pub fn camera_local(device: &str) -> Result<PipelineDescription, ConstructionError> {
    let description = PipelineDescription::parse(
        "v4l2src ! videoconvert ! videoscale ! video/x-raw,width=320,height=240 \
         ! clockoverlay shaded-background=true font-desc=\"Sans 16\" ! autovideosink",
    )?;
    Ok(with_device(description, device))
}

/// Camera stream as ogg/theora on a local TCP port, for a browser to open.
pub fn camera_browser(device: &str, port: u16) -> Result<PipelineDescription, ConstructionError> {
    let description = PipelineDescription::parse(&format!(
        "v4l2src ! videoconvert ! videoscale ! video/x-raw,width=400,height=400 \
         ! clockoverlay shaded-background=true font-desc=\"Sans 16\" \
         ! theoraenc ! oggmux ! tcpserversink host=127.0.0.1 port={port}"
    ))?;
    Ok(with_device(description, device))
}

fn with_device(description: PipelineDescription, device: &str) -> PipelineDescription {
    let mut stages = description.stages().iter().cloned();
    let mut out = PipelineDescription::new();
    if let Some(first) = stages.next() {
        out = out.stage(first.with("device", device));
    }
    stages.fold(out, PipelineDescription::stage)
}

/// Parse a sink description that must be exactly one stage.
fn sink_stage(text: &str) -> Result<StageSpec, ConstructionError> {
    let description = PipelineDescription::parse(text)?;
    match description.stages() {
        [stage] => Ok(stage.clone()),
        _ => Err(ConstructionError::InvalidValue {
            element: "audio-sink".into(),
            property: "description".into(),
            reason: format!("expected a single stage, got \"{text}\""),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{
        Element, ElementContext, ElementFactory, FlowError, MediaRuntime, PadKind, ParamValue,
        PropertySpec, Registry,
    };

    #[test]
    fn transcode_matches_launch_syntax() {
        let desc = transcode(
            Path::new("song.mp3"),
            Path::new("song.wav"),
            SampleFormat::S24LE,
            48_000,
        );
        assert_eq!(
            desc.to_string(),
            "filesrc location=song.mp3 ! decodebin ! audioresample ! audioconvert \
             ! audio/x-raw,format=S24LE,rate=48000 ! wavenc ! filesink location=song.wav"
        );
    }

    #[test]
    fn speech_local_carries_every_engine_setting() {
        let espeak = EspeakConfig {
            rate: -20,
            voice: "en-gb".into(),
            ..EspeakConfig::default()
        };
        let desc = speech_local("Hello, world", &espeak, "fakesink sync=true").unwrap();
        let stages = desc.stages();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].param("text"), Some(&ParamValue::from("Hello, world")));
        assert_eq!(stages[0].param("rate"), Some(&ParamValue::Int(-20)));
        assert_eq!(stages[0].param("voice"), Some(&ParamValue::from("en-gb")));
        assert_eq!(stages[1].name, "fakesink");
        assert_eq!(stages[1].param("sync"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn multi_stage_sink_is_rejected() {
        assert!(playbin("file:///a.mp3", "queue ! fakesink").is_err());
        assert!(speech_local("hi", &EspeakConfig::default(), "").is_err());
    }

    #[tokio::test]
    async fn every_audio_template_builds() {
        let media = MediaRuntime::with_defaults(tokio::runtime::Handle::current());
        let espeak = EspeakConfig::default();
        let descriptions = [
            transcode(Path::new("a.mp3"), Path::new("a.wav"), SampleFormat::S16LE, 44_100),
            playbin("http://example.com/a.mp3", "autoaudiosink").unwrap(),
            speech_local("hello", &espeak, "alsasink").unwrap(),
            phrase("https://example.com/tts?q=hi", Path::new("hi.mp3")),
        ];
        for desc in &descriptions {
            media.plan(desc).unwrap_or_else(|e| panic!("{desc}: {e}"));
        }
    }

    /// Stand-in for a video element; never instantiated.
    struct Video(&'static str, PadKind, PadKind);

    impl ElementFactory for Video {
        fn name(&self) -> &'static str {
            self.0
        }
        fn sink_pad(&self) -> PadKind {
            self.1
        }
        fn src_pad(&self) -> PadKind {
            self.2
        }
        fn properties(&self) -> Vec<PropertySpec> {
            ["device", "caps", "shaded-background", "font-desc", "host", "port"]
                .into_iter()
                .map(|name| match name {
                    "shaded-background" => PropertySpec::boolean(name),
                    "port" => PropertySpec::int(name),
                    _ => PropertySpec::string(name),
                })
                .collect()
        }
        fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
            Err(ctx.failed("not available", ""))
        }
    }

    #[tokio::test]
    async fn camera_templates_need_video_elements() {
        let media = MediaRuntime::with_defaults(tokio::runtime::Handle::current());
        let local = camera_local("/dev/video0").unwrap();
        assert!(matches!(
            media.plan(&local),
            Err(ConstructionError::UnknownElement(_))
        ));

        let mut registry = Registry::new();
        let (n, a) = (PadKind::None, PadKind::Any);
        for (name, sink, src) in [
            ("v4l2src", n, a),
            ("videoconvert", a, a),
            ("videoscale", a, a),
            ("capsfilter", a, a),
            ("clockoverlay", a, a),
            ("theoraenc", a, a),
            ("oggmux", a, a),
            ("tcpserversink", a, n),
            ("autovideosink", a, n),
        ] {
            registry.register(Video(name, sink, src));
        }
        let video = MediaRuntime::new(tokio::runtime::Handle::current(), registry);

        let plan = video.plan(&local).unwrap();
        assert_eq!(plan.params[0].get("device"), Some(&ParamValue::from("/dev/video0")));
        let browser = video.plan(&camera_browser("/dev/video0", 8080).unwrap()).unwrap();
        assert_eq!(browser.stages.len(), 8);
        assert_eq!(browser.params[7].get("port"), Some(&ParamValue::Int(8080)));
    }
}
