//! Raw-audio filters: `audioconvert`, `audioresample`, `capsfilter`,
//! `volume` and the `queue` passthrough.
//!
//! `audioconvert` and `audioresample` have no properties of their own; they
//! convert towards the nearest downstream `capsfilter` (the plan hands it to
//! them as [`ElementContext::caps`]) and pass audio through unchanged when
//! there is none.

use crate::media::buffer::{AudioBuffer, Buffer};
use crate::media::caps::AudioCaps;
use crate::media::dsp::{remix, StreamResampler};
use crate::media::element::{Element, ElementContext, Transform};
use crate::media::error::FlowError;
use crate::media::props::StageProps;
use crate::media::registry::{ElementFactory, PadKind, PropertySpec};

fn expect_audio(name: &str, buffer: Buffer) -> Result<AudioBuffer, FlowError> {
    match buffer {
        Buffer::Audio(audio) => Ok(audio),
        Buffer::Bytes(_) => Err(FlowError::failed(
            name,
            "Internal data stream error.",
            "expected raw audio, received encoded bytes",
        )),
    }
}

// ---------------------------------------------------------------------------
// audioconvert
// ---------------------------------------------------------------------------

pub struct AudioConvert;

impl ElementFactory for AudioConvert {
    fn name(&self) -> &'static str {
        "audioconvert"
    }

    fn description(&self) -> &'static str {
        "Remix channels to match downstream caps"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        Ok(Element::transform(ChannelMixer {
            name: ctx.name.clone(),
            target: ctx.caps.and_then(|c| c.channels),
        }))
    }
}

struct ChannelMixer {
    name: String,
    target: Option<u16>,
}

impl Transform for ChannelMixer {
    fn chain(&mut self, buffer: Buffer, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        let mut audio = expect_audio(&self.name, buffer)?;
        if let Some(target) = self.target.filter(|&t| t != audio.channels) {
            audio.samples = remix(&audio.samples, audio.channels, target);
            audio.channels = target;
        }
        out.push(Buffer::Audio(audio));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// audioresample
// ---------------------------------------------------------------------------

pub struct AudioResample;

impl ElementFactory for AudioResample {
    fn name(&self) -> &'static str {
        "audioresample"
    }

    fn description(&self) -> &'static str {
        "Convert the sample rate to match downstream caps"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        Ok(Element::transform(RateConverter {
            name: ctx.name.clone(),
            target: ctx.caps.and_then(|c| c.rate),
            active: None,
        }))
    }
}

struct RateConverter {
    name: String,
    target: Option<u32>,
    /// Resampler for the current input layout: `(rate, channels, resampler)`.
    active: Option<(u32, u16, StreamResampler)>,
}

impl RateConverter {
    fn flush_active(&mut self, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        let (Some(target), Some((_, channels, mut resampler))) = (self.target, self.active.take())
        else {
            return Ok(());
        };
        let tail = resampler
            .flush()
            .map_err(|e| FlowError::failed(&self.name, "Resampling failed.", e))?;
        if !tail.is_empty() {
            out.push(Buffer::Audio(AudioBuffer::new(target, channels, tail)));
        }
        Ok(())
    }
}

impl Transform for RateConverter {
    fn chain(&mut self, buffer: Buffer, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        let audio = expect_audio(&self.name, buffer)?;
        let Some(target) = self.target.filter(|&t| t != audio.rate) else {
            out.push(Buffer::Audio(audio));
            return Ok(());
        };

        let layout_changed = self
            .active
            .as_ref()
            .map_or(true, |(rate, channels, _)| *rate != audio.rate || *channels != audio.channels);
        if layout_changed {
            self.flush_active(out)?;
            let resampler = StreamResampler::new(audio.rate, target, audio.channels)
                .map_err(|e| FlowError::failed(&self.name, "Could not set up resampler.", e))?;
            log::debug!("{}: {} Hz -> {target} Hz", self.name, audio.rate);
            self.active = Some((audio.rate, audio.channels, resampler));
        }

        if let Some((_, _, resampler)) = self.active.as_mut() {
            let samples = resampler
                .process(&audio.samples)
                .map_err(|e| FlowError::failed(&self.name, "Resampling failed.", e))?;
            if !samples.is_empty() {
                out.push(Buffer::Audio(AudioBuffer {
                    rate: target,
                    samples,
                    ..audio
                }));
            }
        }
        Ok(())
    }

    fn drain(&mut self, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        self.flush_active(out)
    }
}

// ---------------------------------------------------------------------------
// capsfilter
// ---------------------------------------------------------------------------

fn check_caps(text: &str) -> Result<(), String> {
    AudioCaps::parse(text).map(|_| ())
}

pub struct CapsFilter;

impl ElementFactory for CapsFilter {
    fn name(&self) -> &'static str {
        "capsfilter"
    }

    fn description(&self) -> &'static str {
        "Enforce a raw-audio format"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::string("caps")
            .default_value("audio/x-raw")
            .check(check_caps)]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let text = ctx.props.str("caps").unwrap_or_else(|| "audio/x-raw".into());
        let caps = AudioCaps::parse(&text).map_err(|e| ctx.failed("Invalid caps.", e))?;
        Ok(Element::transform(Filter {
            name: ctx.name.clone(),
            caps,
        }))
    }
}

struct Filter {
    name: String,
    caps: AudioCaps,
}

impl Transform for Filter {
    fn chain(&mut self, buffer: Buffer, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        let mut audio = expect_audio(&self.name, buffer)?;
        if !self.caps.accepts(audio.rate, audio.channels) {
            return Err(FlowError::failed(
                &self.name,
                "Internal data stream error: not negotiated.",
                format!(
                    "stream is {} Hz / {} channels, caps require {}",
                    audio.rate, audio.channels, self.caps
                ),
            ));
        }
        if let Some(format) = self.caps.format {
            audio.format = format;
        }
        out.push(Buffer::Audio(audio));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// volume
// ---------------------------------------------------------------------------

/// Gain stage.  `volume` is a percentage; both properties are re-read for
/// every buffer so live changes apply immediately.
pub struct Volume;

impl ElementFactory for Volume {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn description(&self) -> &'static str {
        "Scale or mute audio"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![
            PropertySpec::float("volume")
                .live()
                .range(0.0, 100.0)
                .default_value(100.0),
            PropertySpec::boolean("mute").live().default_value(false),
        ]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        Ok(Element::transform(Gain {
            name: ctx.name.clone(),
            props: ctx.props.clone(),
        }))
    }
}

struct Gain {
    name: String,
    props: StageProps,
}

impl Gain {
    fn factor(&self) -> f32 {
        if self.props.bool("mute").unwrap_or(false) {
            return 0.0;
        }
        (self.props.f64("volume").unwrap_or(100.0) / 100.0) as f32
    }
}

impl Transform for Gain {
    fn chain(&mut self, buffer: Buffer, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        let mut audio = expect_audio(&self.name, buffer)?;
        let factor = self.factor();
        if factor != 1.0 {
            for s in &mut audio.samples {
                *s *= factor;
            }
        }
        out.push(Buffer::Audio(audio));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// queue
// ---------------------------------------------------------------------------

/// Passthrough for any kind of data.
pub struct Queue;

impl ElementFactory for Queue {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Any
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Any
    }

    fn create(&self, _ctx: &ElementContext) -> Result<Element, FlowError> {
        Ok(Element::transform(Passthrough))
    }
}

struct Passthrough;

impl Transform for Passthrough {
    fn chain(&mut self, buffer: Buffer, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        out.push(buffer);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::caps::SampleFormat;
    use crate::media::description::{ParamValue, Params};
    use crate::media::elements::test_support::context;

    fn transform(
        factory: &dyn ElementFactory,
        params: Params,
        caps: Option<&str>,
    ) -> (Box<dyn Transform>, StageProps) {
        let (mut ctx, _rt) = context("t0", params);
        ctx.caps = caps.map(|c| AudioCaps::parse(c).unwrap());
        let props = ctx.props.clone();
        match factory.create(&ctx).unwrap() {
            Element::Transform(t) => (t, props),
            _ => panic!("expected a transform"),
        }
    }

    fn run(t: &mut dyn Transform, input: AudioBuffer) -> Vec<AudioBuffer> {
        let mut out = Vec::new();
        t.chain(Buffer::Audio(input), &mut out).unwrap();
        t.drain(&mut out).unwrap();
        out.into_iter()
            .map(|b| match b {
                Buffer::Audio(a) => a,
                Buffer::Bytes(_) => panic!("expected audio"),
            })
            .collect()
    }

    #[test]
    fn audioconvert_downmixes_to_caps_channels() {
        let (mut t, _) = transform(&AudioConvert, Params::new(), Some("audio/x-raw,channels=1"));
        let out = run(&mut *t, AudioBuffer::new(48_000, 2, vec![1.0, 0.0, 0.5, 0.5]));
        assert_eq!(out[0].channels, 1);
        assert_eq!(out[0].samples, vec![0.5, 0.5]);
    }

    #[test]
    fn audioconvert_without_caps_passes_through() {
        let (mut t, _) = transform(&AudioConvert, Params::new(), None);
        let input = AudioBuffer::new(48_000, 2, vec![1.0, 0.0]);
        assert_eq!(run(&mut *t, input.clone()), vec![input]);
    }

    #[test]
    fn audioresample_converts_to_caps_rate() {
        let (mut t, _) = transform(&AudioResample, Params::new(), Some("audio/x-raw,rate=48000"));
        let out = run(&mut *t, AudioBuffer::new(24_000, 1, vec![0.25; 24_000]));
        let frames: usize = out.iter().map(AudioBuffer::frames).sum();
        assert!(out.iter().all(|a| a.rate == 48_000));
        assert_eq!(frames, 48_000);
    }

    #[test]
    fn audioresample_same_rate_is_untouched() {
        let (mut t, _) = transform(&AudioResample, Params::new(), Some("audio/x-raw,rate=48000"));
        let input = AudioBuffer::new(48_000, 1, vec![0.1; 32]);
        assert_eq!(run(&mut *t, input.clone()), vec![input]);
    }

    #[test]
    fn capsfilter_sets_format_and_rejects_mismatch() {
        let mut params = Params::new();
        params.insert("caps".into(), ParamValue::from("audio/x-raw,format=S24LE,rate=48000"));
        let (mut t, _) = transform(&CapsFilter, params, None);

        let out = run(&mut *t, AudioBuffer::new(48_000, 2, vec![0.0; 4]));
        assert_eq!(out[0].format, SampleFormat::S24LE);

        let mut sink = Vec::new();
        let err = t
            .chain(Buffer::Audio(AudioBuffer::new(44_100, 2, vec![0.0; 4])), &mut sink)
            .unwrap_err();
        assert!(matches!(err, FlowError::Failed { .. }));
    }

    #[test]
    fn volume_reads_live_properties_per_buffer() {
        let mut params = Params::new();
        params.insert("volume".into(), ParamValue::Float(50.0));
        params.insert("mute".into(), ParamValue::Bool(false));
        let (mut t, props) = transform(&Volume, params, None);

        let out = run(&mut *t, AudioBuffer::new(8_000, 1, vec![0.8, -0.8]));
        assert_eq!(out[0].samples, vec![0.4, -0.4]);

        props.set("mute", ParamValue::Bool(true));
        let out = run(&mut *t, AudioBuffer::new(8_000, 1, vec![0.8, -0.8]));
        assert_eq!(out[0].samples, vec![0.0, 0.0]);
    }

    #[test]
    fn queue_passes_bytes_and_audio() {
        let (mut t, _) = transform(&Queue, Params::new(), None);
        let mut out = Vec::new();
        t.chain(Buffer::Bytes(vec![1, 2]), &mut out).unwrap();
        assert_eq!(out, vec![Buffer::Bytes(vec![1, 2])]);
    }

    #[test]
    fn filters_reject_encoded_bytes() {
        let (mut t, _) = transform(&AudioConvert, Params::new(), None);
        let mut out = Vec::new();
        assert!(t.chain(Buffer::Bytes(vec![0]), &mut out).is_err());
    }
}
