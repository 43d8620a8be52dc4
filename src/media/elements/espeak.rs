//! `espeak`: local speech synthesis through the `espeak-ng` program.
//!
//! The engine renders the whole utterance to a scratch WAV file; the element
//! then streams that file as audio buffers.  The child process is killed if
//! the run is cancelled while it is still synthesising.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::media::buffer::{AudioBuffer, Buffer};
use crate::media::element::{Element, ElementContext, Source};
use crate::media::error::FlowError;
use crate::media::registry::{ElementFactory, PadKind, PropertySpec};

const FRAMES_PER_BUFFER: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// espeak-ng speaking rate (words per minute) at `rate=0`.
const BASE_WPM: f64 = 175.0;

/// Speech source.  `rate` and `pitch` are relative adjustments in
/// `-100..=100`; `gap` is the pause between words in 10 ms units.
pub struct Espeak;

impl ElementFactory for Espeak {
    fn name(&self) -> &'static str {
        "espeak"
    }

    fn description(&self) -> &'static str {
        "Synthesise speech with eSpeak NG"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::None
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![
            PropertySpec::string("text").default_value(""),
            PropertySpec::int("rate").range(-100.0, 100.0).default_value(0),
            PropertySpec::int("pitch").range(-100.0, 100.0).default_value(0),
            PropertySpec::string("voice").default_value("en"),
            PropertySpec::int("gap")
                .range(0.0, i32::MAX as f64)
                .default_value(0),
            PropertySpec::int("track").range(0.0, 2.0).default_value(0),
            PropertySpec::string("program").default_value("espeak-ng"),
        ]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let props = &ctx.props;
        let request = SpeechRequest {
            text: props.str("text").unwrap_or_default(),
            rate: props.i64("rate").unwrap_or(0),
            pitch: props.i64("pitch").unwrap_or(0),
            voice: props.str("voice").unwrap_or_else(|| "en".into()),
            gap: props.i64("gap").unwrap_or(0),
        };
        let program = props.str("program").unwrap_or_else(|| "espeak-ng".into());

        if request.text.trim().is_empty() {
            return Err(ctx.failed("No text to speak.", ""));
        }

        let scratch = tempfile::Builder::new()
            .prefix("pipeplay-espeak-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| ctx.failed("Could not create scratch file.", e.to_string()))?;

        synthesise(ctx, &program, &request, scratch.path())?;
        let audio = read_wav(scratch.path()).map_err(|e| {
            ctx.failed("Speech engine produced unreadable audio.", e.to_string())
        })?;

        if props.i64("track").unwrap_or(0) > 0 {
            for (i, word) in request.text.split_whitespace().enumerate() {
                ctx.bus.info(&ctx.name, format!("word {i}: {word}"));
            }
        }

        log::debug!(
            "{}: synthesised {:.2}s of speech",
            ctx.name,
            audio.duration_secs()
        );

        Ok(Element::source(SpeechAudio { audio, offset: 0 }))
    }
}

// ---------------------------------------------------------------------------
// Engine invocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SpeechRequest {
    text: String,
    rate: i64,
    pitch: i64,
    voice: String,
    gap: i64,
}

impl SpeechRequest {
    /// Command-line arguments for espeak-ng, excluding the program name.
    fn args(&self, output: &Path) -> Vec<String> {
        let wpm = (BASE_WPM * (1.0 + self.rate as f64 / 100.0)).max(80.0).round() as i64;
        let pitch = (50 + self.pitch / 2).clamp(0, 99);
        vec![
            "-w".into(),
            output.display().to_string(),
            "-s".into(),
            wpm.to_string(),
            "-p".into(),
            pitch.to_string(),
            "-v".into(),
            self.voice.clone(),
            "-g".into(),
            self.gap.to_string(),
            self.text.clone(),
        ]
    }
}

fn synthesise(
    ctx: &ElementContext,
    program: &str,
    request: &SpeechRequest,
    output: &Path,
) -> Result<(), FlowError> {
    let mut child = Command::new(program)
        .args(request.args(output))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ctx.failed(format!("Could not launch speech engine \"{program}\"."), e.to_string()))?;

    let status = loop {
        if ctx.cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FlowError::Flushing);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(ctx.failed("Lost track of speech engine.", e.to_string()));
            }
        }
    };

    if !status.success() {
        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            use std::io::Read;
            let _ = pipe.read_to_string(&mut stderr);
        }
        return Err(ctx.failed(
            format!("Speech engine exited with {status}."),
            stderr.trim().to_string(),
        ));
    }

    Ok(())
}

/// Load a WAV file into a normalised interleaved buffer.
pub(super) fn read_wav(path: &Path) -> Result<AudioBuffer, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(AudioBuffer::new(spec.sample_rate, spec.channels, samples))
}

// ---------------------------------------------------------------------------
// SpeechAudio
// ---------------------------------------------------------------------------

struct SpeechAudio {
    audio: AudioBuffer,
    /// Next sample index.
    offset: usize,
}

impl Source for SpeechAudio {
    fn pull(&mut self) -> Result<Option<Buffer>, FlowError> {
        let total = self.audio.samples.len();
        if self.offset >= total {
            return Ok(None);
        }
        let step = FRAMES_PER_BUFFER * self.audio.channels.max(1) as usize;
        let end = (self.offset + step).min(total);
        let samples = self.audio.samples[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(Buffer::Audio(AudioBuffer::new(
            self.audio.rate,
            self.audio.channels,
            samples,
        ))))
    }
}
