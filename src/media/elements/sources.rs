//! `filesrc` and `audiotestsrc`.

use std::f64::consts::TAU;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::media::buffer::{AudioBuffer, Buffer};
use crate::media::element::{Element, ElementContext, Source};
use crate::media::error::FlowError;
use crate::media::registry::{ElementFactory, PadKind, PropertySpec};

// ---------------------------------------------------------------------------
// filesrc
// ---------------------------------------------------------------------------

/// Reads a local file in `blocksize` chunks.
pub struct FileSrc;

impl ElementFactory for FileSrc {
    fn name(&self) -> &'static str {
        "filesrc"
    }

    fn description(&self) -> &'static str {
        "Read from a local file"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::None
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Bytes
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![
            PropertySpec::string("location").live(),
            PropertySpec::int("blocksize")
                .range(1.0, (16 * 1024 * 1024) as f64)
                .default_value(4096),
        ]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let location = ctx
            .props
            .str("location")
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ctx.failed("No file name specified for reading.", ""))?;
        let blocksize = ctx.props.i64("blocksize").unwrap_or(4096) as usize;

        Ok(Element::Source(open_file(ctx, &PathBuf::from(location), blocksize)?))
    }
}

/// Open `path` as a byte source; shared with `urisrc` for `file://` URIs.
pub(super) fn open_file(
    ctx: &ElementContext,
    path: &Path,
    blocksize: usize,
) -> Result<Box<dyn Source>, FlowError> {
    let file = File::open(path).map_err(|e| {
        ctx.failed(
            format!("Could not open file \"{}\" for reading.", path.display()),
            e.to_string(),
        )
    })?;
    log::debug!("{}: reading {}", ctx.name, path.display());

    Ok(Box::new(FileReader {
        name: ctx.name.clone(),
        hint: extension_hint(path),
        file,
        blocksize,
    }))
}

pub(super) fn extension_hint(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

struct FileReader {
    name: String,
    hint: Option<String>,
    file: File,
    blocksize: usize,
}

impl Source for FileReader {
    fn pull(&mut self) -> Result<Option<Buffer>, FlowError> {
        let mut block = vec![0u8; self.blocksize];
        let n = self
            .file
            .read(&mut block)
            .map_err(|e| FlowError::failed(&self.name, "Could not read from resource.", e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        block.truncate(n);
        Ok(Some(Buffer::Bytes(block)))
    }

    fn media_hint(&self) -> Option<String> {
        self.hint.clone()
    }
}

// ---------------------------------------------------------------------------
// audiotestsrc
// ---------------------------------------------------------------------------

/// Generates a test tone.  `num-buffers=-1` runs until cancelled.
pub struct AudioTestSrc;

impl ElementFactory for AudioTestSrc {
    fn name(&self) -> &'static str {
        "audiotestsrc"
    }

    fn description(&self) -> &'static str {
        "Generate a test tone"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::None
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![
            PropertySpec::string("wave")
                .choices(&["sine", "square", "silence"])
                .default_value("sine"),
            PropertySpec::float("freq")
                .range(0.0, 20_000.0)
                .default_value(440.0),
            PropertySpec::float("volume").range(0.0, 1.0).default_value(0.8),
            PropertySpec::int("num-buffers")
                .range(-1.0, i32::MAX as f64)
                .default_value(-1),
            PropertySpec::int("samplesperbuffer")
                .range(1.0, 65_536.0)
                .default_value(1024),
            PropertySpec::int("rate")
                .range(1.0, 384_000.0)
                .default_value(44_100),
            PropertySpec::int("channels").range(1.0, 8.0).default_value(1),
        ]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let props = &ctx.props;
        let wave = match props.str("wave").as_deref() {
            Some("square") => Wave::Square,
            Some("silence") => Wave::Silence,
            _ => Wave::Sine,
        };
        let remaining = match props.i64("num-buffers").unwrap_or(-1) {
            n if n < 0 => None,
            n => Some(n as u64),
        };

        Ok(Element::source(ToneGenerator {
            wave,
            freq: props.f64("freq").unwrap_or(440.0),
            amplitude: props.f64("volume").unwrap_or(0.8),
            rate: props.i64("rate").unwrap_or(44_100) as u32,
            channels: props.i64("channels").unwrap_or(1) as u16,
            frames_per_buffer: props.i64("samplesperbuffer").unwrap_or(1024) as usize,
            remaining,
            phase: 0.0,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Wave {
    Sine,
    Square,
    Silence,
}

struct ToneGenerator {
    wave: Wave,
    freq: f64,
    amplitude: f64,
    rate: u32,
    channels: u16,
    frames_per_buffer: usize,
    remaining: Option<u64>,
    /// Position in the current cycle, `0.0..1.0`.
    phase: f64,
}

impl Source for ToneGenerator {
    fn pull(&mut self) -> Result<Option<Buffer>, FlowError> {
        match self.remaining.as_mut() {
            Some(0) => return Ok(None),
            Some(n) => *n -= 1,
            None => {}
        }

        let step = self.freq / self.rate as f64;
        let mut samples = Vec::with_capacity(self.frames_per_buffer * self.channels as usize);
        for _ in 0..self.frames_per_buffer {
            let value = match self.wave {
                Wave::Sine => (self.phase * TAU).sin(),
                Wave::Square if self.phase < 0.5 => 1.0,
                Wave::Square => -1.0,
                Wave::Silence => 0.0,
            } * self.amplitude;
            for _ in 0..self.channels {
                samples.push(value as f32);
            }
            self.phase = (self.phase + step).fract();
        }

        Ok(Some(Buffer::Audio(AudioBuffer::new(
            self.rate,
            self.channels,
            samples,
        ))))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
