//! mp3 → wav conversion.
//!
//! ```text
//! song.mp3 ─▶ filesrc ! decodebin ! audioresample ! audioconvert
//!           ! audio/x-raw,format=S24LE,rate=48000 ! wavenc ! filesink ─▶ song.wav
//! ```
//!
//! The input must exist and carry an `.mp3` extension (any case); the output
//! is written next to it with the extension replaced.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::media::SampleFormat;
use crate::pipeline::{PipelineError, PipelineRunner, TerminationEvent};
use crate::templates;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("the input file {0} does not exist")]
    NotFound(PathBuf),

    #[error("the input file {0} does not have an .mp3 extension")]
    NotMp3(PathBuf),

    #[error("cancelled, partial output removed")]
    Cancelled,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Output format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavTarget {
    pub format: SampleFormat,
    pub rate: u32,
}

impl Default for WavTarget {
    fn default() -> Self {
        Self {
            format: SampleFormat::S24LE,
            rate: 48_000,
        }
    }
}

/// What a finished conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeReport {
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Validate `input` and return the `.wav` path next to it.
pub fn output_path(input: &Path) -> Result<PathBuf, TranscodeError> {
    if !input.is_file() {
        return Err(TranscodeError::NotFound(input.to_path_buf()));
    }
    let is_mp3 = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));
    if !is_mp3 {
        return Err(TranscodeError::NotMp3(input.to_path_buf()));
    }
    Ok(input.with_extension("wav"))
}

/// Convert `input` and wait for the result.
pub async fn transcode(
    runner: &mut PipelineRunner,
    input: &Path,
    target: WavTarget,
    cancel: &CancellationToken,
) -> Result<TranscodeReport, TranscodeError> {
    let output = output_path(input)?;
    let started = Instant::now();
    let description = templates::transcode(input, &output, target.format, target.rate);

    let event = runner.play(&description, cancel).await?;
    if event != TerminationEvent::EndOfStream && output.exists() {
        let _ = std::fs::remove_file(&output);
    }
    match event {
        TerminationEvent::EndOfStream => {
            let report = TranscodeReport {
                output,
                elapsed: started.elapsed(),
            };
            log::info!(
                "transcode: wrote {} in {} ms",
                report.output.display(),
                report.elapsed.as_millis()
            );
            Ok(report)
        }
        TerminationEvent::Cancelled => Err(TranscodeError::Cancelled),
        TerminationEvent::Error { message, detail } => {
            Err(PipelineError::Runtime { message, detail }.into())
        }
    }
}
