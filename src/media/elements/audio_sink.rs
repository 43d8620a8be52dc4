//! Audio-device output via `cpal` (`autoaudiosink`, `alsasink`, `pulsesink`).
//!
//! ```text
//! render(AudioBuffer) ─▶ remix + resample to device format
//!                     ─▶ Arc<Mutex<VecDeque<f32>>> ─▶ cpal output callback
//! ```
//!
//! The cpal stream lives on the streaming thread for the duration of the run
//! and is dropped (closing the device) when the element is released.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use crate::media::buffer::Buffer;
use crate::media::dsp::{remix, StreamResampler};
use crate::media::element::{Element, ElementContext, Sink};
use crate::media::error::FlowError;
use crate::media::registry::{ElementFactory, PadKind, PropertySpec};

/// Queue depth at which `render` waits for the device to catch up.
const MAX_QUEUED_SECS: f64 = 0.5;
const BACKPRESSURE_POLL: Duration = Duration::from_millis(10);
/// Give the device a moment to play out its own buffer after the queue empties.
const PLAYOUT_GRACE: Duration = Duration::from_millis(100);

/// Plays to the default output device (or the device named by `device`).
/// Registered under several names so existing descriptions keep working.
pub struct AudioDeviceSink {
    name: &'static str,
}

impl AudioDeviceSink {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl ElementFactory for AudioDeviceSink {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Play audio on an output device"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn src_pad(&self) -> PadKind {
        PadKind::None
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::string("device")]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let host = cpal::default_host();
        let device = match ctx.props.str("device") {
            Some(wanted) => host
                .output_devices()
                .map_err(|e| ctx.failed("Could not list audio devices.", e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| ctx.failed("Audio device not found.", wanted))?,
            None => host
                .default_output_device()
                .ok_or_else(|| ctx.failed("No output audio device found.", ""))?,
        };

        let supported = device
            .default_output_config()
            .map_err(|e| ctx.failed("Could not query audio device.", e.to_string()))?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let rate = config.sample_rate.0;
        let channels = config.channels;

        let shared = Arc::new(Mutex::new(Playback::default()));
        let stream = match sample_format {
            cpal::SampleFormat::F32 => open_stream::<f32>(&device, &config, &shared),
            cpal::SampleFormat::I16 => open_stream::<i16>(&device, &config, &shared),
            cpal::SampleFormat::U16 => open_stream::<u16>(&device, &config, &shared),
            cpal::SampleFormat::I32 => open_stream::<i32>(&device, &config, &shared),
            other => Err(format!("unsupported device sample format {other}")),
        }
        .map_err(|e| ctx.failed("Could not open audio device.", e))?;

        log::debug!(
            "{}: playing on {} ({rate} Hz, {channels} ch, {sample_format})",
            ctx.name,
            device.name().unwrap_or_else(|_| "unknown device".into())
        );

        Ok(Element::sink(DevicePlayer {
            ctx: ctx.clone(),
            _stream: stream,
            shared,
            rate,
            channels,
            resampler: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// Stream setup
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Playback {
    queue: VecDeque<f32>,
    error: Option<String>,
}

fn lock(shared: &Mutex<Playback>) -> MutexGuard<'_, Playback> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &Arc<Mutex<Playback>>,
) -> Result<cpal::Stream, String>
where
    T: SizedSample + FromSample<f32>,
{
    let data = Arc::clone(shared);
    let errors = Arc::clone(shared);

    let stream = device
        .build_output_stream(
            config,
            move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut playback = lock(&data);
                for slot in out.iter_mut() {
                    *slot = T::from_sample(playback.queue.pop_front().unwrap_or(0.0));
                }
            },
            move |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
                lock(&errors).error = Some(err.to_string());
            },
            None,
        )
        .map_err(|e| e.to_string())?;

    stream.play().map_err(|e| e.to_string())?;
    Ok(stream)
}

// ---------------------------------------------------------------------------
// DevicePlayer
// ---------------------------------------------------------------------------

struct DevicePlayer {
    ctx: ElementContext,
    _stream: cpal::Stream,
    shared: Arc<Mutex<Playback>>,
    rate: u32,
    channels: u16,
    /// Resampler for the current input layout: `(rate, channels, resampler)`.
    resampler: Option<(u32, u16, StreamResampler)>,
}

impl DevicePlayer {
    fn device_error(&self) -> Result<(), FlowError> {
        match lock(&self.shared).error.take() {
            Some(e) => Err(self.ctx.failed("Audio device error.", e)),
            None => Ok(()),
        }
    }

    fn queued(&self) -> usize {
        lock(&self.shared).queue.len()
    }

    /// Remix to device channels, then push once the queue has room.
    fn enqueue(&mut self, samples: Vec<f32>, from_channels: u16) -> Result<(), FlowError> {
        let samples = remix(&samples, from_channels, self.channels);
        let limit = (self.rate as f64 * self.channels as f64 * MAX_QUEUED_SECS) as usize;
        while self.queued() > limit {
            self.device_error()?;
            self.ctx.sleep(BACKPRESSURE_POLL)?;
        }
        lock(&self.shared).queue.extend(samples);
        Ok(())
    }
}

impl Sink for DevicePlayer {
    fn render(&mut self, buffer: Buffer) -> Result<(), FlowError> {
        self.device_error()?;
        let Buffer::Audio(audio) = buffer else {
            return Err(self.ctx.failed(
                "Internal data stream error.",
                "audio sink expects raw audio",
            ));
        };

        let stale = self
            .resampler
            .as_ref()
            .map_or(true, |(r, c, _)| *r != audio.rate || *c != audio.channels);
        if stale {
            let resampler = StreamResampler::new(audio.rate, self.rate, audio.channels)
                .map_err(|e| self.ctx.failed("Could not set up resampler.", e))?;
            self.resampler = Some((audio.rate, audio.channels, resampler));
        }

        let converted = match self.resampler.as_mut() {
            Some((_, _, r)) => r
                .process(&audio.samples)
                .map_err(|e| FlowError::failed(&self.ctx.name, "Resampling failed.", e))?,
            None => audio.samples,
        };
        self.enqueue(converted, audio.channels)
    }

    fn finish(&mut self) -> Result<(), FlowError> {
        if let Some((_, channels, mut resampler)) = self.resampler.take() {
            let tail = resampler
                .flush()
                .map_err(|e| self.ctx.failed("Resampling failed.", e))?;
            self.enqueue(tail, channels)?;
        }

        while self.queued() > 0 {
            self.device_error()?;
            self.ctx.sleep(BACKPRESSURE_POLL)?;
        }
        self.ctx.sleep(PLAYOUT_GRACE)
    }
}
