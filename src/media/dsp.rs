//! Channel mixing and sample-rate conversion.
//!
//! Used by `audioconvert`, `audioresample` and the audio-device sink:
//!
//! 1. [`remix`] — map interleaved audio from one channel count to another.
//! 2. [`StreamResampler`] — incremental rate conversion on top of `rubato`
//!    (`SincFixedIn` + `BlackmanHarris2` window).

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input frames handed to rubato per call.
const CHUNK_FRAMES: usize = 1024;

// ---------------------------------------------------------------------------
// remix
// ---------------------------------------------------------------------------

/// Convert interleaved audio from `from` channels to `to` channels.
///
/// * equal counts: returned unchanged;
/// * down to mono: every frame is averaged;
/// * up from mono: the single channel is duplicated;
/// * anything else: output channel `c` takes input channel `c % from`.
///
/// Zero on either side yields an empty vector.
///
/// ```rust
/// use pipeplay::media::dsp::remix;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = remix(&stereo, 2, 1);
/// assert_eq!(mono.len(), 2);
/// assert!(mono[0].abs() < 1e-6);
/// ```
pub fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == 0 || to == 0 {
        return Vec::new();
    }
    if from == to {
        return samples.to_vec();
    }

    let from = from as usize;
    let to = to as usize;
    let frames = samples.chunks_exact(from);

    if to == 1 {
        return frames
            .map(|frame| frame.iter().sum::<f32>() / from as f32)
            .collect();
    }

    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in frames {
        for c in 0..to {
            out.push(frame[c % from]);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// StreamResampler
// ---------------------------------------------------------------------------

/// Incremental resampler for interleaved audio.
///
/// Feed arbitrarily sized buffers with [`process`](Self::process); input is
/// queued until a full rubato chunk is available.  Call
/// [`flush`](Self::flush) once at end of stream to push out the tail.
///
/// The filter delay is dropped from the head of the output and the tail is
/// cut so a stream of `n` input frames yields `round(n * to / from)` frames.
pub struct StreamResampler {
    inner: Option<SincFixedIn<f32>>,
    channels: usize,
    pending: Vec<Vec<f32>>,
    from: u32,
    to: u32,
    frames_in: u64,
    frames_out: u64,
    /// Output frames still to drop for the filter delay.
    skip: usize,
}

impl StreamResampler {
    /// Build a resampler from `from` Hz to `to` Hz.  Equal rates produce a
    /// passthrough that never touches rubato.
    pub fn new(from: u32, to: u32, channels: u16) -> Result<Self, String> {
        if from == 0 || to == 0 || channels == 0 {
            return Err(format!(
                "cannot resample {from} Hz to {to} Hz with {channels} channels"
            ));
        }

        let inner = if from == to {
            None
        } else {
            let params = SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 128,
                window: WindowFunction::BlackmanHarris2,
            };
            let resampler = SincFixedIn::<f32>::new(
                to as f64 / from as f64,
                1.0,
                params,
                CHUNK_FRAMES,
                channels as usize,
            )
            .map_err(|e| e.to_string())?;
            Some(resampler)
        };
        let skip = inner.as_ref().map_or(0, |r| r.output_delay());

        Ok(Self {
            inner,
            channels: channels as usize,
            pending: vec![Vec::new(); channels as usize],
            from,
            to,
            frames_in: 0,
            frames_out: 0,
            skip,
        })
    }

    /// `true` when input and output rates are equal.
    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Output length owed for everything fed so far.
    fn expected_frames(&self) -> u64 {
        let from = u64::from(self.from);
        (self.frames_in * u64::from(self.to) + from / 2) / from
    }

    /// Queue `interleaved` and return whatever output is ready.
    pub fn process(&mut self, interleaved: &[f32]) -> Result<Vec<f32>, String> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(interleaved.to_vec());
        };

        for frame in interleaved.chunks_exact(self.channels) {
            for (c, &s) in frame.iter().enumerate() {
                self.pending[c].push(s);
            }
            self.frames_in += 1;
        }

        let mut out: Vec<Vec<f32>> = vec![Vec::new(); self.channels];
        loop {
            let needed = inner.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }
            let chunk: Vec<&[f32]> = self.pending.iter().map(|c| &c[..needed]).collect();
            let produced = inner.process(&chunk[..], None).map_err(|e| e.to_string())?;
            append_trimmed(
                produced,
                &mut out,
                &mut self.skip,
                &mut self.frames_out,
                u64::MAX,
            );
            for channel in &mut self.pending {
                channel.drain(..needed);
            }
        }

        Ok(interleave(&out))
    }

    /// Resample the queued remainder and the filter delay line.
    pub fn flush(&mut self) -> Result<Vec<f32>, String> {
        let expected = self.expected_frames();
        let Some(inner) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };

        let mut out: Vec<Vec<f32>> = vec![Vec::new(); self.channels];

        if !self.pending[0].is_empty() {
            let produced = inner
                .process_partial(Some(self.pending.as_slice()), None)
                .map_err(|e| e.to_string())?;
            append_trimmed(
                produced,
                &mut out,
                &mut self.skip,
                &mut self.frames_out,
                expected,
            );
            for channel in &mut self.pending {
                channel.clear();
            }
        }

        // Each empty call pushes one chunk of zeros through the delay line.
        for _ in 0..4 {
            if self.frames_out >= expected {
                break;
            }
            let tail = inner
                .process_partial::<Vec<f32>>(None, None)
                .map_err(|e| e.to_string())?;
            append_trimmed(
                tail,
                &mut out,
                &mut self.skip,
                &mut self.frames_out,
                expected,
            );
        }

        Ok(interleave(&out))
    }
}

/// Append planar `produced` to `out`, first dropping `skip` frames and never
/// letting the running total pass `limit`.
fn append_trimmed(
    produced: Vec<Vec<f32>>,
    out: &mut [Vec<f32>],
    skip: &mut usize,
    frames_out: &mut u64,
    limit: u64,
) {
    let available = produced.iter().map(Vec::len).min().unwrap_or(0);
    let dropped = (*skip).min(available);
    *skip -= dropped;

    let room = usize::try_from(limit.saturating_sub(*frames_out)).unwrap_or(usize::MAX);
    let keep = (available - dropped).min(room);
    for (dst, src) in out.iter_mut().zip(produced) {
        dst.extend_from_slice(&src[dropped..dropped + keep]);
    }
    *frames_out += keep as u64;
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            out.push(channel[i]);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
