//! Data flowing between elements.

use super::caps::SampleFormat;

/// Interleaved, normalised `f32` audio plus the stream properties it was
/// produced with.
///
/// `format` is the sample encoding negotiated downstream; the samples stay
/// `f32` until an encoder quantises them.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            rate,
            channels,
            format: SampleFormat::F32LE,
            samples,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            n => self.samples.len() / n as usize,
        }
    }

    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.rate as f64
    }
}

/// One unit of data handed down the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    /// Undecoded bytes (file or network payload, encoded output).
    Bytes(Vec<u8>),
    /// Decoded audio.
    Audio(AudioBuffer),
}

impl Buffer {
    pub fn len(&self) -> usize {
        match self {
            Buffer::Bytes(b) => b.len(),
            Buffer::Audio(a) => a.samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_and_duration() {
        let buf = AudioBuffer::new(48_000, 2, vec![0.0; 96_000]);
        assert_eq!(buf.frames(), 48_000);
        assert!((buf.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_channels_has_no_frames() {
        let buf = AudioBuffer::new(48_000, 0, vec![0.0; 10]);
        assert_eq!(buf.frames(), 0);
    }

    #[test]
    fn buffer_len_counts_payload() {
        assert_eq!(Buffer::Bytes(vec![1, 2, 3]).len(), 3);
        assert!(Buffer::Audio(AudioBuffer::new(8_000, 1, Vec::new())).is_empty());
    }
}
