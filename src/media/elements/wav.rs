//! `wavenc`: raw audio in, a complete RIFF/WAVE file out (hound).
//!
//! The header needs the final data length, so the encoder holds the stream
//! and emits the whole file as a single buffer at end of stream.

use std::io::Cursor;

use crate::media::buffer::Buffer;
use crate::media::caps::SampleFormat;
use crate::media::element::{Element, ElementContext, Transform};
use crate::media::error::FlowError;
use crate::media::registry::{ElementFactory, PadKind};

pub struct WavEnc;

impl ElementFactory for WavEnc {
    fn name(&self) -> &'static str {
        "wavenc"
    }

    fn description(&self) -> &'static str {
        "Encode raw audio as WAV"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Bytes
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        Ok(Element::transform(WavEncoder {
            name: ctx.name.clone(),
            layout: None,
            samples: Vec::new(),
        }))
    }
}

struct WavEncoder {
    name: String,
    /// `(rate, channels, format)` fixed by the first buffer.
    layout: Option<(u32, u16, SampleFormat)>,
    samples: Vec<f32>,
}

impl WavEncoder {
    fn encode(&self, rate: u32, channels: u16, format: SampleFormat) -> Result<Vec<u8>, hound::Error> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: format.bits_per_sample(),
            sample_format: if format.is_float() {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            if format.is_float() {
                for &s in &self.samples {
                    writer.write_sample(s)?;
                }
            } else {
                for &s in &self.samples {
                    writer.write_sample(format.quantize(s))?;
                }
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

impl Transform for WavEncoder {
    fn chain(&mut self, buffer: Buffer, _out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        let Buffer::Audio(audio) = buffer else {
            return Err(FlowError::failed(
                &self.name,
                "Internal data stream error.",
                "expected raw audio, received encoded bytes",
            ));
        };

        let layout = (audio.rate, audio.channels, audio.format);
        match self.layout {
            None => self.layout = Some(layout),
            Some(existing) if existing != layout => {
                return Err(FlowError::failed(
                    &self.name,
                    "Format changed mid-stream.",
                    format!("{existing:?} -> {layout:?}"),
                ))
            }
            Some(_) => {}
        }

        self.samples.extend_from_slice(&audio.samples);
        Ok(())
    }

    fn drain(&mut self, out: &mut Vec<Buffer>) -> Result<(), FlowError> {
        let Some((rate, channels, format)) = self.layout else {
            log::warn!("{}: no audio received, nothing to encode", self.name);
            return Ok(());
        };

        let bytes = self
            .encode(rate, channels, format)
            .map_err(|e| FlowError::failed(&self.name, "Could not encode WAV.", e.to_string()))?;
        log::debug!(
            "{}: encoded {} bytes ({format}, {rate} Hz, {channels} ch)",
            self.name,
            bytes.len()
        );
        out.push(Buffer::Bytes(bytes));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::buffer::AudioBuffer;

    fn encoder() -> WavEncoder {
        WavEncoder {
            name: "wavenc0".into(),
            layout: None,
            samples: Vec::new(),
        }
    }

    fn audio(format: SampleFormat, samples: Vec<f32>) -> Buffer {
        Buffer::Audio(AudioBuffer {
            rate: 48_000,
            channels: 1,
            format,
            samples,
        })
    }

    #[test]
    fn encodes_s24le_readable_by_hound() {
        let mut enc = encoder();
        let mut out = Vec::new();
        enc.chain(audio(SampleFormat::S24LE, vec![0.5, -0.5]), &mut out).unwrap();
        enc.chain(audio(SampleFormat::S24LE, vec![0.0]), &mut out).unwrap();
        assert!(out.is_empty());
        enc.drain(&mut out).unwrap();

        let [Buffer::Bytes(bytes)] = out.as_slice() else {
            panic!("expected one encoded buffer");
        };
        let mut reader = hound::WavReader::new(Cursor::new(bytes.clone())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(spec.sample_rate, 48_000);
        let samples: Vec<i32> = reader.samples::<i32>().map(Result::unwrap).collect();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], SampleFormat::S24LE.quantize(0.5));
        assert_eq!(samples[2], 0);
    }

    #[test]
    fn float_format_is_written_as_ieee() {
        let mut enc = encoder();
        let mut out = Vec::new();
        enc.chain(audio(SampleFormat::F32LE, vec![0.25]), &mut out).unwrap();
        enc.drain(&mut out).unwrap();
        let Buffer::Bytes(bytes) = &out[0] else {
            panic!("expected bytes");
        };
        let reader = hound::WavReader::new(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    }

    #[test]
    fn layout_change_is_an_error() {
        let mut enc = encoder();
        let mut out = Vec::new();
        enc.chain(audio(SampleFormat::S16LE, vec![0.0]), &mut out).unwrap();
        assert!(enc.chain(audio(SampleFormat::S24LE, vec![0.0]), &mut out).is_err());
    }

    #[test]
    fn nothing_received_emits_nothing() {
        let mut enc = encoder();
        let mut out = Vec::new();
        enc.drain(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
