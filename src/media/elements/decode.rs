//! `decodebin`: compressed bytes in, raw audio out (symphonia).
//!
//! The upstream chain is wrapped in a [`std::io::Read`] adapter so symphonia
//! can probe and demux it like a file.  Errors raised upstream (a failed
//! HTTP read, a cancelled run) are stashed and re-raised unchanged rather
//! than surfacing as an opaque I/O error from the demuxer.

use std::io::{self, Read};
use std::sync::{Arc, Mutex, PoisonError};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::media::buffer::{AudioBuffer, Buffer};
use crate::media::element::{Element, ElementContext, Source};
use crate::media::error::FlowError;
use crate::media::registry::{ElementFactory, PadKind};

/// Auto-detecting audio decoder (mp3, wav, flac, ogg/vorbis, aac, …).
pub struct DecodeBin;

impl ElementFactory for DecodeBin {
    fn name(&self) -> &'static str {
        "decodebin"
    }

    fn description(&self) -> &'static str {
        "Detect the container and decode the first audio track"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Bytes
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Audio
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let ctx = ctx.clone();
        Ok(Element::Wrap(Box::new(move |upstream| {
            Ok(Box::new(AudioDecoder::open(&ctx, upstream)?) as Box<dyn Source>)
        })))
    }
}

// ---------------------------------------------------------------------------
// UpstreamReader
// ---------------------------------------------------------------------------

type Stash = Arc<Mutex<Option<FlowError>>>;

/// Presents an upstream byte [`Source`] as a [`Read`].
struct UpstreamReader {
    upstream: Mutex<Box<dyn Source>>,
    pending: Vec<u8>,
    pos: usize,
    failure: Stash,
}

impl Read for UpstreamReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            let next = self
                .upstream
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .pull();
            match next {
                Ok(Some(Buffer::Bytes(bytes))) => {
                    self.pending = bytes;
                    self.pos = 0;
                }
                Ok(Some(Buffer::Audio(_))) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "decoder received raw audio",
                    ))
                }
                Ok(None) => return Ok(0),
                Err(e) => {
                    let message = e.to_string();
                    *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
                    return Err(io::Error::new(io::ErrorKind::Other, message));
                }
            }
        }

        let n = out.len().min(self.pending.len() - self.pos);
        out[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn take_stashed(stash: &Stash) -> Option<FlowError> {
    stash.lock().unwrap_or_else(PoisonError::into_inner).take()
}

// ---------------------------------------------------------------------------
// AudioDecoder
// ---------------------------------------------------------------------------

struct AudioDecoder {
    name: String,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    failure: Stash,
    done: bool,
}

impl AudioDecoder {
    fn open(ctx: &ElementContext, upstream: Box<dyn Source>) -> Result<Self, FlowError> {
        let mut hint = Hint::new();
        match upstream.media_hint() {
            Some(h) if h.contains('/') => {
                hint.mime_type(&h);
            }
            Some(h) => {
                hint.with_extension(&h);
            }
            None => {}
        }

        let failure: Stash = Arc::new(Mutex::new(None));
        let reader = UpstreamReader {
            upstream: Mutex::new(upstream),
            pending: Vec::new(),
            pos: 0,
            failure: Arc::clone(&failure),
        };
        let mss = MediaSourceStream::new(Box::new(ReadOnlySource::new(reader)), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                take_stashed(&failure).unwrap_or_else(|| {
                    ctx.failed("Could not determine type of stream.", e.to_string())
                })
            })?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ctx.failed("No audio stream found.", ""))?;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ctx.failed("No decoder available for this stream.", e.to_string()))?;
        let track_id = track.id;

        log::debug!(
            "{}: decoding track {track_id} ({:?} Hz, {:?} channels)",
            ctx.name,
            track.codec_params.sample_rate,
            track.codec_params.channels.map(|c| c.count())
        );

        Ok(Self {
            name: ctx.name.clone(),
            format,
            decoder,
            track_id,
            failure,
            done: false,
        })
    }

    fn stream_error(&self, message: &str, e: SymphoniaError) -> FlowError {
        take_stashed(&self.failure)
            .unwrap_or_else(|| FlowError::failed(&self.name, message, e.to_string()))
    }
}

impl Source for AudioDecoder {
    fn pull(&mut self) -> Result<Option<Buffer>, FlowError> {
        while !self.done {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.done = true;
                    break;
                }
                Err(e) => return Err(self.stream_error("Could not demultiplex stream.", e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    samples.copy_interleaved_ref(decoded);
                    return Ok(Some(Buffer::Audio(AudioBuffer::new(
                        spec.rate,
                        spec.channels.count() as u16,
                        samples.samples().to_vec(),
                    ))));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    log::debug!("{}: skipping undecodable packet: {e}", self.name);
                    continue;
                }
                Err(e) => return Err(self.stream_error("Could not decode stream.", e)),
            }
        }

        Ok(None)
    }
}
