//! Raw-audio caps strings.
//!
//! Only the `audio/x-raw` media type is understood:
//!
//! ```text
//! audio/x-raw,format=S24LE,rate=48000,channels=2
//! ```
//!
//! Every field is optional; absent fields leave that aspect of the stream
//! unconstrained.  Typed values in the gst style (`rate=(int)48000`) are
//! accepted.

use std::fmt;

// ---------------------------------------------------------------------------
// SampleFormat
// ---------------------------------------------------------------------------

/// Interleaved little-endian sample encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    S16LE,
    S24LE,
    S32LE,
    #[default]
    F32LE,
}

impl SampleFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "S16LE" => Some(SampleFormat::S16LE),
            "S24LE" => Some(SampleFormat::S24LE),
            "S32LE" => Some(SampleFormat::S32LE),
            "F32LE" => Some(SampleFormat::F32LE),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::S16LE => "S16LE",
            SampleFormat::S24LE => "S24LE",
            SampleFormat::S32LE => "S32LE",
            SampleFormat::F32LE => "F32LE",
        }
    }

    pub fn bits_per_sample(self) -> u16 {
        match self {
            SampleFormat::S16LE => 16,
            SampleFormat::S24LE => 24,
            SampleFormat::S32LE | SampleFormat::F32LE => 32,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::F32LE)
    }

    /// Convert a normalised sample to this integer depth, saturating at the
    /// rails.  Meaningless for `F32LE`.
    pub fn quantize(self, sample: f32) -> i32 {
        let max = ((1_i64 << (self.bits_per_sample() - 1)) - 1) as f64;
        let scaled = (sample.clamp(-1.0, 1.0) as f64 * max).round();
        scaled.clamp(-max - 1.0, max) as i32
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// AudioCaps
// ---------------------------------------------------------------------------

/// Constraint on a raw audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioCaps {
    pub format: Option<SampleFormat>,
    pub rate: Option<u32>,
    pub channels: Option<u16>,
}

impl AudioCaps {
    /// Parse a caps string.  The error is a human-readable reason.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut fields = text.split(',').map(str::trim);

        let media_type = fields.next().unwrap_or_default();
        if media_type != "audio/x-raw" {
            return Err(format!("unsupported media type \"{media_type}\""));
        }

        let mut caps = AudioCaps::default();
        for field in fields.filter(|f| !f.is_empty()) {
            let Some((key, raw)) = field.split_once('=') else {
                return Err(format!("malformed caps field \"{field}\""));
            };
            let value = strip_type_annotation(raw.trim());

            match key.trim() {
                "format" => {
                    caps.format = Some(
                        SampleFormat::parse(value)
                            .ok_or_else(|| format!("unsupported sample format \"{value}\""))?,
                    );
                }
                "rate" => {
                    let rate: u32 = value
                        .parse()
                        .map_err(|_| format!("invalid rate \"{value}\""))?;
                    if rate == 0 {
                        return Err("rate must be positive".into());
                    }
                    caps.rate = Some(rate);
                }
                "channels" => {
                    let channels: u16 = value
                        .parse()
                        .map_err(|_| format!("invalid channel count \"{value}\""))?;
                    if channels == 0 {
                        return Err("channels must be positive".into());
                    }
                    caps.channels = Some(channels);
                }
                // layout=interleaved is the only layout produced anyway.
                "layout" => {}
                other => log::debug!("caps: ignoring field \"{other}\""),
            }
        }

        Ok(caps)
    }

    /// `true` when a stream with these properties satisfies the constraint.
    pub fn accepts(&self, rate: u32, channels: u16) -> bool {
        self.rate.map_or(true, |r| r == rate) && self.channels.map_or(true, |c| c == channels)
    }
}

fn strip_type_annotation(value: &str) -> &str {
    match value.strip_prefix('(') {
        Some(rest) => rest.split_once(')').map_or(value, |(_, v)| v.trim()),
        None => value,
    }
}

impl fmt::Display for AudioCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("audio/x-raw")?;
        if let Some(format) = self.format {
            write!(f, ",format={format}")?;
        }
        if let Some(rate) = self.rate {
            write!(f, ",rate={rate}")?;
        }
        if let Some(channels) = self.channels {
            write!(f, ",channels={channels}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_caps() {
        let caps = AudioCaps::parse("audio/x-raw,format=S24LE,rate=48000,channels=2").unwrap();
        assert_eq!(caps.format, Some(SampleFormat::S24LE));
        assert_eq!(caps.rate, Some(48_000));
        assert_eq!(caps.channels, Some(2));
    }

    #[test]
    fn typed_values_are_accepted() {
        let caps = AudioCaps::parse("audio/x-raw, rate=(int)22050, layout=(string)interleaved")
            .unwrap();
        assert_eq!(caps.rate, Some(22_050));
        assert_eq!(caps.format, None);
    }

    #[test]
    fn video_caps_are_rejected() {
        assert!(AudioCaps::parse("video/x-raw,width=640").is_err());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(AudioCaps::parse("audio/x-raw,format=U8").is_err());
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(AudioCaps::parse("audio/x-raw,rate=0").is_err());
    }

    #[test]
    fn accepts_checks_only_present_fields() {
        let caps = AudioCaps::parse("audio/x-raw,rate=48000").unwrap();
        assert!(caps.accepts(48_000, 1));
        assert!(caps.accepts(48_000, 6));
        assert!(!caps.accepts(44_100, 1));
    }

    #[test]
    fn display_matches_parse_input() {
        let text = "audio/x-raw,format=S16LE,rate=16000,channels=1";
        assert_eq!(AudioCaps::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn quantize_saturates() {
        assert_eq!(SampleFormat::S16LE.quantize(1.0), i16::MAX as i32);
        assert_eq!(SampleFormat::S16LE.quantize(-2.0), -(i16::MAX as i32));
        assert_eq!(SampleFormat::S24LE.quantize(0.0), 0);
        assert_eq!(SampleFormat::S24LE.quantize(1.0), (1 << 23) - 1);
    }
}
