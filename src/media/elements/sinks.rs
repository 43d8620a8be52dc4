//! `filesink` and `fakesink`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Duration;

use crate::media::buffer::Buffer;
use crate::media::element::{Element, ElementContext, Sink};
use crate::media::error::FlowError;
use crate::media::registry::{ElementFactory, PadKind, PropertySpec};

// ---------------------------------------------------------------------------
// filesink
// ---------------------------------------------------------------------------

/// Writes every byte buffer to `location`, truncating any existing file.
pub struct FileSink;

impl ElementFactory for FileSink {
    fn name(&self) -> &'static str {
        "filesink"
    }

    fn description(&self) -> &'static str {
        "Write to a local file"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Bytes
    }

    fn src_pad(&self) -> PadKind {
        PadKind::None
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::string("location").live()]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let location = ctx
            .props
            .str("location")
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ctx.failed("No file name specified for writing.", ""))?;
        let file = File::create(&location).map_err(|e| {
            ctx.failed(
                format!("Could not open file \"{location}\" for writing."),
                e.to_string(),
            )
        })?;
        log::debug!("{}: writing {location}", ctx.name);

        Ok(Element::sink(FileWriter {
            name: ctx.name.clone(),
            out: BufWriter::new(file),
            written: 0,
        }))
    }
}

struct FileWriter {
    name: String,
    out: BufWriter<File>,
    written: u64,
}

impl FileWriter {
    fn write_error(&self, e: std::io::Error) -> FlowError {
        FlowError::failed(&self.name, "Could not write to file.", e.to_string())
    }
}

impl Sink for FileWriter {
    fn render(&mut self, buffer: Buffer) -> Result<(), FlowError> {
        let Buffer::Bytes(bytes) = buffer else {
            return Err(FlowError::failed(
                &self.name,
                "Internal data stream error.",
                "filesink expects encoded bytes",
            ));
        };
        if let Err(e) = self.out.write_all(&bytes) {
            return Err(self.write_error(e));
        }
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FlowError> {
        if let Err(e) = self.out.flush() {
            return Err(self.write_error(e));
        }
        log::debug!("{}: wrote {} bytes", self.name, self.written);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// fakesink
// ---------------------------------------------------------------------------

/// Discards everything.  With `sync=true` raw audio is consumed at its
/// playback rate.
pub struct FakeSink;

impl ElementFactory for FakeSink {
    fn name(&self) -> &'static str {
        "fakesink"
    }

    fn description(&self) -> &'static str {
        "Discard all data"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::Any
    }

    fn src_pad(&self) -> PadKind {
        PadKind::None
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::boolean("sync").default_value(false)]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        Ok(Element::sink(Discard {
            ctx: ctx.clone(),
            sync: ctx.props.bool("sync").unwrap_or(false),
            buffers: 0,
        }))
    }
}

struct Discard {
    ctx: ElementContext,
    sync: bool,
    buffers: u64,
}

impl Sink for Discard {
    fn render(&mut self, buffer: Buffer) -> Result<(), FlowError> {
        self.buffers += 1;
        if let (true, Buffer::Audio(audio)) = (self.sync, &buffer) {
            self.ctx
                .sleep(Duration::from_secs_f64(audio.duration_secs()))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FlowError> {
        log::debug!("{}: discarded {} buffers", self.ctx.name, self.buffers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::description::{ParamValue, Params};
    use crate::media::elements::test_support::context;

    #[test]
    fn filesink_writes_bytes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut params = Params::new();
        params.insert("location".into(), ParamValue::from(path.as_path()));
        let (ctx, _rt) = context("filesink0", params);

        let Element::Sink(mut sink) = FileSink.create(&ctx).unwrap() else {
            panic!("expected a sink");
        };
        sink.render(Buffer::Bytes(b"abc".to_vec())).unwrap();
        sink.render(Buffer::Bytes(b"def".to_vec())).unwrap();
        sink.finish().unwrap();
        drop(sink);

        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[test]
    fn filesink_without_location_fails() {
        let (ctx, _rt) = context("filesink0", Params::new());
        assert!(matches!(FileSink.create(&ctx), Err(FlowError::Failed { .. })));
    }

    #[test]
    fn fakesink_sync_stops_when_cancelled() {
        let mut params = Params::new();
        params.insert("sync".into(), ParamValue::Bool(true));
        let (ctx, _rt) = context("fakesink0", params);
        ctx.cancel.cancel();

        let Element::Sink(mut sink) = FakeSink.create(&ctx).unwrap() else {
            panic!("expected a sink");
        };
        let long = crate::media::buffer::AudioBuffer::new(8_000, 1, vec![0.0; 80_000]);
        assert_eq!(sink.render(Buffer::Audio(long)), Err(FlowError::Flushing));
    }
}
