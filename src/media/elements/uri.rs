//! `urisrc` and `souphttpsrc`.
//!
//! HTTP bodies are fetched on the runtime's tokio handle by a pump task and
//! handed to the streaming thread through a bounded channel:
//!
//! ```text
//! tokio task: response.chunk() ──mpsc(16)──▶ streaming thread: blocking_recv()
//! ```
//!
//! Both sides observe the run's cancellation token.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::media::buffer::Buffer;
use crate::media::element::{Element, ElementContext, Source};
use crate::media::error::FlowError;
use crate::media::registry::{ElementFactory, PadKind, PropertySpec};

use super::sources::{extension_hint, open_file};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const FILE_BLOCKSIZE: usize = 4096;

fn check_uri(uri: &str) -> Result<(), String> {
    Url::parse(uri).map(|_| ()).map_err(|e| format!("invalid URI: {e}"))
}

fn check_http(location: &str) -> Result<(), String> {
    let url = Url::parse(location).map_err(|e| format!("invalid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme \"{other}\"")),
    }
}

// ---------------------------------------------------------------------------
// urisrc
// ---------------------------------------------------------------------------

/// Byte source for `file://`, `http://` and `https://` URIs.
pub struct UriSrc;

impl ElementFactory for UriSrc {
    fn name(&self) -> &'static str {
        "urisrc"
    }

    fn description(&self) -> &'static str {
        "Read from a file or HTTP URI"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::None
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Bytes
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::string("uri").live().check(check_uri)]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let uri = ctx
            .props
            .str("uri")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ctx.failed("No URI set.", ""))?;
        let url = Url::parse(&uri).map_err(|e| ctx.failed("Invalid URI.", e.to_string()))?;

        let source = match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| ctx.failed("Invalid file URI.", uri.clone()))?;
                open_file(ctx, &path, FILE_BLOCKSIZE)?
            }
            "http" | "https" => open_http(ctx, url)?,
            scheme => {
                return Err(ctx.failed(
                    format!("No URI handler implemented for \"{scheme}\"."),
                    uri,
                ))
            }
        };
        Ok(Element::Source(source))
    }
}

// ---------------------------------------------------------------------------
// souphttpsrc
// ---------------------------------------------------------------------------

/// HTTP-only byte source addressed by `location`.
pub struct SoupHttpSrc;

impl ElementFactory for SoupHttpSrc {
    fn name(&self) -> &'static str {
        "souphttpsrc"
    }

    fn description(&self) -> &'static str {
        "Read from an HTTP(S) URL"
    }

    fn sink_pad(&self) -> PadKind {
        PadKind::None
    }

    fn src_pad(&self) -> PadKind {
        PadKind::Bytes
    }

    fn properties(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::string("location").live().check(check_http)]
    }

    fn create(&self, ctx: &ElementContext) -> Result<Element, FlowError> {
        let location = ctx
            .props
            .str("location")
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ctx.failed("No URL set.", ""))?;
        let url =
            Url::parse(&location).map_err(|e| ctx.failed("Invalid URL.", e.to_string()))?;
        Ok(Element::Source(open_http(ctx, url)?))
    }
}

// ---------------------------------------------------------------------------
// HTTP streaming
// ---------------------------------------------------------------------------

fn is_playlist(url: &Url, content_type: Option<&str>) -> bool {
    url.path().to_ascii_lowercase().ends_with(".m3u8")
        || content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("mpegurl"))
}

fn open_http(ctx: &ElementContext, url: Url) -> Result<Box<dyn Source>, FlowError> {
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("pipeplay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ctx.failed("Could not create HTTP client.", e.to_string()))?;

    log::debug!("{}: GET {url}", ctx.name);
    let cancel = ctx.cancel.clone();
    let request = client.get(url.clone()).send();
    let response = ctx.handle.block_on(async move {
        tokio::select! {
            _ = cancel.cancelled() => Err(FlowError::Flushing),
            result = request => Ok(result),
        }
    })?;
    let response = response
        .map_err(|e| ctx.failed("Could not resolve or connect to server.", e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ctx.failed(
            format!("Could not open resource for reading: HTTP {status}"),
            url.to_string(),
        ));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    if is_playlist(&url, content_type.as_deref()) {
        return Err(ctx.failed("HLS playlists are not supported.", url.to_string()));
    }

    let hint = content_type
        .filter(|ct| ct.starts_with("audio/") || ct.starts_with("application/ogg"))
        .or_else(|| extension_hint(std::path::Path::new(url.path())));

    let (tx, rx) = mpsc::channel(16);
    let pump_cancel = ctx.cancel.clone();
    let name = ctx.name.clone();
    ctx.handle.spawn(async move {
        let mut response = response;
        loop {
            let chunk = tokio::select! {
                _ = pump_cancel.cancelled() => break,
                chunk = response.chunk() => chunk,
            };
            match chunk {
                Ok(Some(bytes)) => {
                    if tx.send(Ok(bytes.to_vec())).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e.to_string())).await;
                    break;
                }
            }
        }
        log::debug!("{name}: body pump finished");
    });

    Ok(Box::new(HttpStream {
        name: ctx.name.clone(),
        hint,
        rx,
        cancel: ctx.cancel.clone(),
    }))
}

struct HttpStream {
    name: String,
    hint: Option<String>,
    rx: mpsc::Receiver<Result<Vec<u8>, String>>,
    cancel: CancellationToken,
}

impl Source for HttpStream {
    fn pull(&mut self) -> Result<Option<Buffer>, FlowError> {
        match self.rx.blocking_recv() {
            Some(Ok(bytes)) => Ok(Some(Buffer::Bytes(bytes))),
            Some(Err(e)) => Err(FlowError::failed(
                &self.name,
                "Could not read from resource.",
                e,
            )),
            None if self.cancel.is_cancelled() => Err(FlowError::Flushing),
            None => Ok(None),
        }
    }

    fn media_hint(&self) -> Option<String> {
        self.hint.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::description::{ParamValue, Params};
    use crate::media::elements::test_support::context;

    #[test]
    fn playlist_detection() {
        let hls = Url::parse("http://example.com/live/radio_one.m3u8").unwrap();
        assert!(is_playlist(&hls, None));
        let mp3 = Url::parse("http://example.com/live/mp3/").unwrap();
        assert!(!is_playlist(&mp3, Some("audio/mpeg")));
        assert!(is_playlist(&mp3, Some("application/vnd.apple.mpegURL")));
    }

    #[test]
    fn uri_and_location_checks() {
        assert!(check_uri("file:///tmp/a.mp3").is_ok());
        assert!(check_uri("not a uri").is_err());
        assert!(check_http("https://example.com/a.mp3").is_ok());
        assert!(check_http("file:///tmp/a.mp3").is_err());
    }

    #[test]
    fn file_uri_opens_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        let uri = Url::from_file_path(&path).unwrap().to_string();

        let mut params = Params::new();
        params.insert("uri".into(), ParamValue::from(uri));
        let (ctx, _rt) = context("urisrc0", params);
        let Element::Source(mut src) = UriSrc.create(&ctx).unwrap() else {
            panic!("expected a source");
        };
        assert_eq!(src.media_hint().as_deref(), Some("wav"));
        assert_eq!(src.pull().unwrap(), Some(Buffer::Bytes(b"RIFF".to_vec())));
        assert_eq!(src.pull().unwrap(), None);
    }

    #[test]
    fn missing_uri_fails_at_start() {
        let (ctx, _rt) = context("urisrc0", Params::new());
        assert!(matches!(
            UriSrc.create(&ctx),
            Err(FlowError::Failed { message, .. }) if message == "No URI set."
        ));
    }

    #[test]
    fn unknown_scheme_fails() {
        let mut params = Params::new();
        params.insert("uri".into(), ParamValue::from("rtsp://camera.local/stream"));
        let (ctx, _rt) = context("urisrc0", params);
        assert!(matches!(UriSrc.create(&ctx), Err(FlowError::Failed { .. })));
    }
}
