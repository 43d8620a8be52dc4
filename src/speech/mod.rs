//! Text-to-speech demos built on the pipeline runner.
//!
//! # Architecture
//!
//! ```text
//! Speaker<R: Reachability>
//!   ├─ route(): mode / probe ──▶ Cloud | Local
//!   ├─ Cloud: TtsRequest::uri ──▶ playbin (one pipeline, uri swapped per utterance)
//!   └─ Local: espeak ! <sink>   (one pipeline per utterance)
//!
//! PhraseCache ──TtsRequest::uri──▶ urisrc ! queue ! filesink  (<dir>/<name>.mp3)
//! announce(time | date | accents) ──▶ cached intro + Speaker
//! ```

pub mod announce;
pub mod phrase;
pub mod speaker;
pub mod tts;

use std::path::Path;

use reqwest::Url;
use thiserror::Error;

use crate::media::ConstructionError;
use crate::pipeline::PipelineError;

pub use announce::{announce, date_text, time_text, Announcement};
pub use phrase::{phrase_name, PhraseCache};
pub use speaker::{Route, Speaker};
pub use tts::TtsRequest;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("nothing to say")]
    EmptyText,

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<ConstructionError> for SpeechError {
    fn from(e: ConstructionError) -> Self {
        SpeechError::Pipeline(e.into())
    }
}

/// `file://` URI for a local path; relative paths are resolved against the
/// working directory.
pub fn file_uri(path: &Path) -> Result<String, SpeechError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| SpeechError::InvalidUri(absolute.display().to_string()))
}

/// Accept either a URI or a local path.
pub fn to_uri(item: &str) -> Result<String, SpeechError> {
    if item.contains("://") {
        Url::parse(item)
            .map(String::from)
            .map_err(|e| SpeechError::InvalidUri(format!("{item}: {e}")))
    } else {
        file_uri(Path::new(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_become_file_uris() {
        assert_eq!(
            file_uri(Path::new("/tmp/a song.mp3")).unwrap(),
            "file:///tmp/a%20song.mp3"
        );
        let relative = file_uri(Path::new("a.mp3")).unwrap();
        assert!(relative.starts_with("file:///") && relative.ends_with("/a.mp3"));
    }

    #[test]
    fn uris_pass_through() {
        assert_eq!(
            to_uri("http://radionz-ice.streamguys.com/concert").unwrap(),
            "http://radionz-ice.streamguys.com/concert"
        );
        assert!(matches!(to_uri("http://[::1"), Err(SpeechError::InvalidUri(_))));
        assert!(to_uri("/tmp/x.wav").unwrap().starts_with("file:///"));
    }
}
