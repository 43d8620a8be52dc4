//! Cache of pre-recorded phrases.
//!
//! A phrase is fetched once from the TTS endpoint and stored as
//! `<dir>/<name>.mp3`, where `name` is the phrase lowercased, stripped of
//! punctuation and joined with underscores:
//!
//! ```text
//! "The time is"      → the_time_is.mp3
//! "Today's date is"  → todays_date_is.mp3
//! ```

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::config::SpeechConfig;
use crate::pipeline::{PipelineRunner, TerminationEvent};
use crate::templates;

use super::tts::TtsRequest;
use super::SpeechError;

/// File stem for `text`, or `None` when nothing printable is left.
pub fn phrase_name(text: &str) -> Option<String> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join("_"))
    }
}

#[derive(Debug, Clone)]
pub struct PhraseCache {
    dir: PathBuf,
}

impl PhraseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, text: &str) -> Result<PathBuf, SpeechError> {
        let name = phrase_name(text).ok_or(SpeechError::EmptyText)?;
        Ok(self.dir.join(format!("{name}.mp3")))
    }

    /// Path of an already cached recording.
    pub fn lookup(&self, text: &str) -> Option<PathBuf> {
        self.path_for(text).ok().filter(|p| p.is_file())
    }

    /// Download the recording for `text`, replacing any cached copy.
    ///
    /// A cancelled or failed download leaves no file behind.
    pub async fn fetch(
        &self,
        runner: &mut PipelineRunner,
        speech: &SpeechConfig,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, SpeechError> {
        let path = self.path_for(text)?;
        if !self.dir.is_dir() {
            log::info!("phrase: creating {}", self.dir.display());
            std::fs::create_dir_all(&self.dir)?;
        }

        let uri = TtsRequest {
            endpoint: &speech.endpoint,
            language: &speech.language,
            text,
            speed: speech.speed,
        }
        .uri()?;

        let event = runner.play(&templates::phrase(&uri, &path), cancel).await?;
        match event {
            TerminationEvent::EndOfStream => {
                log::info!("phrase: saved {}", path.display());
                Ok(path)
            }
            other => {
                if path.exists() {
                    let _ = std::fs::remove_file(&path);
                }
                match other.into_result() {
                    Err(e) => Err(e.into()),
                    Ok(()) => Err(SpeechError::Cancelled),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use crate::media::MediaRuntime;

    #[test]
    fn names_are_normalised() {
        assert_eq!(phrase_name("The cat came back.").as_deref(), Some("the_cat_came_back"));
        assert_eq!(phrase_name("  Today's date is ").as_deref(), Some("todays_date_is"));
        assert_eq!(phrase_name("Hello,   World!").as_deref(), Some("hello_world"));
        assert_eq!(phrase_name("?!."), None);
    }

    #[test]
    fn lookup_only_finds_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PhraseCache::new(dir.path());
        assert!(cache.lookup("The time is").is_none());

        let path = cache.path_for("The time is").unwrap();
        assert_eq!(path, dir.path().join("the_time_is.mp3"));
        std::fs::write(&path, b"mp3").unwrap();
        assert_eq!(cache.lookup("the TIME is"), Some(path));
    }

    /// Serves `body` once and reports the request line.
    async fn serve_once(body: &'static [u8]) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let text = String::from_utf8_lossy(&request);
            let _ = tx.send(text.lines().next().unwrap_or_default().to_string());

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        (format!("http://{addr}/translate_tts"), rx)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_saves_the_response_body() {
        let (endpoint, request_line) = serve_once(b"ID3 fake mp3 bytes").await;
        let dir = tempfile::tempdir().unwrap();
        let cache = PhraseCache::new(dir.path().join("phrase"));
        let speech = SpeechConfig {
            endpoint,
            ..SpeechConfig::default()
        };
        let mut runner = PipelineRunner::new(MediaRuntime::with_defaults(
            tokio::runtime::Handle::current(),
        ));

        let path = cache
            .fetch(&mut runner, &speech, "The cat came back.", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("phrase").join("the_cat_came_back.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3 fake mp3 bytes");
        let line = request_line.await.unwrap();
        assert!(line.contains("tl=en-au"), "{line}");
        assert!(line.contains("q=The+cat+came+back."), "{line}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_fetch_leaves_nothing_behind() {
        // Nothing listens on a port we just released.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let dir = tempfile::tempdir().unwrap();
        let cache = PhraseCache::new(dir.path());
        let speech = SpeechConfig {
            endpoint: format!("http://127.0.0.1:{port}/tts"),
            ..SpeechConfig::default()
        };
        let mut runner = PipelineRunner::new(MediaRuntime::with_defaults(
            tokio::runtime::Handle::current(),
        ));

        let err = cache
            .fetch(&mut runner, &speech, "hello", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Pipeline(_)), "{err}");
        assert!(cache.lookup("hello").is_none());
    }
}
