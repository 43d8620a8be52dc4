//! Routed speech: cloud TTS when reachable, local espeak otherwise.
//!
//! ```text
//! speak(text)
//!   ├─ mode = cloud ─────────────────────────────▶ playbin uri=<tts uri>   (reused)
//!   ├─ mode = local ─────────────────────────────▶ espeak text=… ! <sink>  (per run)
//!   └─ mode = auto ─▶ probe(host, port, timeout) ─┬─ true  ─▶ cloud
//!                                                 └─ false ─▶ local
//! ```
//!
//! The probe runs before every utterance, so connectivity changes are picked
//! up between messages.

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, EspeakConfig, ProbeConfig, SpeechConfig, SpeechMode};
use crate::pipeline::{Pipeline, PipelineRunner, TerminationEvent};
use crate::probe::Reachability;
use crate::templates;

use super::tts::TtsRequest;
use super::SpeechError;

/// The path a single utterance takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Cloud,
    Local,
}

pub struct Speaker<R: Reachability> {
    probe: R,
    speech: SpeechConfig,
    espeak: EspeakConfig,
    target: ProbeConfig,
    /// `playbin` kept across cloud utterances; only its `uri` changes.
    cloud: Option<Pipeline>,
}

impl<R: Reachability> Speaker<R> {
    pub fn new(probe: R, config: &AppConfig) -> Self {
        Self {
            probe,
            speech: config.speech.clone(),
            espeak: config.espeak.clone(),
            target: config.probe.clone(),
            cloud: None,
        }
    }

    pub fn speech(&self) -> &SpeechConfig {
        &self.speech
    }

    /// Force a route, or go back to probing with [`SpeechMode::Auto`].
    pub fn set_mode(&mut self, mode: SpeechMode) {
        self.speech.mode = mode;
    }

    pub async fn route(&self) -> Route {
        match self.speech.mode {
            SpeechMode::Cloud => Route::Cloud,
            SpeechMode::Local => Route::Local,
            SpeechMode::Auto => {
                let reachable = self
                    .probe
                    .is_reachable(&self.target.host, self.target.port, self.target.timeout_ms)
                    .await;
                if reachable {
                    Route::Cloud
                } else {
                    log::info!(
                        "speech: {}:{} unreachable, using {}",
                        self.target.host,
                        self.target.port,
                        self.espeak.program
                    );
                    Route::Local
                }
            }
        }
    }

    /// Speak `text` in the configured language.
    pub async fn speak(
        &mut self,
        runner: &mut PipelineRunner,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TerminationEvent, SpeechError> {
        let language = self.speech.language.clone();
        self.speak_in(runner, &language, text, cancel).await
    }

    /// Speak `text` with a cloud accent of `language`.  The local engine
    /// keeps its configured voice.
    pub async fn speak_in(
        &mut self,
        runner: &mut PipelineRunner,
        language: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TerminationEvent, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        match self.route().await {
            Route::Cloud => self.speak_cloud(runner, language, text, cancel).await,
            Route::Local => self.speak_local(runner, text, cancel).await,
        }
    }

    async fn speak_cloud(
        &mut self,
        runner: &mut PipelineRunner,
        language: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TerminationEvent, SpeechError> {
        let uri = TtsRequest {
            endpoint: &self.speech.endpoint,
            language,
            text,
            speed: self.speech.speed,
        }
        .uri()?;
        log::debug!("speech: cloud {uri}");

        let pipeline = match self.cloud.take() {
            Some(mut pipeline) => {
                pipeline.set_live_property("uri", uri)?;
                pipeline
            }
            None => runner.build(&templates::playbin(&uri, &self.speech.audio_sink)?)?,
        };
        let pipeline = self.cloud.insert(pipeline);
        Ok(runner.run(pipeline, cancel).await?)
    }

    async fn speak_local(
        &mut self,
        runner: &mut PipelineRunner,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TerminationEvent, SpeechError> {
        let description = templates::speech_local(text, &self.espeak, &self.speech.audio_sink)?;
        Ok(runner.play(&description, cancel).await?)
    }
}
