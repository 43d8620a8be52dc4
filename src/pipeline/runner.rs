//! Pipeline runner: build, start, await termination, stop.
//!
//! [`PipelineRunner`] owns the message dispatch table and a [`MediaRuntime`];
//! [`Pipeline`] owns one validated plan, its live property table and at most
//! one streaming session.
//!
//! # Run flow
//!
//! ```text
//! build(description) ──▶ Pipeline [Idle]
//! start(&mut p)       ──▶ spawn worker            [Running]
//! await_completion    ──▶ loop {
//!                           cancel fired?  ─▶ Cancelled
//!                           bus message    ─▶ dispatch ─▶ EndOfStream / Error
//!                           bus closed     ─▶ Error
//!                         }
//!                     ──▶ stop (exactly once)     [Stopped | Failed]
//! set_live_property   ──▶ property table          [Stopped/Failed → Idle]
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::media::{
    BusMessage, ConstructionError, MediaRuntime, MessageKind, ParamValue, PipelineDescription,
    Plan, PropertyTable, Session, ValidationError,
};

use super::dispatch::{Dispatcher, Flow};
use super::state::{PipelineState, TerminationEvent};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors returned by the runner's synchronous operations.
///
/// Asynchronous failures (a file that cannot be opened, a server that does
/// not answer) arrive as [`TerminationEvent::Error`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The description could not be turned into a pipeline.
    #[error("could not build pipeline: {0}")]
    Construction(#[from] ConstructionError),

    /// A live property value was rejected.
    #[error("invalid property: {0}")]
    Validation(#[from] ValidationError),

    /// A run failed.
    #[error("{message} ({detail})")]
    Runtime { message: String, detail: String },

    /// The operation is not allowed in the pipeline's current state.
    #[error("cannot {action} a pipeline that is {state}")]
    InvalidState {
        state: PipelineState,
        action: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A built pipeline.  Dropping it stops any run in progress.
pub struct Pipeline {
    name: String,
    media: MediaRuntime,
    plan: Arc<Plan>,
    props: PropertyTable,
    state: PipelineState,
    session: Option<Session>,
    stops: usize,
}

impl Pipeline {
    fn new(name: String, media: MediaRuntime, plan: Plan) -> Self {
        let props = PropertyTable::new(plan.params.clone());
        Self {
            name,
            media,
            plan: Arc::new(plan),
            props,
            state: PipelineState::Idle,
            session: None,
            stops: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// How many times `stop` ran on this pipeline.
    pub fn stop_count(&self) -> usize {
        self.stops
    }

    /// Current value of a live property.
    pub fn property(&self, key: &str) -> Option<ParamValue> {
        self.controller().get(key)
    }

    /// Handle for changing live properties from another task while this
    /// pipeline is being awaited.
    pub fn controller(&self) -> PipelineController {
        PipelineController {
            plan: Arc::clone(&self.plan),
            props: self.props.clone(),
        }
    }

    /// Validate and store a live property.  A stopped or failed pipeline is
    /// re-armed to `Idle`.
    pub fn set_live_property(
        &mut self,
        key: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), PipelineError> {
        self.controller().set(key, value)?;
        if matches!(self.state, PipelineState::Stopped | PipelineState::Failed) {
            log::debug!("pipeline: {} re-armed by {key}", self.name);
            self.state = PipelineState::Idle;
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), PipelineError> {
        if !self.state.can_start() {
            return Err(PipelineError::InvalidState {
                state: self.state,
                action: "start",
            });
        }
        if self.media.is_closed() {
            return Err(ConstructionError::RuntimeClosed.into());
        }

        // A previous session has already been stopped; drop its bus.
        self.session = None;
        let session = Session::spawn(
            &self.name,
            Arc::clone(&self.plan),
            self.props.clone(),
            self.media.handle().clone(),
        )
        .map_err(|e| PipelineError::Runtime {
            message: "Could not start streaming thread.".into(),
            detail: e.to_string(),
        })?;

        self.session = Some(session);
        self.state = PipelineState::Running;
        log::debug!("pipeline: {} running", self.name);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
        if let Some(mut session) = self.session.take() {
            session.stop();
            log::debug!("pipeline: {} stopped", self.name);
        }
        self.state = PipelineState::Stopped;
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("stages", &self.plan.stages)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PipelineController
// ---------------------------------------------------------------------------

/// Cloneable live-property handle for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineController {
    plan: Arc<Plan>,
    props: PropertyTable,
}

impl PipelineController {
    /// Set `key` on the first stage that declares it live.
    ///
    /// `volume`/`mute` apply from the next buffer; `uri`/`location` apply on
    /// the next start.
    pub fn set(&self, key: &str, value: impl Into<ParamValue>) -> Result<(), ValidationError> {
        let (index, spec) = self
            .plan
            .live_slot(key)
            .ok_or_else(|| ValidationError::UnknownProperty(key.to_string()))?;
        let value = spec.coerce(&value.into())?;
        log::debug!("pipeline: {}.{key} = {value}", self.plan.stages[index].name);
        self.props.set(index, key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        let (index, _) = self.plan.live_slot(key)?;
        self.props.get(index, key)
    }
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// Builds pipelines and drives their runs.
///
/// ```rust,no_run
/// use pipeplay::media::MediaRuntime;
/// use pipeplay::pipeline::{PipelineRunner, TerminationEvent};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), pipeplay::pipeline::PipelineError> {
/// let media = MediaRuntime::with_defaults(tokio::runtime::Handle::current());
/// let mut runner = PipelineRunner::new(media);
/// let desc = "filesrc location=song.mp3 ! decodebin ! autoaudiosink".parse()?;
/// let event = runner.play(&desc, &CancellationToken::new()).await?;
/// assert_eq!(event, TerminationEvent::EndOfStream);
/// # Ok(())
/// # }
/// ```
pub struct PipelineRunner {
    media: MediaRuntime,
    dispatcher: Dispatcher,
    built: usize,
}

impl PipelineRunner {
    /// Runner with the default dispatch table.
    pub fn new(media: MediaRuntime) -> Self {
        Self::with_dispatcher(media, Dispatcher::default())
    }

    pub fn with_dispatcher(media: MediaRuntime, dispatcher: Dispatcher) -> Self {
        Self {
            media,
            dispatcher,
            built: 0,
        }
    }

    pub fn media(&self) -> &MediaRuntime {
        &self.media
    }

    /// Add a handler for one message kind.
    pub fn connect<F>(&mut self, kind: MessageKind, handler: F) -> &mut Self
    where
        F: FnMut(&BusMessage) -> Flow + Send + 'static,
    {
        self.dispatcher.connect(kind, handler);
        self
    }

    /// Add a handler for every message.
    pub fn connect_any<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&BusMessage) -> Flow + Send + 'static,
    {
        self.dispatcher.connect_any(handler);
        self
    }

    /// Validate `description` and return an `Idle` pipeline.
    pub fn build(&mut self, description: &PipelineDescription) -> Result<Pipeline, PipelineError> {
        let plan = self.media.plan(description)?;
        let name = format!("pipeline{}", self.built);
        self.built += 1;
        log::debug!("pipeline: built {name}: {description}");
        Ok(Pipeline::new(name, self.media.clone(), plan))
    }

    /// `Idle | Stopped | Failed → Running`.
    pub fn start(&self, pipeline: &mut Pipeline) -> Result<(), PipelineError> {
        pipeline.start()
    }

    /// Wait for the run to end.  `stop` runs exactly once before this
    /// returns, whatever the outcome.
    pub async fn await_completion(
        &mut self,
        pipeline: &mut Pipeline,
        cancel: &CancellationToken,
    ) -> TerminationEvent {
        let state = pipeline.state;
        let session = match pipeline.session.as_mut() {
            Some(session) if state.is_running() => session,
            _ => {
                return TerminationEvent::Error {
                    message: "Pipeline is not running.".into(),
                    detail: format!("{} is {state}", pipeline.name),
                }
            }
        };

        let event = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                message = session.bus().recv() => Some(message),
            };

            match next {
                None => break TerminationEvent::Cancelled,
                Some(None) => {
                    break TerminationEvent::Error {
                        message: "Streaming stopped without end of stream.".into(),
                        detail: pipeline.name.clone(),
                    }
                }
                Some(Some(message)) => {
                    if let Some(event) = self.dispatcher.dispatch(&message) {
                        break event;
                    }
                }
            }
        };

        pipeline.stop();
        if event.is_error() {
            pipeline.state = PipelineState::Failed;
        }
        log::info!("pipeline: {} finished: {event}", pipeline.name);
        event
    }

    /// Idempotent; any state → `Stopped`.
    pub fn stop(&self, pipeline: &mut Pipeline) {
        pipeline.stop();
    }

    pub fn set_live_property(
        &self,
        pipeline: &mut Pipeline,
        key: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), PipelineError> {
        pipeline.set_live_property(key, value)
    }

    /// `start` followed by `await_completion`.
    pub async fn run(
        &mut self,
        pipeline: &mut Pipeline,
        cancel: &CancellationToken,
    ) -> Result<TerminationEvent, PipelineError> {
        self.start(pipeline)?;
        Ok(self.await_completion(pipeline, cancel).await)
    }

    /// Build, run and drop a pipeline for one description.
    pub async fn play(
        &mut self,
        description: &PipelineDescription,
        cancel: &CancellationToken,
    ) -> Result<TerminationEvent, PipelineError> {
        let mut pipeline = self.build(description)?;
        self.run(&mut pipeline, cancel).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::media::StageSpec;

    fn runner() -> PipelineRunner {
        PipelineRunner::new(MediaRuntime::with_defaults(
            tokio::runtime::Handle::current(),
        ))
    }

    fn desc(text: &str) -> PipelineDescription {
        text.parse().expect("valid description")
    }

    fn write_tone(path: &Path, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (8_000.0 * seconds) as usize;
        for i in 0..frames {
            let t = i as f32 / 8_000.0;
            let s = (t * 440.0 * std::f32::consts::TAU).sin() * 0.4;
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Roughly one second of silent MPEG-1 layer III frames (128 kbit/s,
    /// 44.1 kHz, no padding, 417 bytes each).
    fn write_silent_mp3(path: &Path) {
        let mut bytes = Vec::new();
        for _ in 0..40 {
            bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
            bytes.extend(std::iter::repeat(0u8).take(413));
        }
        std::fs::write(path, bytes).unwrap();
    }

    fn file_uri(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    #[tokio::test]
    async fn build_then_stop_without_start() {
        let mut runner = runner();
        let mut p = runner.build(&desc("audiotestsrc ! fakesink")).unwrap();
        assert_eq!(p.state(), PipelineState::Idle);
        assert_eq!(p.name(), "pipeline0");

        runner.stop(&mut p);
        runner.stop(&mut p);
        assert_eq!(p.state(), PipelineState::Stopped);
        assert_eq!(p.stop_count(), 2);
    }

    #[tokio::test]
    async fn unknown_stage_is_a_construction_error() {
        let mut runner = runner();
        let err = runner
            .build(&desc("filesrc location=a.mp3 ! bogus_stage ! fakesink"))
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::Construction(ConstructionError::UnknownElement("bogus_stage".into()))
        );
    }

    #[tokio::test]
    async fn build_fails_on_closed_runtime() {
        let mut runner = runner();
        runner.media().shutdown();
        let err = runner.build(&desc("audiotestsrc ! fakesink")).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Construction(ConstructionError::RuntimeClosed)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn finite_source_reaches_end_of_stream() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc num-buffers=5 ! volume volume=50 ! fakesink"))
            .unwrap();
        let event = runner.run(&mut p, &CancellationToken::new()).await.unwrap();
        assert_eq!(event, TerminationEvent::EndOfStream);
        assert_eq!(p.state(), PipelineState::Stopped);
        assert_eq!(p.stop_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_while_running_is_rejected() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc num-buffers=-1 ! fakesink sync=true"))
            .unwrap();
        runner.start(&mut p).unwrap();
        let err = runner.start(&mut p).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidState {
                state: PipelineState::Running,
                action: "start"
            }
        );
        runner.stop(&mut p);
        assert!(!p.state().is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancellation_stops_exactly_once() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc num-buffers=-1 ! fakesink sync=true"))
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let event = runner.run(&mut p, &cancel).await.unwrap();
        assert_eq!(event, TerminationEvent::Cancelled);
        assert_eq!(p.state(), PipelineState::Stopped);
        assert_eq!(p.stop_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn already_cancelled_token_wins() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc num-buffers=1 ! fakesink"))
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let event = runner.run(&mut p, &cancel).await.unwrap();
        assert_eq!(event, TerminationEvent::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_file_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp3");
        let mut runner = runner();
        let mut p = runner
            .build(
                &PipelineDescription::new()
                    .stage(StageSpec::new("filesrc").with("location", missing.as_path()))
                    .stage(StageSpec::new("decodebin"))
                    .stage(StageSpec::new("fakesink")),
            )
            .unwrap();

        let event = runner.run(&mut p, &CancellationToken::new()).await.unwrap();
        match &event {
            TerminationEvent::Error { detail, .. } => assert!(detail.starts_with("filesrc0")),
            other => panic!("expected an error, got {other:?}"),
        }
        assert_eq!(p.state(), PipelineState::Failed);
        assert_eq!(p.stop_count(), 1);
        assert!(event.into_result().is_err());
    }

    #[tokio::test]
    async fn awaiting_an_idle_pipeline_is_an_error_without_side_effects() {
        let mut runner = runner();
        let mut p = runner.build(&desc("audiotestsrc ! fakesink")).unwrap();
        let event = runner
            .await_completion(&mut p, &CancellationToken::new())
            .await;
        assert!(event.is_error());
        assert_eq!(p.state(), PipelineState::Idle);
        assert_eq!(p.stop_count(), 0);
    }

    #[tokio::test]
    async fn volume_range_is_enforced() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc ! volume ! fakesink"))
            .unwrap();

        for bad in [-1.0, 101.0] {
            let err = runner.set_live_property(&mut p, "volume", bad).unwrap_err();
            assert!(matches!(
                err,
                PipelineError::Validation(ValidationError::OutOfRange { .. })
            ));
        }
        runner.set_live_property(&mut p, "volume", 0.0).unwrap();
        runner.set_live_property(&mut p, "volume", 100).unwrap();
        assert_eq!(p.property("volume"), Some(ParamValue::Float(100.0)));
    }

    #[tokio::test]
    async fn live_property_type_and_name_are_checked() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc ! volume ! fakesink"))
            .unwrap();
        assert!(matches!(
            runner.set_live_property(&mut p, "mute", "loud"),
            Err(PipelineError::Validation(ValidationError::WrongType { .. }))
        ));
        assert!(matches!(
            runner.set_live_property(&mut p, "uri", "file:///a.mp3"),
            Err(PipelineError::Validation(ValidationError::UnknownProperty(_)))
        ));
    }

    #[tokio::test]
    async fn setting_a_property_rearms_a_stopped_pipeline() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc ! volume ! fakesink"))
            .unwrap();
        runner.stop(&mut p);
        assert_eq!(p.state(), PipelineState::Stopped);
        runner.set_live_property(&mut p, "mute", true).unwrap();
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn playbin_is_reused_across_uris() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.wav");
        let second = dir.path().join("second.wav");
        write_tone(&first, 0.2);
        write_tone(&second, 0.1);

        let mut runner = runner();
        let mut p = runner
            .build(
                &PipelineDescription::new().stage(
                    StageSpec::new("playbin")
                        .with("uri", file_uri(&first))
                        .with("audio-sink", "fakesink"),
                ),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        assert_eq!(
            runner.run(&mut p, &cancel).await.unwrap(),
            TerminationEvent::EndOfStream
        );

        runner
            .set_live_property(&mut p, "uri", file_uri(&second))
            .unwrap();
        assert_eq!(p.state(), PipelineState::Idle);
        assert_eq!(
            runner.run(&mut p, &cancel).await.unwrap(),
            TerminationEvent::EndOfStream
        );
        assert_eq!(p.stop_count(), 2);
        assert_eq!(p.property("uri"), Some(ParamValue::from(file_uri(&second))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_pipeline_can_be_restarted_after_fixing_the_uri() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        write_tone(&good, 0.1);

        let mut runner = runner();
        let mut p = runner
            .build(
                &PipelineDescription::new().stage(
                    StageSpec::new("playbin")
                        .with("uri", file_uri(&dir.path().join("missing.wav")))
                        .with("audio-sink", "fakesink"),
                ),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        assert!(runner.run(&mut p, &cancel).await.unwrap().is_error());
        assert_eq!(p.state(), PipelineState::Failed);

        runner.set_live_property(&mut p, "uri", file_uri(&good)).unwrap();
        assert_eq!(
            runner.run(&mut p, &cancel).await.unwrap(),
            TerminationEvent::EndOfStream
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transcode_chain_writes_a_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fixture.wav");
        let output = dir.path().join("fixture.out.wav");
        write_tone(&input, 0.25);

        let description = PipelineDescription::new()
            .stage(StageSpec::new("filesrc").with("location", input.as_path()))
            .stage(StageSpec::new("decodebin"))
            .stage(StageSpec::new("audioresample"))
            .stage(StageSpec::new("audioconvert"))
            .stage(StageSpec::caps("audio/x-raw,format=S24LE,rate=48000"))
            .stage(StageSpec::new("wavenc"))
            .stage(StageSpec::new("filesink").with("location", output.as_path()));

        let mut runner = runner();
        let event = runner
            .play(&description, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(event, TerminationEvent::EndOfStream);

        let reader = hound::WavReader::open(&output).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 48_000);
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(spec.channels, 1);
        // 0.25 s in, 0.25 s out.
        assert_eq!(reader.duration(), 12_000);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mp3_transcodes_to_a_non_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fixture.mp3");
        let output = dir.path().join("fixture.wav");
        write_silent_mp3(&input);

        let description = PipelineDescription::new()
            .stage(StageSpec::new("filesrc").with("location", input.as_path()))
            .stage(StageSpec::new("decodebin"))
            .stage(StageSpec::new("audioresample"))
            .stage(StageSpec::new("audioconvert"))
            .stage(StageSpec::caps("audio/x-raw,format=S24LE,rate=48000"))
            .stage(StageSpec::new("wavenc"))
            .stage(StageSpec::new("filesink").with("location", output.as_path()));

        let mut runner = runner();
        let event = runner
            .play(&description, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(event, TerminationEvent::EndOfStream);
        assert!(std::fs::metadata(&output).unwrap().len() > 44);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn extra_handlers_see_bus_traffic() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let mut runner = runner();
        runner.connect(MessageKind::StreamStart, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Flow::Continue
        });
        let event = runner
            .play(
                &desc("audiotestsrc num-buffers=2 ! fakesink"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(event, TerminationEvent::EndOfStream);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn controller_changes_volume_while_running() {
        let mut runner = runner();
        let mut p = runner
            .build(&desc("audiotestsrc num-buffers=-1 ! volume ! fakesink sync=true"))
            .unwrap();
        let controller = p.controller();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            controller.set("volume", 10.0).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let event = runner.run(&mut p, &cancel).await.unwrap();
        assert_eq!(event, TerminationEvent::Cancelled);
        assert_eq!(p.property("volume"), Some(ParamValue::Float(10.0)));
    }
}
