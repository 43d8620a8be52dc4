//! Interactive radio playback over one reused `playbin` pipeline.
//!
//! ```text
//! start(station) ──▶ await_completion(run token) ─┬─ EndOfStream ─▶ StreamEnded
//!        ▲                                        ├─ Cancelled (Ctrl-C) ─▶ Interrupted
//!        │                                        └─ Error ─▶ wait for a station / quit
//!        └── set uri ◀── Select(n) ◀── commands (volume / mute applied live)
//! ```

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{PipelineController, PipelineError, PipelineRunner, TerminationEvent};
use crate::templates;

use super::command::RadioCommand;
use super::stations::{StationEntry, StationList};
use super::RadioError;

/// Initial selection, usually from configuration or the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioSettings {
    /// 1-based station number.
    pub station: usize,
    /// Percent, `0..=100`.
    pub volume: f64,
    pub muting: bool,
    /// One-stage sink description, e.g. `autoaudiosink`.
    pub audio_sink: String,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            station: 1,
            volume: 50.0,
            muting: false,
            audio_sink: "autoaudiosink".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadioState {
    pub current: usize,
    pub volume: f64,
    pub muted: bool,
}

/// Why [`RadioPlayer::play`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioOutcome {
    Quit,
    Interrupted,
    StreamEnded,
}

enum Action {
    Switch(usize),
    Quit,
}

pub struct RadioPlayer {
    stations: StationList,
    state: RadioState,
    audio_sink: String,
}

impl RadioPlayer {
    /// Checks the station number and volume before anything is built.
    pub fn new(stations: StationList, settings: &RadioSettings) -> Result<Self, RadioError> {
        stations.select(settings.station)?;
        if !(0.0..=100.0).contains(&settings.volume) {
            return Err(RadioError::VolumeOutOfRange(settings.volume));
        }
        Ok(Self {
            stations,
            state: RadioState {
                current: settings.station,
                volume: settings.volume,
                muted: settings.muting,
            },
            audio_sink: settings.audio_sink.clone(),
        })
    }

    pub fn state(&self) -> &RadioState {
        &self.state
    }

    pub fn current(&self) -> Result<&StationEntry, RadioError> {
        self.stations.select(self.state.current)
    }

    /// Play until quit, interrupted or the stream ends.
    pub async fn play(
        &mut self,
        runner: &mut PipelineRunner,
        commands: &mut mpsc::Receiver<RadioCommand>,
        cancel: &CancellationToken,
    ) -> Result<RadioOutcome, RadioError> {
        let station = self.current()?.clone();
        let description = templates::playbin(&station.uri, &self.audio_sink)?;
        let mut pipeline = runner.build(&description)?;
        pipeline.set_live_property("volume", self.state.volume)?;
        pipeline.set_live_property("mute", self.state.muted)?;

        let mut commands_open = true;
        loop {
            let station = self.current()?;
            log::info!("radio: playing {}. {}", self.state.current, station.name);

            let run = cancel.child_token();
            runner.start(&mut pipeline)?;
            let controller = pipeline.controller();
            let mut action = None;

            let event = {
                let wait = runner.await_completion(&mut pipeline, &run);
                tokio::pin!(wait);
                loop {
                    tokio::select! {
                        event = &mut wait => break event,
                        command = commands.recv(), if commands_open => match command {
                            None => commands_open = false,
                            Some(command) => {
                                if let Some(next) = self.apply(command, &controller) {
                                    action = Some(next);
                                    run.cancel();
                                }
                            }
                        },
                    }
                }
            };

            let action = match (action, event) {
                (Some(action), _) => action,
                (None, TerminationEvent::EndOfStream) => {
                    log::info!("radio: stream ended");
                    return Ok(RadioOutcome::StreamEnded);
                }
                (None, TerminationEvent::Cancelled) => return Ok(RadioOutcome::Interrupted),
                (None, TerminationEvent::Error { message, detail }) => {
                    log::error!("radio: {message} ({detail})");
                    if !commands_open {
                        return Err(PipelineError::Runtime { message, detail }.into());
                    }
                    log::info!("radio: choose another station or q to quit");
                    match self
                        .next_action(commands, &controller, cancel, &mut commands_open)
                        .await
                    {
                        Some(action) => action,
                        None => return Ok(RadioOutcome::Interrupted),
                    }
                }
            };

            match action {
                Action::Quit => return Ok(RadioOutcome::Quit),
                Action::Switch(number) => {
                    self.state.current = number;
                    let uri = self.current()?.uri.clone();
                    pipeline.set_live_property("uri", uri)?;
                }
            }
        }
    }

    /// Handle one command; returns an action when the run has to end.
    fn apply(&mut self, command: RadioCommand, controller: &PipelineController) -> Option<Action> {
        match command {
            RadioCommand::Quit => Some(Action::Quit),
            RadioCommand::Select(number) => match self.stations.select(number) {
                Ok(_) => Some(Action::Switch(number)),
                Err(e) => {
                    log::warn!("radio: {e}");
                    None
                }
            },
            RadioCommand::Volume(volume) => {
                match controller.set("volume", volume) {
                    Ok(()) => {
                        self.state.volume = volume;
                        log::info!("radio: volume {volume}");
                    }
                    Err(e) => log::warn!("radio: {e}"),
                }
                None
            }
            RadioCommand::ToggleMute => {
                let muted = !self.state.muted;
                match controller.set("mute", muted) {
                    Ok(()) => {
                        self.state.muted = muted;
                        log::info!("radio: {}", if muted { "muted" } else { "unmuted" });
                    }
                    Err(e) => log::warn!("radio: {e}"),
                }
                None
            }
        }
    }

    /// Wait, with nothing playing, for a command that ends the pause.
    async fn next_action(
        &mut self,
        commands: &mut mpsc::Receiver<RadioCommand>,
        controller: &PipelineController,
        cancel: &CancellationToken,
        commands_open: &mut bool,
    ) -> Option<Action> {
        while *commands_open {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                command = commands.recv() => match command {
                    None => *commands_open = false,
                    Some(command) => {
                        if let Some(action) = self.apply(command, controller) {
                            return Some(action);
                        }
                    }
                },
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use crate::media::{MediaRuntime, ParamValue};

    fn write_tone(path: &Path, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(8_000.0 * seconds) as usize {
            writer.write_sample(1_000i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn file_stations(dir: &Path, seconds: f32) -> StationList {
        let entries = ["a", "b"]
            .iter()
            .map(|name| {
                let path = dir.join(format!("{name}.wav"));
                write_tone(&path, seconds);
                StationEntry::new(*name, format!("file://{}", path.display()))
            })
            .collect();
        StationList::new(entries).unwrap()
    }

    fn settings() -> RadioSettings {
        RadioSettings {
            audio_sink: "fakesink sync=true".into(),
            ..RadioSettings::default()
        }
    }

    fn runner() -> PipelineRunner {
        PipelineRunner::new(MediaRuntime::with_defaults(
            tokio::runtime::Handle::current(),
        ))
    }

    #[test]
    fn bad_initial_settings_are_rejected() {
        let stations = StationList::default();
        let err = RadioPlayer::new(
            stations.clone(),
            &RadioSettings {
                station: 9,
                ..RadioSettings::default()
            },
        )
        .err();
        assert_eq!(
            err,
            Some(RadioError::NoSuchStation {
                number: 9,
                count: 8
            })
        );

        let err = RadioPlayer::new(
            stations,
            &RadioSettings {
                volume: 120.0,
                ..RadioSettings::default()
            },
        )
        .err();
        assert_eq!(err, Some(RadioError::VolumeOutOfRange(120.0)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn short_stream_ends_on_its_own() {
        let dir = tempfile::tempdir().unwrap();
        let stations = file_stations(dir.path(), 0.05);
        let mut player = RadioPlayer::new(
            stations,
            &RadioSettings {
                audio_sink: "fakesink".into(),
                ..RadioSettings::default()
            },
        )
        .unwrap();

        let (_tx, mut rx) = mpsc::channel(4);
        let outcome = player
            .play(&mut runner(), &mut rx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, RadioOutcome::StreamEnded);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn commands_switch_station_and_adjust_volume() {
        let dir = tempfile::tempdir().unwrap();
        let stations = file_stations(dir.path(), 5.0);
        let mut player = RadioPlayer::new(stations, &settings()).unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for command in [
                RadioCommand::Volume(20.0),
                RadioCommand::ToggleMute,
                RadioCommand::Select(7),
                RadioCommand::Select(2),
                RadioCommand::Quit,
            ] {
                tokio::time::sleep(Duration::from_millis(100)).await;
                tx.send(command).await.unwrap();
            }
        });

        let outcome = player
            .play(&mut runner(), &mut rx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, RadioOutcome::Quit);
        assert_eq!(
            player.state(),
            &RadioState {
                current: 2,
                volume: 20.0,
                muted: true
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn interrupt_ends_playback() {
        let dir = tempfile::tempdir().unwrap();
        let stations = file_stations(dir.path(), 5.0);
        let mut player = RadioPlayer::new(stations, &settings()).unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let (_tx, mut rx) = mpsc::channel(4);
        let outcome = player.play(&mut runner(), &mut rx, &cancel).await.unwrap();
        assert_eq!(outcome, RadioOutcome::Interrupted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_station_waits_for_another_choice() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        write_tone(&good, 0.05);
        let stations = StationList::new(vec![
            StationEntry::new("missing", format!("file://{}", dir.path().join("x.wav").display())),
            StationEntry::new("good", format!("file://{}", good.display())),
        ])
        .unwrap();
        let mut player = RadioPlayer::new(
            stations,
            &RadioSettings {
                audio_sink: "fakesink".into(),
                ..RadioSettings::default()
            },
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        tx.send(RadioCommand::Select(2)).await.unwrap();
        let outcome = player
            .play(&mut runner(), &mut rx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(player.state().current, 2);
        assert_eq!(outcome, RadioOutcome::StreamEnded);
    }

    #[tokio::test]
    async fn volume_and_mute_reach_the_pipeline() {
        let mut player = RadioPlayer::new(StationList::default(), &settings()).unwrap();
        let mut runner = runner();
        let pipeline = runner
            .build(&templates::playbin("file:///tmp/a.mp3", "fakesink").unwrap())
            .unwrap();
        let controller = pipeline.controller();

        assert!(player
            .apply(RadioCommand::Volume(35.0), &controller)
            .is_none());
        assert!(player.apply(RadioCommand::ToggleMute, &controller).is_none());
        assert_eq!(pipeline.property("volume"), Some(ParamValue::Float(35.0)));
        assert_eq!(pipeline.property("mute"), Some(ParamValue::Bool(true)));
        assert!(matches!(
            player.apply(RadioCommand::Select(3), &controller),
            Some(Action::Switch(3))
        ));
        assert!(player.apply(RadioCommand::Select(30), &controller).is_none());
    }
}
