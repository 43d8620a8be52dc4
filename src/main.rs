//! Application entry point: pipeplay.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG` overrides the `info` default).
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] (defaults on first run or when unreadable).
//! 4. Create the [`tokio`] runtime (multi-thread).
//! 5. Create the [`MediaRuntime`], the [`PipelineRunner`] and the Ctrl-C
//!    [`Interrupts`] on that runtime.
//! 6. Run the chosen demonstration; every item gets a freshly armed
//!    cancellation token.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use pipeplay::{
    config::{AppConfig, AppPaths, SpeechConfig, SpeechMode},
    interrupt::Interrupts,
    media::{MediaRuntime, PipelineDescription},
    pipeline::{PipelineRunner, TerminationEvent},
    probe::AvailabilityProbe,
    radio::{spawn_stdin_reader, RadioPlayer, RadioSettings, StationList},
    speech::{announce, to_uri, Announcement, PhraseCache, Speaker},
    templates,
    transcode::{transcode, WavTarget},
};

const ESPEAK_DEFAULT_TEXT: &str = "Hello world this is e speak talking to you.";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "pipeplay", version, about = "Media pipeline demonstrations")]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Speak text, through the cloud when reachable and espeak otherwise.
    Speak {
        text: Option<String>,
        /// Number of numbered messages spoken when no text is given.
        #[arg(long)]
        count: Option<usize>,
        #[arg(long, conflicts_with = "cloud")]
        local: bool,
        #[arg(long)]
        cloud: bool,
    },
    /// Speak text with the local engine only.
    Espeak { text: Option<String> },
    /// Convert an mp3 file into a wav file next to it.
    Transcode { input: PathBuf },
    /// Fetch and cache the recording of a phrase.
    Phrase { text: Option<String> },
    /// Play files or URIs in turn; Ctrl-C skips to the next one.
    Play {
        #[arg(required = true, value_name = "URI|FILE")]
        items: Vec<String>,
    },
    /// Internet radio with stdin commands.
    Radio {
        /// 1-based station number.
        #[arg(long)]
        station: Option<usize>,
        /// Percent, 0 to 100.
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
        #[arg(long, conflicts_with = "no_muting")]
        muting: bool,
        #[arg(long)]
        no_muting: bool,
    },
    /// Announce the time, the date or the accent demonstration.
    Announce {
        #[arg(value_name = "time|date|accents")]
        which: String,
    },
    /// Camera preview, or a stream on a local TCP port with `--browser`.
    /// Needs video elements in the registry.
    Camera {
        #[arg(long, default_value = "/dev/video0")]
        device: String,
        #[arg(long)]
        browser: bool,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run a pipeline description, e.g. `audiotestsrc num-buffers=50 ! autoaudiosink`.
    Launch {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        description: Vec<String>,
    },
    /// List the configured radio stations.
    Stations,
}

// ---------------------------------------------------------------------------
// Demonstrations
// ---------------------------------------------------------------------------

/// Log how a single item ended.  Returns `false` when it was cancelled.
fn report(area: &str, event: &TerminationEvent) -> bool {
    match event {
        TerminationEvent::EndOfStream => {
            log::debug!("{area}: finished");
            true
        }
        TerminationEvent::Cancelled => {
            log::info!("{area}: interrupted");
            false
        }
        TerminationEvent::Error { .. } => {
            log::error!("{area}: {event}");
            true
        }
    }
}

fn numbered_messages(count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| format!("This is message number {n}"))
        .collect()
}

/// What `speak` says: `text` repeated `count` times (once by default), or
/// the numbered messages.
fn speak_texts(text: Option<String>, count: Option<usize>, speech: &SpeechConfig) -> Vec<String> {
    match text {
        Some(text) => vec![text; count.unwrap_or(1)],
        None => numbered_messages(count.unwrap_or(speech.message_count)),
    }
}

/// Rejoin shell arguments into launch text.  Arguments holding whitespace or
/// quotes had their quoting removed by the shell, so it is put back around
/// the value.
fn launch_text(args: &[String]) -> String {
    fn quote(s: &str) -> String {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }

    args.iter()
        .map(|arg| {
            if !arg.chars().any(|c| c.is_whitespace() || c == '"') {
                return arg.clone();
            }
            match arg.split_once('=') {
                Some((key, value)) if !key.is_empty() && !key.contains(char::is_whitespace) => {
                    format!("{key}={}", quote(value))
                }
                _ => quote(arg),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn camera_description(device: &str, browser: bool, port: u16) -> Result<PipelineDescription> {
    let description = if browser {
        templates::camera_browser(device, port)?
    } else {
        templates::camera_local(device)?
    };
    Ok(description)
}

async fn speak_all(
    speaker: &mut Speaker<AvailabilityProbe>,
    runner: &mut PipelineRunner,
    interrupts: &Interrupts,
    texts: &[String],
) {
    for text in texts {
        log::info!("speak: {text}");
        match speaker.speak(runner, text, &interrupts.arm()).await {
            Ok(event) => {
                if !report("speak", &event) {
                    break;
                }
            }
            Err(e) => log::error!("speak: {e}"),
        }
    }
}

async fn play_all(
    runner: &mut PipelineRunner,
    interrupts: &Interrupts,
    items: &[String],
    sink: &str,
) {
    for item in items {
        let description = match to_uri(item)
            .map_err(anyhow::Error::from)
            .and_then(|uri| Ok(templates::playbin(&uri, sink)?))
        {
            Ok(description) => description,
            Err(e) => {
                log::error!("play: {item}: {e}");
                continue;
            }
        };
        log::info!("play: {item}");
        match runner.play(&description, &interrupts.arm()).await {
            Ok(event) => {
                report("play", &event);
            }
            Err(e) => log::error!("play: {item}: {e}"),
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let mut runner = PipelineRunner::new(MediaRuntime::with_defaults(
        tokio::runtime::Handle::current(),
    ));
    let interrupts = Interrupts::install();

    match cli.command {
        Command::Speak {
            text,
            count,
            local,
            cloud,
        } => {
            let mut speaker = Speaker::new(AvailabilityProbe, &config);
            if local {
                speaker.set_mode(SpeechMode::Local);
            } else if cloud {
                speaker.set_mode(SpeechMode::Cloud);
            }
            let texts = speak_texts(text, count, &config.speech);
            speak_all(&mut speaker, &mut runner, &interrupts, &texts).await;
        }

        Command::Espeak { text } => {
            let mut speaker = Speaker::new(AvailabilityProbe, &config);
            speaker.set_mode(SpeechMode::Local);
            let text = text.unwrap_or_else(|| ESPEAK_DEFAULT_TEXT.to_string());
            speak_all(&mut speaker, &mut runner, &interrupts, &[text]).await;
        }

        Command::Transcode { input } => {
            let target = WavTarget {
                format: config.transcode.sample_format()?,
                rate: config.transcode.rate,
            };
            let report = transcode(&mut runner, &input, target, &interrupts.arm()).await?;
            println!(
                "{} ({:.1} s)",
                report.output.display(),
                report.elapsed.as_secs_f64()
            );
        }

        Command::Phrase { text } => {
            let text = text.unwrap_or_else(|| config.phrase.default_text.clone());
            let cache = PhraseCache::new(config.phrase.resolve_dir(&AppPaths::new()));
            let path = cache
                .fetch(&mut runner, &config.speech, &text, &interrupts.arm())
                .await?;
            println!("{}", path.display());
        }

        Command::Play { items } => {
            play_all(&mut runner, &interrupts, &items, &config.speech.audio_sink).await;
        }

        Command::Radio {
            station,
            volume,
            muting,
            no_muting,
        } => {
            let stations = StationList::new(config.radio.stations.clone())?;
            let settings = RadioSettings {
                station: station.unwrap_or(config.radio.default_station),
                volume: volume.map_or(config.radio.volume, f64::from),
                muting: (muting || config.radio.muting) && !no_muting,
                audio_sink: config.speech.audio_sink.clone(),
            };
            let mut player = RadioPlayer::new(stations.clone(), &settings)?;

            print!("{}", stations.menu());
            println!("Commands: <number>, v <0-100>, m (mute), q (quit)");

            let (tx, mut rx) = mpsc::channel(8);
            spawn_stdin_reader(tx).context("starting the stdin reader")?;
            let outcome = player.play(&mut runner, &mut rx, &interrupts.arm()).await?;
            log::info!("radio: {outcome:?}");
        }

        Command::Announce { which } => {
            let which: Announcement = which.parse()?;
            let mut speaker = Speaker::new(AvailabilityProbe, &config);
            let cache = PhraseCache::new(config.phrase.resolve_dir(&AppPaths::new()));
            let now = chrono::Local::now();
            let event = announce(
                which,
                &now,
                &mut speaker,
                &mut runner,
                &cache,
                &interrupts.arm(),
            )
            .await?;
            report("announce", &event);
        }

        Command::Camera {
            device,
            browser,
            port,
        } => {
            let description = camera_description(&device, browser, port)?;
            let mut pipeline = runner.build(&description)?;
            if browser {
                println!("Open http://127.0.0.1:{port} in a browser");
            }
            let event = runner.run(&mut pipeline, &interrupts.arm()).await?;
            report("camera", &event);
        }

        Command::Launch { description } => {
            let description = PipelineDescription::parse(&launch_text(&description))?;
            log::info!("launch: {description}");
            let event = runner.play(&description, &interrupts.arm()).await?;
            report("launch", &event);
        }

        Command::Stations => {
            let stations = StationList::new(config.radio.stations.clone())?;
            print!("{}", stations.menu());
        }
    }

    runner.media().shutdown();
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();

    // 3. Configuration
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        log::warn!("config: failed to load ({e:#}); using defaults");
        AppConfig::default()
    });

    // 4. Tokio runtime
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .thread_name("pipeplay-rt")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // 5-6. Run
    match runtime.block_on(run(cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
