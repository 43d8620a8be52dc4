//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Missing sections and
//! fields fall back to their defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::media::SampleFormat;
use crate::probe;
use crate::radio::{default_stations, StationEntry};

// ---------------------------------------------------------------------------
// SpeechMode
// ---------------------------------------------------------------------------

/// Which speech path to use.
///
/// | Variant | Path |
/// |---|---|
/// | Auto  | probe first: cloud when reachable, espeak otherwise |
/// | Cloud | always the TTS endpoint |
/// | Local | always espeak |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechMode {
    #[default]
    Auto,
    Cloud,
    Local,
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Cloud text-to-speech and the shared output sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub mode: SpeechMode,
    /// TTS endpoint; query parameters are appended.
    pub endpoint: String,
    /// Language/accent code sent as `tl`, e.g. `en-au`.
    pub language: String,
    /// Optional `ttsspeed` (1.0 normal, 0.3 slow).
    pub speed: Option<f32>,
    /// One-stage sink description used by every speech and playback path.
    pub audio_sink: String,
    /// Messages spoken by `speak` when no text is given.
    pub message_count: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            mode: SpeechMode::Auto,
            endpoint: "https://translate.google.com/translate_tts".into(),
            language: "en-au".into(),
            speed: None,
            audio_sink: "autoaudiosink".into(),
            message_count: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// EspeakConfig
// ---------------------------------------------------------------------------

/// Local speech engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EspeakConfig {
    /// Executable to launch (`espeak-ng` or `espeak`).
    pub program: String,
    pub voice: String,
    /// -100 to 100.
    pub rate: i64,
    /// -100 to 100.
    pub pitch: i64,
    /// Extra pause between words, in 10 ms units.
    pub gap: i64,
    /// 0 none, 1 word, 2 mark.
    pub track: i64,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".into(),
            voice: "en-gb".into(),
            rate: 0,
            pitch: 0,
            gap: 0,
            track: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ProbeConfig
// ---------------------------------------------------------------------------

/// Where and how long to probe before choosing the cloud path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: probe::DEFAULT_HOST.into(),
            port: probe::DEFAULT_PORT,
            timeout_ms: probe::DEFAULT_TIMEOUT_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// RadioConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub stations: Vec<StationEntry>,
    /// 1-based station played when none is given.
    pub default_station: usize,
    /// Percent, 0 to 100.
    pub volume: f64,
    pub muting: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            stations: default_stations(),
            default_station: 1,
            volume: 50.0,
            muting: false,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscodeConfig
// ---------------------------------------------------------------------------

/// Output format of `transcode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// `S16LE`, `S24LE`, `S32LE` or `F32LE`.
    pub format: String,
    pub rate: u32,
}

impl TranscodeConfig {
    pub fn sample_format(&self) -> Result<SampleFormat> {
        SampleFormat::parse(&self.format)
            .with_context(|| format!("unknown sample format \"{}\"", self.format))
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            format: "S24LE".into(),
            rate: 48_000,
        }
    }
}

// ---------------------------------------------------------------------------
// PhraseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    /// Cache directory; `None` means [`AppPaths::phrase_dir`].
    pub dir: Option<PathBuf>,
    /// Phrase fetched when `phrase` is run without text.
    pub default_text: String,
}

impl PhraseConfig {
    pub fn resolve_dir(&self, paths: &AppPaths) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| paths.phrase_dir.clone())
    }
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            dir: None,
            default_text: "The cat came back.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use pipeplay::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub speech: SpeechConfig,
    pub espeak: EspeakConfig,
    pub probe: ProbeConfig,
    pub radio: RadioConfig,
    pub transcode: TranscodeConfig,
    pub phrase: PhraseConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
