//! Internet-radio player.
//!
//! A configured [`StationList`] (1-based), a one-line command language read
//! from stdin ([`RadioCommand`]) and a [`RadioPlayer`] that keeps a single
//! `playbin` pipeline alive across station changes by swapping its `uri`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pipeplay::media::MediaRuntime;
//! use pipeplay::pipeline::PipelineRunner;
//! use pipeplay::radio::{spawn_stdin_reader, RadioPlayer, RadioSettings, StationList};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), pipeplay::radio::RadioError> {
//! let mut runner = PipelineRunner::new(MediaRuntime::with_defaults(
//!     tokio::runtime::Handle::current(),
//! ));
//! let mut player = RadioPlayer::new(StationList::default(), &RadioSettings::default())?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(8);
//! spawn_stdin_reader(tx).expect("stdin thread");
//! player.play(&mut runner, &mut rx, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod player;
pub mod stations;

use thiserror::Error;

use crate::media::ConstructionError;
use crate::pipeline::PipelineError;

pub use command::{spawn_stdin_reader, RadioCommand};
pub use player::{RadioOutcome, RadioPlayer, RadioSettings, RadioState};
pub use stations::{default_stations, StationEntry, StationList};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RadioError {
    #[error("the station list is empty")]
    NoStations,

    #[error("no station number {number}, choose 1 to {count}")]
    NoSuchStation { number: usize, count: usize },

    #[error("volume {0} is outside 0 to 100")]
    VolumeOutOfRange(f64),

    #[error("unrecognised command \"{0}\" (number, v <0-100>, m, q)")]
    BadCommand(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<ConstructionError> for RadioError {
    fn from(e: ConstructionError) -> Self {
        RadioError::Pipeline(e.into())
    }
}
