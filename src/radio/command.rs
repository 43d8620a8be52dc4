//! Commands typed while a station plays.
//!
//! | input | command |
//! |---|---|
//! | `3` | switch to station 3 |
//! | `v 40` | volume 40 % |
//! | `m` | toggle mute |
//! | `q` | quit |

use std::io::BufRead;
use std::str::FromStr;

use tokio::sync::mpsc;

use super::RadioError;

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCommand {
    Select(usize),
    Volume(f64),
    ToggleMute,
    Quit,
}

impl FromStr for RadioCommand {
    type Err = RadioError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let bad = || RadioError::BadCommand(line.to_string());

        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("q" | "quit"), None) => RadioCommand::Quit,
            (Some("m" | "mute"), None) => RadioCommand::ToggleMute,
            (Some("v" | "volume"), Some(level)) => {
                let level: f64 = level.parse().map_err(|_| bad())?;
                if !(0.0..=100.0).contains(&level) {
                    return Err(RadioError::VolumeOutOfRange(level));
                }
                RadioCommand::Volume(level)
            }
            (Some(number), None) => RadioCommand::Select(number.parse().map_err(|_| bad())?),
            _ => return Err(bad()),
        };

        if words.next().is_some() {
            return Err(bad());
        }
        Ok(command)
    }
}

/// Read commands from stdin on a dedicated thread.
///
/// Unparseable lines are reported and skipped.  The channel closes when stdin
/// does or when the receiver is dropped.
pub fn spawn_stdin_reader(tx: mpsc::Sender<RadioCommand>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("radio:stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<RadioCommand>() {
                    Ok(command) => {
                        if tx.blocking_send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("radio: {e}"),
                }
            }
            log::debug!("radio: stdin closed");
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!("3".parse(), Ok(RadioCommand::Select(3)));
        assert_eq!(" v 40 ".parse(), Ok(RadioCommand::Volume(40.0)));
        assert_eq!("volume 7.5".parse(), Ok(RadioCommand::Volume(7.5)));
        assert_eq!("m".parse(), Ok(RadioCommand::ToggleMute));
        assert_eq!("q".parse(), Ok(RadioCommand::Quit));
    }

    #[test]
    fn volume_outside_percent_range_is_rejected() {
        assert_eq!(
            "v 101".parse::<RadioCommand>(),
            Err(RadioError::VolumeOutOfRange(101.0))
        );
        assert!("v -1".parse::<RadioCommand>().is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        for line in ["", "x", "v", "v loud", "3 4", "m now", "-2"] {
            assert!(line.parse::<RadioCommand>().is_err(), "{line:?}");
        }
    }
}
