//! Spoken time, date and accent announcements.
//!
//! Time and date are announced as a cached intro phrase ("The time is",
//! "Today's date is") followed by the spoken value.  When the intro has not
//! been fetched yet it is spoken like any other text.

use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use tokio_util::sync::CancellationToken;

use crate::pipeline::{PipelineRunner, TerminationEvent};
use crate::probe::Reachability;
use crate::templates;

use super::phrase::PhraseCache;
use super::speaker::Speaker;
use super::{file_uri, SpeechError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Time,
    Date,
    Accents,
}

impl FromStr for Announcement {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(Announcement::Time),
            "date" => Ok(Announcement::Date),
            "accents" | "test" => Ok(Announcement::Accents),
            other => Err(SpeechError::InvalidArgument(format!(
                "unknown announcement \"{other}\" (time, date, accents)"
            ))),
        }
    }
}

impl Announcement {
    /// Phrase played before the value, if any.
    pub fn intro(self) -> Option<&'static str> {
        match self {
            Announcement::Time => Some("The time is"),
            Announcement::Date => Some("Today's date is"),
            Announcement::Accents => None,
        }
    }
}

/// `"2 05 PM"`: hour without padding, minutes with.
pub fn time_text<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%-I %M %p").to_string()
}

/// `"Wednesday, 25 March, 2020"`.
pub fn date_text<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%A, %-d %B, %Y").to_string()
}

/// `(language, text)` pairs for the accent demonstration.
pub const ACCENTS: [(&str, &str); 3] = [
    ("en-au", "Hello. I am an Australian."),
    ("en-US", "This is with an USA accent."),
    ("en-UK", "This is with a British accent."),
];

/// Run one announcement.  Stops early when an utterance does not reach
/// end of stream.
pub async fn announce<R, Tz>(
    which: Announcement,
    now: &DateTime<Tz>,
    speaker: &mut Speaker<R>,
    runner: &mut PipelineRunner,
    cache: &PhraseCache,
    cancel: &CancellationToken,
) -> Result<TerminationEvent, SpeechError>
where
    R: Reachability,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let value = match which {
        Announcement::Time => time_text(now),
        Announcement::Date => date_text(now),
        Announcement::Accents => {
            let mut last = TerminationEvent::EndOfStream;
            for (language, text) in ACCENTS {
                log::info!("announce: {language}: {text}");
                last = speaker.speak_in(runner, language, text, cancel).await?;
                if last != TerminationEvent::EndOfStream {
                    break;
                }
            }
            return Ok(last);
        }
    };

    if let Some(intro) = which.intro() {
        let event = match cache.lookup(intro) {
            Some(path) => {
                log::debug!("announce: playing cached {}", path.display());
                let description =
                    templates::playbin(&file_uri(&path)?, &speaker.speech().audio_sink)?;
                runner.play(&description, cancel).await?
            }
            None => speaker.speak(runner, intro, cancel).await?,
        };
        if event != TerminationEvent::EndOfStream {
            return Ok(event);
        }
    }

    log::info!("announce: {value}");
    speaker.speak(runner, &value, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    use crate::speech::phrase::phrase_name;

    #[test]
    fn formats_time_and_date_for_speech() {
        let afternoon = Utc.with_ymd_and_hms(2020, 3, 25, 14, 5, 0).unwrap();
        assert_eq!(time_text(&afternoon), "2 05 PM");
        assert_eq!(date_text(&afternoon), "Wednesday, 25 March, 2020");

        let nz = FixedOffset::east_opt(13 * 3600).unwrap();
        let morning = nz.with_ymd_and_hms(2020, 1, 1, 9, 30, 0).unwrap();
        assert_eq!(time_text(&morning), "9 30 AM");
        assert_eq!(date_text(&morning), "Wednesday, 1 January, 2020");
    }

    #[test]
    fn parses_announcement_names() {
        assert_eq!("time".parse::<Announcement>().unwrap(), Announcement::Time);
        assert_eq!("DATE".parse::<Announcement>().unwrap(), Announcement::Date);
        assert_eq!("accents".parse::<Announcement>().unwrap(), Announcement::Accents);
        assert!("weather".parse::<Announcement>().is_err());
    }

    #[test]
    fn intros_match_cached_file_names() {
        assert_eq!(
            Announcement::Time.intro().and_then(phrase_name).as_deref(),
            Some("the_time_is")
        );
        assert_eq!(
            Announcement::Date.intro().and_then(phrase_name).as_deref(),
            Some("todays_date_is")
        );
        assert_eq!(Announcement::Accents.intro(), None);
    }
}
