//! Station list: ordered, read-only, selected by 1-based number.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::RadioError;

/// One internet-radio station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEntry {
    pub name: String,
    pub uri: String,
}

impl StationEntry {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }
}

/// The stations shipped with a fresh configuration.
pub fn default_stations() -> Vec<StationEntry> {
    const BBC_HLS: &str =
        "http://a.files.bbci.co.uk/media/live/manifesto/audio/simulcast/hls/nonuk/sbr_low/ak";
    vec![
        StationEntry::new(
            "Radio New Zealand Concert Program",
            "http://radionz-ice.streamguys.com/concert",
        ),
        StationEntry::new(
            "Radio New Zealand Nation Program",
            "http://radionz-ice.streamguys.com/national",
        ),
        StationEntry::new(
            "ABC Sydney 702AM",
            "http://live-radio01.mediahubaustralia.com/2LRW/mp3/",
        ),
        StationEntry::new("BBC Radio One", format!("{BBC_HLS}/bbc_radio_one.m3u8")),
        StationEntry::new("BBC Radio Two", format!("{BBC_HLS}/bbc_radio_two.m3u8")),
        StationEntry::new("BBC Radio Three", format!("{BBC_HLS}/bbc_radio_three.m3u8")),
        StationEntry::new("BBC Radio Four", format!("{BBC_HLS}/bbc_radio_fourfm.m3u8")),
        StationEntry::new("Coast", "http://ais-nzme.streamguys1.com/nz_011_aac"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationList {
    entries: Vec<StationEntry>,
}

impl StationList {
    pub fn new(entries: Vec<StationEntry>) -> Result<Self, RadioError> {
        if entries.is_empty() {
            return Err(RadioError::NoStations);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Station number `number`, counting from 1.
    pub fn select(&self, number: usize) -> Result<&StationEntry, RadioError> {
        number
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or(RadioError::NoSuchStation {
                number,
                count: self.entries.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &StationEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (i + 1, e))
    }

    /// Numbered listing, one station per line.
    pub fn menu(&self) -> String {
        let mut out = String::new();
        for (number, entry) in self.iter() {
            let _ = writeln!(out, "{number:>2}. {}", entry.name);
        }
        out
    }
}

impl Default for StationList {
    fn default() -> Self {
        Self {
            entries: default_stations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_has_eight_stations() {
        let list = StationList::default();
        assert_eq!(list.len(), 8);
        assert_eq!(list.select(1).unwrap().name, "Radio New Zealand Concert Program");
        assert_eq!(list.select(8).unwrap().name, "Coast");
        assert!(list.select(4).unwrap().uri.ends_with("bbc_radio_one.m3u8"));
    }

    #[test]
    fn selection_is_one_based_and_bounded() {
        let list = StationList::default();
        assert_eq!(
            list.select(0),
            Err(RadioError::NoSuchStation {
                number: 0,
                count: 8
            })
        );
        assert!(list.select(9).is_err());
    }

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(StationList::new(Vec::new()), Err(RadioError::NoStations));
    }

    #[test]
    fn menu_numbers_every_station() {
        let list = StationList::new(vec![
            StationEntry::new("One", "http://a/"),
            StationEntry::new("Two", "http://b/"),
        ])
        .unwrap();
        assert_eq!(list.menu(), " 1. One\n 2. Two\n");
    }
}
