use std::collections::HashMap;

use crate::domain::models::Station;

// Declaration order is display order; the first entry is the default station.
static STATIONS: [Station; 7] = [
    Station {
        key: "nightride",
        label: "Nightride FM",
        stream_url: "https://stream.nightride.fm/nightride.mp3",
        gradient_start: "#CC00FF",
        gradient_end: "#7F00FF",
    },
    Station {
        key: "chillsynth",
        label: "Chillsynth FM",
        stream_url: "https://stream.nightride.fm/chillsynth.mp3",
        gradient_start: "#26303c",
        gradient_end: "#2b3a4c",
    },
    Station {
        key: "datawave",
        label: "Datawave FM",
        stream_url: "https://stream.nightride.fm/datawave.mp3",
        gradient_start: "#ffe696",
        gradient_end: "#000000",
    },
    Station {
        key: "spacesynth",
        label: "Spacesynth FM",
        stream_url: "https://stream.nightride.fm/spacesynth.mp3",
        gradient_start: "#006d52",
        gradient_end: "#240027",
    },
    Station {
        key: "darksynth",
        label: "Darksynth",
        stream_url: "https://stream.nightride.fm/darksynth.mp3",
        gradient_start: "#fd0090",
        gradient_end: "#2c0000",
    },
    Station {
        key: "horrorsynth",
        label: "Horrorsynth",
        stream_url: "https://stream.nightride.fm/horrorsynth.mp3",
        gradient_start: "#00ff00",
        gradient_end: "#200000",
    },
    Station {
        key: "ebsm",
        label: "EBSM",
        stream_url: "https://stream.nightride.fm/ebsm.mp3",
        gradient_start: "#ffffff",
        gradient_end: "#666666",
    },
];

/// Fixed, read-only station registry indexed by key.
#[derive(Debug, Clone)]
pub struct StationCatalog {
    stations: &'static [Station],
    index: HashMap<&'static str, usize>,
}

impl StationCatalog {
    pub fn new() -> Self {
        let index = STATIONS
            .iter()
            .enumerate()
            .map(|(idx, station)| (station.key, idx))
            .collect();
        Self {
            stations: &STATIONS,
            index,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&'static Station> {
        self.index.get(key).map(|&idx| &self.stations[idx])
    }

    pub fn default_station(&self) -> &'static Station {
        &self.stations[0]
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn stations(&self) -> &'static [Station] {
        self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl Default for StationCatalog {
    fn default() -> Self {
        Self::new()
    }
}
