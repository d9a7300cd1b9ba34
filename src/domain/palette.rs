use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

use crate::domain::catalog::StationCatalog;
use crate::domain::models::Station;

/// Resolves user input to a station: exact key first, then fuzzy on labels.
pub fn resolve_station(catalog: &StationCatalog, query: &str) -> Option<&'static Station> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    if let Some(station) = catalog.lookup(&query.to_ascii_lowercase()) {
        return Some(station);
    }
    fuzzy_stations(catalog, query).into_iter().next()
}

/// Stations matching `query`, best score first; ties keep catalog order.
pub fn fuzzy_stations(catalog: &StationCatalog, query: &str) -> Vec<&'static Station> {
    if query.trim().is_empty() {
        return catalog.stations().iter().collect();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);

    let mut buf = Vec::new();
    let mut scored = Vec::new();
    for (idx, station) in catalog.stations().iter().enumerate() {
        let score = pattern.score(Utf32Str::new(station.label, &mut buf), &mut matcher);
        if let Some(score) = score {
            scored.push((score, idx, station));
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, _, station)| station).collect()
}
