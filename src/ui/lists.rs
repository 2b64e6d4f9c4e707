use chrono::{DateTime, Utc};

use super::{minutes_old, Palette};
use crate::data::Place;
use crate::service::Conditions;
use crate::settings::{format_temperature, Settings};

/// Result of a place search, as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Saved locations whose names match
    Saved(Vec<Place>),
    /// New places from the geocoder, saved ones removed
    Found(Vec<Place>),
    /// The geocoder only returned places that are already saved
    AllSaved,
    NoneFound,
}

/// One line per saved location: name, current temperature, next-24h high/low
pub fn render_locations(
    entries: &[(Place, Conditions)],
    settings: &Settings,
    palette: &Palette,
    now: DateTime<Utc>,
) -> String {
    if entries.is_empty() {
        return "No saved locations. Add one with `skywatch locations add <name>`.".to_string();
    }

    let unit = settings.temperature_unit;
    let width = entries
        .iter()
        .map(|(place, _)| place.display_name().chars().count())
        .max()
        .unwrap_or(0);

    entries
        .iter()
        .map(|(place, conditions)| {
            let name = format!("{:<width$}", place.display_name(), width = width);
            let mut line = palette.heading(&name);

            match &conditions.current {
                Ok(current) => {
                    line.push_str(&format!(
                        "  {:>4}",
                        format_temperature(current.data.temperature, unit)
                    ));
                    if let Some((high, low)) = conditions.high_low(now) {
                        line.push_str(&format!(
                            "  H:{} L:{}",
                            format_temperature(high, unit),
                            format_temperature(low, unit)
                        ));
                    }
                    if current.is_stale() {
                        let age = minutes_old(current.stored_at, now);
                        line.push_str(&palette.warning(&format!(
                            "  (cached {} min ago, may be out of date)",
                            age
                        )));
                    }
                }
                Err(_) => line.push_str(&palette.muted("  --  no data")),
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_search(outcome: &SearchOutcome, palette: &Palette) -> String {
    let place_line = |place: &Place| {
        format!(
            "{}  {}",
            place.display_name(),
            palette.muted(&format!(
                "({:.2}, {:.2})",
                place.coordinates.latitude, place.coordinates.longitude
            ))
        )
    };

    match outcome {
        SearchOutcome::Saved(places) => places
            .iter()
            .map(|p| format!("{} {}", place_line(p), palette.accent("[saved]")))
            .collect::<Vec<_>>()
            .join("\n"),
        SearchOutcome::Found(places) => {
            places.iter().map(place_line).collect::<Vec<_>>().join("\n")
        }
        SearchOutcome::AllSaved => "Location already saved".to_string(),
        SearchOutcome::NoneFound => "No locations found".to_string(),
    }
}

pub fn render_settings(settings: &Settings) -> String {
    format!(
        "Temperature unit: {}\nDark mode: {}",
        settings.temperature_unit,
        if settings.dark_mode { "on" } else { "off" }
    )
}
