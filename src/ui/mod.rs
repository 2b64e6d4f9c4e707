//! Text rendering for terminal output
//!
//! Renderers return plain `String`s so they can be tested without a
//! terminal; [`Palette`] adds ANSI colors when stdout is a TTY.

mod lists;
mod report;

pub use lists::{render_locations, render_search, render_settings, SearchOutcome};
pub use report::render_report;

use chrono::{DateTime, TimeZone, Utc};
use crossterm::style::{style, Color, Stylize};
use std::fmt::Display;

use crate::cache::{FetchError, Fetched};

/// Colors for the four kinds of text we print
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    heading: Option<Color>,
    accent: Option<Color>,
    muted: Option<Color>,
    warning: Option<Color>,
}

impl Palette {
    /// No escape codes at all
    pub fn plain() -> Self {
        Self {
            heading: None,
            accent: None,
            muted: None,
            warning: None,
        }
    }

    /// Bright colors for dark terminals, deep colors for light ones
    pub fn themed(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                heading: Some(Color::Cyan),
                accent: Some(Color::White),
                muted: Some(Color::Grey),
                warning: Some(Color::Yellow),
            }
        } else {
            Self {
                heading: Some(Color::DarkBlue),
                accent: Some(Color::Black),
                muted: Some(Color::DarkGrey),
                warning: Some(Color::DarkYellow),
            }
        }
    }

    pub fn heading(&self, text: &str) -> String {
        paint(text, self.heading)
    }

    pub fn accent(&self, text: &str) -> String {
        paint(text, self.accent)
    }

    pub fn muted(&self, text: &str) -> String {
        paint(text, self.muted)
    }

    pub fn warning(&self, text: &str) -> String {
        paint(text, self.warning)
    }
}

fn paint(text: &str, color: Option<Color>) -> String {
    match color {
        Some(color) => style(text).with(color).to_string(),
        None => text.to_string(),
    }
}

/// Provenance note for cached data, empty for live data
fn freshness_note<T, Tz>(fetched: &Fetched<T>, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if !fetched.is_from_cache() {
        return None;
    }
    let when = fetched.stored_at.with_timezone(tz).format("%b %-d %H:%M");
    Some(if fetched.is_stale() {
        format!("(cached {}, may be out of date)", when)
    } else {
        format!("(cached {})", when)
    })
}

/// What to print in place of a section that produced no data
fn unavailable<E: std::error::Error + 'static>(what: &str, error: &FetchError<E>) -> String {
    match error {
        FetchError::CacheMiss { .. } => {
            "No data available offline. Try again when online.".to_string()
        }
        FetchError::RemoteFetchFailed { source, .. } => {
            format!("Could not fetch {}: {}", what, source)
        }
        FetchError::EmptyKey => format!("Could not fetch {}", what),
    }
}

/// Age in whole minutes, for compact list output
fn minutes_old(stored_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - stored_at).num_minutes().max(0)
}
