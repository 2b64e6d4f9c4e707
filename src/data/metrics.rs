//! Derived weather metrics
//!
//! Pure functions over the parsed API data: dew point, feels-like wording,
//! the pressure-based high/low estimate, and the hourly, daily and
//! precipitation views computed from the three-hour forecast.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use super::{ForecastSlot, WeatherCondition};

/// Magnus formula coefficients
const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;

/// Standard sea-level pressure in hPa
const REFERENCE_PRESSURE_HPA: f64 = 1013.0;

/// Degrees of spread per hPa away from the reference pressure
const PRESSURE_SPREAD_PER_HPA: f64 = 0.12;

/// Temperature differences below this many degrees read as "similar"
const FEELS_LIKE_THRESHOLD: f64 = 2.0;

/// Number of forecast slots shown in the hourly view
pub const HOURLY_SLOTS: usize = 24;

/// Number of days shown in the weekly view
pub const WEEKLY_DAYS: usize = 5;

/// Dew point in whole degrees Celsius, truncated toward zero
///
/// Returns `None` for 0% humidity, where the formula has no finite answer.
pub fn dew_point(temperature: f64, humidity: u8) -> Option<i32> {
    if humidity == 0 {
        return None;
    }
    let alpha =
        (MAGNUS_A * temperature) / (MAGNUS_B + temperature) + (f64::from(humidity) / 100.0).ln();
    let dew_point = (MAGNUS_B * alpha) / (MAGNUS_A - alpha);
    dew_point.is_finite().then(|| dew_point.trunc() as i32)
}

/// How the feels-like temperature compares to the measured one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeelsLike {
    Similar,
    Warmer,
    Cooler,
}

impl FeelsLike {
    pub fn compare(actual: f64, feels_like: f64) -> Self {
        if (actual - feels_like).abs() < FEELS_LIKE_THRESHOLD {
            FeelsLike::Similar
        } else if feels_like > actual {
            FeelsLike::Warmer
        } else {
            FeelsLike::Cooler
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FeelsLike::Similar => "Similar to the actual temperature.",
            FeelsLike::Warmer => "Feels warmer than the actual temperature.",
            FeelsLike::Cooler => "Feels cooler than the actual temperature.",
        }
    }
}

/// High/low estimate from the current temperature and pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressureRange {
    pub high: i32,
    pub low: i32,
}

/// Spreads the temperature by 0.12° per hPa away from 1013 hPa
///
/// Both ends are truncated; `high >= low` holds for any pressure.
pub fn pressure_range(temperature: f64, pressure_hpa: f64) -> PressureRange {
    let spread = ((pressure_hpa - REFERENCE_PRESSURE_HPA) * PRESSURE_SPREAD_PER_HPA).abs();
    PressureRange {
        high: (temperature + spread).trunc() as i32,
        low: (temperature - spread).trunc() as i32,
    }
}

/// One row of the hourly view
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyEntry {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub condition: WeatherCondition,
    /// Chance of precipitation, rounded to a whole percent
    pub precipitation_percent: u8,
}

/// The first [`HOURLY_SLOTS`] forecast slots
pub fn hourly(slots: &[ForecastSlot]) -> Vec<HourlyEntry> {
    slots
        .iter()
        .take(HOURLY_SLOTS)
        .map(|slot| HourlyEntry {
            time: slot.time,
            temperature: slot.temperature,
            condition: slot.condition,
            precipitation_percent: (slot.precipitation_chance * 100.0)
                .round()
                .clamp(0.0, 100.0) as u8,
        })
        .collect()
}

/// One row of the weekly view
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Highest slot temperature of the day
    pub max_temperature: f64,
    /// Condition of the day's first slot
    pub condition: WeatherCondition,
}

/// Groups slots by calendar day in `tz`, in order, keeping the first
/// [`WEEKLY_DAYS`] days
pub fn daily<Tz: TimeZone>(slots: &[ForecastSlot], tz: &Tz) -> Vec<DailySummary> {
    let mut days: Vec<DailySummary> = Vec::new();

    for slot in slots {
        let date = slot.time.with_timezone(tz).date_naive();
        match days.iter_mut().find(|day| day.date == date) {
            Some(day) => day.max_temperature = day.max_temperature.max(slot.temperature),
            None => days.push(DailySummary {
                date,
                max_temperature: slot.temperature,
                condition: slot.condition,
            }),
        }
    }

    days.truncate(WEEKLY_DAYS);
    days
}

/// Rainfall around `now`, in mm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Precipitation {
    /// Rain of the latest slot that started within the last three hours
    pub last_3h: f64,
    /// Total rain of slots in the next 24 hours
    pub next_24h: f64,
}

impl Precipitation {
    pub fn last_3h_text(&self) -> String {
        if self.last_3h > 0.0 {
            format!("{:.1}mm in last 3h", self.last_3h)
        } else {
            "No rainfall in last 3h".to_string()
        }
    }

    pub fn next_24h_text(&self) -> String {
        if self.next_24h > 0.0 {
            format!("{:.1}mm expected in the next 24hrs", self.next_24h)
        } else {
            "No rainfall expected in next 24hrs".to_string()
        }
    }
}

/// Slots in `[now - 3h, now)` feed `last_3h`; slots in `(now, now + 24h]` feed `next_24h`
pub fn precipitation(slots: &[ForecastSlot], now: DateTime<Utc>) -> Precipitation {
    let mut last_3h = 0.0;
    let mut next_24h = 0.0;

    for slot in slots {
        let Some(rain) = slot.rain_3h.filter(|r| *r > 0.0) else {
            continue;
        };
        if slot.time >= now - Duration::hours(3) && slot.time < now {
            last_3h = rain;
        }
        if slot.time > now && slot.time <= now + Duration::hours(24) {
            next_24h += rain;
        }
    }

    Precipitation { last_3h, next_24h }
}

/// Forecast high and low over the slot in progress and the next 24 hours
pub fn high_low(slots: &[ForecastSlot], now: DateTime<Utc>) -> Option<(f64, f64)> {
    let window_start = now - Duration::hours(3);
    let window_end = now + Duration::hours(24);

    slots
        .iter()
        .filter(|slot| slot.time > window_start && slot.time <= window_end)
        .map(|slot| slot.temperature)
        .fold(None, |acc, t| match acc {
            None => Some((t, t)),
            Some((high, low)) => Some((high.max(t), low.min(t))),
        })
}
