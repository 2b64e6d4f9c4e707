use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

use super::{freshness_note, unavailable, Palette};
use crate::data::metrics::{self, FeelsLike};
use crate::data::{CurrentWeather, Forecast};
use crate::service::LocationReport;
use crate::settings::{format_temperature, Settings, TemperatureUnit};

/// Renders the full report for one location
///
/// Every section is rendered from whatever data is available, so a failed
/// place lookup or forecast does not hide the current conditions.
pub fn render_report<Tz>(
    report: &LocationReport,
    settings: &Settings,
    palette: &Palette,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let unit = settings.temperature_unit;
    let conditions = &report.conditions;
    let mut lines = Vec::new();

    let title = match &report.place {
        Ok(place) => place.data.display_name(),
        Err(_) => "Location unavailable".to_string(),
    };
    lines.push(palette.heading(&title));
    lines.push(palette.muted(&format!(
        "{:.2}, {:.2}",
        conditions.coordinates.latitude, conditions.coordinates.longitude
    )));

    if conditions.is_empty() {
        if let Err(e) = &conditions.current {
            lines.push(String::new());
            lines.push(palette.warning(&unavailable("weather", e)));
        }
        return lines.join("\n");
    }

    lines.push(String::new());
    match &conditions.current {
        Ok(current) => {
            lines.extend(current_lines(&current.data, conditions.high_low(now), unit, palette));
            if let Some(note) = freshness_note(current, tz) {
                lines.push(palette.warning(&note));
            }
        }
        Err(e) => lines.push(palette.warning(&unavailable("current conditions", e))),
    }

    lines.push(String::new());
    match &conditions.forecast {
        Ok(forecast) => {
            lines.extend(forecast_lines(&forecast.data, unit, palette, now, tz));
            if let Some(note) = freshness_note(forecast, tz) {
                lines.push(palette.warning(&note));
            }
        }
        Err(e) => lines.push(palette.warning(&unavailable("forecast", e))),
    }

    lines.join("\n")
}

fn current_lines(
    current: &CurrentWeather,
    high_low: Option<(f64, f64)>,
    unit: TemperatureUnit,
    palette: &Palette,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{}  {}",
        palette.accent(&format_temperature(current.temperature, unit)),
        current.description
    )];

    if let Some((high, low)) = high_low {
        lines.push(format!(
            "H:{} L:{}",
            format_temperature(high, unit),
            format_temperature(low, unit)
        ));
    }

    let feels = FeelsLike::compare(current.temperature, current.feels_like);
    lines.push(format!(
        "Feels like {}. {}",
        format_temperature(current.feels_like, unit),
        feels.description()
    ));

    let humidity = format!("Humidity {}%.", current.humidity);
    lines.push(match metrics::dew_point(current.temperature, current.humidity) {
        Some(dew) => format!(
            "{} The dew point is {} right now.",
            humidity,
            format_temperature(f64::from(dew), unit)
        ),
        None => humidity,
    });

    let range = metrics::pressure_range(current.temperature, current.pressure);
    lines.push(format!(
        "Pressure {} hPa, expect a high of {} and a low of {}.",
        current.pressure.round() as i64,
        format_temperature(f64::from(range.high), unit),
        format_temperature(f64::from(range.low), unit)
    ));

    lines
}

fn forecast_lines<Tz>(
    forecast: &Forecast,
    unit: TemperatureUnit,
    palette: &Palette,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec![palette.heading("Hourly")];
    for entry in metrics::hourly(&forecast.slots) {
        lines.push(format!(
            "  {:>5}  {:>4}  {:<12} {:>3}%",
            entry.time.with_timezone(tz).format("%-I %p").to_string(),
            format_temperature(entry.temperature, unit),
            entry.condition.label(),
            entry.precipitation_percent
        ));
    }

    lines.push(String::new());
    lines.push(palette.heading("Daily"));
    for day in metrics::daily(&forecast.slots, tz) {
        lines.push(format!(
            "  {}  {:<13} {:>4}",
            day.date.format("%a"),
            day.condition.icon(),
            format_temperature(day.max_temperature, unit)
        ));
    }

    let rain = metrics::precipitation(&forecast.slots, now);
    lines.push(String::new());
    lines.push(palette.heading("Precipitation"));
    lines.push(format!("  {}", rain.last_3h_text()));
    lines.push(format!("  {}", rain.next_24h_text()));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DataSource, FetchError, Fetched};
    use crate::data::{
        Coordinates, ForecastSlot, GeocodeError, Place, WeatherCondition, WeatherError,
    };
    use crate::service::Conditions;

    const BASE: i64 = 1_721_001_600;

    fn at(offset_hours: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(BASE + offset_hours * 3600, 0).unwrap()
    }

    fn fetched<T>(data: T, source: DataSource) -> Fetched<T> {
        Fetched {
            data,
            source,
            stored_at: at(0),
        }
    }

    fn current() -> CurrentWeather {
        CurrentWeather {
            temperature: 30.0,
            feels_like: 33.4,
            humidity: 70,
            pressure: 1023.0,
            condition: WeatherCondition::Clear,
            description: "clear sky".to_string(),
            observed_at: at(0),
        }
    }

    fn forecast() -> Forecast {
        Forecast {
            slots: (0..10)
                .map(|i| ForecastSlot {
                    time: at(i * 3),
                    temperature: 20.0 + i as f64,
                    condition: if i < 4 { WeatherCondition::Clear } else { WeatherCondition::Rain },
                    precipitation_chance: 0.25,
                    rain_3h: (i >= 4).then_some(1.5),
                })
                .collect(),
        }
    }

    fn coords() -> Coordinates {
        Coordinates::new(10.0, 20.0).unwrap()
    }

    fn report(
        place: Result<Fetched<Place>, FetchError<GeocodeError>>,
        current: Result<Fetched<CurrentWeather>, FetchError<WeatherError>>,
        forecast: Result<Fetched<Forecast>, FetchError<WeatherError>>,
    ) -> LocationReport {
        LocationReport {
            place,
            conditions: Conditions {
                coordinates: coords(),
                current,
                forecast,
            },
        }
    }

    fn miss<E: std::error::Error + 'static>() -> FetchError<E> {
        FetchError::CacheMiss {
            key: "weather_10.0_20.0".to_string(),
        }
    }

    fn render(report: &LocationReport, settings: Settings) -> String {
        render_report(report, &settings, &Palette::plain(), at(1), &Utc)
    }

    #[test]
    fn test_render_full_report() {
        let place = Place {
            name: "Testville".to_string(),
            country: "CA".to_string(),
            coordinates: coords(),
        };
        let report = report(
            Ok(fetched(place, DataSource::Network)),
            Ok(fetched(current(), DataSource::Network)),
            Ok(fetched(forecast(), DataSource::Network)),
        );

        let text = render(&report, Settings::default());

        assert!(text.starts_with("Testville, CA\n10.00, 20.00"));
        assert!(text.contains("30°  clear sky"));
        assert!(text.contains("Feels like 33°. Feels warmer than the actual temperature."));
        assert!(text.contains("Humidity 70%. The dew point is 23° right now."));
        assert!(text.contains("expect a high of 31° and a low of 28°."));
        assert!(text.contains("12 AM"));
        assert!(text.contains("  Mon  sunny"));
        assert!(text.contains("No rainfall in last 3h"));
        assert!(text.contains("7.5mm expected in the next 24hrs"));
        assert!(!text.contains("cached"));
    }

    #[test]
    fn test_render_fahrenheit() {
        let report = report(
            Err(miss()),
            Ok(fetched(current(), DataSource::Network)),
            Err(miss()),
        );
        let settings = Settings {
            temperature_unit: TemperatureUnit::Fahrenheit,
            ..Settings::default()
        };

        let text = render(&report, settings);

        assert!(text.contains("86°  clear sky"));
    }

    #[test]
    fn test_render_stale_label_and_missing_place() {
        let report = report(
            Err(miss()),
            Ok(fetched(current(), DataSource::StaleCache)),
            Ok(fetched(forecast(), DataSource::FreshCache)),
        );

        let text = render(&report, Settings::default());

        assert!(text.starts_with("Location unavailable"));
        assert!(text.contains("(cached Jul 15 00:00, may be out of date)"));
        assert!(text.contains("(cached Jul 15 00:00)"));
    }

    #[test]
    fn test_render_nothing_available_offline() {
        let report = report(Err(miss()), Err(miss()), Err(miss()));

        let text = render(&report, Settings::default());

        assert!(text.contains("No data available offline. Try again when online."));
        assert_eq!(text.matches("No data available").count(), 1);
        assert!(!text.contains("Hourly"));
    }
}
