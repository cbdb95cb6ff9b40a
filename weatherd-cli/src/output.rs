//! Human-readable rendering of service responses.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use weatherd_core::{
    CitySuggestion, Statistics, Units, WeatherRecord, WeatherResponse,
    condition::{format_pressure, format_temperature, format_wind_speed},
};

/// Render a response for the terminal. Failures render as a single `Error:` line.
pub fn render_response(response: &WeatherResponse, units: Units) -> String {
    if !response.success {
        return format!("Error: {}", response.error_message);
    }

    if let Some(record) = &response.current {
        return render_current(record, units);
    }
    if !response.forecast.is_empty() {
        return render_forecast(&response.forecast, units);
    }
    render_suggestions(&response.suggestions)
}

fn render_current(record: &WeatherRecord, units: Units) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", location_line(record));
    let _ = writeln!(
        out,
        "  {} ({})  {}",
        record.condition,
        record.icon_name,
        format_temperature(record.temperature, units)
    );
    let _ = writeln!(out, "  Feels like:  {}", format_temperature(record.feels_like, units));
    let _ = writeln!(out, "  Humidity:    {}%", record.humidity_pct);
    let _ = writeln!(
        out,
        "  Wind:        {} from {}°",
        format_wind_speed(record.wind_speed, units),
        record.wind_direction_deg
    );
    let _ = writeln!(out, "  Pressure:    {}", format_pressure(record.pressure_hpa));
    let _ = writeln!(out, "  Clouds:      {}%", record.cloud_cover_pct);
    let _ = write!(out, "  Observed:    {}", observed(record.observation_time));

    out
}

fn render_forecast(days: &[WeatherRecord], units: Units) -> String {
    let mut out = String::new();

    if let Some(first) = days.first() {
        let _ = writeln!(out, "{}", location_line(first));
    }

    for day in days {
        let date = day
            .observation_time
            .map(|t| t.format("%a %Y-%m-%d").to_string())
            .unwrap_or_else(|| "?".to_string());
        let _ = writeln!(
            out,
            "  {date}  {:>8}  {:>6.1} mm  {}",
            format_temperature(day.temperature, units),
            day.precipitation_mm,
            day.condition
        );
    }

    out.trim_end().to_string()
}

fn render_suggestions(suggestions: &[CitySuggestion]) -> String {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.country.is_empty() {
                format!("{:>2}. {}", i + 1, s.name)
            } else {
                format!("{:>2}. {}, {}", i + 1, s.name, s.country)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_statistics(stats: &Statistics, cached_entries: usize) -> String {
    format!(
        "Requests:        {}\n\
         Cache hits:      {} ({:.1}%)\n\
         Upstream calls:  {}\n\
         Avg latency:     {} ms\n\
         Cached entries:  {}",
        stats.total_requests,
        stats.cache_hits,
        stats.hit_rate(),
        stats.upstream_calls,
        stats.average_latency().as_millis(),
        cached_entries,
    )
}

fn location_line(record: &WeatherRecord) -> String {
    let place = match (record.city.is_empty(), record.country.is_empty()) {
        (true, _) => format!("{:.4}, {:.4}", record.latitude, record.longitude),
        (false, true) => record.city.clone(),
        (false, false) => format!("{}, {}", record.city, record.country),
    };

    if record.timezone.is_empty() { place } else { format!("{place} [{}]", record.timezone) }
}

fn observed(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M %Z").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
