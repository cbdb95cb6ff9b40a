//! Labels derived from WMO weather codes, plus display formatting.
//!
//! Everything here is pure: the same inputs always produce the same output.

use crate::model::Units;

/// Human readable condition for a WMO code.
///
/// `zh` / `zh-CN` select Chinese; any other language falls back to English.
/// Codes outside the table map to the language's "unknown" word.
pub fn condition_text(code: i32, language: &str) -> &'static str {
    if is_chinese(language) {
        condition_zh(code)
    } else {
        condition_en(code)
    }
}

fn is_chinese(language: &str) -> bool {
    matches!(language, "zh" | "zh-CN" | "zh-cn" | "zh_CN")
}

fn condition_en(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

// Drizzle (51..=55) keeps its own wording so it doesn't read as rain (61..=65).
fn condition_zh(code: i32) -> &'static str {
    match code {
        0 => "晴天",
        1 => "大部晴朗",
        2 => "部分多云",
        3 => "阴天",
        45 | 48 => "有雾",
        51 => "小毛毛雨",
        53 => "中毛毛雨",
        55 => "大毛毛雨",
        56 => "冻毛毛雨",
        57 => "强冻毛毛雨",
        61 => "小雨",
        63 => "中雨",
        65 => "大雨",
        66 => "冻雨",
        67 => "强冻雨",
        71 => "小雪",
        73 => "中雪",
        75 => "大雪",
        77 => "雪粒",
        80 => "小阵雨",
        81 => "中阵雨",
        82 => "强阵雨",
        85 => "小阵雪",
        86 => "大阵雪",
        95 => "雷暴",
        96 => "小雹雷暴",
        99 => "大雹雷暴",
        _ => "未知",
    }
}

/// Icon identifier for a WMO code. Day/night only matters for clear and partly cloudy skies.
pub fn icon_name(code: i32, is_day: bool) -> &'static str {
    match code {
        0 if is_day => "sunny",
        0 => "clear-night",
        1..=3 if is_day => "partly-cloudy-day",
        1..=3 => "partly-cloudy-night",
        45 | 48 => "fog",
        51..=57 => "drizzle",
        61..=67 | 80..=82 => "rain",
        71..=77 | 85 | 86 => "snow",
        95..=99 => "thunderstorm",
        _ => "unknown",
    }
}

pub fn format_temperature(value: f64, units: Units) -> String {
    match units {
        Units::Metric => format!("{value:.1}°C"),
        Units::Imperial => format!("{value:.1}°F"),
    }
}

pub fn format_wind_speed(value: f64, units: Units) -> String {
    match units {
        Units::Metric => format!("{value:.1} km/h"),
        Units::Imperial => format!("{value:.1} mph"),
    }
}

pub fn format_pressure(hpa: f64) -> String {
    format!("{hpa:.0} hPa")
}
