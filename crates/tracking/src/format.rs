//! User-facing strings for metric values.
//!
//! Everything is stored in meters, seconds and km/h; conversion to imperial
//! units happens only here.

use crate::models::Sport;

pub const METERS_PER_MILE: f64 = 1609.344;
pub const FEET_PER_METER: f64 = 3.280_84;

/// Shown when pace is not available yet.
pub const PACE_PLACEHOLDER: &str = "--:--";

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh * 1000.0 / METERS_PER_MILE
}

/// Converts seconds per kilometer into seconds per mile.
pub fn pace_km_to_mile(seconds_per_km: f64) -> f64 {
    seconds_per_km * METERS_PER_MILE / 1000.0
}

/// `M:SS` below an hour, `H:MM:SS` above.
///
/// ```
/// use tracking::format::format_duration;
/// assert_eq!(format_duration(125.0), "2:05");
/// assert_eq!(format_duration(3725.0), "1:02:05");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0).round() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Kilometers with one decimal (meters below 1 km), or miles with one
/// decimal (feet below a tenth of a mile).
pub fn format_distance(meters: f64, use_metric: bool) -> String {
    let meters = meters.max(0.0);
    if use_metric {
        if meters.round() < 1000.0 {
            format!("{:.0} m", meters)
        } else {
            format!("{:.1} km", meters / 1000.0)
        }
    } else {
        let miles = meters_to_miles(meters);
        if miles < 0.1 {
            format!("{:.0} ft", meters_to_feet(meters))
        } else {
            format!("{:.1} mi", miles)
        }
    }
}

fn format_clock(seconds: f64) -> String {
    let total = seconds.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn valid_pace(pace: Option<f64>) -> Option<f64> {
    pace.filter(|p| p.is_finite() && *p > 0.0)
}

/// Running-style pace: `5:00 /km` or `8:03 /mi`.
pub fn format_pace(seconds_per_km: Option<f64>, use_metric: bool) -> String {
    let Some(pace) = valid_pace(seconds_per_km) else {
        return PACE_PLACEHOLDER.to_string();
    };
    if use_metric {
        format!("{} /km", format_clock(pace))
    } else {
        format!("{} /mi", format_clock(pace_km_to_mile(pace)))
    }
}

/// Pace using the denominator each sport is usually quoted in: swimming per
/// 100 m, rowing per 500 m, everything else per km or mile.
pub fn format_sport_pace(seconds_per_km: Option<f64>, sport: Sport, use_metric: bool) -> String {
    match sport {
        Sport::Swimming => match valid_pace(seconds_per_km) {
            Some(pace) => format!("{} /100m", format_clock(pace / 10.0)),
            None => PACE_PLACEHOLDER.to_string(),
        },
        Sport::Rowing => match valid_pace(seconds_per_km) {
            Some(pace) => format!("{} /500m", format_clock(pace / 2.0)),
            None => PACE_PLACEHOLDER.to_string(),
        },
        _ => format_pace(seconds_per_km, use_metric),
    }
}

pub fn format_speed(kmh: Option<f64>, use_metric: bool) -> String {
    match kmh.filter(|s| s.is_finite()) {
        Some(speed) if use_metric => format!("{:.1} km/h", speed),
        Some(speed) => format!("{:.1} mph", kmh_to_mph(speed)),
        None if use_metric => "-- km/h".to_string(),
        None => "-- mph".to_string(),
    }
}

/// Elevation change with an explicit sign, e.g. `+120 m` or `-49 ft`.
pub fn format_elevation(meters: f64, use_metric: bool) -> String {
    let value = if use_metric {
        meters
    } else {
        meters_to_feet(meters)
    };
    let rounded = value.round();
    let unit = if use_metric { "m" } else { "ft" };
    if rounded < 0.0 {
        format!("-{:.0} {unit}", rounded.abs())
    } else {
        format!("+{:.0} {unit}", rounded)
    }
}
