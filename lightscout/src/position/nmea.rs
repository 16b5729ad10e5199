//! NMEA 0183 sentence decoding.
//!
//! Only the two sentence types needed for proximity tracking are decoded:
//!
//! | Sentence | Provides |
//! |----------|----------|
//! | `GGA` | position, fix quality, satellites, altitude |
//! | `VTG` | true track, ground speed |
//!
//! Any talker id is accepted (`GP`, `GN`, `GL`, `GA`, ...).
//!
//! # Example
//!
//! ```
//! use lightscout::position::nmea::{parse_sentence, Sentence};
//!
//! let line = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
//! match parse_sentence(line).unwrap() {
//!     Sentence::Gga(gga) => assert_eq!(gga.fix_quality, 1),
//!     Sentence::Vtg(_) => unreachable!(),
//! }
//! ```

use chrono::NaiveTime;

/// Knots to meters per second.
const KNOTS_TO_MPS: f64 = 0.514444;

/// km/h to meters per second divisor.
const KMH_PER_MPS: f64 = 3.6;

/// Errors raised while decoding a sentence.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NmeaError {
    #[error("sentence does not start with '$'")]
    MissingMarker,

    #[error("checksum mismatch: expected {expected:02X}, computed {computed:02X}")]
    Checksum { expected: u8, computed: u8 },

    #[error("malformed sentence: {0}")]
    Malformed(String),

    #[error("unsupported sentence type: {0}")]
    Unsupported(String),

    #[error("invalid {field} field: '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// A decoded sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(GgaFrame),
    Vtg(VtgFrame),
}

/// GGA: global positioning system fix data.
#[derive(Debug, Clone, PartialEq)]
pub struct GgaFrame {
    pub talker: String,
    /// UTC time of the fix.
    pub time: Option<NaiveTime>,
    /// Signed decimal degrees. `None` when the receiver has no position.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// 0 = invalid, 1 = GPS, 2 = DGPS, ... Empty field decodes as 0.
    pub fix_quality: u8,
    pub satellite_count: Option<u32>,
    pub hdop: Option<f64>,
    /// Meters above mean sea level.
    pub altitude: Option<f64>,
}

impl GgaFrame {
    /// Whether the frame carries a usable position.
    pub fn has_fix(&self) -> bool {
        self.fix_quality > 0 && self.latitude.is_some() && self.longitude.is_some()
    }
}

/// VTG: track made good and ground speed.
#[derive(Debug, Clone, PartialEq)]
pub struct VtgFrame {
    pub talker: String,
    pub true_track_deg: Option<f64>,
    pub magnetic_track_deg: Option<f64>,
    pub speed_knots: Option<f64>,
    pub speed_kmh: Option<f64>,
}

impl VtgFrame {
    /// Ground speed in m/s, preferring the km/h field.
    pub fn speed_mps(&self) -> Option<f64> {
        self.speed_kmh
            .map(|kmh| kmh / KMH_PER_MPS)
            .or_else(|| self.speed_knots.map(|kn| kn * KNOTS_TO_MPS))
    }
}

/// XOR of every byte between `$` and `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Decode a single sentence.
///
/// Surrounding whitespace is ignored. When a `*hh` checksum is present it must
/// match.
pub fn parse_sentence(line: &str) -> Result<Sentence, NmeaError> {
    let line = line.trim();
    let line = line.strip_prefix('$').ok_or(NmeaError::MissingMarker)?;

    let body = match line.split_once('*') {
        Some((body, sum)) => {
            let expected = u8::from_str_radix(sum.trim(), 16).map_err(|_| NmeaError::InvalidField {
                field: "checksum",
                value: sum.to_string(),
            })?;
            let computed = checksum(body);
            if expected != computed {
                return Err(NmeaError::Checksum { expected, computed });
            }
            body
        }
        None => line,
    };

    let fields: Vec<&str> = body.split(',').collect();
    let address = fields[0];
    if address.len() != 5 || !address.is_ascii() {
        return Err(NmeaError::Malformed(format!("bad address '{}'", address)));
    }
    let (talker, kind) = address.split_at(2);

    match kind {
        "GGA" => parse_gga(talker, &fields).map(Sentence::Gga),
        "VTG" => parse_vtg(talker, &fields).map(Sentence::Vtg),
        _ => Err(NmeaError::Unsupported(address.to_string())),
    }
}

fn parse_gga(talker: &str, fields: &[&str]) -> Result<GgaFrame, NmeaError> {
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    let time = parse_time(field(1))?;
    let latitude = parse_coordinate(field(2), field(3), "latitude", 'N', 'S', 90.0)?;
    let longitude = parse_coordinate(field(4), field(5), "longitude", 'E', 'W', 180.0)?;
    let fix_quality = parse_optional::<u8>(field(6), "fix quality")?.unwrap_or(0);
    let satellite_count = parse_optional::<u32>(field(7), "satellite count")?;
    let hdop = parse_optional::<f64>(field(8), "hdop")?;
    let altitude = parse_optional::<f64>(field(9), "altitude")?;

    Ok(GgaFrame {
        talker: talker.to_string(),
        time,
        latitude,
        longitude,
        fix_quality,
        satellite_count,
        hdop,
        altitude,
    })
}

fn parse_vtg(talker: &str, fields: &[&str]) -> Result<VtgFrame, NmeaError> {
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    Ok(VtgFrame {
        talker: talker.to_string(),
        true_track_deg: parse_optional::<f64>(field(1), "true track")?,
        magnetic_track_deg: parse_optional::<f64>(field(3), "magnetic track")?,
        speed_knots: parse_optional::<f64>(field(5), "speed knots")?,
        speed_kmh: parse_optional::<f64>(field(7), "speed km/h")?,
    })
}

fn parse_optional<T: std::str::FromStr>(
    raw: &str,
    field: &'static str,
) -> Result<Option<T>, NmeaError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(|_| NmeaError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

/// `hhmmss` or `hhmmss.sss`.
fn parse_time(raw: &str) -> Result<Option<NaiveTime>, NmeaError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let invalid = || NmeaError::InvalidField {
        field: "time",
        value: raw.to_string(),
    };
    if raw.len() < 6 || !raw.is_ascii() {
        return Err(invalid());
    }
    let (hms, frac) = raw.split_at(6);
    let hour: u32 = hms[0..2].parse().map_err(|_| invalid())?;
    let minute: u32 = hms[2..4].parse().map_err(|_| invalid())?;
    let second: u32 = hms[4..6].parse().map_err(|_| invalid())?;
    let millis = if frac.is_empty() {
        0
    } else {
        let fraction: f64 = frac.parse().map_err(|_| invalid())?;
        (fraction * 1000.0).round() as u32
    };
    NaiveTime::from_hms_milli_opt(hour, minute, second, millis.min(999))
        .map(Some)
        .ok_or_else(invalid)
}

/// Convert `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere into signed degrees.
fn parse_coordinate(
    raw: &str,
    hemisphere: &str,
    field: &'static str,
    positive: char,
    negative: char,
    limit: f64,
) -> Result<Option<f64>, NmeaError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let invalid = || NmeaError::InvalidField {
        field,
        value: format!("{},{}", raw, hemisphere),
    };

    let value: f64 = raw.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    let degrees = (value / 100.0).trunc();
    let minutes = value - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(invalid());
    }
    let magnitude = degrees + minutes / 60.0;

    let signed = match hemisphere.trim().chars().next() {
        Some(c) if c == positive => magnitude,
        Some(c) if c == negative => -magnitude,
        _ => return Err(invalid()),
    };
    if signed.abs() > limit {
        return Err(invalid());
    }
    Ok(Some(signed))
}
