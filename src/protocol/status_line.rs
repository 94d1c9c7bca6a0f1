//! Status line encoding and decoding
//!
//! One broadcast is one ASCII line:
//!
//! ```text
//! pc=<odometer>;<timestamp_ms>;<longitude>;<latitude>|\n
//! ```
//!
//! The odometer is rounded to an integer, the timestamp is wall-clock
//! milliseconds since the UNIX epoch, and the coordinates are printed with six
//! significant digits in the shortest `%g` form (`24.9384`, `60.1699`, `1.5e-05`).

use std::fmt::{self, Write as _};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::protocol::constants::{
    COORDINATE_PRECISION, FIELD_SEPARATOR, LINE_PREFIX, LINE_TERMINATOR, MAX_LINE_LEN,
};
use crate::status::Status;

/// A decoded (or about to be encoded) status line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusLine {
    /// Odometer rounded to the nearest integer
    pub odometer: i64,
    /// Broadcast instant in milliseconds since the UNIX epoch
    pub timestamp_ms: i64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
}

impl StatusLine {
    /// Build the line for `status` stamped with `timestamp_ms`
    pub fn new(status: &Status, timestamp_ms: i64) -> Self {
        Self {
            odometer: status.odometer.round() as i64,
            timestamp_ms,
            longitude: status.longitude,
            latitude: status.latitude,
        }
    }

    /// Build the line for `status` stamped with the current wall-clock time
    pub fn now(status: &Status) -> Self {
        Self::new(status, unix_millis(SystemTime::now()))
    }

    /// Encode to the newline-terminated wire form
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(MAX_LINE_LEN);
        // Writing into BytesMut only grows the buffer; it cannot fail.
        let _ = writeln!(buf, "{}", self);
        buf.freeze()
    }

    /// Decode one line, with or without its trailing newline
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
        let body = line
            .strip_prefix(LINE_PREFIX)
            .ok_or(ProtocolError::MissingPrefix)?
            .strip_suffix(LINE_TERMINATOR)
            .ok_or(ProtocolError::MissingTerminator)?;

        let fields: Vec<&str> = body.split(FIELD_SEPARATOR).collect();
        if fields.len() != 4 {
            return Err(ProtocolError::FieldCount(fields.len()));
        }

        Ok(Self {
            odometer: parse_field("odometer", fields[0])?,
            timestamp_ms: parse_field("timestamp", fields[1])?,
            longitude: parse_field("longitude", fields[2])?,
            latitude: parse_field("latitude", fields[3])?,
        })
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{prefix}{odo}{sep}{ts}{sep}{lon}{sep}{lat}{term}",
            prefix = LINE_PREFIX,
            odo = self.odometer,
            ts = self.timestamp_ms,
            lon = format_significant(self.longitude, COORDINATE_PRECISION),
            lat = format_significant(self.latitude, COORDINATE_PRECISION),
            sep = FIELD_SEPARATOR,
            term = LINE_TERMINATOR,
        )
    }
}

fn parse_field<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ProtocolError> {
    value.parse().map_err(|_| ProtocolError::InvalidField {
        field,
        value: value.to_string(),
    })
}

/// Milliseconds since the UNIX epoch, rounded to the nearest millisecond
///
/// Instants before the epoch come out negative.
pub fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => round_millis(elapsed.as_millis(), elapsed.subsec_nanos()),
        Err(e) => {
            let before = e.duration();
            -round_millis(before.as_millis(), before.subsec_nanos())
        }
    }
}

fn round_millis(millis: u128, subsec_nanos: u32) -> i64 {
    let rounded = if subsec_nanos % 1_000_000 >= 500_000 {
        millis + 1
    } else {
        millis
    };
    i64::try_from(rounded).unwrap_or(i64::MAX)
}

/// Format `value` with `precision` significant digits, `%g` style
///
/// Uses fixed notation when the decimal exponent is in `-4..precision`,
/// scientific notation otherwise. Trailing zeros (and a bare trailing point)
/// are removed; the exponent always has a sign and at least two digits.
pub fn format_significant(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let precision = precision.max(1);
    // The exponent after rounding to `precision` digits decides the notation.
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_encode_typical_line() {
        let status = Status::new(1523.6, 24.938379, 60.169857);
        let line = StatusLine::new(&status, 1_700_000_000_123);

        assert_eq!(
            line.encode(),
            Bytes::from_static(b"pc=1524;1700000000123;24.9384;60.1699|\n")
        );
    }

    #[test]
    fn test_encode_zero_status() {
        let line = StatusLine::new(&Status::default(), 42);
        assert_eq!(line.encode(), Bytes::from_static(b"pc=0;42;0;0|\n"));
    }

    #[test]
    fn test_odometer_rounding() {
        assert_eq!(StatusLine::new(&Status::new(0.2, 0.0, 0.0), 0).odometer, 0);
        assert_eq!(StatusLine::new(&Status::new(0.5, 0.0, 0.0), 0).odometer, 1);
        assert_eq!(StatusLine::new(&Status::new(2.49, 0.0, 0.0), 0).odometer, 2);
        assert_eq!(StatusLine::new(&Status::new(-1.5, 0.0, 0.0), 0).odometer, -2);
    }

    #[test]
    fn test_format_significant_fixed() {
        assert_eq!(format_significant(0.0, 6), "0");
        assert_eq!(format_significant(1.0, 6), "1");
        assert_eq!(format_significant(24.938379, 6), "24.9384");
        assert_eq!(format_significant(-122.419416, 6), "-122.419");
        assert_eq!(format_significant(123456.7, 6), "123457");
        assert_eq!(format_significant(0.0001234567, 6), "0.000123457");
        assert_eq!(format_significant(99.99999, 6), "100");
    }

    #[test]
    fn test_format_significant_scientific() {
        assert_eq!(format_significant(1234567.0, 6), "1.23457e+06");
        assert_eq!(format_significant(0.000015, 6), "1.5e-05");
        assert_eq!(format_significant(-2.5e-7, 6), "-2.5e-07");
        assert_eq!(format_significant(1e100, 6), "1e+100");
    }

    #[test]
    fn test_format_significant_non_finite() {
        assert_eq!(format_significant(f64::NAN, 6), "nan");
        assert_eq!(format_significant(f64::INFINITY, 6), "inf");
        assert_eq!(format_significant(f64::NEG_INFINITY, 6), "-inf");
    }

    #[test]
    fn test_parse_line() {
        let line = StatusLine::parse("pc=1524;1700000000123;24.9384;60.1699|\n").unwrap();

        assert_eq!(line.odometer, 1524);
        assert_eq!(line.timestamp_ms, 1_700_000_000_123);
        assert_eq!(line.longitude, 24.9384);
        assert_eq!(line.latitude, 60.1699);
    }

    #[test]
    fn test_parse_scientific_coordinates() {
        let line = StatusLine::parse("pc=0;1;1.5e-05;-2.5e-07|").unwrap();
        assert_eq!(line.longitude, 1.5e-5);
        assert_eq!(line.latitude, -2.5e-7);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            StatusLine::parse("xx=0;0;0;0|"),
            Err(ProtocolError::MissingPrefix)
        );
        assert_eq!(
            StatusLine::parse("pc=0;0;0;0"),
            Err(ProtocolError::MissingTerminator)
        );
        assert_eq!(
            StatusLine::parse("pc=0;0;0|"),
            Err(ProtocolError::FieldCount(3))
        );
        assert!(matches!(
            StatusLine::parse("pc=1.5;0;0;0|"),
            Err(ProtocolError::InvalidField { field: "odometer", .. })
        ));
    }

    #[test]
    fn test_unix_millis_rounding() {
        let t = UNIX_EPOCH + Duration::from_micros(1_499);
        assert_eq!(unix_millis(t), 1);

        let t = UNIX_EPOCH + Duration::from_micros(1_500);
        assert_eq!(unix_millis(t), 2);

        let t = UNIX_EPOCH - Duration::from_millis(250);
        assert_eq!(unix_millis(t), -250);
    }

    #[test]
    fn test_now_uses_wall_clock() {
        let before = unix_millis(SystemTime::now());
        let line = StatusLine::now(&Status::default());
        let after = unix_millis(SystemTime::now());

        assert!(line.timestamp_ms >= before && line.timestamp_ms <= after);
    }
}
