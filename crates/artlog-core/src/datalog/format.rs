//! CSV row format
//!
//! Every field, the last one included, is followed by a comma. Numbers are
//! written from their fixed-point form as `[-]int.frac` with the fractional
//! part zero-padded to three digits. The longitude column drops the leading
//! hundreds-of-degrees digit, leaving at most nine characters.

use std::fmt::Write;

use crate::channel::ChannelRegistry;
use crate::gps::GpsFix;
use crate::session::LogRecord;

/// Fixed columns after `Time,`
pub const GPS_HEADERS: &str = "Latitude,Longitude,GPS Speed(knots),";

/// Accelerometer columns
pub const ACCEL_HEADERS: &str = "ACC_X(G),ACC_Y(G),ACC_Z(G),";

/// Fixed-point scale of accelerometer readings (milli-g)
pub const ACCEL_PRECISION: u16 = 1000;

/// Characters of the longitude column
const LONGITUDE_WIDTH: usize = 9;

/// Append `value / precision` followed by a comma.
///
/// A zero precision is treated as 1.
pub fn push_fixed(out: &mut String, value: i32, precision: u16) {
    let precision = u32::from(precision.max(1));
    let magnitude = value.unsigned_abs();
    if value < 0 {
        out.push('-');
    }
    let _ = write!(out, "{}.{:03},", magnitude / precision, magnitude % precision);
}

/// Session header line
pub fn header_line(registry: &ChannelRegistry) -> String {
    let mut out = String::from("Time,");
    out.push_str(GPS_HEADERS);
    out.push_str(ACCEL_HEADERS);

    for (_, channel) in registry.enabled_analog() {
        out.push_str(&channel.name);
        out.push(',');
    }
    for (_, channel) in registry.enabled_can() {
        for signal in &channel.signals {
            out.push_str(&signal.name);
            out.push(',');
        }
    }

    out.push('\n');
    out
}

/// One data row for the current tick
pub fn row_line(
    record: &LogRecord,
    fix: &GpsFix,
    accel_milli_g: [i16; 3],
    registry: &ChannelRegistry,
) -> String {
    let mut out = String::with_capacity(256);
    let _ = write!(
        out,
        "{}.{:03},",
        record.timestamp.seconds, record.timestamp.subseconds
    );

    out.push_str(&fix.latitude);
    out.push(',');
    out.extend(fix.longitude.chars().skip(1).take(LONGITUDE_WIDTH));
    out.push(',');
    out.push_str(&fix.speed);
    out.push(',');

    for axis in accel_milli_g {
        push_fixed(&mut out, i32::from(axis), ACCEL_PRECISION);
    }

    for (_, channel) in registry.enabled_analog() {
        push_fixed(&mut out, channel.processed.fixed, channel.precision());
    }
    for (_, channel) in registry.enabled_can() {
        for signal in &channel.signals {
            push_fixed(&mut out, signal.processed.fixed, signal.calibration.precision);
        }
    }

    out.push('\n');
    out
}
