//! Wide-integer trace time.
//!
//! Source timestamps are absolute microsecond (or nanosecond) counters that
//! routinely exceed 2^53, so they stay in `i64` until the very last pixel
//! computation. Arithmetic saturates instead of wrapping.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Time units per second for microsecond timestamps.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// A point on the trace clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TraceTime(pub i64);

/// Signed distance between two [`TraceTime`]s. Negative values show up for
/// inverted spans and out-of-order arrivals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TraceDuration(pub i64);

impl TraceTime {
    pub const ZERO: TraceTime = TraceTime(0);
    pub const MIN: TraceTime = TraceTime(i64::MIN);
    pub const MAX: TraceTime = TraceTime(i64::MAX);

    pub fn units(self) -> i64 {
        self.0
    }

    pub fn duration_since(self, earlier: TraceTime) -> TraceDuration {
        TraceDuration(self.0.saturating_sub(earlier.0))
    }
}

impl TraceDuration {
    pub const ZERO: TraceDuration = TraceDuration(0);

    pub fn units(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Negative durations (inverted intervals) count as zero work.
    pub fn clamp_non_negative(self) -> Self {
        TraceDuration(self.0.max(0))
    }

    pub fn saturating_mul(self, factor: i64) -> Self {
        TraceDuration(self.0.saturating_mul(factor))
    }

    pub fn div(self, divisor: i64) -> Self {
        if divisor == 0 {
            return self;
        }
        TraceDuration(self.0 / divisor)
    }

    /// Scale by a real factor, truncating toward zero. Float-to-int casts
    /// saturate, so huge factors pin at the `i64` limits.
    pub fn scale(self, factor: f64) -> Self {
        TraceDuration((self.0 as f64 * factor) as i64)
    }

    /// Controlled narrowing for pixel math.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl Add<TraceDuration> for TraceTime {
    type Output = TraceTime;

    fn add(self, rhs: TraceDuration) -> TraceTime {
        TraceTime(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<TraceDuration> for TraceTime {
    fn add_assign(&mut self, rhs: TraceDuration) {
        *self = *self + rhs;
    }
}

impl Sub<TraceDuration> for TraceTime {
    type Output = TraceTime;

    fn sub(self, rhs: TraceDuration) -> TraceTime {
        TraceTime(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign<TraceDuration> for TraceTime {
    fn sub_assign(&mut self, rhs: TraceDuration) {
        *self = *self - rhs;
    }
}

impl Sub for TraceTime {
    type Output = TraceDuration;

    fn sub(self, rhs: TraceTime) -> TraceDuration {
        self.duration_since(rhs)
    }
}

impl Add for TraceDuration {
    type Output = TraceDuration;

    fn add(self, rhs: TraceDuration) -> TraceDuration {
        TraceDuration(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for TraceDuration {
    fn add_assign(&mut self, rhs: TraceDuration) {
        *self = *self + rhs;
    }
}

impl Sub for TraceDuration {
    type Output = TraceDuration;

    fn sub(self, rhs: TraceDuration) -> TraceDuration {
        TraceDuration(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for TraceDuration {
    type Output = TraceDuration;

    fn neg(self) -> TraceDuration {
        TraceDuration(self.0.saturating_neg())
    }
}

impl fmt::Display for TraceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis label for a time relative to the dataset start, e.g. `+1.2345s`.
///
/// Computed with integer division so labels stay exact far beyond 2^53.
pub fn format_relative_seconds(
    delta: TraceDuration,
    units_per_second: i64,
    decimals: u32,
) -> String {
    let units_per_second = units_per_second.max(1).unsigned_abs() as u128;
    let sign = if delta.0 < 0 { '-' } else { '+' };
    let magnitude = delta.0.unsigned_abs() as u128;
    let whole = magnitude / units_per_second;
    if decimals == 0 {
        return format!("{sign}{whole}s");
    }
    let remainder = magnitude % units_per_second;
    let scale = 10u128.pow(decimals);
    let fraction = remainder * scale / units_per_second;
    format!(
        "{sign}{whole}.{fraction:0width$}s",
        width = decimals as usize
    )
}

/// Human readable span length for tooltips.
pub fn format_duration(duration: TraceDuration, units_per_second: i64) -> String {
    let seconds = duration.as_f64() / units_per_second.max(1) as f64;
    let magnitude = seconds.abs();
    if magnitude < 1e-6 {
        format!("{:.0}ns", seconds * 1e9)
    } else if magnitude < 1e-3 {
        format!("{:.1}us", seconds * 1e6)
    } else if magnitude < 1.0 {
        format!("{:.3}ms", seconds * 1e3)
    } else {
        format!("{seconds:.3}s")
    }
}

struct WideIntVisitor;

impl<'de> Visitor<'de> for WideIntVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer timestamp or a string holding one")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| E::custom(format!("timestamp {v} exceeds i64")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.trim()
            .parse::<i64>()
            .map_err(|err| E::custom(format!("timestamp {v:?}: {err}")))
    }
}

// Producers serialize wide timestamps as strings to survive JSON number
// handling, so both forms are accepted.
impl<'de> Deserialize<'de> for TraceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WideIntVisitor).map(TraceTime)
    }
}

impl<'de> Deserialize<'de> for TraceDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WideIntVisitor).map(TraceDuration)
    }
}
