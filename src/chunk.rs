//! Homogeneous cell runs and the vectorized casts that expand them.
//!
//! A chunk is a run of consecutive cells within one column that share a
//! storage shape. Raw shapes (`Rk32`, `SharedIdx`) keep the wire encoding
//! untouched; prepare rewrites each chunk into its final representation in
//! one pass over a contiguous buffer.

use chrono::{DateTime, Timelike};

pub(crate) const MS_PER_DAY: f64 = 86_400_000.0;
/// Days between 1899-12-31 (Excel serial 0, with the fictitious 1900-02-29)
/// and 1970-01-01.
pub(crate) const UNIX_EPOCH_SERIAL: f64 = 25_569.0;

/// Storage shape tag, used for run boundaries and dominance ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Float { temporal: bool },
    Rk { temporal: bool },
    Str,
    SharedIdx,
    Null,
}

impl Shape {
    /// Tie-break rank for `dominant_shape`: numeric > temporal-numeric >
    /// string > null.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Shape::Float { temporal: false } | Shape::Rk { temporal: false } => 4,
            Shape::Float { temporal: true } | Shape::Rk { temporal: true } => 3,
            Shape::Str | Shape::SharedIdx => 2,
            Shape::Null => 1,
        }
    }
}

/// Backing buffer of a sealed chunk. Each variant owns its data exclusively.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkData {
    Float { temporal: bool, values: Vec<f64> },
    Rk { temporal: bool, values: Vec<u32> },
    Str(Vec<String>),
    SharedIdx(Vec<u32>),
    Null(usize),
}

/// A sealed run of same-shape cells starting at `origin` (0-based body row).
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub origin: u32,
    pub data: ChunkData,
}

impl Chunk {
    pub fn nulls(origin: u32, count: usize) -> Self {
        Chunk {
            origin,
            data: ChunkData::Null(count),
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ChunkData::Float { values, .. } => values.len(),
            ChunkData::Rk { values, .. } => values.len(),
            ChunkData::Str(values) => values.len(),
            ChunkData::SharedIdx(values) => values.len(),
            ChunkData::Null(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> Shape {
        match &self.data {
            ChunkData::Float { temporal, .. } => Shape::Float {
                temporal: *temporal,
            },
            ChunkData::Rk { temporal, .. } => Shape::Rk {
                temporal: *temporal,
            },
            ChunkData::Str(_) => Shape::Str,
            ChunkData::SharedIdx(_) => Shape::SharedIdx,
            ChunkData::Null(_) => Shape::Null,
        }
    }
}

/// Decode one packed RK value (MS-XLSB 2.5.122).
///
/// Bit 0: value is scaled by 100. Bit 1: the upper 30 bits are a signed
/// integer, otherwise they are the high half of an IEEE-754 double.
pub(crate) fn rk_to_f64(raw: u32) -> f64 {
    let div100 = raw & 0b01 != 0;
    let is_int = raw & 0b10 != 0;
    let body = raw & 0xFFFF_FFFC;

    let value = if is_int {
        ((body as i32) >> 2) as f64
    } else {
        f64::from_bits((body as u64) << 32)
    };

    if div100 {
        value / 100.0
    } else {
        value
    }
}

/// Excel serial days → milliseconds since 1970-01-01, truncating toward zero.
///
/// The 1900 leap-year bug is preserved: serials below 60 (before the
/// fictitious 1900-02-29) shift by one fewer day. Serials below 1.0 carry no
/// date part and map onto the epoch day as time-of-day.
pub(crate) fn serial_to_unix_ms(serial: f64) -> i64 {
    let adjust = if serial >= 1.0 {
        UNIX_EPOCH_SERIAL - f64::from(serial < 60.0)
    } else {
        0.0
    };
    ((serial - adjust) * MS_PER_DAY) as i64
}

/// Whether rounding every value to `precision` decimals leaves a whole
/// number, i.e. the run can narrow to 64-bit integers without loss.
pub(crate) fn float_run_is_integral(values: &[f64], precision: u32) -> bool {
    let scale = 10f64.powi(precision as i32);
    values
        .iter()
        .all(|v| v.is_finite() && (v * scale).round() / scale == v.trunc())
}

/// Render a float the way the UTF-8 fallback does: `1`, not `1.0`.
pub(crate) fn format_float(value: f64) -> String {
    format!("{value}")
}

/// Render a millisecond timestamp: date-only at midnight, seconds otherwise,
/// milliseconds only when sub-second precision is present.
pub(crate) fn format_timestamp_ms(ms: i64) -> String {
    let Some(dt) = DateTime::from_timestamp_millis(ms) else {
        return ms.to_string();
    };
    let naive = dt.naive_utc();
    let time = naive.time();
    if time.num_seconds_from_midnight() == 0 && time.nanosecond() == 0 {
        naive.format("%Y-%m-%d").to_string()
    } else if time.nanosecond() == 0 {
        naive.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        naive.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}
