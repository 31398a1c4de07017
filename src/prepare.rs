//! Per-column preparation: expansion, temporal normalization, narrowing,
//! and conflict resolution, ending in a single typed Arrow array.
//!
//! Everything here is column-local, so the table assembler may run prepare
//! for independent columns in parallel.

use std::sync::Arc;

use arrow::array::{
    new_null_array, Array, ArrayRef, Float64Array, Int64Array, StringArray,
    TimestampMillisecondArray,
};
use arrow::compute::concat;
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{NaiveDate, NaiveDateTime};

use crate::chunk::{
    float_run_is_integral, format_float, format_timestamp_ms, rk_to_f64, serial_to_unix_ms, Chunk,
    ChunkData,
};
use crate::error::{Result, SheetcastError};
use crate::shared::SharedStrings;

/// Policy for columns that mix numeric, temporal, and string chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictResolve {
    /// Stringify every non-null chunk; the column comes out as UTF-8.
    #[default]
    No,
    /// Coerce toward timestamps when any temporal chunk exists.
    Temporal,
    /// Coerce strings toward floats when any numeric chunk exists.
    Numeric,
    /// Temporal first (with a string→float→timestamp second try), then
    /// numeric.
    All,
}

/// Patterns tried in order when parsing strings as timestamps.
pub const DEFAULT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d",
];

/// Shared, read-only inputs for preparing one column.
pub(crate) struct PrepareContext<'a> {
    pub shared: &'a SharedStrings,
    pub conflict: ConflictResolve,
    pub datetime_formats: &'a [String],
    pub float_precision: Option<u32>,
    pub sheet: &'a str,
}

/// A chunk after conversion, aligned with the column's final type.
enum Cooked {
    F64(Vec<f64>),
    Ts(Vec<i64>),
    Str(Vec<String>),
    Null(usize),
}

impl Cooked {
    fn len(&self) -> usize {
        match self {
            Cooked::F64(v) => v.len(),
            Cooked::Ts(v) => v.len(),
            Cooked::Str(v) => v.len(),
            Cooked::Null(n) => *n,
        }
    }
}

/// The millisecond timestamp type every temporal column resolves to.
pub(crate) fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, None)
}

/// Run P1–P4 over a sealed chunk list and concatenate the result.
pub(crate) fn prepare_chunks(chunks: Vec<Chunk>, ctx: &PrepareContext) -> Result<ArrayRef> {
    let total: usize = chunks.iter().map(Chunk::len).sum();

    // P1: expand packed encodings so later phases see only floats, strings,
    // timestamps, and nulls.
    let chunks = expand(chunks, ctx)?;

    let has_temporal = chunks
        .iter()
        .any(|c| matches!(c.data, ChunkData::Float { temporal: true, .. }));
    let has_numeric = chunks
        .iter()
        .any(|c| matches!(c.data, ChunkData::Float { temporal: false, .. }));
    let has_string = chunks.iter().any(|c| matches!(c.data, ChunkData::Str(_)));

    if !has_temporal && !has_numeric && !has_string {
        return Ok(new_null_array(&DataType::Null, total));
    }

    // P2–P4: pick the conversion plan, falling back to UTF-8 whenever a
    // coercion fails anywhere in the column.
    let cooked: Vec<Cooked> = if has_temporal {
        let coerce = matches!(ctx.conflict, ConflictResolve::Temporal | ConflictResolve::All);
        if (has_numeric || has_string) && !coerce {
            stringify(&chunks)
        } else {
            let two_step = matches!(ctx.conflict, ConflictResolve::All);
            match cook_temporal(&chunks, ctx.datetime_formats, two_step) {
                Some(cooked) => cooked,
                None => stringify(&chunks),
            }
        }
    } else if has_numeric {
        if has_string {
            if matches!(ctx.conflict, ConflictResolve::Numeric | ConflictResolve::All) {
                match cook_numeric(&chunks) {
                    Some(cooked) => cooked,
                    None => stringify(&chunks),
                }
            } else {
                stringify(&chunks)
            }
        } else {
            cook_numeric(&chunks).expect("pure numeric column always cooks")
        }
    } else {
        stringify(&chunks)
    };

    // P3: narrow a pure numeric column to integers when rounding at the
    // configured precision loses nothing.
    let narrow = matches!(cooked.first(), Some(Cooked::F64(_)) | Some(Cooked::Null(_)))
        && cooked.iter().any(|c| matches!(c, Cooked::F64(_)))
        && !has_string
        && !has_temporal
        && ctx.float_precision.is_some_and(|precision| {
            cooked.iter().all(|c| match c {
                Cooked::F64(values) => float_run_is_integral(values, precision),
                _ => true,
            })
        });

    build(cooked, narrow, total)
}

/// P1: `Rk32Run` → `F64Run` (temporal flag preserved), `SharedIdxRun` →
/// `InlineStrRun` via the shared-strings table.
fn expand(chunks: Vec<Chunk>, ctx: &PrepareContext) -> Result<Vec<Chunk>> {
    chunks
        .into_iter()
        .map(|chunk| {
            let origin = chunk.origin;
            let data = match chunk.data {
                ChunkData::Rk { temporal, values } => ChunkData::Float {
                    temporal,
                    values: values.into_iter().map(rk_to_f64).collect(),
                },
                ChunkData::SharedIdx(indices) => {
                    let mut values = Vec::with_capacity(indices.len());
                    for idx in indices {
                        if !ctx.shared.contains(idx) {
                            return Err(SheetcastError::SharedStringsCorrupt {
                                sheet: ctx.sheet.to_owned(),
                                index: idx,
                                len: ctx.shared.len(),
                            });
                        }
                        match ctx.shared.get(idx) {
                            Some(s) => values.push(s.to_owned()),
                            None => {
                                log::debug!("shared string {idx} was nulled; using empty string");
                                values.push(String::new());
                            }
                        }
                    }
                    ChunkData::Str(values)
                }
                other => other,
            };
            Ok(Chunk { origin, data })
        })
        .collect()
}

/// Convert every chunk toward millisecond timestamps. `None` when any
/// single value refuses, which sends the whole column to UTF-8.
fn cook_temporal(chunks: &[Chunk], formats: &[String], two_step: bool) -> Option<Vec<Cooked>> {
    chunks
        .iter()
        .map(|chunk| {
            Some(match &chunk.data {
                ChunkData::Float { values, .. } => {
                    Cooked::Ts(values.iter().map(|v| serial_to_unix_ms(*v)).collect())
                }
                ChunkData::Str(values) => {
                    let mut out = Vec::with_capacity(values.len());
                    for value in values {
                        let parsed = parse_datetime(value, formats).or_else(|| {
                            if two_step {
                                value.trim().parse::<f64>().ok().map(serial_to_unix_ms)
                            } else {
                                None
                            }
                        })?;
                        out.push(parsed);
                    }
                    Cooked::Ts(out)
                }
                ChunkData::Null(count) => Cooked::Null(*count),
                ChunkData::Rk { .. } | ChunkData::SharedIdx(_) => {
                    unreachable!("expanded before cooking")
                }
            })
        })
        .collect()
}

/// Convert string chunks to floats alongside the numeric chunks. `None`
/// when any value fails to parse.
fn cook_numeric(chunks: &[Chunk]) -> Option<Vec<Cooked>> {
    chunks
        .iter()
        .map(|chunk| {
            Some(match &chunk.data {
                ChunkData::Float { values, .. } => Cooked::F64(values.clone()),
                ChunkData::Str(values) => Cooked::F64(
                    values
                        .iter()
                        .map(|v| v.trim().parse::<f64>().ok())
                        .collect::<Option<Vec<_>>>()?,
                ),
                ChunkData::Null(count) => Cooked::Null(*count),
                ChunkData::Rk { .. } | ChunkData::SharedIdx(_) => {
                    unreachable!("expanded before cooking")
                }
            })
        })
        .collect()
}

/// The `no` strategy and the failure fallback: every non-null chunk
/// becomes strings.
fn stringify(chunks: &[Chunk]) -> Vec<Cooked> {
    chunks
        .iter()
        .map(|chunk| match &chunk.data {
            ChunkData::Float { temporal, values } => Cooked::Str(
                values
                    .iter()
                    .map(|v| {
                        if *temporal {
                            format_timestamp_ms(serial_to_unix_ms(*v))
                        } else {
                            format_float(*v)
                        }
                    })
                    .collect(),
            ),
            ChunkData::Str(values) => Cooked::Str(values.clone()),
            ChunkData::Null(count) => Cooked::Null(*count),
            ChunkData::Rk { .. } | ChunkData::SharedIdx(_) => {
                unreachable!("expanded before cooking")
            }
        })
        .collect()
}

/// Try each configured format; date-only formats resolve to midnight.
fn parse_datetime(value: &str, formats: &[String]) -> Option<i64> {
    let value = value.trim();
    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(
                date.and_hms_opt(0, 0, 0)
                    .expect("midnight is valid")
                    .and_utc()
                    .timestamp_millis(),
            );
        }
    }
    None
}

/// Concatenate cooked chunks into one array of the column's final type.
fn build(cooked: Vec<Cooked>, narrow: bool, total: usize) -> Result<ArrayRef> {
    let dtype = cooked
        .iter()
        .find_map(|c| match c {
            Cooked::F64(_) if narrow => Some(DataType::Int64),
            Cooked::F64(_) => Some(DataType::Float64),
            Cooked::Ts(_) => Some(timestamp_type()),
            Cooked::Str(_) => Some(DataType::Utf8),
            Cooked::Null(_) => None,
        })
        .unwrap_or(DataType::Null);

    let arrays: Vec<ArrayRef> = cooked
        .into_iter()
        .filter(|c| c.len() > 0)
        .map(|c| -> ArrayRef {
            match c {
                Cooked::F64(values) if narrow => Arc::new(Int64Array::from_iter_values(
                    values.into_iter().map(|v| v.trunc() as i64),
                )),
                Cooked::F64(values) => Arc::new(Float64Array::from(values)),
                Cooked::Ts(values) => Arc::new(TimestampMillisecondArray::from(values)),
                Cooked::Str(values) => Arc::new(StringArray::from_iter_values(values)),
                Cooked::Null(count) => new_null_array(&dtype, count),
            }
        })
        .collect();

    let result = match arrays.len() {
        0 => new_null_array(&dtype, total),
        1 => arrays.into_iter().next().expect("one array"),
        _ => {
            let refs: Vec<&dyn Array> = arrays.iter().map(AsRef::as_ref).collect();
            concat(&refs)?
        }
    };
    debug_assert_eq!(result.len(), total);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use arrow::datatypes::{Float64Type, Int64Type, TimestampMillisecondType};

    fn ctx<'a>(
        shared: &'a SharedStrings,
        conflict: ConflictResolve,
        formats: &'a [String],
        precision: Option<u32>,
    ) -> PrepareContext<'a> {
        PrepareContext {
            shared,
            conflict,
            datetime_formats: formats,
            float_precision: precision,
            sheet: "Sheet1",
        }
    }

    fn float_chunk(origin: u32, temporal: bool, values: &[f64]) -> Chunk {
        Chunk {
            origin,
            data: ChunkData::Float {
                temporal,
                values: values.to_vec(),
            },
        }
    }

    fn str_chunk(origin: u32, values: &[&str]) -> Chunk {
        Chunk {
            origin,
            data: ChunkData::Str(values.iter().map(|s| (*s).to_owned()).collect()),
        }
    }

    fn default_formats() -> Vec<String> {
        DEFAULT_DATETIME_FORMATS.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn pure_numeric_narrows_with_precision() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![float_chunk(0, false, &[1.0, 2.0]), Chunk::nulls(2, 1)];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::No, &formats, Some(0)),
        )
        .unwrap();
        let ints = arr.as_primitive::<Int64Type>();
        assert_eq!(ints.value(0), 1);
        assert_eq!(ints.value(1), 2);
        assert!(ints.is_null(2));
    }

    #[test]
    fn pure_numeric_keeps_floats_without_precision() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![float_chunk(0, false, &[1.0, 2.0])];
        let arr =
            prepare_chunks(chunks, &ctx(&shared, ConflictResolve::No, &formats, None)).unwrap();
        assert_eq!(arr.data_type(), &DataType::Float64);
    }

    #[test]
    fn temporal_column_converts_to_timestamps() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![float_chunk(0, true, &[44927.0, 44928.5])];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::No, &formats, Some(6)),
        )
        .unwrap();
        let ts = arr.as_primitive::<TimestampMillisecondType>();
        assert_eq!(ts.value(0), (44927 - 25569) * 86_400_000);
        assert_eq!(ts.value(1), (44928 - 25569) * 86_400_000 + 43_200_000);
    }

    #[test]
    fn numeric_strategy_coerces_parseable_strings() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![
            float_chunk(0, false, &[1.5, 2.5]),
            str_chunk(2, &["3.5", " 4.5 "]),
        ];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::Numeric, &formats, Some(6)),
        )
        .unwrap();
        let floats = arr.as_primitive::<Float64Type>();
        assert_eq!(&floats.values()[..], &[1.5, 2.5, 3.5, 4.5]);
        assert_eq!(arr.null_count(), 0);
    }

    #[test]
    fn coerced_numeric_column_never_narrows() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![float_chunk(0, false, &[1.0]), str_chunk(1, &["2"])];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::Numeric, &formats, Some(6)),
        )
        .unwrap();
        assert_eq!(arr.data_type(), &DataType::Float64);
    }

    #[test]
    fn unparseable_string_falls_back_to_utf8() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![float_chunk(0, true, &[44927.0]), str_chunk(1, &["not a date"])];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::Temporal, &formats, Some(6)),
        )
        .unwrap();
        let strs = arr.as_string::<i32>();
        assert_eq!(strs.value(0), "2023-01-01");
        assert_eq!(strs.value(1), "not a date");
    }

    #[test]
    fn all_strategy_tries_float_then_timestamp_for_strings() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![float_chunk(0, true, &[44927.0]), str_chunk(1, &["44928.5"])];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::All, &formats, Some(6)),
        )
        .unwrap();
        let ts = arr.as_primitive::<TimestampMillisecondType>();
        assert_eq!(ts.value(1), (44928 - 25569) * 86_400_000 + 43_200_000);
    }

    #[test]
    fn no_strategy_stringifies_conflicts() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![
            float_chunk(0, false, &[1.0]),
            str_chunk(1, &["x"]),
            Chunk::nulls(2, 1),
        ];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::No, &formats, Some(6)),
        )
        .unwrap();
        let strs = arr.as_string::<i32>();
        assert_eq!(strs.value(0), "1");
        assert_eq!(strs.value(1), "x");
        assert!(strs.is_null(2));
    }

    #[test]
    fn all_null_column_is_null_typed() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let arr = prepare_chunks(
            vec![Chunk::nulls(0, 4)],
            &ctx(&shared, ConflictResolve::No, &formats, Some(6)),
        )
        .unwrap();
        assert_eq!(arr.data_type(), &DataType::Null);
        assert_eq!(arr.len(), 4);
    }

    #[test]
    fn rk_chunks_expand_before_conversion() {
        let shared = SharedStrings::default();
        let formats = default_formats();
        let chunks = vec![Chunk {
            origin: 0,
            data: ChunkData::Rk {
                temporal: false,
                values: vec![(1234 << 2) | 0b10, (250 << 2) | 0b11],
            },
        }];
        let arr = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::No, &formats, None),
        )
        .unwrap();
        let floats = arr.as_primitive::<Float64Type>();
        assert_eq!(&floats.values()[..], &[1234.0, 2.5]);
    }

    #[test]
    fn shared_index_out_of_range_is_corrupt() {
        let shared: SharedStrings = vec![Some("a".to_owned())].into_iter().collect();
        let formats = default_formats();
        let chunks = vec![Chunk {
            origin: 0,
            data: ChunkData::SharedIdx(vec![5]),
        }];
        let err = prepare_chunks(
            chunks,
            &ctx(&shared, ConflictResolve::No, &formats, None),
        )
        .unwrap_err();
        assert!(matches!(err, SheetcastError::SharedStringsCorrupt { .. }));
    }

    #[test]
    fn parse_datetime_accepts_iso_variants() {
        let formats = default_formats();
        assert_eq!(
            parse_datetime("2023-01-01", &formats),
            Some((44927 - 25569) * 86_400_000)
        );
        assert_eq!(
            parse_datetime("2023-01-02 12:00:00", &formats),
            Some((44928 - 25569) * 86_400_000 + 43_200_000)
        );
        assert_eq!(parse_datetime("not a date", &formats), None);
    }
}
