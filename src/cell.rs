//! Raw cell events produced by the format adapters.

use crate::shared::SharedStrings;

/// Canonical display strings for worksheet error codes (MS-XLSB 2.5.97.2).
const ERROR_CODES: &[(u8, &str)] = &[
    (0x00, "#NULL!"),
    (0x07, "#DIV/0!"),
    (0x0F, "#VALUE!"),
    (0x17, "#REF!"),
    (0x1D, "#NAME?"),
    (0x24, "#NUM!"),
    (0x2A, "#N/A"),
    (0x2B, "#GETTING_DATA"),
];

/// A single cell as it comes off the wire, before any conversion.
///
/// Encodings stay implicit: dates are floats with `temporal` set from the
/// cell's style, shared strings are table indices, RK numbers stay packed.
/// Everything is expanded during prepare, not while reading.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    /// IEEE-754 cell value; `temporal` when the style is a date/time/duration.
    Number { value: f64, temporal: bool },
    /// XLSB packed 30-bit numeric; expansion to f64 is deferred.
    RkNumber { raw: u32, temporal: bool },
    /// UTF-8 string stored directly in the cell record.
    InlineString(String),
    /// Index into the workbook shared-strings table.
    SharedStringRef(u32),
    Boolean(bool),
    /// Worksheet error code, surfaced as its `#…!` string during prepare.
    ErrorCode(u8),
    /// Explicit empty cell (styled but valueless, or nulled by the caller).
    Blank,
}

impl RawCell {
    pub fn is_blank(&self) -> bool {
        matches!(self, RawCell::Blank)
    }

    /// Stringify the cell the same way prepare's UTF-8 fallback would.
    /// Used for header cells and header lookup. Returns `None` for blanks.
    pub(crate) fn display_string(&self, shared: &SharedStrings) -> Option<String> {
        match self {
            RawCell::Number { value, temporal } => Some(if *temporal {
                crate::chunk::format_timestamp_ms(crate::chunk::serial_to_unix_ms(*value))
            } else {
                crate::chunk::format_float(*value)
            }),
            RawCell::RkNumber { raw, temporal } => {
                let v = crate::chunk::rk_to_f64(*raw);
                Some(if *temporal {
                    crate::chunk::format_timestamp_ms(crate::chunk::serial_to_unix_ms(v))
                } else {
                    crate::chunk::format_float(v)
                })
            }
            RawCell::InlineString(s) => Some(s.clone()),
            RawCell::SharedStringRef(idx) => shared.get(*idx).map(str::to_owned),
            RawCell::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_owned()),
            RawCell::ErrorCode(code) => Some(error_code_string(*code).to_owned()),
            RawCell::Blank => None,
        }
    }
}

/// Canonical error text for a worksheet error code.
pub(crate) fn error_code_string(code: u8) -> &'static str {
    ERROR_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
        .unwrap_or("#UNKNOWN!")
}

/// Inverse mapping for XLSX error cells, which carry the display text.
pub(crate) fn error_code_from_str(text: &str) -> Option<u8> {
    ERROR_CODES
        .iter()
        .find(|(_, s)| *s == text)
        .map(|(c, _)| *c)
}

/// One `(row, col, cell)` event, 0-based, emitted in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEvent {
    pub row: u32,
    pub col: u32,
    pub cell: RawCell,
}

/// Where the format adapters deliver their cell stream.
///
/// `push_cell` returns `Ok(false)` when the consumer is done (take limit
/// reached); adapters stop scanning at that point.
pub(crate) trait CellSink {
    fn push_cell(&mut self, event: CellEvent) -> crate::error::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_canonical_text() {
        assert_eq!(error_code_string(0x07), "#DIV/0!");
        assert_eq!(error_code_string(0x2A), "#N/A");
        assert_eq!(error_code_string(0x63), "#UNKNOWN!");
    }

    #[test]
    fn display_string_renders_booleans_and_numbers() {
        let shared = SharedStrings::default();
        assert_eq!(
            RawCell::Boolean(true).display_string(&shared).as_deref(),
            Some("TRUE")
        );
        assert_eq!(
            RawCell::Number {
                value: 3.0,
                temporal: false
            }
            .display_string(&shared)
            .as_deref(),
            Some("3")
        );
        assert_eq!(RawCell::Blank.display_string(&shared), None);
    }
}
