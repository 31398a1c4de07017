//! Number-format classification shared by the XLSX and XLSB adapters.
//!
//! The only thing the reader needs from a cell style is whether a numeric
//! value represents a date/time/duration. That is decided per cell-xf from
//! the number format it references, either a built-in id or a custom code.

/// Built-in number format ids that are dates, times, or durations.
const TEMPORAL_BUILTIN: &[u16] = &[
    0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x2D, 0x2E, 0x2F,
];

/// Built-in number format ids that are plainly numeric.
const NUMERIC_BUILTIN: &[u16] = &[0x01, 0x02, 0x03, 0x04, 0x25, 0x26, 0x27, 0x28, 0x30];

/// What a cell style tells us about a numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum StyleClass {
    #[default]
    General,
    Numeric,
    Temporal,
}

/// Per-workbook table mapping a cell-xf index to its class.
#[derive(Debug, Default)]
pub(crate) struct StyleTable {
    classes: Vec<StyleClass>,
}

impl StyleTable {
    pub fn from_xfs(classes: Vec<StyleClass>) -> Self {
        StyleTable { classes }
    }

    pub fn is_temporal(&self, xf: u32) -> bool {
        matches!(self.classes.get(xf as usize), Some(StyleClass::Temporal))
    }
}

/// Classify a number format by id and (for custom formats) code.
pub(crate) fn classify_format(fmt_id: u16, code: Option<&str>) -> StyleClass {
    if let Some(code) = code {
        let first = code.split(';').next().unwrap_or(code);
        if first == "0" || first.contains(".00") {
            return StyleClass::Numeric;
        }
        if format_code_is_temporal(first) {
            return StyleClass::Temporal;
        }
    }
    if TEMPORAL_BUILTIN.contains(&fmt_id) {
        StyleClass::Temporal
    } else if NUMERIC_BUILTIN.contains(&fmt_id) {
        StyleClass::Numeric
    } else {
        StyleClass::General
    }
}

/// A format code is temporal when it still contains one of `dmhysDMHYS`
/// after quoted literals, color/condition brackets, and backslash escapes
/// are stripped. Elapsed-time brackets like `[hh]` count as temporal.
fn format_code_is_temporal(code: &str) -> bool {
    let mut chars = code.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' => {
                chars.next();
            }
            '[' => {
                let section: String = chars.by_ref().take_while(|&c| c != ']').collect();
                if is_elapsed_section(&section) {
                    return true;
                }
            }
            'd' | 'm' | 'h' | 'y' | 's' | 'D' | 'M' | 'H' | 'Y' | 'S' => return true,
            _ => {}
        }
    }
    false
}

/// `[h]`, `[hh]`, `[m]`, `[mm]`, `[s]`, `[ss]` mark elapsed durations;
/// anything else in brackets is a color or condition and is ignored.
fn is_elapsed_section(section: &str) -> bool {
    !section.is_empty()
        && section.len() <= 2
        && section
            .chars()
            .all(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'))
}
