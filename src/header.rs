//! Header discovery and column naming.

use crate::error::{Result, SheetcastError};
use regex::Regex;

/// How the header region is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    /// `Rows(0)` means no header: columns get `Unnamed: i` names.
    Rows(u32),
    /// Caller-provided names; no header rows are consumed.
    Explicit(Vec<String>),
}

impl Default for Header {
    fn default() -> Self {
        Header::Rows(0)
    }
}

impl From<bool> for Header {
    fn from(present: bool) -> Self {
        Header::Rows(u32::from(present))
    }
}

impl From<u32> for Header {
    fn from(rows: u32) -> Self {
        Header::Rows(rows)
    }
}

impl From<Vec<String>> for Header {
    fn from(names: Vec<String>) -> Self {
        Header::Explicit(names)
    }
}

impl From<Vec<&str>> for Header {
    fn from(names: Vec<&str>) -> Self {
        Header::Explicit(names.into_iter().map(str::to_owned).collect())
    }
}

/// Where to look for the header start when it is not the first row.
#[derive(Debug, Clone)]
pub enum HeaderLookup {
    /// Header starts at the first row where any cell's stringified value
    /// matches the pattern (substring search).
    Pattern(String),
    /// Header starts at the first non-empty cell in this 0-based column.
    Column(u32),
}

impl From<&str> for HeaderLookup {
    fn from(pattern: &str) -> Self {
        HeaderLookup::Pattern(pattern.to_owned())
    }
}

impl From<u32> for HeaderLookup {
    fn from(col: u32) -> Self {
        HeaderLookup::Column(col)
    }
}

pub(crate) enum CompiledLookup {
    Pattern(Regex),
    Column(u32),
}

impl CompiledLookup {
    pub fn compile(lookup: &HeaderLookup) -> Result<Self> {
        Ok(match lookup {
            HeaderLookup::Pattern(p) => CompiledLookup::Pattern(
                Regex::new(p)
                    .map_err(|e| SheetcastError::config(format!("invalid lookup_head: {e}")))?,
            ),
            HeaderLookup::Column(c) => CompiledLookup::Column(*c),
        })
    }

    /// Whether this stringified row marks the header start.
    pub fn matches(&self, row: &[(u32, String)]) -> bool {
        match self {
            CompiledLookup::Pattern(re) => row.iter().any(|(_, text)| re.is_match(text)),
            CompiledLookup::Column(col) => row.iter().any(|(c, _)| c == col),
        }
    }
}

/// Collects stringified header rows and produces final column names.
#[derive(Debug, Default)]
pub(crate) struct HeaderBuilder {
    /// One entry per header row: (col, text) pairs, non-blank cells only.
    rows: Vec<Vec<(u32, String)>>,
}

impl HeaderBuilder {
    pub fn push_row(&mut self, cells: Vec<(u32, String)>) {
        self.rows.push(cells);
    }

    pub fn rows_collected(&self) -> usize {
        self.rows.len()
    }

    /// Columns that carry at least one header cell, in sheet order.
    pub fn columns(&self) -> Vec<u32> {
        let mut cols: Vec<u32> = self
            .rows
            .iter()
            .flat_map(|row| row.iter().map(|(c, _)| *c))
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    /// Resolve a name for each column in `columns` (sheet order expected).
    ///
    /// Multi-row headers concatenate non-empty cells top-to-bottom with
    /// `", "`. A column whose top-most cells are empty inherits those rows
    /// from the nearest left neighbor that had a value there; a column with
    /// no header cells at all becomes `Unnamed`. Names are not deduplicated.
    pub fn resolve(&self, columns: &[u32]) -> Vec<String> {
        let height = self.rows.len();
        if height == 0 {
            return columns.iter().map(|_| "Unnamed".to_owned()).collect();
        }

        let cell = |row: usize, col: u32| -> Option<&str> {
            self.rows[row]
                .iter()
                .find(|(c, _)| *c == col)
                .map(|(_, text)| text.as_str())
        };

        if height == 1 {
            return columns
                .iter()
                .map(|&col| cell(0, col).unwrap_or("Unnamed").to_owned())
                .collect();
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut prev_parts: Vec<Option<String>> = vec![None; height];

        for &col in columns {
            let mut parts: Vec<Option<String>> = (0..height)
                .map(|row| cell(row, col).map(str::to_owned))
                .collect();

            match parts.iter().position(Option::is_some) {
                None => names.push("Unnamed".to_owned()),
                Some(top) => {
                    // top-most empties inherit from the left neighbor
                    for row in 0..top {
                        parts[row].clone_from(&prev_parts[row]);
                    }
                    let joined = parts
                        .iter()
                        .flatten()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ");
                    names.push(if joined.is_empty() {
                        "Unnamed".to_owned()
                    } else {
                        joined
                    });
                    prev_parts = parts;
                }
            }
        }
        names
    }
}
