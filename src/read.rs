//! The read entry points and the scan lifecycle that drives them.
//!
//! A read call opens the package, resolves the sheet, loads shared strings
//! and styles, then streams cells through a `SheetBuilder`: skip region →
//! header lookup → header → body row-gate → sealed series → per-column
//! prepare → assembled table.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use arrow::array::{new_null_array, Array, ArrayRef};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::DataType;
use rayon::prelude::*;

use crate::cell::{CellEvent, CellSink, RawCell};
use crate::error::{Result, SheetcastError};
use crate::gate::{RowFilterStrategy, RowGate};
use crate::header::{CompiledLookup, Header, HeaderBuilder, HeaderLookup};
use crate::prepare::{
    prepare_chunks, ConflictResolve, PrepareContext, DEFAULT_DATETIME_FORMATS,
};
use crate::series::ColumnSeries;
use crate::shared::SharedStrings;
use crate::table::Table;
use crate::xlsb::XlsbWorkbook;
use crate::xlsx::XlsxWorkbook;

/// Sheet addressing: zero-based index or exact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRef {
    Index(usize),
    Name(String),
}

impl From<usize> for SheetRef {
    fn from(index: usize) -> Self {
        SheetRef::Index(index)
    }
}

impl From<&str> for SheetRef {
    fn from(name: &str) -> Self {
        SheetRef::Name(name.to_owned())
    }
}

impl From<String> for SheetRef {
    fn from(name: String) -> Self {
        SheetRef::Name(name)
    }
}

/// Cells whose text matches become blanks while reading.
pub enum NullValues {
    Literals(Vec<String>),
    Predicate(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl NullValues {
    pub fn literals<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NullValues::Literals(values.into_iter().map(Into::into).collect())
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        match self {
            NullValues::Literals(values) => values.iter().any(|v| v == text),
            NullValues::Predicate(predicate) => predicate(text),
        }
    }
}

/// User dtype overrides applied after conflict resolution.
#[derive(Debug, Clone)]
pub enum DTypes {
    /// One blanket type for every column.
    All(DataType),
    /// One type per surviving column, left-to-right.
    ByIndex(Vec<DataType>),
    /// Types for specific column names.
    ByName(HashMap<String, DataType>),
}

/// Invoked once per admitted body row; an error aborts the read.
pub type RowCallback =
    Box<dyn FnMut() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>>;

/// Options for a read call, in the builder style.
///
/// ```no_run
/// use sheetcast::{read, ConflictResolve, ReadOptions};
///
/// let table = read(
///     "report.xlsx",
///     0,
///     ReadOptions::new()
///         .with_header(true)
///         .with_conflict_resolve(ConflictResolve::All),
/// )
/// .unwrap();
/// ```
pub struct ReadOptions {
    pub header: Header,
    pub dtypes: Option<DTypes>,
    /// 0-based spreadsheet column indices omitted while reading.
    pub skip_cols: Vec<u32>,
    /// Rows discarded at the top, before header lookup.
    pub skip_rows: u32,
    pub skip_rows_after_header: u32,
    /// Hard upper bound on admitted body rows.
    pub take_rows: Option<u64>,
    /// When true, blank-only rows are neither admitted nor counted.
    pub take_rows_non_empty: bool,
    pub lookup_head: Option<HeaderLookup>,
    pub lookup_size: usize,
    pub row_filters: Vec<String>,
    pub row_filters_strategy: RowFilterStrategy,
    /// Decimals for float→int narrowing; `None` disables narrowing.
    pub float_precision: Option<u32>,
    pub datetime_formats: Vec<String>,
    pub conflict_resolve: ConflictResolve,
    pub null_values: Option<NullValues>,
    pub row_callback: Option<RowCallback>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            header: Header::default(),
            dtypes: None,
            skip_cols: Vec::new(),
            skip_rows: 0,
            skip_rows_after_header: 0,
            take_rows: None,
            take_rows_non_empty: false,
            lookup_head: None,
            lookup_size: 30,
            row_filters: Vec::new(),
            row_filters_strategy: RowFilterStrategy::default(),
            float_precision: Some(6),
            datetime_formats: DEFAULT_DATETIME_FORMATS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            conflict_resolve: ConflictResolve::default(),
            null_values: None,
            row_callback: None,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, header: impl Into<Header>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_dtypes(mut self, dtypes: DTypes) -> Self {
        self.dtypes = Some(dtypes);
        self
    }

    pub fn with_skip_cols(mut self, cols: impl IntoIterator<Item = u32>) -> Self {
        self.skip_cols = cols.into_iter().collect();
        self
    }

    pub fn with_skip_rows(mut self, rows: u32) -> Self {
        self.skip_rows = rows;
        self
    }

    pub fn with_skip_rows_after_header(mut self, rows: u32) -> Self {
        self.skip_rows_after_header = rows;
        self
    }

    pub fn with_take_rows(mut self, rows: u64) -> Self {
        self.take_rows = Some(rows);
        self
    }

    pub fn with_take_rows_non_empty(mut self, non_empty: bool) -> Self {
        self.take_rows_non_empty = non_empty;
        self
    }

    pub fn with_lookup_head(mut self, lookup: impl Into<HeaderLookup>) -> Self {
        self.lookup_head = Some(lookup.into());
        self
    }

    pub fn with_lookup_size(mut self, size: usize) -> Self {
        self.lookup_size = size;
        self
    }

    pub fn with_row_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.row_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_row_filters_strategy(mut self, strategy: RowFilterStrategy) -> Self {
        self.row_filters_strategy = strategy;
        self
    }

    pub fn with_float_precision(mut self, precision: Option<u32>) -> Self {
        self.float_precision = precision;
        self
    }

    pub fn with_datetime_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datetime_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conflict_resolve(mut self, strategy: ConflictResolve) -> Self {
        self.conflict_resolve = strategy;
        self
    }

    pub fn with_null_values(mut self, nulls: NullValues) -> Self {
        self.null_values = Some(nulls);
        self
    }

    pub fn with_row_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
            + 'static,
    {
        self.row_callback = Some(Box::new(callback));
        self
    }
}

/// Read one sheet of a workbook file into a columnar table.
pub fn read<P: AsRef<Path>>(
    path: P,
    sheet: impl Into<SheetRef>,
    options: ReadOptions,
) -> Result<Table> {
    let file = File::open(path)?;
    read_impl(BufReader::new(file), sheet.into(), options)
}

/// Read one sheet of an in-memory workbook.
pub fn read_from_bytes(
    bytes: &[u8],
    sheet: impl Into<SheetRef>,
    options: ReadOptions,
) -> Result<Table> {
    read_impl(Cursor::new(bytes), sheet.into(), options)
}

enum PackageKind {
    Xlsx,
    Xlsb,
}

fn read_impl<RS: Read + Seek>(
    mut source: RS,
    sheet: SheetRef,
    mut options: ReadOptions,
) -> Result<Table> {
    // Both formats are ZIP containers; they differ in the workbook part.
    let mut magic = [0u8; 4];
    source.seek(SeekFrom::Start(0))?;
    let got = source.read(&mut magic)?;
    source.seek(SeekFrom::Start(0))?;
    if got < 4 || &magic != b"PK\x03\x04" {
        return Err(SheetcastError::format(
            "not a spreadsheet package (missing ZIP signature)",
        ));
    }

    let archive = zip::ZipArchive::new(source)?;
    let kind = {
        let mut kind = None;
        for name in archive.file_names() {
            match name {
                "xl/workbook.xml" => kind = Some(PackageKind::Xlsx),
                "xl/workbook.bin" => kind = Some(PackageKind::Xlsb),
                _ => continue,
            }
            break;
        }
        kind.ok_or_else(|| {
            SheetcastError::format("archive contains neither xl/workbook.xml nor xl/workbook.bin")
        })?
    };

    let null_values = options.null_values.take();
    let mut skip_cols = std::mem::take(&mut options.skip_cols);
    skip_cols.sort_unstable();
    skip_cols.dedup();

    match kind {
        PackageKind::Xlsx => {
            let mut workbook = XlsxWorkbook::open(archive)?;
            let (sheet_name, part_path) = resolve_sheet(workbook.sheets(), &sheet)?;
            let shared = workbook.load_shared_strings(null_values.as_ref())?;
            let styles = workbook.load_styles()?;
            let mut builder = SheetBuilder::new(sheet_name, &shared, options)?;
            workbook.scan_sheet(
                &part_path,
                &styles,
                &shared,
                null_values.as_ref(),
                &skip_cols,
                &mut builder,
            )?;
            builder.finish()
        }
        PackageKind::Xlsb => {
            let mut workbook = XlsbWorkbook::open(archive)?;
            let (sheet_name, part_path) = resolve_sheet(workbook.sheets(), &sheet)?;
            let shared = workbook.load_shared_strings(null_values.as_ref())?;
            let styles = workbook.load_styles()?;
            let mut builder = SheetBuilder::new(sheet_name, &shared, options)?;
            workbook.scan_sheet(
                &part_path,
                &styles,
                &shared,
                null_values.as_ref(),
                &skip_cols,
                &mut builder,
            )?;
            builder.finish()
        }
    }
}

fn resolve_sheet(sheets: &[(String, String)], sheet: &SheetRef) -> Result<(String, String)> {
    match sheet {
        SheetRef::Index(index) => sheets
            .get(*index)
            .cloned()
            .ok_or_else(|| SheetcastError::SheetNotFound(format!("index {index}"))),
        SheetRef::Name(name) => sheets
            .iter()
            .find(|(n, _)| n == name)
            .cloned()
            .ok_or_else(|| SheetcastError::SheetNotFound(name.clone())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Scanning for the header start within the lookup horizon.
    Lookup,
    /// Consuming the header's rows.
    Header,
    /// Discarding `skip_rows_after_header` rows.
    SkipAfter,
    /// Streaming body rows through the gate.
    Body,
}

/// Consumes the adapter's cell stream and assembles the table.
pub(crate) struct SheetBuilder<'a> {
    sheet_name: String,
    shared: &'a SharedStrings,
    opts: ReadOptions,

    state: ScanState,
    lookup: Option<CompiledLookup>,
    lookup_scanned: usize,
    header_rows_needed: u32,
    header: HeaderBuilder,
    pending_skip_after: u32,
    gate: RowGate,

    series: BTreeMap<u32, ColumnSeries>,

    /// Sheet row index of the in-flight row; -1 before the first cell.
    cur_row: i64,
    row_cells: Vec<(u32, RawCell)>,
    row_touched: Vec<u32>,
    row_nonblank: Vec<u32>,
    done: bool,
    /// Error raised in a context that cannot propagate (header completion
    /// inside a void row handler); surfaced by `finish`.
    deferred_error: Option<SheetcastError>,
}

impl<'a> SheetBuilder<'a> {
    pub fn new(
        sheet_name: String,
        shared: &'a SharedStrings,
        opts: ReadOptions,
    ) -> Result<Self> {
        let gate = RowGate::new(
            &opts.row_filters,
            opts.row_filters_strategy.clone(),
            opts.take_rows,
            opts.take_rows_non_empty,
        )?;
        let lookup = opts
            .lookup_head
            .as_ref()
            .map(CompiledLookup::compile)
            .transpose()?;
        let header_rows_needed = match &opts.header {
            Header::Rows(n) => *n,
            Header::Explicit(_) => 0,
        };
        let pending_skip_after = opts.skip_rows_after_header;
        let state = if lookup.is_some() {
            ScanState::Lookup
        } else if header_rows_needed > 0 {
            ScanState::Header
        } else if pending_skip_after > 0 {
            ScanState::SkipAfter
        } else {
            ScanState::Body
        };

        Ok(SheetBuilder {
            sheet_name,
            shared,
            opts,
            state,
            lookup,
            lookup_scanned: 0,
            header_rows_needed,
            header: HeaderBuilder::default(),
            pending_skip_after,
            gate,
            series: BTreeMap::new(),
            cur_row: -1,
            row_cells: Vec::new(),
            row_touched: Vec::new(),
            row_nonblank: Vec::new(),
            done: false,
            deferred_error: None,
        })
    }

    fn end_row(&mut self) -> Result<()> {
        let cells = std::mem::take(&mut self.row_cells);
        let mut touched = std::mem::take(&mut self.row_touched);
        let mut nonblank = std::mem::take(&mut self.row_nonblank);

        if self.cur_row < i64::from(self.opts.skip_rows) {
            return Ok(());
        }

        match self.state {
            ScanState::Lookup => self.lookup_row(&cells),
            ScanState::Header => {
                self.header_row(&cells);
                Ok(())
            }
            ScanState::SkipAfter => {
                self.skip_after_row();
                Ok(())
            }
            ScanState::Body => {
                touched.sort_unstable();
                touched.dedup();
                nonblank.sort_unstable();
                nonblank.dedup();
                self.body_row_end(&touched, &nonblank)
            }
        }
    }

    fn lookup_row(&mut self, cells: &[(u32, RawCell)]) -> Result<()> {
        let text_cells = self.stringify_row(cells);
        let matched = self
            .lookup
            .as_ref()
            .expect("lookup state implies lookup_head")
            .matches(&text_cells);

        if !matched {
            self.lookup_scanned += 1;
            if self.lookup_scanned >= self.opts.lookup_size {
                return Err(self.lookup_error());
            }
            return Ok(());
        }

        if self.header_rows_needed > 0 {
            self.state = ScanState::Header;
            self.header_row(cells);
        } else {
            // the matched row itself opens the post-header region
            self.enter_post_header()?;
            match self.state {
                ScanState::SkipAfter => self.skip_after_row(),
                ScanState::Body => {
                    for (col, cell) in cells {
                        self.body_cell(*col, cell);
                    }
                    let mut touched = std::mem::take(&mut self.row_touched);
                    let mut nonblank = std::mem::take(&mut self.row_nonblank);
                    touched.sort_unstable();
                    touched.dedup();
                    nonblank.sort_unstable();
                    nonblank.dedup();
                    return self.body_row_end(&touched, &nonblank);
                }
                _ => unreachable!("post-header state is SkipAfter or Body"),
            }
        }
        Ok(())
    }

    fn header_row(&mut self, cells: &[(u32, RawCell)]) {
        let text_cells = self.stringify_row(cells);
        // the header consists of the first N non-empty rows
        if text_cells.is_empty() {
            return;
        }
        self.header.push_row(text_cells);
        if self.header.rows_collected() as u32 >= self.header_rows_needed {
            if let Err(e) = self.enter_post_header() {
                self.deferred_error = Some(e);
                self.done = true;
            }
        }
    }

    fn skip_after_row(&mut self) {
        self.pending_skip_after = self.pending_skip_after.saturating_sub(1);
        if self.pending_skip_after == 0 {
            self.state = ScanState::Body;
        }
    }

    fn enter_post_header(&mut self) -> Result<()> {
        if self.gate.has_filters() && self.header_rows_needed > 0 {
            self.bind_gate()?;
        }
        self.state = if self.pending_skip_after > 0 {
            ScanState::SkipAfter
        } else {
            ScanState::Body
        };
        Ok(())
    }

    fn body_cell(&mut self, col: u32, cell: &RawCell) {
        let idx = self.gate.admitted() as u32;
        let series = self
            .series
            .entry(col)
            .or_insert_with(|| ColumnSeries::new(col));
        series.record(idx, cell);
        self.row_touched.push(col);
        if !cell.is_blank() {
            self.row_nonblank.push(col);
        }
    }

    fn body_row_end(&mut self, touched: &[u32], nonblank: &[u32]) -> Result<()> {
        if !self.gate.is_bound() {
            self.bind_gate()?;
        }
        if self.gate.admit(nonblank) {
            for &col in nonblank {
                if let Some(series) = self.series.get_mut(&col) {
                    series.nonblank = true;
                }
            }
            if let Some(callback) = self.opts.row_callback.as_mut() {
                callback().map_err(|source| SheetcastError::Cancelled {
                    sheet: self.sheet_name.clone(),
                    row: self.cur_row.max(0) as u64,
                    source,
                })?;
            }
        } else {
            for &col in touched {
                if let Some(series) = self.series.get_mut(&col) {
                    series.truncate_last();
                }
            }
        }
        if self.gate.exhausted() {
            self.done = true;
        }
        Ok(())
    }

    /// Resolve filter regexes against the column names known at this point:
    /// discovered header names, explicit names, or positional synthetics.
    fn bind_gate(&mut self) -> Result<()> {
        if self.gate.is_bound() {
            return Ok(());
        }
        let mut cols: Vec<u32> = self.series.keys().copied().collect();
        cols.extend(self.header.columns());
        cols.sort_unstable();
        cols.dedup();

        let named: Vec<(u32, String)> = match &self.opts.header {
            Header::Rows(n) if *n > 0 => {
                let names = self.header.resolve(&cols);
                cols.into_iter().zip(names).collect()
            }
            Header::Rows(_) => cols
                .into_iter()
                .enumerate()
                .map(|(i, col)| (col, format!("Unnamed: {i}")))
                .collect(),
            Header::Explicit(names) => cols.into_iter().zip(names.iter().cloned()).collect(),
        };
        self.gate.bind(&named)
    }

    fn stringify_row(&self, cells: &[(u32, RawCell)]) -> Vec<(u32, String)> {
        cells
            .iter()
            .filter_map(|(col, cell)| cell.display_string(self.shared).map(|s| (*col, s)))
            .collect()
    }

    fn lookup_error(&self) -> SheetcastError {
        let pattern = match &self.opts.lookup_head {
            Some(HeaderLookup::Pattern(p)) => p.clone(),
            Some(HeaderLookup::Column(c)) => format!("column {c}"),
            None => String::new(),
        };
        SheetcastError::HeaderLookup {
            sheet: self.sheet_name.clone(),
            pattern,
            scanned: self.lookup_scanned,
        }
    }

    /// Seal every series, resolve names, prepare columns, and assemble.
    pub fn finish(mut self) -> Result<Table> {
        if self.cur_row >= 0 && !self.done {
            self.end_row()?;
        }
        if let Some(e) = self.deferred_error.take() {
            return Err(e);
        }
        if self.state == ScanState::Lookup && self.lookup.is_some() {
            return Err(self.lookup_error());
        }
        if self.gate.has_filters() && !self.gate.is_bound() {
            self.bind_gate()?;
        }

        let admitted = self.gate.admitted() as usize;
        let named_header = matches!(&self.opts.header, Header::Rows(n) if *n > 0);
        let header_cols = if named_header {
            self.header.columns()
        } else {
            Vec::new()
        };

        let mut all_cols: Vec<u32> = self.series.keys().copied().collect();
        all_cols.extend(header_cols.iter().copied());
        all_cols.sort_unstable();
        all_cols.dedup();

        // empty columns (never non-blank, no header text) are dropped
        let survivors: Vec<u32> = all_cols
            .into_iter()
            .filter(|col| {
                self.series.get(col).is_some_and(|s| s.nonblank)
                    || header_cols.binary_search(col).is_ok()
            })
            .collect();

        let names: Vec<String> = match &self.opts.header {
            Header::Rows(n) if *n > 0 => self.header.resolve(&survivors),
            Header::Rows(_) => (0..survivors.len())
                .map(|i| format!("Unnamed: {i}"))
                .collect(),
            Header::Explicit(provided) => {
                if provided.len() != survivors.len() {
                    return Err(SheetcastError::HeaderMismatch {
                        sheet: self.sheet_name,
                        provided: provided.len(),
                        found: survivors.len(),
                    });
                }
                provided.clone()
            }
        };

        let work: Vec<Option<ColumnSeries>> = survivors
            .iter()
            .map(|col| self.series.remove(col))
            .collect();

        if log::log_enabled!(log::Level::Debug) {
            for (name, series) in names.iter().zip(&work) {
                if let Some(series) = series {
                    log::debug!(
                        "column {name:?}: {} rows, dominant shape {:?}",
                        series.len(),
                        series.dominant_shape()
                    );
                }
            }
        }

        let ctx = PrepareContext {
            shared: self.shared,
            conflict: self.opts.conflict_resolve,
            datetime_formats: &self.opts.datetime_formats,
            float_precision: self.opts.float_precision,
            sheet: &self.sheet_name,
        };

        // columns are independent; prepare them in parallel when there is
        // more than one
        let columns: Vec<ArrayRef> = if work.len() > 1 {
            work.into_par_iter()
                .map(|series| prepare_one(series, admitted, &ctx))
                .collect::<Result<_>>()?
        } else {
            work.into_iter()
                .map(|series| prepare_one(series, admitted, &ctx))
                .collect::<Result<_>>()?
        };

        let columns = apply_dtypes(columns, &names, self.opts.dtypes.as_ref())?;
        Ok(Table::new(names, columns))
    }
}

impl CellSink for SheetBuilder<'_> {
    fn push_cell(&mut self, event: CellEvent) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let row = i64::from(event.row);
        if row < self.cur_row {
            log::warn!(
                "out-of-order cell at ({}, {}); ignoring",
                event.row,
                event.col
            );
            return Ok(true);
        }
        if self.cur_row < 0 {
            self.cur_row = 0;
        }
        while self.cur_row < row {
            self.end_row()?;
            self.cur_row += 1;
            if self.done {
                return Ok(false);
            }
        }

        if self.cur_row >= i64::from(self.opts.skip_rows) {
            match self.state {
                ScanState::Lookup | ScanState::Header => {
                    self.row_cells.push((event.col, event.cell));
                }
                ScanState::SkipAfter => {}
                ScanState::Body => self.body_cell(event.col, &event.cell),
            }
        }
        Ok(!self.done)
    }
}

fn prepare_one(
    series: Option<ColumnSeries>,
    admitted: usize,
    ctx: &PrepareContext<'_>,
) -> Result<ArrayRef> {
    match series {
        Some(series) => prepare_chunks(series.seal(admitted), ctx),
        // header-only column: all nulls at the admitted length
        None => Ok(new_null_array(&DataType::Null, admitted)),
    }
}

fn apply_dtypes(
    columns: Vec<ArrayRef>,
    names: &[String],
    dtypes: Option<&DTypes>,
) -> Result<Vec<ArrayRef>> {
    let Some(dtypes) = dtypes else {
        return Ok(columns);
    };
    match dtypes {
        DTypes::All(dtype) => columns
            .into_iter()
            .zip(names)
            .map(|(column, name)| cast_column(column, name, dtype))
            .collect(),
        DTypes::ByIndex(list) => {
            if list.len() != columns.len() {
                return Err(SheetcastError::config(format!(
                    "{} dtypes provided for {} columns",
                    list.len(),
                    columns.len()
                )));
            }
            columns
                .into_iter()
                .zip(names)
                .zip(list)
                .map(|((column, name), dtype)| cast_column(column, name, dtype))
                .collect()
        }
        DTypes::ByName(map) => columns
            .into_iter()
            .zip(names)
            .map(|(column, name)| match map.get(name) {
                Some(dtype) => cast_column(column, name, dtype),
                None => Ok(column),
            })
            .collect(),
    }
}

fn cast_column(column: ArrayRef, name: &str, dtype: &DataType) -> Result<ArrayRef> {
    if column.data_type() == dtype {
        return Ok(column);
    }
    // safe casting would null out failures instead of reporting them
    let options = CastOptions {
        safe: false,
        ..CastOptions::default()
    };
    cast_with_options(&column, dtype, &options).map_err(|source| SheetcastError::DTypeCast {
        column: name.to_owned(),
        dtype: dtype.clone(),
        source,
    })
}
