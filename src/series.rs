//! Per-column chunk builder.
//!
//! A series receives the admitted body cells of one column in row order and
//! groups them into homogeneous runs. Conversion never happens here; the
//! series only decides run boundaries and keeps gap/blank bookkeeping so
//! that the total element count always equals the admitted row count.

use crate::cell::{error_code_string, RawCell};
use crate::chunk::{Chunk, ChunkData, Shape};

#[derive(Debug)]
enum RunData {
    Float { temporal: bool, values: Vec<f64> },
    Rk { temporal: bool, values: Vec<u32> },
    Str(Vec<String>),
    SharedIdx(Vec<u32>),
}

impl RunData {
    fn shape(&self) -> Shape {
        match self {
            RunData::Float { temporal, .. } => Shape::Float {
                temporal: *temporal,
            },
            RunData::Rk { temporal, .. } => Shape::Rk {
                temporal: *temporal,
            },
            RunData::Str(_) => Shape::Str,
            RunData::SharedIdx(_) => Shape::SharedIdx,
        }
    }

    fn len(&self) -> usize {
        match self {
            RunData::Float { values, .. } => values.len(),
            RunData::Rk { values, .. } => values.len(),
            RunData::Str(values) => values.len(),
            RunData::SharedIdx(values) => values.len(),
        }
    }

    fn into_chunk_data(self) -> ChunkData {
        match self {
            RunData::Float { temporal, values } => ChunkData::Float { temporal, values },
            RunData::Rk { temporal, values } => ChunkData::Rk { temporal, values },
            RunData::Str(values) => ChunkData::Str(values),
            RunData::SharedIdx(values) => ChunkData::SharedIdx(values),
        }
    }

    fn from_chunk_data(data: ChunkData) -> Option<Self> {
        match data {
            ChunkData::Float { temporal, values } => Some(RunData::Float { temporal, values }),
            ChunkData::Rk { temporal, values } => Some(RunData::Rk { temporal, values }),
            ChunkData::Str(values) => Some(RunData::Str(values)),
            ChunkData::SharedIdx(values) => Some(RunData::SharedIdx(values)),
            ChunkData::Null(_) => None,
        }
    }
}

#[derive(Debug)]
struct OpenRun {
    origin: u32,
    data: RunData,
}

/// Ordered chunk list for one column plus its build state.
#[derive(Debug)]
pub(crate) struct ColumnSeries {
    /// 0-based spreadsheet column index.
    pub col: u32,
    chunks: Vec<Chunk>,
    open: Option<OpenRun>,
    pending_nulls: usize,
    last_row: i64,
    /// Whether any admitted row contributed a non-blank cell.
    pub nonblank: bool,
}

impl ColumnSeries {
    pub fn new(col: u32) -> Self {
        ColumnSeries {
            col,
            chunks: Vec::new(),
            open: None,
            pending_nulls: 0,
            last_row: -1,
            nonblank: false,
        }
    }

    /// Total elements recorded so far.
    pub fn len(&self) -> usize {
        (self.last_row + 1) as usize
    }

    /// Append the cell for body row `row`. Rows may skip forward; the gap
    /// becomes pending nulls. A second cell for the same row is ignored.
    pub fn record(&mut self, row: u32, cell: &RawCell) {
        if i64::from(row) <= self.last_row {
            return;
        }

        let gap = i64::from(row) - self.last_row - 1;
        if gap > 0 {
            self.seal_open();
            self.pending_nulls += gap as usize;
        }

        match cell {
            RawCell::Blank => {
                self.seal_open();
                self.pending_nulls += 1;
            }
            RawCell::Number { value, temporal } => {
                if let RunData::Float { values, .. } =
                    self.run_for(Shape::Float { temporal: *temporal }, row)
                {
                    values.push(*value);
                }
            }
            RawCell::RkNumber { raw, temporal } => {
                if let RunData::Rk { values, .. } =
                    self.run_for(Shape::Rk { temporal: *temporal }, row)
                {
                    values.push(*raw);
                }
            }
            RawCell::InlineString(s) => {
                if let RunData::Str(values) = self.run_for(Shape::Str, row) {
                    values.push(s.clone());
                }
            }
            RawCell::SharedStringRef(idx) => {
                if let RunData::SharedIdx(values) = self.run_for(Shape::SharedIdx, row) {
                    values.push(*idx);
                }
            }
            // booleans and error codes collapse onto inline string runs
            RawCell::Boolean(b) => {
                let text = if *b { "TRUE" } else { "FALSE" };
                if let RunData::Str(values) = self.run_for(Shape::Str, row) {
                    values.push(text.to_owned());
                }
            }
            RawCell::ErrorCode(code) => {
                let text = error_code_string(*code);
                if let RunData::Str(values) = self.run_for(Shape::Str, row) {
                    values.push(text.to_owned());
                }
            }
        }

        self.last_row = i64::from(row);
    }

    /// Discard the element recorded for the current row, rolling the series
    /// back one row. Used by the row-gate when the in-flight row is dropped.
    pub fn truncate_last(&mut self) {
        if self.last_row < 0 {
            return;
        }
        let popped = if let Some(run) = self.open.as_mut() {
            match &mut run.data {
                RunData::Float { values, .. } => {
                    values.pop();
                    values.is_empty()
                }
                RunData::Rk { values, .. } => {
                    values.pop();
                    values.is_empty()
                }
                RunData::Str(values) => {
                    values.pop();
                    values.is_empty()
                }
                RunData::SharedIdx(values) => {
                    values.pop();
                    values.is_empty()
                }
            }
        } else if self.pending_nulls > 0 {
            self.pending_nulls -= 1;
            false
        } else {
            false
        };
        if popped {
            self.open = None;
        }
        self.last_row -= 1;
    }

    /// Seal the series at exactly `total_rows` elements, materializing the
    /// trailing null run, and return the chunk list.
    pub fn seal(mut self, total_rows: usize) -> Vec<Chunk> {
        let tail = total_rows as i64 - (self.last_row + 1);
        if tail > 0 {
            self.pending_nulls += tail as usize;
        }
        self.seal_open();
        self.flush_pending();
        self.chunks
    }

    /// Storage shape with the greatest element count. Ties break toward
    /// numeric, then temporal-numeric, then string, then null.
    pub fn dominant_shape(&self) -> Option<Shape> {
        let mut counts: Vec<(Shape, usize)> = Vec::new();
        let mut bump = |shape: Shape, n: usize| {
            if n == 0 {
                return;
            }
            if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == shape) {
                entry.1 += n;
            } else {
                counts.push((shape, n));
            }
        };
        for chunk in &self.chunks {
            bump(chunk.shape(), chunk.len());
        }
        if let Some(run) = &self.open {
            bump(run.data.shape(), run.data.len());
        }
        bump(Shape::Null, self.pending_nulls);

        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(a.0.rank().cmp(&b.0.rank())))
            .map(|(shape, _)| shape)
    }

    /// Get the open run for `shape`, sealing/flushing as needed. Reopens the
    /// last sealed chunk when it already has the right shape, so adjacent
    /// same-shape chunks never occur.
    fn run_for(&mut self, shape: Shape, row: u32) -> &mut RunData {
        let compatible = self
            .open
            .as_ref()
            .is_some_and(|run| run.data.shape() == shape);
        if !compatible {
            self.seal_open();
            self.flush_pending();
            let reopen = self.chunks.last().is_some_and(|last| last.shape() == shape);
            let reopened = if reopen {
                let chunk = self.chunks.pop().expect("last chunk present");
                RunData::from_chunk_data(chunk.data).map(|data| OpenRun {
                    origin: chunk.origin,
                    data,
                })
            } else {
                None
            };
            self.open = Some(reopened.unwrap_or_else(|| OpenRun {
                origin: row,
                data: match shape {
                    Shape::Float { temporal } => RunData::Float {
                        temporal,
                        values: Vec::new(),
                    },
                    Shape::Rk { temporal } => RunData::Rk {
                        temporal,
                        values: Vec::new(),
                    },
                    Shape::Str => RunData::Str(Vec::new()),
                    Shape::SharedIdx => RunData::SharedIdx(Vec::new()),
                    Shape::Null => unreachable!("null runs are pending counts"),
                },
            }));
        }
        &mut self.open.as_mut().expect("open run just ensured").data
    }

    fn seal_open(&mut self) {
        if let Some(run) = self.open.take() {
            if run.data.len() > 0 {
                self.chunks.push(Chunk {
                    origin: run.origin,
                    data: run.data.into_chunk_data(),
                });
            }
        }
    }

    fn flush_pending(&mut self) {
        if self.pending_nulls == 0 {
            return;
        }
        let count = std::mem::take(&mut self.pending_nulls);
        // consecutive null runs coalesce
        if let Some(Chunk {
            data: ChunkData::Null(existing),
            ..
        }) = self.chunks.last_mut()
        {
            *existing += count;
            return;
        }
        let origin = self
            .chunks
            .iter()
            .map(Chunk::len)
            .sum::<usize>() as u32;
        self.chunks.push(Chunk::nulls(origin, count));
    }
}
