//! # sheetcast
//!
//! Fast reader for XLSX and XLSB workbooks that materializes one worksheet
//! as a columnar table of typed Arrow arrays.
//!
//! Cells stream out of the package in row-major order and are stored as
//! homogeneous runs ("chunks") per column, with all conversion deferred:
//! dates stay serial floats, shared strings stay table indices, XLSB RK
//! numbers stay packed. After the row-gate has decided which rows survive,
//! each column is prepared in one vectorized pass — packed encodings
//! expand, temporal serials become millisecond timestamps, and columns
//! mixing numeric/temporal/string runs are reconciled by a small explicit
//! policy — then concatenated into a single typed array.
//!
//! ```no_run
//! use sheetcast::{read, ReadOptions};
//!
//! let table = read("report.xlsx", 0, ReadOptions::new().with_header(true))?;
//! for (name, column) in table.column_names().iter().zip(table.columns()) {
//!     println!("{name}: {:?} x{}", column.data_type(), column.len());
//! }
//! # Ok::<(), sheetcast::SheetcastError>(())
//! ```

mod biff;
mod cell;
mod chunk;
mod error;
mod gate;
mod header;
mod prepare;
mod read;
mod series;
mod shared;
mod styles;
mod table;
pub mod utils;
mod xlsb;
mod xlsx;

pub use cell::{CellEvent, RawCell};
pub use error::{Result, SheetcastError};
pub use gate::{FilterOp, RowFilterStrategy};
pub use header::{Header, HeaderLookup};
pub use prepare::{ConflictResolve, DEFAULT_DATETIME_FORMATS};
pub use read::{read, read_from_bytes, DTypes, NullValues, ReadOptions, RowCallback, SheetRef};
pub use shared::SharedStrings;
pub use table::Table;
