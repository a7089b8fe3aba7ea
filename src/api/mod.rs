//! Purpose: Define the stable public Rust API boundary for statgather.
//! Exports: Table model, report document, codec entry points, gather, and summaries.
//! Role: Public, additive-only surface used by the CLI and integration tests.
//! Invariants: Crate-internal helpers (key slots, column storage) are never re-exported.

mod summary;

pub use crate::core::cell_format::CellFormat;
pub use crate::core::codec::{ReadOptions, TableReader, render_table, write_table};
pub use crate::core::column::{Column, ColumnFormat};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::filter::{AlignedRecord, NO_ALIGNMENT_START, RecordFilter, UnmappedReadFilter};
pub use crate::core::format::{LATEST_REPORT_VERSION, ReportVersion};
pub use crate::core::gather::GatherStats;
pub use crate::core::keys::KeyOrder;
pub use crate::core::packed::{PackedIntReader, SuffixArrayParts, read_suffix_array_parts};
pub use crate::core::report::Report;
pub use crate::core::table::Table;
pub use crate::core::value::{Key, Kind, Value};
pub use summary::{ColumnSummary, ReportSummary, RowSummary, TableSummary};
