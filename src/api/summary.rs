//! Purpose: Provide a stable, serializable summary model for reports and tables.
//! Exports: `ReportSummary`, `TableSummary`, `ColumnSummary`, `RowSummary`.
//! Role: Shared contract for CLI `inspect` output and library callers.
//! Invariants: Summaries are additive-only; row payloads are included only on request.
//! Invariants: Cell text is the column's rendered form, never the raw value.

use std::path::Path;

use serde::Serialize;

use crate::core::column::Column;
use crate::core::keys::KeyOrder;
use crate::core::report::Report;
use crate::core::table::Table;
use crate::core::value::Kind;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: Kind,
    pub format: String,
    pub displayed: bool,
    pub default: String,
    pub stored_cells: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RowSummary {
    pub key: String,
    pub cells: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub description: String,
    pub primary_key: String,
    pub primary_key_displayed: bool,
    pub key_order: KeyOrder,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<RowSummary>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub table_count: usize,
    pub tables: Vec<TableSummary>,
}

impl ColumnSummary {
    pub fn of(column: &Column) -> Self {
        Self {
            name: column.name().to_string(),
            kind: column.kind(),
            format: column.format().to_string(),
            displayed: column.is_displayable(),
            default: column.render(column.default_value()),
            stored_cells: column.len(),
        }
    }
}

impl TableSummary {
    pub fn of(table: &Table) -> Self {
        Self {
            name: table.name().to_string(),
            description: table.description().to_string(),
            primary_key: table.primary_key_name().to_string(),
            primary_key_displayed: table.is_primary_key_displayed(),
            key_order: table.key_order(),
            row_count: table.num_rows(),
            column_count: table.num_columns(),
            columns: table.columns().map(ColumnSummary::of).collect(),
            rows: None,
        }
    }

    /// Adds every row in key order with each cell's effective value.
    pub fn with_rows(mut self, table: &Table) -> Self {
        let rows = table
            .primary_keys()
            .map(|key| RowSummary {
                key: key.to_string(),
                cells: table
                    .columns()
                    .map(|column| match table.lookup(key, column.name()) {
                        Ok(value) => column.render(value),
                        Err(_) => column.render(column.default_value()),
                    })
                    .collect(),
            })
            .collect();
        self.rows = Some(rows);
        self
    }
}

impl ReportSummary {
    pub fn of(report: &Report) -> Self {
        Self::from_tables(report.tables(), false)
    }

    pub fn with_rows(report: &Report) -> Self {
        Self::from_tables(report.tables(), true)
    }

    /// Summarizes an explicit selection of tables.
    pub fn from_tables<'a>(tables: impl Iterator<Item = &'a Table>, rows: bool) -> Self {
        let tables: Vec<TableSummary> = tables
            .map(|table| {
                let summary = TableSummary::of(table);
                if rows { summary.with_rows(table) } else { summary }
            })
            .collect();
        Self {
            path: None,
            table_count: tables.len(),
            tables,
        }
    }

    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }
}
