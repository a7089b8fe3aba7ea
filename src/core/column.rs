//! Purpose: One named, kind-constrained column of cells keyed by primary-key slot.
//! Exports: `Column`, `ColumnFormat`.
//! Role: Storage unit owned by `Table`; knows its default, display flag, and print format.
//! Invariants: Cells are sparse; a slot has a cell only after it was touched through this column.
//! Invariants: Kind is fixed at creation; type checks on writes belong to `Table`.

use std::collections::HashMap;

use crate::core::cell_format::CellFormat;
use crate::core::error::Error;
use crate::core::keys::Slot;
use crate::core::value::{Kind, Value};

#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    default: Value,
    display: bool,
    format: String,
    cell_format: CellFormat,
    kind: Kind,
    cells: HashMap<Slot, Value>,
}

/// Print layout computed from a column's current contents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnFormat {
    pub width: usize,
}

impl ColumnFormat {
    pub fn pad(&self, text: &str) -> String {
        let len = text.chars().count();
        if len >= self.width {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len() + self.width - len);
        out.push_str(text);
        out.extend(std::iter::repeat_n(' ', self.width - len));
        out
    }
}

impl Column {
    /// An empty `format` takes the default format of the default value's kind;
    /// a null default leaves the column `Unknown`.
    pub(crate) fn new(
        name: impl Into<String>,
        default: Value,
        display: bool,
        format: &str,
    ) -> Result<Self, Error> {
        let (kind, cell_format) = if format.is_empty() {
            let kind = if default.is_null() {
                Kind::Unknown
            } else {
                default.kind()
            };
            (kind, CellFormat::parse(kind.default_format())?)
        } else {
            let cell_format = CellFormat::parse(format)?;
            (cell_format.kind(), cell_format)
        };
        Ok(Self {
            name: name.into(),
            default,
            display,
            format: cell_format.to_string(),
            cell_format,
            kind,
            cells: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn is_displayable(&self) -> bool {
        self.display
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn contains(&self, slot: Slot) -> bool {
        self.cells.contains_key(&slot)
    }

    pub(crate) fn initialize(&mut self, slot: Slot) {
        self.cells
            .entry(slot)
            .or_insert_with(|| self.default.clone());
    }

    pub(crate) fn get(&mut self, slot: Slot) -> &Value {
        self.initialize(slot);
        self.peek(slot)
    }

    /// Stored value, or the default for a slot this column never touched.
    pub(crate) fn peek(&self, slot: Slot) -> &Value {
        self.cells.get(&slot).unwrap_or(&self.default)
    }

    pub(crate) fn stored(&self, slot: Slot) -> Option<&Value> {
        self.cells.get(&slot)
    }

    pub(crate) fn put(&mut self, slot: Slot, value: Value) {
        self.cells.insert(slot, value);
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
    }

    /// Text that reads as this column's kind (in its print format) becomes that kind.
    pub(crate) fn coerce(&self, value: Value) -> Value {
        match value {
            Value::String(text) if !matches!(self.kind, Kind::String | Kind::Unknown) => self
                .cell_format
                .parse_value(&text)
                .unwrap_or(Value::String(text)),
            other => other,
        }
    }

    pub fn render(&self, value: &Value) -> String {
        self.cell_format.render(value)
    }

    /// Width is the longest of the name, the rendered default, and every stored cell.
    pub fn column_format(&self) -> ColumnFormat {
        let name_width = self.name.chars().count();
        let default_width = self.render(&self.default).chars().count();
        let widest_cell = self
            .cells
            .values()
            .map(|value| self.render(value).chars().count())
            .max()
            .unwrap_or(0);
        ColumnFormat {
            width: name_width.max(default_width).max(widest_cell),
        }
    }

    /// Structural equality: kind, display flag, and format.
    pub fn is_same_format(&self, other: &Column) -> bool {
        self.kind == other.kind && self.display == other.display && self.format == other.format
    }
}
