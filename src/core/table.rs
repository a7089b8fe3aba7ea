//! Purpose: Typed report table with touch-to-create rows and per-column defaults.
//! Exports: `Table`, `validate_name`, `validate_description`.
//! Role: Accumulation structure written by one worker, later written out or gathered.
//! Invariants: Names match `[A-Za-z0-9_.-]+`; descriptions hold no line breaks.
//! Invariants: Any read or write of (key, column) adds the key; other columns stay lazy.
//! Invariants: A rejected `set` leaves the table untouched (checks run before the key is added).
//! Invariants: Arithmetic reads through `get`, so a failed update may still have added the key.
//! Notes: Single-owner structure; no internal locking.

use std::collections::HashMap;

use tracing::debug;

use crate::core::column::Column;
use crate::core::error::{Error, ErrorKind};
use crate::core::keys::{KeyDomain, KeyOrder, Slot};
use crate::core::value::{Key, Kind, Value};

pub const DEFAULT_PRIMARY_KEY: &str = "id";

#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    description: String,
    primary_key_name: String,
    primary_key_display: bool,
    keys: KeyDomain,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithOp {
    fn verb(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Subtract => "subtract",
            ArithOp::Multiply => "multiply",
            ArithOp::Divide => "divide",
        }
    }

    fn apply_i64(self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            ArithOp::Add => lhs.checked_add(rhs),
            ArithOp::Subtract => lhs.checked_sub(rhs),
            ArithOp::Multiply => lhs.checked_mul(rhs),
            ArithOp::Divide => lhs.checked_div(rhs),
        }
    }

    fn apply_f64(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            ArithOp::Add => lhs + rhs,
            ArithOp::Subtract => lhs - rhs,
            ArithOp::Multiply => lhs * rhs,
            ArithOp::Divide => lhs / rhs,
        }
    }
}

pub fn validate_name(what: &str, name: &str) -> Result<(), Error> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    if valid {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Invalid)
        .with_message(format!("invalid {what} name '{name}'"))
        .with_hint("Names may only contain letters, digits, '_', '-', and '.'."))
}

pub fn validate_description(description: &str) -> Result<(), Error> {
    if description.contains(['\n', '\r']) {
        return Err(Error::new(ErrorKind::Invalid)
            .with_message("table description must not contain line breaks"));
    }
    Ok(())
}

impl Table {
    /// A table whose rows are kept in primary-key order.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self, Error> {
        Self::with_key_order(name, description, KeyOrder::Sorted)
    }

    pub fn with_key_order(
        name: impl Into<String>,
        description: impl Into<String>,
        order: KeyOrder,
    ) -> Result<Self, Error> {
        let name = name.into();
        let description = description.into();
        validate_name("table", &name)?;
        validate_description(&description)?;
        Ok(Self {
            name,
            description,
            primary_key_name: DEFAULT_PRIMARY_KEY.to_string(),
            primary_key_display: true,
            keys: KeyDomain::new(order),
            columns: Vec::new(),
            index: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn primary_key_name(&self) -> &str {
        &self.primary_key_name
    }

    pub fn is_primary_key_displayed(&self) -> bool {
        self.primary_key_display
    }

    pub fn key_order(&self) -> KeyOrder {
        self.keys.order()
    }

    pub fn num_rows(&self) -> usize {
        self.keys.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Columns in declaration order, which is also display order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|idx| &self.columns[*idx])
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.keys.keys()
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.keys.slot(key).is_some()
    }

    pub fn add_primary_key(&mut self, name: &str) -> Result<(), Error> {
        self.add_primary_key_with(name, true)
    }

    /// Names the key column and starts an empty key domain; stored cells are dropped.
    pub fn add_primary_key_with(&mut self, name: &str, display: bool) -> Result<(), Error> {
        validate_name("primary key", name)?;
        self.primary_key_name = name.to_string();
        self.primary_key_display = display;
        self.keys = KeyDomain::new(self.keys.order());
        for column in &mut self.columns {
            column.clear();
        }
        Ok(())
    }

    pub fn add_column(&mut self, name: &str, default: impl Into<Value>) -> Result<(), Error> {
        self.add_column_with(name, default, true, "")
    }

    /// Registers a column. `format` may be empty to derive it from the default's kind.
    pub fn add_column_with(
        &mut self,
        name: &str,
        default: impl Into<Value>,
        display: bool,
        format: &str,
    ) -> Result<(), Error> {
        validate_name("column", name)?;
        if self.index.contains_key(name) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("column '{name}' already exists in table '{}'", self.name))
                .with_hint("Use replace_column to swap a column definition."));
        }
        let column = Column::new(name, default.into(), display, format)?;
        self.index.insert(name.to_string(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Swaps in a fresh definition for `name`, keeping its display position.
    pub fn replace_column(
        &mut self,
        name: &str,
        default: impl Into<Value>,
        display: bool,
        format: &str,
    ) -> Result<(), Error> {
        validate_name("column", name)?;
        let column = Column::new(name, default.into(), display, format)?;
        match self.index.get(name) {
            Some(idx) => {
                debug!(table = %self.name, column = name, "replacing column");
                self.columns[*idx] = column;
            }
            None => {
                self.index.insert(name.to_string(), self.columns.len());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    pub(crate) fn column_index(&self, name: &str) -> Result<usize, Error> {
        self.index.get(name).copied().ok_or_else(|| {
            Error::new(ErrorKind::NotFound).with_message(format!(
                "column '{name}' does not exist in table '{}'",
                self.name
            ))
        })
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = (Slot, &Key)> + '_ {
        self.keys.iter()
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub(crate) fn touch(&mut self, key: &Key) -> Slot {
        self.keys.touch(key)
    }

    pub(crate) fn slot(&self, key: &Key) -> Option<Slot> {
        self.keys.slot(key)
    }

    /// Stores `value`, coercing text into the column's kind when it parses.
    pub fn set(
        &mut self,
        key: impl Into<Key>,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let key = key.into();
        let idx = self.column_index(column)?;
        let kind = self.columns[idx].kind();
        let value = self.columns[idx].coerce(value.into());
        if !accepts(kind, &value) {
            return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
                "cannot store a {} value in {} column '{column}'",
                value.kind(),
                kind
            )));
        }
        let slot = self.keys.touch(&key);
        self.columns[idx].put(slot, value);
        Ok(())
    }

    /// Reads a cell, adding the key and materializing the column default if needed.
    pub fn get(&mut self, key: impl Into<Key>, column: &str) -> Result<Value, Error> {
        let key = key.into();
        let idx = self.column_index(column)?;
        let slot = self.keys.touch(&key);
        Ok(self.columns[idx].get(slot).clone())
    }

    /// Reads a cell without touching the key; untouched cells read as the default.
    pub fn lookup(&self, key: &Key, column: &str) -> Result<&Value, Error> {
        let column = &self.columns[self.column_index(column)?];
        Ok(match self.keys.slot(key) {
            Some(slot) => column.peek(slot),
            None => column.default_value(),
        })
    }

    pub fn increment(&mut self, key: impl Into<Key>, column: &str) -> Result<(), Error> {
        self.update(key.into(), column, ArithOp::Add, Value::Integer(1))
    }

    pub fn decrement(&mut self, key: impl Into<Key>, column: &str) -> Result<(), Error> {
        self.update(key.into(), column, ArithOp::Subtract, Value::Integer(1))
    }

    pub fn add(
        &mut self,
        key: impl Into<Key>,
        column: &str,
        operand: impl Into<Value>,
    ) -> Result<(), Error> {
        self.update(key.into(), column, ArithOp::Add, operand.into())
    }

    pub fn subtract(
        &mut self,
        key: impl Into<Key>,
        column: &str,
        operand: impl Into<Value>,
    ) -> Result<(), Error> {
        self.update(key.into(), column, ArithOp::Subtract, operand.into())
    }

    pub fn multiply(
        &mut self,
        key: impl Into<Key>,
        column: &str,
        operand: impl Into<Value>,
    ) -> Result<(), Error> {
        self.update(key.into(), column, ArithOp::Multiply, operand.into())
    }

    /// Divides the cell by `operand`; Integer cells use truncating integer division.
    pub fn divide(
        &mut self,
        key: impl Into<Key>,
        column: &str,
        operand: impl Into<Value>,
    ) -> Result<(), Error> {
        self.update(key.into(), column, ArithOp::Divide, operand.into())
    }

    // Integer cells take Integer operands only; Decimal cells take either.
    fn update(&mut self, key: Key, column: &str, op: ArithOp, operand: Value) -> Result<(), Error> {
        let current = self.get(key.clone(), column)?;
        let next = match (&current, &operand) {
            (Value::Integer(lhs), Value::Integer(rhs)) => {
                Value::Integer(op.apply_i64(*lhs, *rhs).ok_or_else(|| {
                    Error::new(ErrorKind::Unsupported).with_message(format!(
                        "cannot {} {lhs} and {rhs} in column '{column}' (key {key}): overflow or division by zero",
                        op.verb()
                    ))
                })?)
            }
            (Value::Decimal(lhs), Value::Integer(_) | Value::Decimal(_)) => {
                Value::Decimal(op.apply_f64(*lhs, operand.as_f64().unwrap_or_default()))
            }
            (Value::Integer(_), _) => {
                return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
                    "cannot {} a {} operand to the Integer cell in column '{column}' (key {key})",
                    op.verb(),
                    operand.kind()
                )));
            }
            _ => {
                return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
                    "cannot {} value '{current}' in column '{column}' (key {key}): not numeric",
                    op.verb()
                )));
            }
        };
        self.set(key, column, next)
    }

    pub fn add_columns(&mut self, result: &str, augend: &str, addend: &str) -> Result<(), Error> {
        self.combine_columns(result, augend, addend, ArithOp::Add)
    }

    pub fn subtract_columns(
        &mut self,
        result: &str,
        minuend: &str,
        subtrahend: &str,
    ) -> Result<(), Error> {
        self.combine_columns(result, minuend, subtrahend, ArithOp::Subtract)
    }

    pub fn multiply_columns(
        &mut self,
        result: &str,
        multiplier: &str,
        multiplicand: &str,
    ) -> Result<(), Error> {
        self.combine_columns(result, multiplier, multiplicand, ArithOp::Multiply)
    }

    pub fn divide_columns(
        &mut self,
        result: &str,
        numerator: &str,
        denominator: &str,
    ) -> Result<(), Error> {
        self.combine_columns(result, numerator, denominator, ArithOp::Divide)
    }

    // Every row is computed before any write, so a non-numeric cell aborts cleanly.
    fn combine_columns(
        &mut self,
        result: &str,
        lhs: &str,
        rhs: &str,
        op: ArithOp,
    ) -> Result<(), Error> {
        let result_idx = self.column_index(result)?;
        let lhs_idx = self.column_index(lhs)?;
        let rhs_idx = self.column_index(rhs)?;
        let result_kind = self.columns[result_idx].kind();
        if !matches!(result_kind, Kind::Decimal | Kind::Unknown) {
            return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
                "column '{result}' is {result_kind}; whole-column {} results are Decimal",
                op.verb()
            )));
        }

        let rows: Vec<(Slot, Key)> = self.keys.iter().map(|(slot, key)| (slot, key.clone())).collect();
        let mut results = Vec::with_capacity(rows.len());
        for (slot, key) in &rows {
            let left = numeric_operand(self.columns[lhs_idx].get(*slot), lhs, key)?;
            let right = numeric_operand(self.columns[rhs_idx].get(*slot), rhs, key)?;
            results.push((*slot, op.apply_f64(left, right)));
        }
        for (slot, value) in results {
            self.columns[result_idx].put(slot, Value::Decimal(value));
        }
        Ok(())
    }

    /// First row, in key order, whose leading columns render as the `.`-separated parts.
    pub fn find_primary_key(&self, dotted: &str) -> Option<&Key> {
        let parts: Vec<&str> = dotted.split('.').collect();
        if parts.len() > self.columns.len() {
            return None;
        }
        self.keys.iter().find_map(|(slot, key)| {
            let matching = parts
                .iter()
                .zip(&self.columns)
                .all(|(part, column)| column.peek(slot).to_string() == *part);
            matching.then_some(key)
        })
    }

    pub fn get_primary_key(&self, dotted: &str) -> Result<&Key, Error> {
        self.find_primary_key(dotted).ok_or_else(|| {
            Error::new(ErrorKind::NotFound).with_message(format!(
                "no row in table '{}' matches '{dotted}'",
                self.name
            ))
        })
    }

    pub fn contains_primary_key(&self, dotted: &str) -> bool {
        self.find_primary_key(dotted).is_some()
    }

    /// Describes the first structural difference from `other`, if any.
    pub fn format_mismatch(&self, other: &Table) -> Option<String> {
        if self.name != other.name {
            return Some(format!("table name '{}' vs '{}'", self.name, other.name));
        }
        if self.description != other.description {
            return Some(format!("table '{}' descriptions differ", self.name));
        }
        if self.primary_key_name != other.primary_key_name {
            return Some(format!(
                "primary key '{}' vs '{}'",
                self.primary_key_name, other.primary_key_name
            ));
        }
        if self.primary_key_display != other.primary_key_display {
            return Some(format!(
                "primary key '{}' display flag differs",
                self.primary_key_name
            ));
        }
        if self.columns.len() != other.columns.len() {
            return Some(format!(
                "{} columns vs {} columns",
                self.columns.len(),
                other.columns.len()
            ));
        }
        for column in &self.columns {
            match other.column(column.name()) {
                None => return Some(format!("column '{}' is missing", column.name())),
                Some(theirs) if !column.is_same_format(theirs) => {
                    return Some(format!(
                        "column '{}' is {} {} vs {} {}",
                        column.name(),
                        column.kind(),
                        column.format(),
                        theirs.kind(),
                        theirs.format()
                    ));
                }
                Some(_) => {}
            }
        }
        None
    }

    /// Same names, description, key column, and column set with matching kind/display/format.
    pub fn is_same_format(&self, other: &Table) -> bool {
        self.format_mismatch(other).is_none()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        if !self.is_same_format(other) || self.key_order() != other.key_order() {
            return false;
        }
        if !self.primary_keys().eq(other.primary_keys()) {
            return false;
        }
        self.columns.iter().all(|column| {
            let Some(theirs) = other.column(column.name()) else {
                return false;
            };
            self.rows().all(|(slot, key)| {
                let their_value = other
                    .slot(key)
                    .map(|their_slot| theirs.peek(their_slot))
                    .unwrap_or(theirs.default_value());
                column.peek(slot) == their_value
            })
        })
    }
}

// Text that failed coercion is kept as-is; this is the tolerated weak spot of the type model.
fn accepts(kind: Kind, value: &Value) -> bool {
    kind == Kind::Unknown || value.kind() == kind || matches!(value, Value::String(_))
}

fn numeric_operand(value: &Value, column: &str, key: &Key) -> Result<f64, Error> {
    value.as_f64().ok_or_else(|| {
        Error::new(ErrorKind::Unsupported).with_message(format!(
            "value '{value}' in column '{column}' (key {key}) is not numeric"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::Table;
    use crate::core::error::ErrorKind;
    use crate::core::keys::KeyOrder;
    use crate::core::value::{Key, Kind, Value};

    fn counts() -> Table {
        let mut table = Table::new("Counts", "per-sample counters").expect("table");
        table.add_primary_key("sample").expect("pk");
        table.add_column("count", 0).expect("count");
        table.add_column("total", 0).expect("total");
        table
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut table = counts();
        for bad in ["bad name", "", "tab\tname", "colon:", "sla/sh", "é"] {
            let err = table.add_column(bad, "x").expect_err(bad);
            assert_eq!(err.kind(), ErrorKind::Invalid);
            assert_eq!(table.add_primary_key(bad).unwrap_err().kind(), ErrorKind::Invalid);
            assert_eq!(Table::new(bad, "").unwrap_err().kind(), ErrorKind::Invalid);
        }
        table.add_column("bad_name", "x").expect("valid");
        table.add_column("v1.2-rc", "x").expect("valid");
    }

    #[test]
    fn description_rejects_line_breaks() {
        let err = Table::new("T", "two\nlines").expect_err("newline");
        assert_eq!(err.kind(), ErrorKind::Invalid);
        Table::new("T", "colons: are fine").expect("colon");
    }

    #[test]
    fn duplicate_column_requires_explicit_replace() {
        let mut table = counts();
        let err = table.add_column("count", 1).expect_err("duplicate");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        table.replace_column("count", 0.0, true, "").expect("replace");
        assert_eq!(table.column("count").expect("column").kind(), Kind::Decimal);
        let names: Vec<&str> = table.columns().map(|c| c.name()).collect();
        assert_eq!(names, ["count", "total"]);
    }

    #[test]
    fn unknown_column_is_a_reference_error() {
        let mut table = counts();
        assert_eq!(table.set("A", "missing", 1).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(table.get("A", "missing").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn defaults_materialize_lazily_per_column() {
        let mut table = counts();
        table.set("A", "count", 5).expect("set");
        assert!(table.contains_key(&Key::from("A")));
        assert!(!table.column("total").expect("total").contains(0));
        assert_eq!(table.get("A", "total").expect("get"), Value::Integer(0));
        assert!(table.column("total").expect("total").contains(0));
    }

    #[test]
    fn reads_touch_keys() {
        let mut table = counts();
        assert_eq!(table.get("B", "count").expect("get"), Value::Integer(0));
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn text_is_coerced_into_the_column_kind() {
        let mut table = counts();
        table.set("A", "count", "12").expect("set");
        assert_eq!(table.get("A", "count").expect("get"), Value::Integer(12));
    }

    #[test]
    fn unparseable_text_is_kept_as_text() {
        let mut table = counts();
        table.set("A", "count", "n/a").expect("set");
        assert_eq!(table.get("A", "count").expect("get"), Value::from("n/a"));
        table.set("B", "count", None::<i64>).expect("null");
        assert!(table.get("B", "count").expect("get").is_null());
    }

    #[test]
    fn wrong_kind_is_a_type_error_and_leaves_no_row() {
        let mut table = counts();
        let err = table.set("A", "count", 1.5).expect_err("decimal into integer");
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn failed_arithmetic_still_adds_the_key() {
        let mut table = counts();
        let err = table.add("A", "count", 0.5).expect_err("decimal operand");
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.get("A", "count").expect("get"), Value::Integer(0));
    }

    #[test]
    fn unknown_columns_accept_anything() {
        let mut table = counts();
        table.add_column("note", None::<i64>).expect("note");
        table.set("A", "note", 1).expect("int");
        table.set("B", "note", 'x').expect("byte");
        assert_eq!(table.column("note").expect("note").kind(), Kind::Unknown);
    }

    #[test]
    fn increment_then_decrement_restores_value() {
        let mut table = counts();
        table.set("A", "count", 41).expect("set");
        table.increment("A", "count").expect("inc");
        assert_eq!(table.get("A", "count").expect("get"), Value::Integer(42));
        table.decrement("A", "count").expect("dec");
        assert_eq!(table.get("A", "count").expect("get"), Value::Integer(41));
    }

    #[test]
    fn increment_works_on_decimal_cells() {
        let mut table = counts();
        table.add_column("rate", 0.5).expect("rate");
        table.increment("A", "rate").expect("inc");
        assert_eq!(table.get("A", "rate").expect("get"), Value::Decimal(1.5));
    }

    #[test]
    fn single_cell_arithmetic_uses_the_cell_kind() {
        let mut table = counts();
        table.set("A", "count", 10).expect("set");
        table.add("A", "count", 5).expect("add");
        table.subtract("A", "count", 3).expect("sub");
        table.multiply("A", "count", 2).expect("mul");
        table.divide("A", "count", 4).expect("div");
        assert_eq!(table.get("A", "count").expect("get"), Value::Integer(6));
    }

    #[test]
    fn divide_divides() {
        let mut table = counts();
        table.add_column("rate", 9.0).expect("rate");
        table.divide("A", "rate", 3.0).expect("div");
        assert_eq!(table.get("A", "rate").expect("get"), Value::Decimal(3.0));
    }

    #[test]
    fn integer_division_by_zero_is_an_error() {
        let mut table = counts();
        table.set("A", "count", 1).expect("set");
        let err = table.divide("A", "count", 0).expect_err("div by zero");
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(table.get("A", "count").expect("get"), Value::Integer(1));
    }

    #[test]
    fn arithmetic_on_text_is_a_type_error() {
        let mut table = counts();
        table.add_column("label", "x").expect("label");
        let err = table.increment("A", "label").expect_err("text");
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = table.add("A", "count", 0.5).expect_err("decimal operand");
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn divide_columns_writes_decimals() {
        let mut table = counts();
        table.add_column("ratio", None::<f64>).expect("ratio");
        table.set("A", "count", 10).expect("a");
        table.set("A", "total", 2).expect("b");
        table.divide_columns("ratio", "count", "total").expect("divide");
        assert_eq!(table.get("A", "ratio").expect("get"), Value::Decimal(5.0));
    }

    #[test]
    fn column_ops_cover_every_row_and_use_defaults() {
        let mut table = counts();
        table.add_column("sum", None::<f64>).expect("sum");
        table.add_column("diff", None::<f64>).expect("diff");
        table.add_column("product", 0.0).expect("product");
        table.set("A", "count", 3).expect("a");
        table.set("B", "total", 4).expect("b");
        table.add_columns("sum", "count", "total").expect("add");
        table.subtract_columns("diff", "count", "total").expect("sub");
        table.multiply_columns("product", "count", "total").expect("mul");
        assert_eq!(table.get("A", "sum").expect("sum"), Value::Decimal(3.0));
        assert_eq!(table.get("B", "sum").expect("sum"), Value::Decimal(4.0));
        assert_eq!(table.get("B", "diff").expect("diff"), Value::Decimal(-4.0));
        assert_eq!(table.get("A", "product").expect("product"), Value::Decimal(0.0));
    }

    #[test]
    fn column_ops_reject_non_numeric_cells_without_writing() {
        let mut table = counts();
        table.add_column("ratio", None::<f64>).expect("ratio");
        table.set("A", "count", 1).expect("a");
        table.set("B", "count", "oops").expect("b");
        let err = table.divide_columns("ratio", "count", "total").expect_err("text");
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(table.get("A", "ratio").expect("get").is_null());
    }

    #[test]
    fn sorted_and_insertion_orders() {
        let mut sorted = counts();
        let mut inserted =
            Table::with_key_order("Counts", "per-sample counters", KeyOrder::Insertion)
                .expect("table");
        inserted.add_primary_key("sample").expect("pk");
        inserted.add_column("count", 0).expect("count");
        for key in ["c", "a", "b"] {
            sorted.increment(key, "count").expect("sorted");
            inserted.increment(key, "count").expect("inserted");
        }
        let sorted_keys: Vec<String> = sorted.primary_keys().map(ToString::to_string).collect();
        let inserted_keys: Vec<String> = inserted.primary_keys().map(ToString::to_string).collect();
        assert_eq!(sorted_keys, ["a", "b", "c"]);
        assert_eq!(inserted_keys, ["c", "a", "b"]);
    }

    #[test]
    fn dotted_lookup_matches_leading_columns() {
        let mut table = Table::new("Eval", "").expect("table");
        table.add_primary_key("row").expect("pk");
        table.add_column("comp", "none").expect("comp");
        table.add_column("novelty", "all").expect("novelty");
        table.set(1, "comp", "dbsnp").expect("set");
        table.set(1, "novelty", "known").expect("set");
        table.set(2, "comp", "dbsnp").expect("set");
        table.set(2, "novelty", "novel").expect("set");

        assert_eq!(table.get_primary_key("dbsnp.novel").expect("key"), &Key::from(2));
        assert_eq!(table.find_primary_key("dbsnp"), Some(&Key::from(1)));
        assert!(!table.contains_primary_key("hapmap.novel"));
        assert_eq!(
            table.get_primary_key("a.b.c").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn same_format_ignores_data_but_not_schema() {
        let mut left = counts();
        let right = counts();
        left.set("A", "count", 1).expect("set");
        assert!(left.is_same_format(&right));
        assert!(left != right);

        let mut other = Table::new("Counts", "per-sample counters").expect("table");
        other.add_primary_key("sample").expect("pk");
        other.add_column("count", 0.0).expect("count");
        other.add_column("total", 0).expect("total");
        assert!(!left.is_same_format(&other));
    }

    #[test]
    fn equality_compares_effective_values() {
        let mut left = counts();
        let mut right = counts();
        left.set("A", "count", 0).expect("explicit default");
        right.get("A", "total").expect("touch");
        assert!(left == right);
    }

    #[test]
    fn add_primary_key_resets_rows() {
        let mut table = counts();
        table.set("A", "count", 3).expect("set");
        table.add_primary_key_with("sample", false).expect("pk");
        assert_eq!(table.num_rows(), 0);
        assert!(!table.is_primary_key_displayed());
        assert_eq!(table.get("A", "count").expect("get"), Value::Integer(0));
    }
}
