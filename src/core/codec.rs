//! Purpose: Fixed-width text encoding of one table per block (writer and reader).
//! Exports: `write_table`, `render_table`, `TableReader`, `ReadOptions`, header constants.
//! Role: Human-readable, awk-able wire format used for report files and gather inputs.
//! Invariants: Column boundaries on read come from the header line's word starts.
//! Invariants: Row/column counts from the definition line are read exactly; short input is Corrupt.
//! Invariants: Every Corrupt error carries the 1-based line number it refers to.
//! Notes: The caller owns the stream; the codec never opens or closes it.

use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::core::cell_format::CellFormat;
use crate::core::error::{Error, ErrorKind};
use crate::core::keys::KeyOrder;
use crate::core::table::{DEFAULT_PRIMARY_KEY, Table};
use crate::core::value::{Key, Value};

pub const TABLE_HEADER_PREFIX: &str = "#:GATKTable";
pub const SEPARATOR: char = ':';
pub const ENDLINE: &str = ":;";
const COLUMN_GAP: &str = "  ";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadOptions {
    pub key_order: KeyOrder,
}

/// Writes one block: definition line, name line, header, rows, blank line.
pub fn write_table<W: Write>(table: &Table, out: &mut W) -> Result<(), Error> {
    let block = render_table(table)?;
    out.write_all(block.as_bytes()).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to write table '{}'", table.name()))
            .with_source(err)
    })
}

pub fn render_table(table: &Table) -> Result<String, Error> {
    let displayed: Vec<_> = table.columns().filter(|c| c.is_displayable()).collect();
    let hidden = table.columns().filter(|c| !c.is_displayable());

    let mut out = format!(
        "{TABLE_HEADER_PREFIX}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
        table.is_primary_key_displayed(),
        table.num_columns(),
        table.num_rows()
    );
    // Displayed formats first so a reader can pair them with header names.
    for column in displayed.iter().copied().chain(hidden) {
        out.push(SEPARATOR);
        out.push_str(column.format());
    }
    out.push_str(ENDLINE);
    out.push('\n');
    out.push_str(&format!(
        "{TABLE_HEADER_PREFIX}{SEPARATOR}{}{SEPARATOR}{}\n",
        table.name(),
        table.description()
    ));

    let key_width = table
        .primary_keys()
        .map(|key| key.to_string().chars().count())
        .chain(std::iter::once(table.primary_key_name().chars().count()))
        .max()
        .unwrap_or(0);
    let formats: Vec<_> = displayed.iter().map(|c| c.column_format()).collect();

    let mut cells = Vec::with_capacity(displayed.len() + 1);
    if table.is_primary_key_displayed() {
        cells.push(pad(table.primary_key_name(), key_width));
    }
    for (column, format) in displayed.iter().zip(&formats) {
        cells.push(format.pad(column.name()));
    }
    out.push_str(&cells.join(COLUMN_GAP));
    out.push('\n');

    for (slot, key) in table.rows() {
        cells.clear();
        if table.is_primary_key_displayed() {
            let text = key.to_string();
            reject_line_breaks(table, &text)?;
            cells.push(pad(&text, key_width));
        }
        for (column, format) in displayed.iter().zip(&formats) {
            let text = column.render(column.peek(slot));
            reject_line_breaks(table, &text)?;
            cells.push(format.pad(&text));
        }
        out.push_str(&cells.join(COLUMN_GAP));
        out.push('\n');
    }
    out.push('\n');
    Ok(out)
}

fn reject_line_breaks(table: &Table, text: &str) -> Result<(), Error> {
    if text.contains(['\n', '\r']) {
        return Err(Error::new(ErrorKind::Invalid).with_message(format!(
            "table '{}' holds a value with a line break; it cannot be written",
            table.name()
        )));
    }
    Ok(())
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut out = text.to_string();
    if width > len {
        out.extend(std::iter::repeat_n(' ', width - len));
    }
    out
}

/// Start of every word in a header line, in characters.
pub fn word_starts(line: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut prev_space = true;
    for (idx, ch) in line.chars().enumerate() {
        let space = ch.is_whitespace();
        if prev_space && !space {
            starts.push(idx);
        }
        prev_space = space;
    }
    starts
}

/// Cuts `line` at `starts`; the first field also takes anything before the first start.
pub fn split_fixed_width(line: &str, starts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut fields = Vec::with_capacity(starts.len());
    for (idx, _) in starts.iter().enumerate() {
        let begin = if idx == 0 { 0 } else { starts[idx] };
        let end = starts.get(idx + 1).copied().unwrap_or(chars.len());
        let begin = begin.min(chars.len());
        let end = end.clamp(begin, chars.len());
        let field: String = chars[begin..end].iter().collect();
        fields.push(field.trim().to_string());
    }
    fields
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Definition {
    key_display: bool,
    num_columns: usize,
    num_rows: usize,
    formats: Vec<String>,
}

pub struct TableReader<R> {
    reader: R,
    line: u64,
    options: ReadOptions,
    pending: Option<String>,
}

impl<R: BufRead> TableReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReadOptions::default())
    }

    pub fn with_options(reader: R, options: ReadOptions) -> Self {
        Self {
            reader,
            line: 0,
            options,
            pending: None,
        }
    }

    /// Number of the last line consumed (1-based; 0 before any read).
    pub fn line_number(&self) -> u64 {
        self.line
    }

    pub(crate) fn next_line(&mut self) -> Result<Option<String>, Error> {
        if let Some(line) = self.pending.take() {
            self.line += 1;
            return Ok(Some(line));
        }
        let mut buf = String::new();
        let read = self.reader.read_line(&mut buf).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read table text")
                .with_line(self.line + 1)
                .with_source(err)
        })?;
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }

    pub(crate) fn unread_line(&mut self, line: String) {
        self.line -= 1;
        self.pending = Some(line);
    }

    fn require_line(&mut self, what: &str) -> Result<String, Error> {
        self.next_line()?.ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("unexpected end of input; expected {what}"))
                .with_line(self.line + 1)
        })
    }

    /// Reads the next block, skipping blank lines; `None` at end of input.
    pub fn read_table(&mut self) -> Result<Option<Table>, Error> {
        let first = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let definition = parse_definition(&first, self.line)?;

        let identity = self.require_line("table name line")?;
        let identity_line = self.line;
        let (name, description) = parse_identity(&identity, identity_line)?;
        let mut table = Table::with_key_order(name, description, self.options.key_order)
            .map_err(|err| corrupt_from(err, "invalid table identity", identity_line))?;

        let header = self.require_line("column header line")?;
        let header_line = self.line;
        let starts = word_starts(&header);
        let mut names = split_fixed_width(&header, &starts);
        if definition.key_display {
            if names.is_empty() {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("header line is missing the primary key column")
                    .with_line(header_line));
            }
            let key_name = names.remove(0);
            table
                .add_primary_key(&key_name)
                .map_err(|err| corrupt_from(err, "invalid primary key", header_line))?;
        } else {
            table
                .add_primary_key_with(DEFAULT_PRIMARY_KEY, false)
                .map_err(|err| corrupt_from(err, "invalid primary key", header_line))?;
        }
        if names.len() > definition.formats.len() {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!(
                    "header names {} columns but the definition declares {}",
                    names.len(),
                    definition.formats.len()
                ))
                .with_line(header_line));
        }
        if names.len() < definition.num_columns {
            warn!(
                table = %table.name(),
                shown = names.len(),
                declared = definition.num_columns,
                "block omits hidden columns"
            );
        }
        for (name, format) in names.iter().zip(&definition.formats) {
            table
                .add_column_with(name, Value::null(), true, format)
                .map_err(|err| corrupt_from(err, "invalid column", header_line))?;
        }

        let offset = usize::from(definition.key_display);
        for row in 0..definition.num_rows {
            let line = self.require_line(&format!("row {} of {}", row + 1, definition.num_rows))?;
            let row_line = self.line;
            let fields = split_fixed_width(&line, &starts);
            let key = if definition.key_display {
                read_key(fields.first().cloned().unwrap_or_default())
            } else {
                Key::Integer(row as i64)
            };
            table.touch(&key);
            for (idx, name) in names.iter().enumerate() {
                let field = fields.get(offset + idx).cloned().unwrap_or_default();
                table
                    .set(key.clone(), name, Value::String(field))
                    .map_err(|err| corrupt_from(err, "invalid cell", row_line))?;
            }
        }

        match self.next_line()? {
            None => {}
            Some(line) if line.trim().is_empty() => {}
            Some(line) if line.starts_with("#:") => self.unread_line(line),
            Some(_) => {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message(format!(
                        "expected a blank line after {} rows of table '{}'",
                        definition.num_rows,
                        table.name()
                    ))
                    .with_line(self.line));
            }
        }

        debug!(
            table = %table.name(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "parsed table block"
        );
        Ok(Some(table))
    }
}

impl Table {
    pub fn to_wire_string(&self) -> Result<String, Error> {
        render_table(self)
    }

    /// Parses exactly the first block of `text`.
    pub fn from_wire_str(text: &str) -> Result<Table, Error> {
        TableReader::new(text.as_bytes()).read_table()?.ok_or_else(|| {
            Error::new(ErrorKind::Corrupt).with_message("input holds no table block")
        })
    }
}

// Canonical integer text ("10", not "010") was written from an integer key.
fn read_key(text: String) -> Key {
    match text.parse::<i64>() {
        Ok(n) if n.to_string() == text => Key::Integer(n),
        _ => Key::Text(text),
    }
}

fn corrupt(message: impl Into<String>, line: u64) -> Error {
    Error::new(ErrorKind::Corrupt)
        .with_message(message)
        .with_line(line)
}

fn corrupt_from(err: Error, context: &str, line: u64) -> Error {
    let detail = err.message().unwrap_or("invalid value").to_string();
    corrupt(format!("{context}: {detail}"), line).with_source(err)
}

fn parse_definition(line: &str, line_no: u64) -> Result<Definition, Error> {
    let tokens: Vec<&str> = line.split(SEPARATOR).collect();
    if tokens.len() < 6 || format!("{}:{}", tokens[0], tokens[1]) != TABLE_HEADER_PREFIX {
        return Err(corrupt(
            format!("expected a '{TABLE_HEADER_PREFIX}' definition line"),
            line_no,
        ));
    }
    if tokens[tokens.len() - 1] != ";" {
        return Err(corrupt(
            format!("definition line must end with '{ENDLINE}'"),
            line_no,
        ));
    }
    let key_display = match tokens[2] {
        flag if flag.eq_ignore_ascii_case("true") => true,
        flag if flag.eq_ignore_ascii_case("false") => false,
        flag => return Err(corrupt(format!("invalid display flag '{flag}'"), line_no)),
    };
    let num_columns = tokens[3]
        .parse::<usize>()
        .map_err(|_| corrupt(format!("invalid column count '{}'", tokens[3]), line_no))?;
    let num_rows = tokens[4]
        .parse::<usize>()
        .map_err(|_| corrupt(format!("invalid row count '{}'", tokens[4]), line_no))?;
    let formats: Vec<String> = tokens[5..tokens.len() - 1]
        .iter()
        .map(|token| token.to_string())
        .collect();
    if formats.len() > num_columns {
        return Err(corrupt(
            format!(
                "{} format tokens for {num_columns} declared columns",
                formats.len()
            ),
            line_no,
        ));
    }
    for format in &formats {
        CellFormat::parse(format).map_err(|err| corrupt_from(err, "invalid format", line_no))?;
    }
    Ok(Definition {
        key_display,
        num_columns,
        num_rows,
        formats,
    })
}

fn parse_identity(line: &str, line_no: u64) -> Result<(String, String), Error> {
    let mut parts = line.splitn(4, SEPARATOR);
    let prefix = (parts.next(), parts.next());
    if prefix != (Some("#"), Some("GATKTable")) {
        return Err(corrupt(
            format!("expected a '{TABLE_HEADER_PREFIX}' name line"),
            line_no,
        ));
    }
    let Some(name) = parts.next() else {
        return Err(corrupt("name line is missing the table name", line_no));
    };
    let description = parts.next().unwrap_or_default();
    Ok((name.to_string(), description.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{ReadOptions, TableReader, render_table, split_fixed_width, word_starts};
    use crate::core::error::ErrorKind;
    use crate::core::keys::KeyOrder;
    use crate::core::table::Table;
    use crate::core::value::{Key, Value};

    fn summary() -> Table {
        let mut table = Table::new("Summary", "per-sample summary").expect("table");
        table.add_primary_key("sample").expect("pk");
        table.add_column("count", 0).expect("count");
        table
    }

    #[test]
    fn writes_the_documented_layout() {
        let mut table = summary();
        table.set("A", "count", 5).expect("set");
        table.set("BB", "count", 12345).expect("set");
        let text = render_table(&table).expect("render");
        let expected = "#:GATKTable:true:1:2:%d:;\n\
                        #:GATKTable:Summary:per-sample summary\n\
                        sample  count\n\
                        A       5    \n\
                        BB      12345\n\
                        \n";
        assert_eq!(text, expected);
    }

    #[test]
    fn scenario_round_trip() {
        let mut table = summary();
        table.set("A", "count", 5).expect("set");
        let text = table.to_wire_string().expect("render");
        let mut parsed = Table::from_wire_str(&text).expect("parse");
        assert_eq!(parsed.get("A", "count").expect("get"), Value::Integer(5));
        assert!(parsed == table);
    }

    #[test]
    fn hidden_columns_list_formats_after_displayed_ones() {
        let mut table = summary();
        table.add_column_with("scratch", 0.0, false, "").expect("hidden");
        table.add_column_with("label", "x", true, "").expect("label");
        table.set("A", "scratch", 2.5).expect("set");
        let text = render_table(&table).expect("render");
        assert!(text.starts_with("#:GATKTable:true:3:1:%d:%s:%f:;\n"));
        assert!(!text.contains("scratch"));

        let parsed = Table::from_wire_str(&text).expect("parse");
        let names: Vec<&str> = parsed.columns().map(|c| c.name()).collect();
        assert_eq!(names, ["count", "label"]);
    }

    #[test]
    fn hidden_primary_key_reads_back_as_counter() {
        let mut table = Table::new("Cycles", "").expect("table");
        table.add_primary_key_with("cycle", false).expect("pk");
        table.add_column("errors", 0).expect("errors");
        table.set("first", "errors", 3).expect("set");
        table.set("second", "errors", 4).expect("set");

        let text = render_table(&table).expect("render");
        let mut lines = text.lines();
        assert_eq!(lines.nth(2), Some("errors"));

        let mut parsed = Table::from_wire_str(&text).expect("parse");
        assert!(!parsed.is_primary_key_displayed());
        assert_eq!(parsed.primary_key_name(), "id");
        assert_eq!(parsed.get(0, "errors").expect("row 0"), Value::Integer(3));
        assert_eq!(parsed.get(1, "errors").expect("row 1"), Value::Integer(4));
    }

    #[test]
    fn values_with_spaces_survive_fixed_width_split() {
        let mut table = summary();
        table.add_column("note", "").expect("note");
        table.set("A", "note", "two words").expect("set");
        table.set("B", "note", "x").expect("set");
        let mut parsed = Table::from_wire_str(&render_table(&table).expect("render")).expect("parse");
        assert_eq!(parsed.get("A", "note").expect("get"), Value::from("two words"));
        assert_eq!(parsed.get("B", "count").expect("get"), Value::Integer(0));
    }

    #[test]
    fn integer_keys_read_back_as_integers() {
        let mut table = Table::new("Lanes", "").expect("table");
        table.add_primary_key("lane").expect("pk");
        table.add_column("reads", 0).expect("reads");
        for lane in [10, 2, 1] {
            table.set(lane, "reads", lane * 100).expect("set");
        }
        table.set("007", "reads", 7).expect("padded text key");

        let parsed = Table::from_wire_str(&render_table(&table).expect("render")).expect("parse");
        let keys: Vec<&Key> = parsed.primary_keys().collect();
        assert_eq!(
            keys,
            [&Key::Integer(1), &Key::Integer(2), &Key::Integer(10), &Key::from("007")]
        );
        assert_eq!(parsed.lookup(&Key::from(2), "reads").expect("lane 2"), &Value::Integer(200));
        assert!(parsed == table);
    }

    #[test]
    fn hex_cells_round_trip() {
        let mut table = summary();
        table.add_column_with("flags", 0, true, "%x").expect("flags");
        table.set("A", "flags", 255).expect("set");
        table.set("B", "flags", -42).expect("set");
        let text = render_table(&table).expect("render");
        assert!(text.contains("ff"));
        assert!(text.contains("-2a"));

        let mut parsed = Table::from_wire_str(&text).expect("parse");
        assert_eq!(parsed.get("A", "flags").expect("A"), Value::Integer(255));
        assert_eq!(parsed.get("B", "flags").expect("B"), Value::Integer(-42));
        assert!(parsed == table);
    }

    #[test]
    fn fixed_width_fields_drop_surrounding_spaces() {
        let mut table = summary();
        table.add_column("note", "").expect("note");
        table.set("A", "note", " x ").expect("set");
        let mut parsed = Table::from_wire_str(&render_table(&table).expect("render")).expect("parse");
        assert_eq!(parsed.get("A", "note").expect("get"), Value::from("x"));
        assert!(parsed != table);
    }

    #[test]
    fn description_may_contain_colons() {
        let table = Table::new("T", "ratio a:b").expect("table");
        let parsed = Table::from_wire_str(&render_table(&table).expect("render")).expect("parse");
        assert_eq!(parsed.description(), "ratio a:b");
    }

    #[test]
    fn word_starts_follow_whitespace_runs() {
        assert_eq!(word_starts("key  a    bb"), vec![0, 5, 10]);
        assert_eq!(
            split_fixed_width("k1   x y  7", &[0, 5, 10]),
            vec!["k1".to_string(), "x y".to_string(), "7".to_string()]
        );
        assert_eq!(
            split_fixed_width("k1", &[0, 5, 10]),
            vec!["k1".to_string(), String::new(), String::new()]
        );
    }

    #[test]
    fn short_input_is_corrupt_with_line_number() {
        let text = "#:GATKTable:true:1:3:%d:;\n#:GATKTable:T:d\nkey  n\na    1\n";
        let err = Table::from_wire_str(text).expect_err("short");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.line(), Some(5));
    }

    #[test]
    fn malformed_definition_is_corrupt() {
        let cases = [
            "#:GATKTable:true:1:1:%d\n",
            "#:GATKTable:maybe:1:1:%d:;\n",
            "#:GATKTable:true:x:1:%d:;\n",
            "#:GATKTable:true:1:1:%d:%d:;\n",
            "#:GATKTable:true:1:1:%q:;\n",
            "##:GATKReport.v0.1 T : d\n",
        ];
        for text in cases {
            let err = Table::from_wire_str(text).expect_err(text);
            assert_eq!(err.kind(), ErrorKind::Corrupt, "{text}");
            assert_eq!(err.line(), Some(1), "{text}");
        }
    }

    #[test]
    fn unparseable_numbers_are_kept_as_text() {
        let text = "#:GATKTable:true:1:1:%d:;\n#:GATKTable:T:d\nkey  n\na    NA\n\n";
        let mut table = Table::from_wire_str(text).expect("parse");
        assert_eq!(table.get("a", "n").expect("get"), Value::from("NA"));
    }

    #[test]
    fn reader_consumes_consecutive_blocks() {
        let mut first = summary();
        first.set("A", "count", 1).expect("set");
        let second = Table::new("Empty", "nothing yet").expect("table");
        let text = format!(
            "{}{}",
            render_table(&first).expect("first"),
            render_table(&second).expect("second")
        );

        let mut reader = TableReader::with_options(
            text.as_bytes(),
            ReadOptions {
                key_order: KeyOrder::Insertion,
            },
        );
        let a = reader.read_table().expect("read").expect("first block");
        let b = reader.read_table().expect("read").expect("second block");
        assert!(reader.read_table().expect("eof").is_none());
        assert_eq!(a.key_order(), KeyOrder::Insertion);
        assert!(a.contains_key(&Key::from("A")));
        assert_eq!(b.name(), "Empty");
        assert_eq!(b.num_rows(), 0);
    }

    #[test]
    fn writer_refuses_line_breaks_in_values() {
        let mut table = summary();
        table.add_column("note", "").expect("note");
        table.set("A", "note", "two\nlines").expect("set");
        assert_eq!(render_table(&table).unwrap_err().kind(), ErrorKind::Invalid);
    }
}
