// Named, ordered collection of tables plus its file-level header.
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::core::codec::{ReadOptions, TABLE_HEADER_PREFIX, TableReader, write_table};
use crate::core::error::{Error, ErrorKind};
use crate::core::format::{LATEST_REPORT_VERSION, REPORT_HEADER_PREFIX, parse_report_header, report_header};
use crate::core::gather::GatherStats;
use crate::core::table::Table;

#[derive(Clone, Debug, Default)]
pub struct Report {
    tables: Vec<Table>,
    index: HashMap<String, usize>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> + '_ {
        self.tables.iter()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.index.get(name).map(|idx| &self.tables[*idx])
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.index.get(name).map(|idx| &mut self.tables[*idx])
    }

    pub fn get_table(&self, name: &str) -> Result<&Table, Error> {
        self.table(name).ok_or_else(|| {
            Error::new(ErrorKind::NotFound).with_message(format!("report has no table '{name}'"))
        })
    }

    pub fn add_table(&mut self, table: Table) -> Result<(), Error> {
        if self.index.contains_key(table.name()) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("report already has a table named '{}'", table.name())));
        }
        self.index.insert(table.name().to_string(), self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    /// Gathers `other` table by table; tables new to `self` are appended whole.
    pub fn combine_with(&mut self, other: &Report) -> Result<GatherStats, Error> {
        for theirs in other.tables() {
            if let Some(ours) = self.table(theirs.name()) {
                if let Some(mismatch) = ours.format_mismatch(theirs) {
                    return Err(Error::new(ErrorKind::Mismatch)
                        .with_message(format!(
                            "cannot combine table '{}': {mismatch}",
                            theirs.name()
                        ))
                        .with_hint("Only tables produced by the same tool configuration can be gathered."));
                }
            }
        }

        let mut stats = GatherStats::default();
        for theirs in other.tables() {
            match self.table_mut(theirs.name()) {
                Some(ours) => stats.absorb(ours.combine_with(theirs)?),
                None => {
                    stats.rows_added += theirs.num_rows();
                    stats.cells_copied += theirs.columns().map(|column| column.len()).sum::<usize>();
                    self.add_table(theirs.clone())?;
                }
            }
        }
        Ok(stats)
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        writeln!(out, "{}", report_header(LATEST_REPORT_VERSION, self.tables.len())).map_err(
            |err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write report header")
                    .with_source(err)
            },
        )?;
        for table in &self.tables {
            write_table(table, out)?;
        }
        Ok(())
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Report, Error> {
        Self::read_with_options(reader, ReadOptions::default())
    }

    /// Accepts a headed report or a bare sequence of table blocks.
    pub fn read_with_options<R: BufRead>(reader: R, options: ReadOptions) -> Result<Report, Error> {
        let mut reader = TableReader::with_options(reader, options);
        let mut report = Report::new();

        let first = loop {
            match reader.next_line()? {
                None => return Ok(report),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };

        if first.starts_with(REPORT_HEADER_PREFIX) {
            let (version, expected) = parse_report_header(&first, reader.line_number())?;
            debug!(%version, tables = expected, "reading report");
            for idx in 0..expected {
                let table = reader.read_table()?.ok_or_else(|| {
                    Error::new(ErrorKind::Corrupt)
                        .with_message(format!(
                            "report declares {expected} tables but ends after {idx}"
                        ))
                        .with_line(reader.line_number() + 1)
                })?;
                report.add_table(table).map_err(|err| duplicate(err, &reader))?;
            }
            if reader.read_table()?.is_some() {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message(format!("report declares {expected} tables but holds more"))
                    .with_line(reader.line_number()));
            }
            return Ok(report);
        }

        if !first.starts_with(TABLE_HEADER_PREFIX) {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message("input is neither a report nor a table block")
                .with_line(reader.line_number()));
        }
        reader.unread_line(first);
        while let Some(table) = reader.read_table()? {
            report.add_table(table).map_err(|err| duplicate(err, &reader))?;
        }
        Ok(report)
    }

    pub fn load(path: &Path) -> Result<Report, Error> {
        Self::load_with_options(path, ReadOptions::default())
    }

    pub fn load_with_options(path: &Path, options: ReadOptions) -> Result<Report, Error> {
        let file = File::open(path).map_err(|err| {
            let kind = if err.kind() == std::io::ErrorKind::NotFound {
                ErrorKind::NotFound
            } else {
                ErrorKind::Io
            };
            Error::new(kind)
                .with_message("failed to open report")
                .with_path(path)
                .with_source(err)
        })?;
        Self::read_with_options(BufReader::new(file), options).map_err(|err| err.with_path(path))
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let io_err = |err: std::io::Error| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write report")
                .with_path(path)
                .with_source(err)
        };
        let file = File::create(path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        self.write(&mut out).map_err(|err| err.with_path(path))?;
        out.flush().map_err(io_err)
    }
}

fn duplicate<R: BufRead>(err: Error, reader: &TableReader<R>) -> Error {
    let message = err.message().unwrap_or("duplicate table").to_string();
    Error::new(ErrorKind::Corrupt)
        .with_message(message)
        .with_line(reader.line_number())
        .with_source(err)
}
