//! Purpose: Centralize report format versioning and the report header line.
//! Exports: `ReportVersion`, `REPORT_HEADER_PREFIX`, `parse_report_header`, `report_version_error`.
//! Role: Shared policy for gating which report files the reader accepts.
//! Invariants: Version list is additive; bump only for incompatible layout changes.

use std::fmt;

use crate::core::error::{Error, ErrorKind};

pub const REPORT_HEADER_PREFIX: &str = "#:GATKReport.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportVersion {
    V1_0,
}

pub const LATEST_REPORT_VERSION: ReportVersion = ReportVersion::V1_0;
pub const SUPPORTED_REPORT_VERSIONS: &[ReportVersion] = &[ReportVersion::V1_0];

impl ReportVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportVersion::V1_0 => "v1.0",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        SUPPORTED_REPORT_VERSIONS
            .iter()
            .copied()
            .find(|version| version.as_str() == tag)
    }
}

impl fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn report_version_error(detected: &str) -> Error {
    let supported = SUPPORTED_REPORT_VERSIONS
        .iter()
        .map(|version| version.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Error::new(ErrorKind::Usage)
        .with_message(format!(
            "unsupported report version '{detected}' (supported: {supported})"
        ))
        .with_hint("Regenerate the report with a current tool, or read its table blocks directly.")
}

pub fn report_header(version: ReportVersion, num_tables: usize) -> String {
    format!("{REPORT_HEADER_PREFIX}{version}:{num_tables}")
}

/// Parses `#:GATKReport.<version>:<nTables>`.
pub fn parse_report_header(line: &str, line_no: u64) -> Result<(ReportVersion, usize), Error> {
    let corrupt = |message: String| {
        Error::new(ErrorKind::Corrupt)
            .with_message(message)
            .with_line(line_no)
    };
    let Some(rest) = line.strip_prefix(REPORT_HEADER_PREFIX) else {
        return Err(corrupt(format!("expected a '{REPORT_HEADER_PREFIX}' header line")));
    };
    let Some((tag, count)) = rest.split_once(':') else {
        return Err(corrupt("report header is missing the table count".to_string()));
    };
    let version =
        ReportVersion::from_tag(tag).ok_or_else(|| report_version_error(tag).with_line(line_no))?;
    let num_tables = count
        .trim()
        .parse::<usize>()
        .map_err(|_| corrupt(format!("invalid table count '{count}'")))?;
    Ok((version, num_tables))
}
