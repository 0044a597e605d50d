//! Report models, run options and the top-level error type.

use std::fmt;
use std::path::PathBuf;

use crate::conf::{
    C_CHANNEL_LETTERS, C_PROGRAM_MDB_EXPORT, C_SHEET_PREFIX, N_CHANNELS,
    N_OFFSET_MIN_RANGE_DEFAULT, N_OFFSET_SPACING_DEFAULT, N_ROW_START_EXCEL,
};

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CalReportError>;

////////////////////////////////////////////////////////////////////////////////
// #region Channel

/// One of the 16 switch channels (`A`..`P`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Build a channel from its upper-case letter `A`..`P`.
    pub fn from_letter(letter: char) -> Result<Self> {
        C_CHANNEL_LETTERS
            .chars()
            .position(|chr| chr == letter)
            .map(|n_idx| Self(n_idx as u8))
            .ok_or_else(|| CalReportError::InvalidChannel(letter.to_string()))
    }

    /// Build a channel from its zero-based index.
    pub fn from_index(index: usize) -> Result<Self> {
        if index < N_CHANNELS {
            Ok(Self(index as u8))
        } else {
            Err(CalReportError::InvalidChannel(format!("index {index}")))
        }
    }

    /// Zero-based alphabetic position.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Upper-case channel letter.
    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }

    /// Channels `A`..`P` in order.
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..N_CHANNELS as u8).map(Channel)
    }

    /// All channel letters except this one, in order.
    pub fn letters_without(self) -> String {
        C_CHANNEL_LETTERS
            .chars()
            .filter(|chr| *chr != self.letter())
            .collect()
    }

    /// Worksheet name for this channel, e.g. `Voie C`.
    pub fn sheet_name(self, prefix: &str) -> String {
        format!("{prefix}{}", self.letter())
    }
}

impl TryFrom<char> for Channel {
    type Error = CalReportError;

    fn try_from(value: char) -> Result<Self> {
        Self::from_letter(value)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Trace measurement type stored in `<ch>_<tag>.prn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumMeasurementTag {
    /// Transmission trace.
    S21,
    /// Output reflection trace.
    S22,
    /// Input reflection trace.
    S11,
}

impl EnumMeasurementTag {
    /// File-name tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S21 => "S21",
            Self::S22 => "S22",
            Self::S11 => "S11",
        }
    }
}

impl fmt::Display for EnumMeasurementTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Band

/// Acquisition order of the dynamic (isolation) series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBandTopology {
    /// Even and odd channel positions acquired in separate files, two file pairs.
    InterleavedEvenOdd,
    /// Channels 1-8 and 9-16 acquired in separate files, concatenated column-wise.
    SplitHalfRanges,
}

/// Resolved band configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBandProfile {
    /// Four-digit band code, e.g. `0120`.
    pub code: String,
    /// Dynamic-series topology.
    pub topology: EnumBandTopology,
    /// Band string embedded in raster container names.
    pub raster_prefix: String,
    /// Frequency label embedded in dynamic container names.
    pub dynamic_label: String,
}

/// Which measurement series a dynamic container feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSeries {
    /// First raster scan.
    Primary,
    /// Second raster scan.
    Secondary,
}

/// Which part of a series a dynamic container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSeriesPart {
    /// Even positions (interleaved) or channels 1-8 (split).
    First,
    /// Odd positions (interleaved) or channels 9-16 (split).
    Second,
}

/// The two containers feeding one series, relative to the database directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDynamicSourcePair {
    /// Even positions (interleaved) or channels 1-8 (split).
    pub file_first: String,
    /// Odd positions (interleaved) or channels 9-16 (split).
    pub file_second: String,
}

/// Containers and combination rule for the dynamic series of one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDynamicSourcePlan {
    /// Combination rule.
    pub topology: EnumBandTopology,
    /// Containers of the primary series (`_0`).
    pub primary: SpecDynamicSourcePair,
    /// Containers of the secondary series (`_1`).
    pub secondary: SpecDynamicSourcePair,
}

impl SpecDynamicSourcePlan {
    /// Container name for one series part.
    pub fn file_name(&self, series: EnumSeries, part: EnumSeriesPart) -> &str {
        let pair = match series {
            EnumSeries::Primary => &self.primary,
            EnumSeries::Secondary => &self.secondary,
        };
        match part {
            EnumSeriesPart::First => &pair.file_first,
            EnumSeriesPart::Second => &pair.file_second,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification (subset used by the report).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

/// Named formats used by the materializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReportFormats {
    /// Format for text cells carried from the template.
    pub text: SpecCellFormat,
    /// Format for every written measurement value.
    pub decimal: SpecCellFormat,
}

/// Normalized cell value held by [`crate::workbook::ReportSheet`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Bool(bool),
    /// Formula text without the leading `=`.
    Formula(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RunOptions

/// Parameters of the offset transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecOffsetOptions {
    /// Vertical shift added per channel index.
    pub spacing: f64,
    /// Minimum total spread of the stacked traces.
    pub min_range: f64,
}

impl Default for SpecOffsetOptions {
    fn default() -> Self {
        Self {
            spacing: N_OFFSET_SPACING_DEFAULT,
            min_range: N_OFFSET_MIN_RANGE_DEFAULT,
        }
    }
}

/// Locations of every input of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRunPaths {
    /// Four-digit band code.
    pub band_code: String,
    /// Base directory of per-channel trace files (`Ch<X>/<X>_<tag>.prn`).
    pub dir_traces: PathBuf,
    /// Directory of database containers.
    pub dir_databases: PathBuf,
    /// Template workbook.
    pub path_template: PathBuf,
    /// Requested output workbook.
    pub path_output: PathBuf,
}

/// Options controlling one fill run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRunOptions {
    /// Worksheet name prefix.
    pub sheet_prefix: String,
    /// Excel 1-based start row of every data column.
    pub row_start_excel: usize,
    /// Offset transform parameters.
    pub offset: SpecOffsetOptions,
}

impl Default for SpecRunOptions {
    fn default() -> Self {
        Self {
            sheet_prefix: C_SHEET_PREFIX.to_string(),
            row_start_excel: N_ROW_START_EXCEL,
            offset: SpecOffsetOptions::default(),
        }
    }
}

/// External table-conversion program settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMdbExportOptions {
    /// Program name or path.
    pub program: String,
}

impl Default for SpecMdbExportOptions {
    fn default() -> Self {
        Self {
            program: C_PROGRAM_MDB_EXPORT.to_string(),
        }
    }
}

/// Existing output file policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumOutputConflictStrategy {
    /// Replace the existing file.
    Overwrite,
    /// Write next to it with a `(1)`, `(2)`, ... suffix.
    #[default]
    Rename,
    /// Fail without writing.
    Error,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Every failure of the engine. All are fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum CalReportError {
    /// Source file or container does not exist.
    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),
    /// Requested column absent from a loaded table.
    #[error("column {column:?} not found in {} (table {table})", .path.display())]
    MissingColumn {
        /// Container path.
        path: PathBuf,
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Null cell in a numeric column.
    #[error("null value at row {row} of column {column:?} in {} (table {table})", .path.display())]
    NullValue {
        /// Container path.
        path: PathBuf,
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Zero-based data row.
        row: usize,
    },
    /// Template lacks an expected worksheet.
    #[error("sheet {0:?} does not exist in the workbook")]
    MissingSheet(String),
    /// Channel letter/index outside `A`..`P`.
    #[error("invalid channel: {0}")]
    InvalidChannel(String),
    /// Band code unknown or malformed.
    #[error("invalid band code: {0:?}")]
    InvalidBand(String),
    /// Trace line that cannot be parsed.
    #[error("malformed trace line {line_no} in {}: {line:?}", .path.display())]
    MalformedTraceLine {
        /// Trace file.
        path: PathBuf,
        /// One-based line number.
        line_no: usize,
        /// Raw line text.
        line: String,
    },
    /// Raw sequence length incompatible with the expected layout.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// External conversion utility failed.
    #[error("table conversion failed for {} (table {table}): {message}", .path.display())]
    ConversionFailed {
        /// Container path.
        path: PathBuf,
        /// Table name.
        table: String,
        /// Exit status and stderr text.
        message: String,
    },
    /// Caller-supplied argument rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Output path exists and the conflict strategy forbids writing.
    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),
    /// Filesystem failure.
    #[error("io error on {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Table decoding failure.
    #[error("table decode error: {0}")]
    Table(#[from] polars::prelude::PolarsError),
    /// Template workbook read failure.
    #[error("template read error: {0}")]
    Template(#[from] calamine::Error),
    /// Workbook write failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_letters_and_indices_agree() {
        for (n_idx, chr) in C_CHANNEL_LETTERS.chars().enumerate() {
            let channel = Channel::from_letter(chr).expect("valid letter");
            assert_eq!(channel.index(), n_idx);
            assert_eq!(channel.letter(), chr);
            assert_eq!(Channel::from_index(n_idx).expect("valid index"), channel);
        }
    }

    #[test]
    fn channel_outside_range_is_rejected() {
        assert!(matches!(
            Channel::from_letter('Q'),
            Err(CalReportError::InvalidChannel(_))
        ));
        assert!(matches!(
            Channel::try_from('1'),
            Err(CalReportError::InvalidChannel(_))
        ));
        for chr in ['a', 'c', 'p'] {
            assert!(matches!(
                Channel::from_letter(chr),
                Err(CalReportError::InvalidChannel(_))
            ));
        }
        assert!(matches!(
            Channel::from_index(16),
            Err(CalReportError::InvalidChannel(_))
        ));
    }

    #[test]
    fn channel_sheet_name_and_exclusion_sequence() {
        let channel = Channel::from_letter('A').expect("valid");
        assert_eq!(channel.sheet_name("Voie "), "Voie A");
        assert_eq!(channel.letters_without(), "BCDEFGHIJKLMNOP");

        let channel = Channel::from_letter('P').expect("valid");
        assert_eq!(channel.letters_without(), "ABCDEFGHIJKLMNO");
        assert_eq!(Channel::all().count(), 16);
    }

    #[test]
    fn cell_format_merge_prefers_right_side() {
        let base = SpecCellFormat {
            font_name: Some("Calibri".to_string()),
            num_format: Some("0".to_string()),
            ..Default::default()
        };
        let merged = base.with_(SpecCellFormat {
            num_format: Some("0.000".to_string()),
            ..Default::default()
        });
        assert_eq!(merged.font_name.as_deref(), Some("Calibri"));
        assert_eq!(merged.num_format.as_deref(), Some("0.000"));
    }
}
