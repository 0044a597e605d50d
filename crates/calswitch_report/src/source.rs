//! Measurement sources: database table exports and per-channel trace files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Lines};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use polars::prelude::{Column, CsvReadOptions, DataFrame, DataType, SerReader};

use crate::conf::{N_TRACE_DECIMALS, N_TRACE_HEADER_LINES};
use crate::spec::{CalReportError, Channel, EnumMeasurementTag, Result, SpecMdbExportOptions};
use crate::util::round_to_decimals;

////////////////////////////////////////////////////////////////////////////////
// #region TableSource

/// Capability that loads one table of a database container.
///
/// Production code converts through an external utility; tests inject
/// [`InMemoryTableSource`].
pub trait TableSource {
    /// Load every row of `table_name` as a column-oriented frame.
    fn read_table(&self, path_container: &Path, table_name: &str) -> Result<DataFrame>;
}

/// Table source backed by the `mdb-export` command-line utility.
#[derive(Debug, Clone, Default)]
pub struct MdbExportSource {
    options: SpecMdbExportOptions,
}

impl MdbExportSource {
    /// Create a source running `options.program`.
    pub fn new(options: SpecMdbExportOptions) -> Self {
        Self { options }
    }
}

impl TableSource for MdbExportSource {
    fn read_table(&self, path_container: &Path, table_name: &str) -> Result<DataFrame> {
        if !path_container.exists() {
            return Err(CalReportError::MissingFile(path_container.to_path_buf()));
        }

        debug!(
            "Exporting table {table_name} from {} with {}",
            path_container.display(),
            self.options.program
        );
        let output = Command::new(&self.options.program)
            .arg(path_container)
            .arg(table_name)
            .output()
            .map_err(|err| CalReportError::ConversionFailed {
                path: path_container.to_path_buf(),
                table: table_name.to_string(),
                message: format!("failed to run {}: {err}", self.options.program),
            })?;

        if !output.status.success() {
            return Err(CalReportError::ConversionFailed {
                path: path_container.to_path_buf(),
                table: table_name.to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    self.options.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        derive_dataframe_from_csv_bytes(output.stdout)
    }
}

/// In-memory table source keyed by container path and table name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTableSource {
    dict_tables: BTreeMap<(PathBuf, String), DataFrame>,
}

impl InMemoryTableSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one table.
    pub fn insert(&mut self, path_container: impl Into<PathBuf>, table_name: &str, df: DataFrame) {
        self.dict_tables
            .insert((path_container.into(), table_name.to_string()), df);
    }

    /// Register a single-column numeric table.
    pub fn insert_column(
        &mut self,
        path_container: impl Into<PathBuf>,
        table_name: &str,
        column_name: &str,
        values: Vec<f64>,
    ) -> Result<()> {
        let df = DataFrame::new(vec![Column::new(column_name.into(), values)])?;
        self.insert(path_container, table_name, df);
        Ok(())
    }
}

impl TableSource for InMemoryTableSource {
    fn read_table(&self, path_container: &Path, table_name: &str) -> Result<DataFrame> {
        self.dict_tables
            .get(&(path_container.to_path_buf(), table_name.to_string()))
            .cloned()
            .ok_or_else(|| CalReportError::MissingFile(path_container.to_path_buf()))
    }
}

/// Parse a headed CSV payload into a frame.
pub fn derive_dataframe_from_csv_bytes(v_csv: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(v_csv))
        .finish()?;
    Ok(df)
}

/// Load one table and isolate `column_name` as a flat `f64` sequence.
pub fn read_column_f64(
    source: &dyn TableSource,
    path_container: &Path,
    table_name: &str,
    column_name: &str,
) -> Result<Vec<f64>> {
    let df = source.read_table(path_container, table_name)?;

    if !df.get_column_names_str().contains(&column_name) {
        return Err(CalReportError::MissingColumn {
            path: path_container.to_path_buf(),
            table: table_name.to_string(),
            column: column_name.to_string(),
        });
    }

    let series = df
        .column(column_name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    let l_values = series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(n_row, value)| {
            value.ok_or_else(|| CalReportError::NullValue {
                path: path_container.to_path_buf(),
                table: table_name.to_string(),
                column: column_name.to_string(),
                row: n_row,
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    debug!(
        "Loaded {} values from {}:{table_name}.{column_name}",
        l_values.len(),
        path_container.display()
    );
    Ok(l_values)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TraceReader

/// Lazy reader over the amplitude column of one `.prn` trace file.
///
/// Yields one value per non-blank data line, rounded to 3 decimals. The
/// sequence cannot be restarted; open the file again instead.
#[derive(Debug)]
pub struct TraceReader {
    path_file: PathBuf,
    lines: Lines<BufReader<File>>,
    n_line: usize,
}

impl TraceReader {
    /// Trace file location: `<base>/Ch<ch>/<ch>_<tag>.prn`.
    pub fn derive_path(dir_base: &Path, channel: Channel, tag: EnumMeasurementTag) -> PathBuf {
        let chr = channel.letter();
        dir_base
            .join(format!("Ch{chr}"))
            .join(format!("{chr}_{tag}.prn"))
    }

    /// Open the trace of `channel`/`tag` under `dir_base`.
    pub fn open(dir_base: &Path, channel: Channel, tag: EnumMeasurementTag) -> Result<Self> {
        Self::open_path(&Self::derive_path(dir_base, channel, tag))
    }

    /// Open a trace file and skip its header lines.
    pub fn open_path(path_file: &Path) -> Result<Self> {
        if !path_file.is_file() {
            return Err(CalReportError::MissingFile(path_file.to_path_buf()));
        }
        let file = File::open(path_file).map_err(|source| CalReportError::Io {
            path: path_file.to_path_buf(),
            source,
        })?;

        let mut reader = Self {
            path_file: path_file.to_path_buf(),
            lines: BufReader::new(file).lines(),
            n_line: 0,
        };
        for _ in 0..N_TRACE_HEADER_LINES {
            match reader.lines.next() {
                Some(Ok(_)) => reader.n_line += 1,
                Some(Err(source)) => {
                    return Err(CalReportError::Io {
                        path: reader.path_file,
                        source,
                    });
                }
                None => break,
            }
        }
        debug!("Opened trace {}", path_file.display());
        Ok(reader)
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path_file
    }
}

impl Iterator for TraceReader {
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(CalReportError::Io {
                        path: self.path_file.clone(),
                        source,
                    }));
                }
            };
            self.n_line += 1;

            let c_line = line.trim();
            if c_line.is_empty() {
                continue;
            }

            return Some(parse_trace_amplitude(c_line).ok_or_else(|| {
                CalReportError::MalformedTraceLine {
                    path: self.path_file.clone(),
                    line_no: self.n_line,
                    line: line.clone(),
                }
            }));
        }
    }
}

/// Second non-empty comma field of a trace line, rounded to 3 decimals.
pub fn parse_trace_amplitude(line: &str) -> Option<f64> {
    let c_field = line
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .nth(1)?;
    c_field
        .parse::<f64>()
        .ok()
        .map(|value| round_to_decimals(value, N_TRACE_DECIMALS))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{TestDir, write_text};

    #[test]
    fn trace_reader_skips_headers_and_blank_lines() {
        let tmp = TestDir::new();
        let channel = Channel::from_letter('B').expect("channel");
        let path = TraceReader::derive_path(tmp.path(), channel, EnumMeasurementTag::S21);
        assert!(path.ends_with("ChB/B_S21.prn"));

        write_text(
            &path,
            "\"S21 Log Mag\"\n\"Frequency (Hz)\",\"dB\",\n1.0E8, -0.12345,\n\n  2.0E8,-0.5,\n",
        );

        let l_values: Vec<f64> = TraceReader::open(tmp.path(), channel, EnumMeasurementTag::S21)
            .expect("open")
            .collect::<Result<_>>()
            .expect("parse");
        assert_eq!(l_values, vec![-0.123, -0.5]);
    }

    #[test]
    fn trace_reader_reports_missing_file() {
        let tmp = TestDir::new();
        let channel = Channel::from_letter('A').expect("channel");
        let err = TraceReader::open(tmp.path(), channel, EnumMeasurementTag::S11)
            .expect_err("missing");
        assert!(matches!(err, CalReportError::MissingFile(_)));
    }

    #[test]
    fn trace_reader_fails_on_malformed_line() {
        let tmp = TestDir::new();
        let path = tmp.path().join("bad.prn");
        write_text(&path, "h1\nh2\n1.0E8,-1.0\n2.0E8,abc\n");

        let mut reader = TraceReader::open_path(&path).expect("open");
        assert_eq!(reader.next().expect("first").expect("value"), -1.0);
        match reader.next() {
            Some(Err(CalReportError::MalformedTraceLine { line_no, .. })) => {
                assert_eq!(line_no, 4)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn trace_amplitude_needs_two_fields() {
        assert_eq!(parse_trace_amplitude("1e9,  -3.14159 ,"), Some(-3.142));
        assert_eq!(parse_trace_amplitude("1e9,"), None);
    }

    #[test]
    fn in_memory_source_reads_column() {
        let mut source = InMemoryTableSource::new();
        source
            .insert_column("/db/a.MDB", "RasterScan", "Bin1Amptd", vec![1.5, -2.0])
            .expect("insert");

        let l_values =
            read_column_f64(&source, Path::new("/db/a.MDB"), "RasterScan", "Bin1Amptd")
                .expect("read");
        assert_eq!(l_values, vec![1.5, -2.0]);
    }

    #[test]
    fn missing_column_and_container_are_reported() {
        let mut source = InMemoryTableSource::new();
        source
            .insert_column("/db/a.MDB", "RasterScan", "Other", vec![1.0])
            .expect("insert");

        let err = read_column_f64(&source, Path::new("/db/a.MDB"), "RasterScan", "Bin1Amptd")
            .expect_err("missing column");
        assert!(matches!(err, CalReportError::MissingColumn { .. }));

        let err = read_column_f64(&source, Path::new("/db/b.MDB"), "RasterScan", "Bin1Amptd")
            .expect_err("missing file");
        assert!(matches!(err, CalReportError::MissingFile(_)));
    }

    #[test]
    fn csv_payload_is_decoded_with_header() {
        let df = derive_dataframe_from_csv_bytes(b"Bin1Amptd,Other\n-1.25,x\n3,y\n".to_vec())
            .expect("csv");
        assert_eq!(df.height(), 2);

        let mut source = InMemoryTableSource::new();
        source.insert("/db/c.MDB", "RasterScan", df);
        let l_values =
            read_column_f64(&source, Path::new("/db/c.MDB"), "RasterScan", "Bin1Amptd")
                .expect("read");
        assert_eq!(l_values, vec![-1.25, 3.0]);
    }

    #[test]
    fn mdb_export_source_checks_container_first() {
        let tmp = TestDir::new();
        let source = MdbExportSource::default();
        let err = source
            .read_table(&tmp.path().join("absent.MDB"), "RasterScan")
            .expect_err("missing");
        assert!(matches!(err, CalReportError::MissingFile(_)));
    }
}
