//! Fill report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// Cells written into one channel sheet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpecSheetWriteCounts {
    /// Cells sourced from trace files.
    pub cnt_trace: u64,
    /// Cells sourced from the raster-scan table.
    pub cnt_raster: u64,
    /// Cells sourced from the dynamic series (offset and raw).
    pub cnt_dynamic: u64,
}

impl SpecSheetWriteCounts {
    /// Total written cells.
    pub fn total(&self) -> u64 {
        self.cnt_trace + self.cnt_raster + self.cnt_dynamic
    }
}

/// Aggregate counters for one fill run.
#[derive(Debug, Default, Clone)]
pub struct ReportFill {
    /// Band code of the run.
    pub band_code: String,
    /// Sheets filled, in order.
    pub sheets: Vec<String>,
    /// Trace cells written.
    pub cnt_trace: u64,
    /// Raster cells written.
    pub cnt_raster: u64,
    /// Dynamic-series cells written.
    pub cnt_dynamic: u64,
    /// Samples per channel in the dynamic series.
    pub n_dynamic_samples: usize,
}

impl ReportFill {
    /// Total written cells.
    pub fn cnt_cells(&self) -> u64 {
        self.cnt_trace + self.cnt_raster + self.cnt_dynamic
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_sheets".to_string(), self.sheets.len() as u64);
        dict_counts.insert("cnt_trace".to_string(), self.cnt_trace);
        dict_counts.insert("cnt_raster".to_string(), self.cnt_raster);
        dict_counts.insert("cnt_dynamic".to_string(), self.cnt_dynamic);
        dict_counts.insert("cnt_cells".to_string(), self.cnt_cells());
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} band={} sheets={} trace={} raster={} dynamic={} cells={}",
            self.band_code,
            dict_counts["cnt_sheets"],
            dict_counts["cnt_trace"],
            dict_counts["cnt_raster"],
            dict_counts["cnt_dynamic"],
            dict_counts["cnt_cells"]
        )
    }
}

impl fmt::Display for ReportFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[FILL]"))
    }
}

/// Mutable accumulator for fill statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportFillBuilder {
    band_code: String,
    sheets: Vec<String>,
    counts: SpecSheetWriteCounts,
    n_dynamic_samples: usize,
}

impl ReportFillBuilder {
    /// Start a report for `band_code` with `n_dynamic_samples` per channel.
    pub fn new(band_code: &str, n_dynamic_samples: usize) -> Self {
        Self {
            band_code: band_code.to_string(),
            n_dynamic_samples,
            ..Default::default()
        }
    }

    /// Record one filled sheet.
    pub fn add_sheet(&mut self, sheet_name: &str, counts: SpecSheetWriteCounts) {
        self.sheets.push(sheet_name.to_string());
        self.counts.cnt_trace += counts.cnt_trace;
        self.counts.cnt_raster += counts.cnt_raster;
        self.counts.cnt_dynamic += counts.cnt_dynamic;
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportFill {
        ReportFill {
            band_code: self.band_code,
            sheets: self.sheets,
            cnt_trace: self.counts.cnt_trace,
            cnt_raster: self.counts.cnt_raster,
            cnt_dynamic: self.counts.cnt_dynamic,
            n_dynamic_samples: self.n_dynamic_samples,
        }
    }
}
