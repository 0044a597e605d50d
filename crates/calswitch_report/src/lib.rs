//! `calswitch_report` v1:
//! SP16T switch calibration data aggregation and report materialization.
//!
//! Modules:
//! - `conf`     : report layout constants, band table and format presets
//! - `spec`     : models, options and the error type
//! - `util`     : pure helpers (column letters, rounding, run paths)
//! - `source`   : database table sources and trace file reader
//! - `topology` : band resolution and dynamic container planning
//! - `matrix`   : channel and raster matrices
//! - `offset`   : vertically separated copy of a channel matrix
//! - `workbook` : in-memory workbook, template loading and XLSX output
//! - `writer`   : per-channel sheet materializer
//! - `fill`     : orchestration over all channel sheets
//! - `report`   : fill counters
pub mod conf;
pub mod fill;
pub mod matrix;
pub mod offset;
pub mod report;
pub mod source;
pub mod spec;
pub mod topology;
pub mod util;
pub mod workbook;
pub mod writer;

#[cfg(test)]
mod test_util;

pub use conf::{
    C_SHEET_PREFIX, N_CHANNELS, N_OFFSET_MIN_RANGE_DEFAULT, N_OFFSET_SPACING_DEFAULT,
    N_ROW_START_EXCEL, derive_default_report_formats,
};
pub use fill::fill_channel_sheets;
pub use matrix::{
    ChannelMatrix, RasterMatrix, SpecDynamicMatrices, build_dynamic_matrices, load_raster_matrix,
};
pub use offset::{calculate_range, derive_offset_matrix};
pub use report::{ReportFill, ReportFillBuilder, SpecSheetWriteCounts};
pub use source::{InMemoryTableSource, MdbExportSource, TableSource, TraceReader, read_column_f64};
pub use spec::{
    CalReportError, Channel, EnumBandTopology, EnumMeasurementTag, EnumOutputConflictStrategy,
    Result, SpecBandProfile, SpecMdbExportOptions, SpecOffsetOptions, SpecRunOptions,
    SpecRunPaths,
};
pub use topology::{plan_dynamic_sources, resolve_band};
pub use util::{build_run_paths, derive_band_code_from_dir, derive_unique_output_path};
pub use workbook::{ReportSheet, ReportWorkbook, save_workbook};
pub use writer::{SpecReportLayout, SpecSheetWriteContext, write_channel_sheet};
