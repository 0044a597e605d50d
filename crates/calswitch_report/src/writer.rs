//! Report materializer: writes one channel's measurements into its worksheet.

use std::path::Path;

use log::debug;

use crate::conf::{
    C_COL_DYNAMIC_PRIMARY_OFFSET, C_COL_DYNAMIC_PRIMARY_RAW, C_COL_DYNAMIC_SECONDARY_OFFSET,
    C_COL_DYNAMIC_SECONDARY_RAW, N_CHANNELS, TUP_COLS_RASTER, TUP_COLS_TRACE,
};
use crate::matrix::{ChannelMatrix, RasterMatrix, SpecDynamicMatrices, load_raster_matrix};
use crate::report::SpecSheetWriteCounts;
use crate::source::{TableSource, TraceReader};
use crate::spec::{Channel, EnumMeasurementTag, Result, SpecBandProfile, SpecCellFormat};
use crate::util::{derive_col_index_from_letters, derive_row_index_from_excel};
use crate::workbook::ReportSheet;

/// Zero-based column indices of every report field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReportLayout {
    /// Zero-based first data row.
    pub row_start: usize,
    /// Trace column per measurement tag, in write order.
    pub cols_trace: Vec<(EnumMeasurementTag, usize)>,
    /// Raster columns in raster order.
    pub cols_raster: [usize; N_CHANNELS],
    /// Offset primary series.
    pub col_primary_offset: usize,
    /// Offset secondary series.
    pub col_secondary_offset: usize,
    /// Raw primary series.
    pub col_primary_raw: usize,
    /// Raw secondary series.
    pub col_secondary_raw: usize,
}

impl SpecReportLayout {
    /// Resolve the column-letter constants for data starting at `row_start_excel`.
    pub fn from_conf(row_start_excel: usize) -> Result<Self> {
        let mut cols_raster = [0usize; N_CHANNELS];
        for (n_idx, c_col) in TUP_COLS_RASTER.iter().enumerate() {
            cols_raster[n_idx] = derive_col_index_from_letters(c_col)?;
        }

        Ok(Self {
            row_start: derive_row_index_from_excel(row_start_excel)?,
            cols_trace: TUP_COLS_TRACE
                .iter()
                .map(|(tag, c_col)| -> Result<(EnumMeasurementTag, usize)> {
                    Ok((*tag, derive_col_index_from_letters(c_col)?))
                })
                .collect::<Result<_>>()?,
            cols_raster,
            col_primary_offset: derive_col_index_from_letters(C_COL_DYNAMIC_PRIMARY_OFFSET)?,
            col_secondary_offset: derive_col_index_from_letters(C_COL_DYNAMIC_SECONDARY_OFFSET)?,
            col_primary_raw: derive_col_index_from_letters(C_COL_DYNAMIC_PRIMARY_RAW)?,
            col_secondary_raw: derive_col_index_from_letters(C_COL_DYNAMIC_SECONDARY_RAW)?,
        })
    }
}

/// Shared, read-only inputs of every channel sheet in one run.
pub struct SpecSheetWriteContext<'a> {
    /// Base directory of trace files.
    pub dir_traces: &'a Path,
    /// Directory of database containers.
    pub dir_databases: &'a Path,
    /// Resolved band.
    pub profile: &'a SpecBandProfile,
    /// Table loading capability.
    pub source: &'a dyn TableSource,
    /// Raw dynamic series.
    pub dynamic: &'a SpecDynamicMatrices,
    /// Offset dynamic series.
    pub dynamic_offset: &'a SpecDynamicMatrices,
    /// Column layout.
    pub layout: &'a SpecReportLayout,
    /// Number format for every written value.
    pub fmt_decimal: &'a SpecCellFormat,
}

/// Write traces, raster table and dynamic series of `channel` into `sheet`.
pub fn write_channel_sheet(
    sheet: &mut ReportSheet,
    channel: Channel,
    ctx: &SpecSheetWriteContext<'_>,
) -> Result<SpecSheetWriteCounts> {
    let mut counts = SpecSheetWriteCounts::default();

    for (tag, col_idx) in &ctx.layout.cols_trace {
        let reader = TraceReader::open(ctx.dir_traces, channel, *tag)?;
        counts.cnt_trace += write_trace_column(
            sheet,
            reader,
            *col_idx,
            ctx.layout.row_start,
            ctx.fmt_decimal,
        )?;
    }

    let raster = load_raster_matrix(ctx.source, ctx.dir_databases, ctx.profile, channel)?;
    counts.cnt_raster += write_raster_block(sheet, &raster, ctx.layout, ctx.fmt_decimal)?;

    counts.cnt_dynamic += write_dynamic_columns(
        sheet,
        channel,
        ctx.dynamic,
        ctx.dynamic_offset,
        ctx.layout,
        ctx.fmt_decimal,
    )?;

    debug!(
        "Sheet {}: trace={} raster={} dynamic={}",
        sheet.name(),
        counts.cnt_trace,
        counts.cnt_raster,
        counts.cnt_dynamic
    );
    Ok(counts)
}

/// Write one trace downwards from `row_start`; returns the number of cells.
pub fn write_trace_column(
    sheet: &mut ReportSheet,
    reader: TraceReader,
    col_idx: usize,
    row_start: usize,
    format: &SpecCellFormat,
) -> Result<u64> {
    let mut n_written = 0u64;
    for (n_offset, value) in reader.enumerate() {
        sheet.write_number(row_start + n_offset, col_idx, value?, format)?;
        n_written += 1;
    }
    Ok(n_written)
}

/// Write the raster table, one sheet row per repetition.
pub fn write_raster_block(
    sheet: &mut ReportSheet,
    raster: &RasterMatrix,
    layout: &SpecReportLayout,
    format: &SpecCellFormat,
) -> Result<u64> {
    let mut n_written = 0u64;
    for (n_rep, row) in raster.as_array().outer_iter().enumerate() {
        for (col_idx, value) in layout.cols_raster.iter().zip(row.iter()) {
            sheet.write_number(layout.row_start + n_rep, *col_idx, *value, format)?;
            n_written += 1;
        }
    }
    Ok(n_written)
}

/// Write the channel's offset and raw dynamic rows.
pub fn write_dynamic_columns(
    sheet: &mut ReportSheet,
    channel: Channel,
    dynamic: &SpecDynamicMatrices,
    dynamic_offset: &SpecDynamicMatrices,
    layout: &SpecReportLayout,
    format: &SpecCellFormat,
) -> Result<u64> {
    let l_columns: [(&ChannelMatrix, usize); 4] = [
        (&dynamic_offset.primary, layout.col_primary_offset),
        (&dynamic_offset.secondary, layout.col_secondary_offset),
        (&dynamic.primary, layout.col_primary_raw),
        (&dynamic.secondary, layout.col_secondary_raw),
    ];

    let mut n_written = 0u64;
    for (matrix, col_idx) in l_columns {
        for (n_sample, value) in matrix.row(channel).iter().enumerate() {
            sheet.write_number(layout.row_start + n_sample, col_idx, *value, format)?;
            n_written += 1;
        }
    }
    Ok(n_written)
}
