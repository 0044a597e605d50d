//! Report layout constants, band lookup table and default format presets.

use crate::spec::{EnumBandTopology, EnumMeasurementTag, SpecCellFormat, SpecReportFormats};

/// Number of switch channels (one worksheet each).
pub const N_CHANNELS: usize = 16;
/// Channel letters in alphabetic (index) order.
pub const C_CHANNEL_LETTERS: &str = "ABCDEFGHIJKLMNOP";
/// Half of the channel range, used by split acquisition topologies.
pub const N_CHANNELS_HALF: usize = N_CHANNELS / 2;

/// Excel worksheet row limit.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet column limit.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;

/// Excel 1-based row where every data column starts.
pub const N_ROW_START_EXCEL: usize = 3;
/// Worksheet name prefix; full name is `"{prefix}{letter}"`.
pub const C_SHEET_PREFIX: &str = "Voie ";

/// Database table holding raster-scan readings.
pub const C_TABLE_RASTER: &str = "RasterScan";
/// Amplitude column of [`C_TABLE_RASTER`].
pub const C_COLUMN_AMPLITUDE: &str = "Bin1Amptd";
/// Default external table-conversion program.
pub const C_PROGRAM_MDB_EXPORT: &str = "mdb-export";

/// Number format applied to every written numeric cell.
pub const C_NUM_FORMAT_DECIMAL_3: &str = "0.000";
/// Decimal places used when rounding trace amplitudes.
pub const N_TRACE_DECIMALS: i32 = 3;
/// Header lines preceding trace rows in a `.prn` file.
pub const N_TRACE_HEADER_LINES: usize = 2;

/// Default per-channel vertical spacing of the offset transform.
pub const N_OFFSET_SPACING_DEFAULT: f64 = 0.1;
/// Default minimum total spread of the offset transform.
pub const N_OFFSET_MIN_RANGE_DEFAULT: f64 = 1.0;

/// Raster-scan columns in physical-to-logical channel order.
///
/// Three single letters followed by thirteen `A?` letters (`X..Z`, `AA..AM`).
pub const TUP_COLS_RASTER: [&str; N_CHANNELS] = [
    "X", "Y", "Z", "AA", "AB", "AC", "AD", "AE", "AF", "AG", "AH", "AI", "AJ", "AK", "AL", "AM",
];

/// Trace column per measurement tag, in write order.
pub const TUP_COLS_TRACE: [(EnumMeasurementTag, &str); 3] = [
    (EnumMeasurementTag::S21, "E"),
    (EnumMeasurementTag::S22, "AU"),
    (EnumMeasurementTag::S11, "AV"),
];

/// Offset primary dynamic series.
pub const C_COL_DYNAMIC_PRIMARY_OFFSET: &str = "AP";
/// Offset secondary dynamic series.
pub const C_COL_DYNAMIC_SECONDARY_OFFSET: &str = "AQ";
/// Raw primary dynamic series.
pub const C_COL_DYNAMIC_PRIMARY_RAW: &str = "AR";
/// Raw secondary dynamic series.
pub const C_COL_DYNAMIC_SECONDARY_RAW: &str = "AS";

/// One row of the band lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecBandEntry {
    /// Four-digit band code.
    pub code: &'static str,
    /// Acquisition topology of the dynamic series.
    pub topology: EnumBandTopology,
    /// Band string embedded in raster container names.
    pub raster_prefix: &'static str,
    /// Frequency label embedded in dynamic container names.
    pub dynamic_label: &'static str,
}

/// Known bands. Codes absent from this table are rejected.
pub const TUP_BAND_PROFILES: [SpecBandEntry; 2] = [
    SpecBandEntry {
        code: "0120",
        topology: EnumBandTopology::SplitHalfRanges,
        raster_prefix: "218",
        dynamic_label: "5GHz",
    },
    SpecBandEntry {
        code: "1840",
        topology: EnumBandTopology::InterleavedEvenOdd,
        raster_prefix: "1840",
        dynamic_label: "20GHz",
    },
];

/// Build default report formats (every numeric cell uses `0.000`).
pub fn derive_default_report_formats() -> SpecReportFormats {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        ..Default::default()
    };

    SpecReportFormats {
        text: cfg_base_fmt_spec.clone(),
        decimal: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some(C_NUM_FORMAT_DECIMAL_3.to_string()),
            ..Default::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::derive_col_index_from_letters;

    #[test]
    fn raster_columns_are_sixteen_consecutive_sheet_columns() {
        let l_idx: Vec<usize> = TUP_COLS_RASTER
            .iter()
            .map(|c_col| derive_col_index_from_letters(c_col).expect("valid letters"))
            .collect();

        assert_eq!(l_idx.first(), Some(&23));
        assert_eq!(l_idx.last(), Some(&38));
        for pair in l_idx.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
    }

    #[test]
    fn report_columns_do_not_collide() {
        let mut l_cols: Vec<&str> = TUP_COLS_RASTER.to_vec();
        l_cols.extend(TUP_COLS_TRACE.iter().map(|(_, c_col)| *c_col));
        l_cols.extend([
            C_COL_DYNAMIC_PRIMARY_OFFSET,
            C_COL_DYNAMIC_SECONDARY_OFFSET,
            C_COL_DYNAMIC_PRIMARY_RAW,
            C_COL_DYNAMIC_SECONDARY_RAW,
        ]);

        let n_total = l_cols.len();
        l_cols.sort_unstable();
        l_cols.dedup();
        assert_eq!(l_cols.len(), n_total);
    }

    #[test]
    fn default_decimal_format_has_three_places() {
        let formats = derive_default_report_formats();
        assert_eq!(formats.decimal.num_format.as_deref(), Some("0.000"));
        assert_eq!(formats.text.num_format, None);
    }
}
