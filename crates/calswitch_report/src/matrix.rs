//! Channel matrices built from raw database column sequences.

use std::path::Path;

use log::debug;
use ndarray::{Array2, ArrayView1, Axis, concatenate};

use crate::conf::{C_COLUMN_AMPLITUDE, C_TABLE_RASTER, N_CHANNELS, N_CHANNELS_HALF};
use crate::source::{TableSource, read_column_f64};
use crate::spec::{
    CalReportError, Channel, EnumBandTopology, EnumSeries, EnumSeriesPart, Result,
    SpecBandProfile, SpecDynamicSourcePlan,
};
use crate::topology::{interleave_even_odd, plan_dynamic_sources};

////////////////////////////////////////////////////////////////////////////////
// #region Models

/// 16 x N matrix: one row per channel, one column per raster repetition.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMatrix {
    data: Array2<f64>,
}

impl ChannelMatrix {
    /// Wrap a matrix whose rows are channels.
    pub fn from_array(data: Array2<f64>) -> Result<Self> {
        if data.nrows() != N_CHANNELS {
            return Err(CalReportError::ShapeMismatch(format!(
                "channel matrix needs {N_CHANNELS} rows, got {}",
                data.nrows()
            )));
        }
        Ok(Self { data })
    }

    /// Samples per channel.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Row of `channel`.
    pub fn row(&self, channel: Channel) -> ArrayView1<'_, f64> {
        self.data.row(channel.index())
    }

    /// Row selected by channel letter; letters outside `A`..`P` fail.
    pub fn row_by_letter(&self, letter: char) -> Result<ArrayView1<'_, f64>> {
        Ok(self.row(Channel::from_letter(letter)?))
    }

    /// Row selected by zero-based channel index.
    pub fn row_by_index(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        Ok(self.row(Channel::from_index(index)?))
    }

    /// Underlying array.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}

/// N x 16 raster-scan table: one row per repetition, columns in raster order.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMatrix {
    data: Array2<f64>,
}

impl RasterMatrix {
    /// Number of raster repetitions.
    pub fn n_repetitions(&self) -> usize {
        self.data.nrows()
    }

    /// Underlying array.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }
}

/// Primary and secondary dynamic series of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDynamicMatrices {
    /// Series read from the `_0` containers.
    pub primary: ChannelMatrix,
    /// Series read from the `_1` containers.
    pub secondary: ChannelMatrix,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reshaping

/// Reshape a flat sequence into rows of `n_cols` values.
pub fn reshape_rows(values: Vec<f64>, n_cols: usize, what: &str) -> Result<Array2<f64>> {
    if n_cols == 0 || values.len() % n_cols != 0 {
        return Err(CalReportError::ShapeMismatch(format!(
            "{what}: {} values do not divide into rows of {n_cols}",
            values.len()
        )));
    }
    let n_rows = values.len() / n_cols;
    Array2::from_shape_vec((n_rows, n_cols), values)
        .map_err(|err| CalReportError::ShapeMismatch(format!("{what}: {err}")))
}

/// Build a channel matrix from two half-range sequences (channels 1-8, 9-16).
///
/// Each sequence is reshaped to 8 columns, the halves are concatenated
/// column-wise and the result is transposed so rows are channels.
pub fn combine_split_halves(first: Vec<f64>, second: Vec<f64>) -> Result<ChannelMatrix> {
    let arr_first = reshape_rows(first, N_CHANNELS_HALF, "channels 1-8")?;
    let arr_second = reshape_rows(second, N_CHANNELS_HALF, "channels 9-16")?;
    if arr_first.nrows() != arr_second.nrows() {
        return Err(CalReportError::ShapeMismatch(format!(
            "half ranges differ in repetitions: {} vs {}",
            arr_first.nrows(),
            arr_second.nrows()
        )));
    }

    let arr_joined = concatenate(Axis(1), &[arr_first.view(), arr_second.view()])
        .map_err(|err| CalReportError::ShapeMismatch(err.to_string()))?;
    ChannelMatrix::from_array(arr_joined.reversed_axes())
}

/// Build a channel matrix from even/odd acquisition sequences.
///
/// The interleaved sequence is reshaped to 16 columns and transposed.
pub fn combine_even_odd(even: &[f64], odd: &[f64]) -> Result<ChannelMatrix> {
    let l_unified = interleave_even_odd(even, odd)?;
    let arr_rows = reshape_rows(l_unified, N_CHANNELS, "interleaved sequence")?;
    ChannelMatrix::from_array(arr_rows.reversed_axes())
}

/// Reshape one raster-scan column into an N x 16 table.
pub fn build_raster_matrix(values: Vec<f64>) -> Result<RasterMatrix> {
    Ok(RasterMatrix {
        data: reshape_rows(values, N_CHANNELS, "raster scan")?,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Loading

/// Raster container of `channel`: `SP16T<prefix>_<other 15 letters>_0.MDB`.
pub fn derive_raster_container_name(profile: &SpecBandProfile, channel: Channel) -> String {
    format!(
        "SP16T{}_{}_0.MDB",
        profile.raster_prefix,
        channel.letters_without()
    )
}

/// Load and reshape the raster-scan table of `channel`.
pub fn load_raster_matrix(
    source: &dyn TableSource,
    dir_databases: &Path,
    profile: &SpecBandProfile,
    channel: Channel,
) -> Result<RasterMatrix> {
    let path_container = dir_databases.join(derive_raster_container_name(profile, channel));
    let l_values = read_column_f64(
        source,
        &path_container,
        C_TABLE_RASTER,
        C_COLUMN_AMPLITUDE,
    )?;
    build_raster_matrix(l_values)
}

fn load_dynamic_part(
    source: &dyn TableSource,
    dir_databases: &Path,
    plan: &SpecDynamicSourcePlan,
    series: EnumSeries,
    part: EnumSeriesPart,
) -> Result<Vec<f64>> {
    read_column_f64(
        source,
        &dir_databases.join(plan.file_name(series, part)),
        C_TABLE_RASTER,
        C_COLUMN_AMPLITUDE,
    )
}

fn load_dynamic_series(
    source: &dyn TableSource,
    dir_databases: &Path,
    plan: &SpecDynamicSourcePlan,
    series: EnumSeries,
) -> Result<ChannelMatrix> {
    let l_first = load_dynamic_part(source, dir_databases, plan, series, EnumSeriesPart::First)?;
    let l_second = load_dynamic_part(source, dir_databases, plan, series, EnumSeriesPart::Second)?;

    match plan.topology {
        EnumBandTopology::InterleavedEvenOdd => combine_even_odd(&l_first, &l_second),
        EnumBandTopology::SplitHalfRanges => combine_split_halves(l_first, l_second),
    }
}

/// Load the four dynamic containers of `profile` and build both series.
pub fn build_dynamic_matrices(
    source: &dyn TableSource,
    dir_databases: &Path,
    profile: &SpecBandProfile,
) -> Result<SpecDynamicMatrices> {
    let plan = plan_dynamic_sources(profile);
    debug!(
        "Building dynamic matrices for band {} ({:?})",
        profile.code, plan.topology
    );

    let primary = load_dynamic_series(source, dir_databases, &plan, EnumSeries::Primary)?;
    let secondary = load_dynamic_series(source, dir_databases, &plan, EnumSeries::Secondary)?;
    Ok(SpecDynamicMatrices { primary, secondary })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryTableSource;
    use crate::topology::resolve_band;

    fn derive_sequence(n_len: usize, n_base: f64) -> Vec<f64> {
        (0..n_len).map(|n_idx| n_base + n_idx as f64).collect()
    }

    #[test]
    fn split_halves_keep_channel_ordering() {
        let n_reps = 3;
        let l_first = derive_sequence(8 * n_reps, 100.0);
        let l_second = derive_sequence(8 * n_reps, 200.0);

        let matrix = combine_split_halves(l_first.clone(), l_second.clone()).expect("matrix");
        assert_eq!(matrix.as_array().dim(), (16, n_reps));

        for n_row in 0..16 {
            let row = matrix.row_by_index(n_row).expect("row");
            for n_rep in 0..n_reps {
                let n_expected = if n_row < 8 {
                    l_first[n_rep * 8 + n_row]
                } else {
                    l_second[n_rep * 8 + (n_row - 8)]
                };
                assert_eq!(row[n_rep], n_expected);
            }
        }
    }

    #[test]
    fn split_halves_reject_bad_lengths() {
        assert!(matches!(
            combine_split_halves(derive_sequence(9, 0.0), derive_sequence(8, 0.0)),
            Err(CalReportError::ShapeMismatch(_))
        ));
        assert!(matches!(
            combine_split_halves(derive_sequence(16, 0.0), derive_sequence(8, 0.0)),
            Err(CalReportError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn even_odd_rows_alternate_sources() {
        let l_even = derive_sequence(16, 0.0);
        let l_odd = derive_sequence(16, 1000.0);

        let matrix = combine_even_odd(&l_even, &l_odd).expect("matrix");
        assert_eq!(matrix.as_array().dim(), (16, 2));

        // Unified position p lands at row p % 16, column p / 16.
        for n_pos in 0..32 {
            let n_expected = if n_pos % 2 == 0 {
                l_even[n_pos / 2]
            } else {
                l_odd[n_pos / 2]
            };
            assert_eq!(matrix.as_array()[[n_pos % 16, n_pos / 16]], n_expected);
        }
    }

    #[test]
    fn row_selection_rejects_invalid_channel() {
        let matrix =
            combine_split_halves(derive_sequence(8, 0.0), derive_sequence(8, 8.0)).expect("m");
        assert!(matches!(
            matrix.row_by_letter('Q'),
            Err(CalReportError::InvalidChannel(_))
        ));
        assert!(matches!(
            matrix.row_by_index(16),
            Err(CalReportError::InvalidChannel(_))
        ));
        assert!(matches!(
            matrix.row_by_letter('p'),
            Err(CalReportError::InvalidChannel(_))
        ));
        assert_eq!(matrix.row_by_letter('P').expect("P")[0], 15.0);
    }

    #[test]
    fn raster_container_name_excludes_channel() {
        let profile = resolve_band("0120").expect("band");
        let channel = Channel::from_letter('C').expect("C");
        assert_eq!(
            derive_raster_container_name(&profile, channel),
            "SP16T218_ABDEFGHIJKLMNOP_0.MDB"
        );
    }

    #[test]
    fn raster_matrix_needs_multiple_of_sixteen() {
        let raster = build_raster_matrix(derive_sequence(32, 0.0)).expect("raster");
        assert_eq!(raster.n_repetitions(), 2);
        assert_eq!(raster.as_array()[[1, 0]], 16.0);
        assert!(build_raster_matrix(derive_sequence(20, 0.0)).is_err());
    }

    #[test]
    fn dynamic_matrices_load_from_split_containers() {
        let profile = resolve_band("0120").expect("band");
        let dir_db = Path::new("/db");
        let mut source = InMemoryTableSource::new();
        for (c_name, n_base) in [
            ("SP16TDynamic_5GHz_1to8_0.MDB", 0.0),
            ("SP16TDynamic_5GHz_9toF_0.MDB", 100.0),
            ("SP16TDynamic_5GHz_1to8_1.MDB", 200.0),
            ("SP16TDynamic_5GHz_9toF_1.MDB", 300.0),
        ] {
            source
                .insert_column(
                    dir_db.join(c_name),
                    C_TABLE_RASTER,
                    C_COLUMN_AMPLITUDE,
                    derive_sequence(16, n_base),
                )
                .expect("insert");
        }

        let matrices = build_dynamic_matrices(&source, dir_db, &profile).expect("matrices");
        assert_eq!(matrices.primary.as_array().dim(), (16, 2));
        assert_eq!(matrices.primary.as_array()[[0, 1]], 8.0);
        assert_eq!(matrices.primary.as_array()[[8, 0]], 100.0);
        assert_eq!(matrices.secondary.as_array()[[15, 1]], 315.0);
    }

    #[test]
    fn dynamic_matrices_fail_on_missing_container() {
        let profile = resolve_band("1840").expect("band");
        let source = InMemoryTableSource::new();
        let err = build_dynamic_matrices(&source, Path::new("/db"), &profile).expect_err("missing");
        assert!(matches!(err, CalReportError::MissingFile(_)));
    }
}
