//! Vertically separated ("offset") copy of a channel matrix for overlaid plots.

use ndarray::{Array2, Axis};

use crate::matrix::ChannelMatrix;
use crate::spec::{Result, SpecOffsetOptions};

/// Full value range (`max - min`) over every cell; `0.0` when empty.
pub fn calculate_range(arr: &Array2<f64>) -> f64 {
    if arr.is_empty() {
        return 0.0;
    }
    let (n_min, n_max) = arr
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(n_lo, n_hi), x| {
            (n_lo.min(*x), n_hi.max(*x))
        });
    n_max - n_min
}

/// Stack the channel traces with a per-row shift and invert the sign.
///
/// Steps: subtract each row's mean, add `row_index * spacing`, shift every
/// value by half the shortfall when the total range is below `min_range`,
/// negate.
pub fn derive_offset_matrix(
    matrix: &ChannelMatrix,
    options: &SpecOffsetOptions,
) -> Result<ChannelMatrix> {
    let mut arr_stacked = matrix.as_array().to_owned();
    if arr_stacked.ncols() == 0 {
        return ChannelMatrix::from_array(arr_stacked);
    }

    let n_cols = arr_stacked.ncols() as f64;
    for (n_row, mut row) in arr_stacked.axis_iter_mut(Axis(0)).enumerate() {
        let n_mean = row.sum() / n_cols;
        let n_shift = n_row as f64 * options.spacing - n_mean;
        row.mapv_inplace(|x| x + n_shift);
    }

    let n_range = calculate_range(&arr_stacked);
    if n_range < options.min_range {
        let n_shortfall_half = (options.min_range - n_range) / 2.0;
        arr_stacked.mapv_inplace(|x| x + n_shortfall_half);
    }

    ChannelMatrix::from_array(-arr_stacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::combine_split_halves;

    const N_TOL: f64 = 1e-9;

    fn derive_matrix(n_reps: usize, n_scale: f64) -> ChannelMatrix {
        let l_first: Vec<f64> = (0..8 * n_reps)
            .map(|n| ((n * 7) % 11) as f64 * n_scale - 40.0)
            .collect();
        let l_second: Vec<f64> = (0..8 * n_reps)
            .map(|n| ((n * 5) % 13) as f64 * n_scale - 35.0)
            .collect();
        combine_split_halves(l_first, l_second).expect("matrix")
    }

    fn derive_row_centered(values: &[f64]) -> Vec<f64> {
        let n_mean = values.iter().sum::<f64>() / values.len() as f64;
        values.iter().map(|x| x - n_mean).collect()
    }

    #[test]
    fn centered_rows_are_negated_input_shape() {
        let matrix = derive_matrix(4, 0.01);
        let offset = derive_offset_matrix(&matrix, &SpecOffsetOptions::default()).expect("offset");

        for n_row in 0..16 {
            let l_in = derive_row_centered(&matrix.row_by_index(n_row).expect("row").to_vec());
            let l_out = derive_row_centered(&offset.row_by_index(n_row).expect("row").to_vec());
            for (x_in, x_out) in l_in.iter().zip(&l_out) {
                assert!((x_out + x_in).abs() < N_TOL);
            }
        }
    }

    #[test]
    fn row_means_step_by_spacing() {
        let matrix = derive_matrix(3, 5.0);
        let options = SpecOffsetOptions {
            spacing: 0.25,
            min_range: 0.0,
        };
        let offset = derive_offset_matrix(&matrix, &options).expect("offset");
        let arr_means = offset.as_array().mean_axis(Axis(1)).expect("means");

        for n_row in 0..16 {
            assert!((arr_means[n_row] + n_row as f64 * 0.25).abs() < N_TOL);
        }
    }

    #[test]
    fn narrow_input_is_shifted_by_half_the_shortfall() {
        let matrix = derive_matrix(2, 0.001);
        let options = SpecOffsetOptions {
            spacing: 0.01,
            min_range: 1.0,
        };
        let offset = derive_offset_matrix(&matrix, &options).expect("offset");

        let unshifted = derive_offset_matrix(
            &matrix,
            &SpecOffsetOptions {
                min_range: 0.0,
                ..options
            },
        )
        .expect("offset");
        let n_range = calculate_range(unshifted.as_array());
        assert!(n_range < 1.0);

        let n_expected_shift = -(1.0 - n_range) / 2.0;
        for (x_out, x_ref) in offset.as_array().iter().zip(unshifted.as_array()) {
            assert!((x_out - x_ref - n_expected_shift).abs() < N_TOL);
        }
        assert!((calculate_range(offset.as_array()) - n_range).abs() < N_TOL);
    }

    #[test]
    fn wide_input_is_not_shifted() {
        let matrix = derive_matrix(2, 10.0);
        let options = SpecOffsetOptions::default();
        let offset = derive_offset_matrix(&matrix, &options).expect("offset");
        let unshifted = derive_offset_matrix(
            &matrix,
            &SpecOffsetOptions {
                min_range: f64::NEG_INFINITY,
                ..options
            },
        )
        .expect("offset");

        assert!(calculate_range(offset.as_array()) >= options.min_range);
        assert_eq!(offset, unshifted);
    }

    #[test]
    fn empty_matrix_passes_through() {
        let matrix = ChannelMatrix::from_array(Array2::zeros((16, 0))).expect("empty");
        let offset = derive_offset_matrix(&matrix, &SpecOffsetOptions::default()).expect("offset");
        assert_eq!(offset.n_samples(), 0);
    }
}
