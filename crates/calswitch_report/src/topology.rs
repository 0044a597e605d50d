//! Band lookup and dynamic-series container planning.

use crate::conf::TUP_BAND_PROFILES;
use crate::spec::{
    CalReportError, EnumBandTopology, Result, SpecBandProfile, SpecDynamicSourcePair,
    SpecDynamicSourcePlan,
};
use crate::util::validate_four_digits;

/// Resolve a band code through [`TUP_BAND_PROFILES`].
///
/// Unknown codes fail instead of falling back to a default topology. Whether a
/// profile matches the file layout actually present on disk is not checked.
pub fn resolve_band(band_code: &str) -> Result<SpecBandProfile> {
    validate_four_digits(band_code, "band")
        .map_err(|_| CalReportError::InvalidBand(band_code.to_string()))?;

    TUP_BAND_PROFILES
        .iter()
        .find(|entry| entry.code == band_code)
        .map(|entry| SpecBandProfile {
            code: entry.code.to_string(),
            topology: entry.topology,
            raster_prefix: entry.raster_prefix.to_string(),
            dynamic_label: entry.dynamic_label.to_string(),
        })
        .ok_or_else(|| CalReportError::InvalidBand(band_code.to_string()))
}

/// List the four dynamic containers of `profile` with their roles.
///
/// Container index `_0` feeds the primary series, `_1` the secondary one.
pub fn plan_dynamic_sources(profile: &SpecBandProfile) -> SpecDynamicSourcePlan {
    let (c_first, c_second) = match profile.topology {
        EnumBandTopology::InterleavedEvenOdd => ("Even", "Odd"),
        EnumBandTopology::SplitHalfRanges => ("1to8", "9toF"),
    };

    let derive_pair = |n_file_idx: u8| SpecDynamicSourcePair {
        file_first: format!(
            "SP16TDynamic_{}_{c_first}_{n_file_idx}.MDB",
            profile.dynamic_label
        ),
        file_second: format!(
            "SP16TDynamic_{}_{c_second}_{n_file_idx}.MDB",
            profile.dynamic_label
        ),
    };

    SpecDynamicSourcePlan {
        topology: profile.topology,
        primary: derive_pair(0),
        secondary: derive_pair(1),
    }
}

/// Interleave two equal-length sequences: `out[2i] = even[i]`, `out[2i+1] = odd[i]`.
pub fn interleave_even_odd(even: &[f64], odd: &[f64]) -> Result<Vec<f64>> {
    if even.len() != odd.len() {
        return Err(CalReportError::ShapeMismatch(format!(
            "even/odd sequences differ in length: {} vs {}",
            even.len(),
            odd.len()
        )));
    }

    Ok(even
        .iter()
        .zip(odd)
        .flat_map(|(x_even, x_odd)| [*x_even, *x_odd])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{EnumSeries, EnumSeriesPart};

    #[test]
    fn known_bands_resolve_to_their_topology() {
        let profile = resolve_band("1840").expect("1840");
        assert_eq!(profile.topology, EnumBandTopology::InterleavedEvenOdd);
        assert_eq!(profile.raster_prefix, "1840");

        let profile = resolve_band("0120").expect("0120");
        assert_eq!(profile.topology, EnumBandTopology::SplitHalfRanges);
        assert_eq!(profile.raster_prefix, "218");
    }

    #[test]
    fn unknown_band_fails_immediately() {
        for code in ["0618", "abcd", "12", ""] {
            assert!(matches!(
                resolve_band(code),
                Err(CalReportError::InvalidBand(_))
            ));
        }
    }

    #[test]
    fn plan_names_containers_by_topology() {
        let plan = plan_dynamic_sources(&resolve_band("0120").expect("band"));
        assert_eq!(
            plan.file_name(EnumSeries::Primary, EnumSeriesPart::First),
            "SP16TDynamic_5GHz_1to8_0.MDB"
        );
        assert_eq!(
            plan.file_name(EnumSeries::Secondary, EnumSeriesPart::Second),
            "SP16TDynamic_5GHz_9toF_1.MDB"
        );

        let plan = plan_dynamic_sources(&resolve_band("1840").expect("band"));
        assert_eq!(
            plan.file_name(EnumSeries::Primary, EnumSeriesPart::Second),
            "SP16TDynamic_20GHz_Odd_0.MDB"
        );
        assert_eq!(
            plan.file_name(EnumSeries::Secondary, EnumSeriesPart::First),
            "SP16TDynamic_20GHz_Even_1.MDB"
        );
    }

    #[test]
    fn interleave_places_even_then_odd() {
        let l_even = [0.0, 2.0, 4.0];
        let l_odd = [1.0, 3.0, 5.0];
        let l_unified = interleave_even_odd(&l_even, &l_odd).expect("interleave");

        for n_idx in 0..l_even.len() {
            assert_eq!(l_unified[2 * n_idx], l_even[n_idx]);
            assert_eq!(l_unified[2 * n_idx + 1], l_odd[n_idx]);
        }
        assert!(interleave_even_odd(&[1.0], &[]).is_err());
    }
}
