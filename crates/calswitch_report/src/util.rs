//! Stateless helper utilities: cell addressing, rounding and run path layout.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::spec::{CalReportError, Result, SpecRunPaths};

////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Convert column letters (`A`, `AU`, ...) to a zero-based column index.
pub fn derive_col_index_from_letters(letters: &str) -> Result<usize> {
    if letters.is_empty() {
        return Err(CalReportError::InvalidArgument(
            "empty column letters".to_string(),
        ));
    }

    let mut n_col = 0usize;
    for chr in letters.chars() {
        if !chr.is_ascii_uppercase() {
            return Err(CalReportError::InvalidArgument(format!(
                "invalid column letters: {letters:?}"
            )));
        }
        n_col = n_col * 26 + (chr as usize - 'A' as usize + 1);
    }
    Ok(n_col - 1)
}

/// Convert a zero-based column index to column letters.
pub fn derive_letters_from_col_index(col_idx: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rem = col_idx + 1;
    while n_rem > 0 {
        let n_digit = (n_rem - 1) % 26;
        l_chars.push((b'A' + n_digit as u8) as char);
        n_rem = (n_rem - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Convert an Excel 1-based row number to a zero-based row index.
pub fn derive_row_index_from_excel(row_excel: usize) -> Result<usize> {
    row_excel
        .checked_sub(1)
        .ok_or_else(|| CalReportError::InvalidArgument("excel rows start at 1".to_string()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Numeric

/// Round half away from zero to `decimals` places.
pub fn round_to_decimals(x: f64, decimals: i32) -> f64 {
    let n_scale = 10f64.powi(decimals);
    (x * n_scale).round() / n_scale
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RunPaths

/// Validate a four-digit code (band or serial number).
pub fn validate_four_digits(value: &str, what: &str) -> Result<()> {
    if value.len() == 4 && value.chars().all(|chr| chr.is_ascii_digit()) {
        return Ok(());
    }
    Err(CalReportError::InvalidArgument(format!(
        "{what} must be 4 digits, got {value:?}"
    )))
}

/// Band display string used in report file names.
///
/// `0120` becomes `.1-20`, `1840` becomes `18-40`.
pub fn derive_band_display(band_code: &str) -> Result<String> {
    validate_four_digits(band_code, "band")?;
    let (c_low, c_high) = band_code.split_at(2);
    let c_low_display = match c_low.strip_prefix('0') {
        Some(c_rest) => format!(".{c_rest}"),
        None => c_low.to_string(),
    };
    Ok(format!("{c_low_display}-{c_high}"))
}

fn regex_band_dir() -> &'static Regex {
    static RE_BAND_DIR: OnceLock<Regex> = OnceLock::new();
    RE_BAND_DIR.get_or_init(|| {
        Regex::new(r"^SP16T-(\d{4})_").expect("band directory pattern is a valid regex")
    })
}

/// Extract the band code from a trace directory named `SP16T-<band>_...`.
pub fn derive_band_code_from_dir(dir: &Path) -> Result<String> {
    let c_name = dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    regex_band_dir()
        .captures(&c_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| CalReportError::InvalidBand(c_name))
}

/// Build every run location from the lab directory convention.
///
/// `dir_root/<client>/Data <year>/SP16T-<band>_Cal-E8361A` holds traces, its
/// `SP16T-<band>_Iso_Dynamic` child holds databases, and the report lands in
/// `Data <year>` as `SP16T <display>GHz SN<serial> <year>.xlsx`.
pub fn build_run_paths(
    dir_root: &Path,
    dir_templates: &Path,
    client: &str,
    year: u16,
    band_code: &str,
    serial: &str,
) -> Result<SpecRunPaths> {
    validate_four_digits(band_code, "band")?;
    validate_four_digits(serial, "serial number")?;
    if client.trim().is_empty() {
        return Err(CalReportError::InvalidArgument(
            "client must not be empty".to_string(),
        ));
    }

    let c_band_display = derive_band_display(band_code)?;
    let path_dir_year = dir_root.join(client.trim()).join(format!("Data {year}"));
    let dir_traces = path_dir_year.join(format!("SP16T-{band_code}_Cal-E8361A"));
    let dir_databases = dir_traces.join(format!("SP16T-{band_code}_Iso_Dynamic"));

    Ok(SpecRunPaths {
        band_code: band_code.to_string(),
        dir_traces,
        dir_databases,
        path_template: dir_templates.join(format!(
            "SP16T {c_band_display}GHz SN{serial} 20XX.xlsx"
        )),
        path_output: path_dir_year.join(format!(
            "SP16T {c_band_display}GHz SN{serial} {year}.xlsx"
        )),
    })
}

/// Return `path` or the first free `stem(1).ext`, `stem(2).ext`, ... sibling.
pub fn derive_unique_output_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let c_stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let c_ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut n_idx = 1usize;
    loop {
        let path_candidate = path.with_file_name(format!("{c_stem}({n_idx}){c_ext}"));
        if !path_candidate.exists() {
            return path_candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
