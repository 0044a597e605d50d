//! In-memory report workbook: template loading, cell access and XLSX output.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{
    CalReportError, EnumCellValue, EnumOutputConflictStrategy, Result, SpecCellFormat,
};
use crate::util::{derive_letters_from_col_index, derive_unique_output_path};

////////////////////////////////////////////////////////////////////////////////
// #region Models

/// One stored cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCell {
    /// Cell value.
    pub value: EnumCellValue,
    /// Optional cell format.
    pub format: Option<SpecCellFormat>,
}

/// Sparse worksheet keyed by zero-based `(row, col)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportSheet {
    name: String,
    dict_cells: BTreeMap<(usize, usize), SpecCell>,
}

impl ReportSheet {
    /// Create an empty sheet.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dict_cells: BTreeMap::new(),
        }
    }

    /// Sheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `value` at `(row_idx, col_idx)`, replacing any previous cell.
    pub fn write_cell(
        &mut self,
        row_idx: usize,
        col_idx: usize,
        value: EnumCellValue,
        format: Option<&SpecCellFormat>,
    ) -> Result<()> {
        validate_cell_position(row_idx, col_idx)?;
        self.dict_cells.insert(
            (row_idx, col_idx),
            SpecCell {
                value,
                format: format.cloned(),
            },
        );
        Ok(())
    }

    /// Store a formatted number.
    pub fn write_number(
        &mut self,
        row_idx: usize,
        col_idx: usize,
        value: f64,
        format: &SpecCellFormat,
    ) -> Result<()> {
        self.write_cell(row_idx, col_idx, EnumCellValue::Number(value), Some(format))
    }

    /// Cell at `(row_idx, col_idx)`.
    pub fn cell(&self, row_idx: usize, col_idx: usize) -> Option<&SpecCell> {
        self.dict_cells.get(&(row_idx, col_idx))
    }

    /// Numeric value at `(row_idx, col_idx)`, if the cell holds a number.
    pub fn number(&self, row_idx: usize, col_idx: usize) -> Option<f64> {
        match self.cell(row_idx, col_idx)?.value {
            EnumCellValue::Number(value) => Some(value),
            _ => None,
        }
    }

    /// Number of stored cells.
    pub fn n_cells(&self) -> usize {
        self.dict_cells.len()
    }

    /// Stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&(usize, usize), &SpecCell)> {
        self.dict_cells.iter()
    }
}

/// Ordered set of sheets plus the active sheet selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportWorkbook {
    l_sheets: Vec<ReportSheet>,
    n_idx_active: usize,
}

impl ReportWorkbook {
    /// Create a workbook without sheets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty sheet. Duplicate names are rejected.
    pub fn add_sheet(&mut self, name: &str) -> Result<&mut ReportSheet> {
        if self.sheet(name).is_some() {
            return Err(CalReportError::InvalidArgument(format!(
                "duplicate sheet name: {name:?}"
            )));
        }
        self.l_sheets.push(ReportSheet::new(name));
        let n_last = self.l_sheets.len() - 1;
        Ok(&mut self.l_sheets[n_last])
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.l_sheets.iter().map(ReportSheet::name).collect()
    }

    /// Sheet by name.
    pub fn sheet(&self, name: &str) -> Option<&ReportSheet> {
        self.l_sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Mutable sheet by name; fails with `MissingSheet`.
    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut ReportSheet> {
        self.l_sheets
            .iter_mut()
            .find(|sheet| sheet.name == name)
            .ok_or_else(|| CalReportError::MissingSheet(name.to_string()))
    }

    /// Select the sheet shown when the file is opened.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        self.n_idx_active = self
            .l_sheets
            .iter()
            .position(|sheet| sheet.name == name)
            .ok_or_else(|| CalReportError::MissingSheet(name.to_string()))?;
        Ok(())
    }

    /// Name of the active sheet.
    pub fn active_sheet_name(&self) -> Option<&str> {
        self.l_sheets.get(self.n_idx_active).map(ReportSheet::name)
    }

    /// Load sheet names, cell values and formulas of an existing workbook.
    ///
    /// Formula cells keep their formula text instead of the cached result.
    /// Dates are kept as serial numbers; cell styles and charts are not
    /// carried over.
    pub fn load_template(path_template: &Path) -> Result<Self> {
        if !path_template.is_file() {
            return Err(CalReportError::MissingFile(path_template.to_path_buf()));
        }

        let mut wb_src = open_workbook_auto(path_template)?;
        let mut workbook = Self::new();
        for c_sheet_name in wb_src.sheet_names() {
            let range = wb_src.worksheet_range(&c_sheet_name)?;
            let range_formula = wb_src.worksheet_formula(&c_sheet_name)?;
            let sheet = workbook.add_sheet(&c_sheet_name)?;

            let (n_row_start, n_col_start) = range.start().unwrap_or((0, 0));
            for (n_row, n_col, data) in range.used_cells() {
                let value = derive_cell_value_from_data(data);
                if matches!(value, EnumCellValue::None) {
                    continue;
                }
                sheet.write_cell(
                    n_row_start as usize + n_row,
                    n_col_start as usize + n_col,
                    value,
                    None,
                )?;
            }

            // Formulas replace the cached results read above.
            let (n_row_start, n_col_start) = range_formula.start().unwrap_or((0, 0));
            for (n_row, n_col, c_formula) in range_formula.used_cells() {
                let c_formula = c_formula.trim().trim_start_matches('=');
                if c_formula.is_empty() {
                    continue;
                }
                sheet.write_cell(
                    n_row_start as usize + n_row,
                    n_col_start as usize + n_col,
                    EnumCellValue::Formula(c_formula.to_string()),
                    None,
                )?;
            }
        }

        info!(
            "Loaded template {} ({} sheets)",
            path_template.display(),
            workbook.l_sheets.len()
        );
        Ok(workbook)
    }

    /// Write the workbook to `path_file_out`, replacing any existing file.
    pub fn save(&self, path_file_out: &Path) -> Result<()> {
        let mut wb_out = Workbook::new();
        let mut dict_formats: HashMap<SpecCellFormat, Format> = HashMap::new();

        for (n_idx_sheet, sheet) in self.l_sheets.iter().enumerate() {
            let worksheet = wb_out.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            if n_idx_sheet == self.n_idx_active {
                worksheet.set_active(true);
            }

            for ((row_idx, col_idx), cell) in &sheet.dict_cells {
                let format = cell.format.as_ref().map(|spec| {
                    dict_formats
                        .entry(spec.clone())
                        .or_insert_with(|| derive_rust_xlsx_format(spec))
                        .clone()
                });
                write_cell_with_format(worksheet, *row_idx, *col_idx, &cell.value, format.as_ref())?;
            }
        }

        wb_out.save(path_file_out)?;
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Persistence

/// Save `workbook` under `path_output`, resolving an existing file per `rule_conflict`.
///
/// Returns the path actually written.
pub fn save_workbook(
    workbook: &ReportWorkbook,
    path_output: &Path,
    rule_conflict: EnumOutputConflictStrategy,
) -> Result<PathBuf> {
    let path_target = if path_output.exists() {
        match rule_conflict {
            EnumOutputConflictStrategy::Overwrite => {
                warn!("Overwriting existing file {}", path_output.display());
                path_output.to_path_buf()
            }
            EnumOutputConflictStrategy::Rename => {
                let path_unique = derive_unique_output_path(path_output);
                warn!(
                    "{} already exists, saving as {}",
                    path_output.display(),
                    path_unique.display()
                );
                path_unique
            }
            EnumOutputConflictStrategy::Error => {
                return Err(CalReportError::OutputExists(path_output.to_path_buf()));
            }
        }
    } else {
        path_output.to_path_buf()
    };

    if let Some(path_parent) = path_target.parent()
        && !path_parent.as_os_str().is_empty()
    {
        fs::create_dir_all(path_parent).map_err(|source| CalReportError::Io {
            path: path_parent.to_path_buf(),
            source,
        })?;
    }

    workbook.save(&path_target)?;
    info!("Saved workbook to {}", path_target.display());
    Ok(path_target)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region XlsxHelpers

fn validate_cell_position(row_idx: usize, col_idx: usize) -> Result<()> {
    if row_idx >= N_NROWS_EXCEL_MAX {
        return Err(CalReportError::InvalidArgument(format!(
            "row index overflow: {row_idx}"
        )));
    }
    if col_idx >= N_NCOLS_EXCEL_MAX {
        return Err(CalReportError::InvalidArgument(format!(
            "column index overflow: {col_idx} ({})",
            derive_letters_from_col_index(col_idx)
        )));
    }
    Ok(())
}

fn derive_cell_value_from_data(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::None,
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Bool(val) => EnumCellValue::Bool(*val),
        Data::DateTime(val) => EnumCellValue::Number(val.as_f64()),
        other => EnumCellValue::String(other.to_string()),
    }
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: Option<&Format>,
) -> Result<()> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match (value, format) {
        (EnumCellValue::None, Some(format)) => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        (EnumCellValue::None, None) => {}
        (EnumCellValue::String(val), Some(format)) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        (EnumCellValue::String(val), None) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        (EnumCellValue::Number(val), Some(format)) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        (EnumCellValue::Number(val), None) => {
            worksheet.write_number(n_row, n_col, *val)?;
        }
        (EnumCellValue::Bool(val), Some(format)) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?;
        }
        (EnumCellValue::Bool(val), None) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
        (EnumCellValue::Formula(val), Some(format)) => {
            worksheet.write_formula_with_format(n_row, n_col, val.as_str(), format)?;
        }
        (EnumCellValue::Formula(val), None) => {
            worksheet.write_formula(n_row, n_col, val.as_str())?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }

    format
}

fn cast_row_num(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| CalReportError::InvalidArgument(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| CalReportError::InvalidArgument(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
