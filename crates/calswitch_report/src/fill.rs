//! Workbook orchestrator: fills every channel sheet of a loaded template.

use log::info;

use crate::conf::derive_default_report_formats;
use crate::matrix::{SpecDynamicMatrices, build_dynamic_matrices};
use crate::offset::derive_offset_matrix;
use crate::report::{ReportFill, ReportFillBuilder};
use crate::source::TableSource;
use crate::spec::{CalReportError, Channel, Result, SpecRunOptions, SpecRunPaths};
use crate::topology::resolve_band;
use crate::workbook::ReportWorkbook;
use crate::writer::{SpecReportLayout, SpecSheetWriteContext, write_channel_sheet};

/// Fill the 16 channel sheets of `workbook` and select the first one.
///
/// The workbook is consumed and handed back only on success, so a failed run
/// never exposes a half-filled report.
pub fn fill_channel_sheets(
    mut workbook: ReportWorkbook,
    paths: &SpecRunPaths,
    source: &dyn TableSource,
    options: &SpecRunOptions,
) -> Result<(ReportWorkbook, ReportFill)> {
    let l_sheet_names: Vec<(Channel, String)> = Channel::all()
        .map(|channel| (channel, channel.sheet_name(&options.sheet_prefix)))
        .collect();
    validate_channel_sheets(&workbook, &l_sheet_names)?;

    let profile = resolve_band(&paths.band_code)?;
    let layout = SpecReportLayout::from_conf(options.row_start_excel)?;
    let formats = derive_default_report_formats();

    info!(
        "Building dynamic series for band {} from {}",
        profile.code,
        paths.dir_databases.display()
    );
    let dynamic = build_dynamic_matrices(source, &paths.dir_databases, &profile)?;
    let dynamic_offset = SpecDynamicMatrices {
        primary: derive_offset_matrix(&dynamic.primary, &options.offset)?,
        secondary: derive_offset_matrix(&dynamic.secondary, &options.offset)?,
    };

    let ctx = SpecSheetWriteContext {
        dir_traces: &paths.dir_traces,
        dir_databases: &paths.dir_databases,
        profile: &profile,
        source,
        dynamic: &dynamic,
        dynamic_offset: &dynamic_offset,
        layout: &layout,
        fmt_decimal: &formats.decimal,
    };

    let mut builder = ReportFillBuilder::new(&profile.code, dynamic.primary.n_samples());
    for (channel, c_sheet_name) in &l_sheet_names {
        info!("Filling sheet {c_sheet_name}");
        let sheet = workbook.sheet_mut(c_sheet_name)?;
        let counts = write_channel_sheet(sheet, *channel, &ctx)?;
        builder.add_sheet(c_sheet_name, counts);
    }

    if let Some((_, c_first)) = l_sheet_names.first() {
        workbook.set_active(c_first)?;
    }

    let report = builder.build();
    info!("{report}");
    Ok((workbook, report))
}

fn validate_channel_sheets(
    workbook: &ReportWorkbook,
    l_sheet_names: &[(Channel, String)],
) -> Result<()> {
    for (_, c_sheet_name) in l_sheet_names {
        if workbook.sheet(c_sheet_name).is_none() {
            return Err(CalReportError::MissingSheet(c_sheet_name.clone()));
        }
    }
    Ok(())
}
