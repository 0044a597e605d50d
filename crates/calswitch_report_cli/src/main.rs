mod args;

use anyhow::{Context, Result, bail};
use calswitch_report::{
    MdbExportSource, ReportWorkbook, SpecMdbExportOptions, SpecOffsetOptions, SpecRunOptions,
    SpecRunPaths, build_run_paths, derive_band_code_from_dir, fill_channel_sheets, save_workbook,
};
use clap::Parser;
use log::info;

use crate::args::Args;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let paths = resolve_run_paths(&args)?;
    info!(
        "Band {}: traces {}, databases {}",
        paths.band_code,
        paths.dir_traces.display(),
        paths.dir_databases.display()
    );

    let options = SpecRunOptions {
        offset: SpecOffsetOptions {
            spacing: args.spacing,
            min_range: args.min_range,
        },
        ..Default::default()
    };
    let source = MdbExportSource::new(SpecMdbExportOptions {
        program: args.mdb_export.clone(),
    });

    let workbook = ReportWorkbook::load_template(&paths.path_template)
        .with_context(|| format!("loading template {}", paths.path_template.display()))?;
    let (workbook, report) = fill_channel_sheets(workbook, &paths, &source, &options)
        .context("filling channel sheets")?;
    let path_written = save_workbook(&workbook, &paths.path_output, args.on_conflict.into())
        .with_context(|| format!("saving {}", paths.path_output.display()))?;

    println!("{report}");
    println!("{}", path_written.display());
    Ok(())
}

fn resolve_run_paths(args: &Args) -> Result<SpecRunPaths> {
    if let Some(dir_root) = &args.root {
        let (Some(client), Some(year), Some(band), Some(sn), Some(dir_templates)) = (
            &args.client,
            args.year,
            &args.band,
            &args.sn,
            &args.template_dir,
        ) else {
            bail!("--root needs --client, --year, --band, --sn and --template-dir");
        };
        return Ok(build_run_paths(
            dir_root,
            dir_templates,
            client,
            year,
            band,
            sn,
        )?);
    }

    let (Some(path_template), Some(dir_traces), Some(dir_databases), Some(path_output)) = (
        &args.template,
        &args.trace_dir,
        &args.db_dir,
        &args.output,
    ) else {
        bail!("either --root or all of --template, --trace-dir, --db-dir and --output are required");
    };

    let band_code = match &args.band {
        Some(band) => band.clone(),
        None => derive_band_code_from_dir(dir_traces).with_context(|| {
            format!("no --band given and none found in {}", dir_traces.display())
        })?,
    };

    Ok(SpecRunPaths {
        band_code,
        dir_traces: dir_traces.clone(),
        dir_databases: dir_databases.clone(),
        path_template: path_template.clone(),
        path_output: path_output.clone(),
    })
}
