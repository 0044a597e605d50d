use std::path::PathBuf;

use calswitch_report::{
    EnumOutputConflictStrategy, N_OFFSET_MIN_RANGE_DEFAULT, N_OFFSET_SPACING_DEFAULT,
};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Fill an SP16T calibration workbook from trace files and measurement databases",
    long_about = None,
    arg_required_else_help = true,
    after_help = "Examples:\n  calswitch-report --root \"E:\\Cal Info Mesure\" --client ACME --year 2024 --band 0120 --sn 1234 --template-dir templates\n  calswitch-report --template t.xlsx --trace-dir data/SP16T-1840_Cal-E8361A --db-dir data/SP16T-1840_Cal-E8361A/SP16T-1840_Iso_Dynamic --output out.xlsx\n"
)]
pub struct Args {
    /// Root of the lab data tree (`<root>/<client>/Data <year>/...`)
    #[arg(long, requires_all = ["client", "year", "band", "sn", "template_dir"])]
    pub root: Option<PathBuf>,

    /// Client directory name under the root
    #[arg(long)]
    pub client: Option<String>,

    /// Measurement year
    #[arg(long)]
    pub year: Option<u16>,

    /// Four-digit band code (0120 or 1840); derived from --trace-dir when omitted
    #[arg(long)]
    pub band: Option<String>,

    /// Four-digit serial number
    #[arg(long)]
    pub sn: Option<String>,

    /// Directory holding `SP16T <band>GHz SN<sn> 20XX.xlsx` templates
    #[arg(long)]
    pub template_dir: Option<PathBuf>,

    /// Explicit template workbook
    #[arg(long, conflicts_with = "root", requires_all = ["trace_dir", "db_dir", "output"])]
    pub template: Option<PathBuf>,

    /// Explicit trace base directory (`Ch<X>/<X>_<tag>.prn`)
    #[arg(long, conflicts_with = "root")]
    pub trace_dir: Option<PathBuf>,

    /// Explicit database container directory
    #[arg(long, conflicts_with = "root")]
    pub db_dir: Option<PathBuf>,

    /// Explicit output workbook
    #[arg(long, conflicts_with = "root")]
    pub output: Option<PathBuf>,

    /// Table export program
    #[arg(long, default_value = "mdb-export")]
    pub mdb_export: String,

    /// Per-channel spacing of the offset series
    #[arg(long, allow_hyphen_values = true, default_value_t = N_OFFSET_SPACING_DEFAULT)]
    pub spacing: f64,

    /// Minimum spread of the offset series
    #[arg(long, default_value_t = N_OFFSET_MIN_RANGE_DEFAULT)]
    pub min_range: f64,

    /// Policy when the output workbook already exists
    #[arg(long, value_enum, default_value_t = ArgConflict::Rename)]
    pub on_conflict: ArgConflict,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgConflict {
    Overwrite,
    Rename,
    Error,
}

impl From<ArgConflict> for EnumOutputConflictStrategy {
    fn from(value: ArgConflict) -> Self {
        match value {
            ArgConflict::Overwrite => EnumOutputConflictStrategy::Overwrite,
            ArgConflict::Rename => EnumOutputConflictStrategy::Rename,
            ArgConflict::Error => EnumOutputConflictStrategy::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lab_layout_flags() {
        let args = Args::try_parse_from([
            "calswitch-report",
            "--root",
            "/data",
            "--client",
            "ACME",
            "--year",
            "2024",
            "--band",
            "0120",
            "--sn",
            "0042",
            "--template-dir",
            "/tpl",
        ])
        .expect("args");
        assert_eq!(args.year, Some(2024));
        assert_eq!(args.on_conflict, ArgConflict::Rename);
        assert_eq!(args.spacing, N_OFFSET_SPACING_DEFAULT);
    }

    #[test]
    fn explicit_paths_conflict_with_root() {
        assert!(
            Args::try_parse_from([
                "calswitch-report",
                "--root",
                "/data",
                "--template",
                "t.xlsx",
            ])
            .is_err()
        );
    }

    #[test]
    fn root_requires_run_identity() {
        assert!(Args::try_parse_from(["calswitch-report", "--root", "/data"]).is_err());
    }
}
