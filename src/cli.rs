use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "license-attribution",
    about = "Resolve third-party license attributions for files shipped in a build",
    version
)]
pub struct Cli {
    /// Project path (build root or any directory inside it)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Config file [default: ./.license-attribution/config.toml, fallback ~/.config/license-attribution/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON object mapping group names to lists of file paths; reads paths from stdin when omitted
    #[arg(long, value_name = "FILE")]
    pub refs: Option<PathBuf>,

    /// Group that paths read from stdin belong to
    #[arg(long, default_value = "main", value_name = "NAME")]
    pub group: String,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Write the text report here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write one `<group>.licenses.txt` per group into the --output directory
    #[arg(long, requires = "output")]
    pub per_group: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
    Text,
}
