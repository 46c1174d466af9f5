/// Packaging and deployment flow.
mod deploy;

pub(crate) use deploy::{deploy, DeployOptions};

use std::path::PathBuf;

use clap::Parser;

/// CLI configuration.
#[derive(Parser)]
#[command(
    about = "Deploy project code to AWS Lambda using the values stored in the config file",
    version
)]
pub(crate) struct Cli {
    /// Name of the project stored in the config file.
    #[arg(short = 'P', long = "projectname")]
    pub project_name: String,

    /// Run without output.
    #[arg(short, long)]
    pub silent: bool,

    /// Projects config file path. Defaults to `config.json` next to the executable.
    #[arg(short, long)]
    pub config_file: Option<PathBuf>,

    /// Directory where the temporary archive is written.
    /// Defaults to the directory of the config file.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Tool settings file path.
    #[arg(long)]
    pub settings: Option<PathBuf>,
}
