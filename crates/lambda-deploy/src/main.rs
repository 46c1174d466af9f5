//! # Lambda code deployer
//!
//! Packages a local source tree into a zip archive and uploads it as the code
//! package of an AWS Lambda function.
//!
//! Projects are described in a JSON config file, which by default sits next to
//! the executable. Every project names a source directory, an archive file name
//! and the target function. See [`config`] for the file format.
//!
//! # Archive layout
//!
//! The archive is flat: every file found under the source directory is stored
//! under its base name, regardless of its depth. Files with equal base names
//! overwrite each other, see [`archiver`] for the exact rules.
//!
//! # Scratch files
//!
//! The archive is written next to the config file (or into `--output-dir`),
//! uploaded and removed again. It never outlives a single run.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::io;

use clap::Parser;
use commands::{Cli, DeployOptions};
use common::{config::Config, lambda::AwsLambdaProvider, logging};

/// Source tree archiving utilities.
mod archiver;

/// CLI definition and the deployment flow.
mod commands;

/// Projects config file parsing and project lookup.
mod config;

/// Function code upload client.
mod deployment;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let settings = Config::new(cli.settings)?;

    logging::init(&settings);

    let config_file = match cli.config_file {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    commands::deploy(
        DeployOptions {
            config_file,
            project_name: cli.project_name,
            output_dir: cli.output_dir.or(settings.workdir),
            silent: cli.silent,
        },
        &AwsLambdaProvider,
        &mut io::stdout().lock(),
    )
    .await?;

    Ok(())
}
