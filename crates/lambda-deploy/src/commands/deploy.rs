use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use common::lambda::{DeploymentResult, FunctionCodeProvider};
use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::info;

use crate::{
    archiver::{build_zip_archive, ArchiverError},
    config::{ProjectConfig, ProjectConfigError},
    deployment::{upload, DeploymentError},
};

/// `deploy` flow errors.
///
/// Messages embed the error of the failed stage, so no variant reports a
/// separate source.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployError {
    /// Projects file couldn't be loaded or doesn't describe the requested project.
    #[display(fmt = "configuration error: {}", _0)]
    Config(#[error(not(source))] ProjectConfigError),

    /// Archive couldn't be created.
    #[display(fmt = "archive error: {}", _0)]
    Archiver(#[error(not(source))] ArchiverError),

    /// Archive was created, but couldn't be read back.
    #[from(ignore)]
    #[display(fmt = "archive error: unable to read {}: {}", path, source)]
    ReadArchive {
        /// Archive location.
        path: String,

        /// Underlying IO error.
        #[error(not(source))]
        source: io::Error,
    },

    /// Code package upload failed.
    #[display(fmt = "deployment error: {}", _0)]
    Deployment(#[error(not(source))] DeploymentError),

    /// Deployment response couldn't be rendered.
    #[display(fmt = "report error: unable to render the deployment response: {}", _0)]
    Render(#[error(not(source))] serde_json::Error),

    /// Deployment response couldn't be written out.
    #[display(fmt = "report error: unable to print the deployment response: {}", _0)]
    Output(#[error(not(source))] io::Error),
}

/// Inputs of a single deployment run.
pub(crate) struct DeployOptions {
    /// Projects file location.
    pub config_file: PathBuf,

    /// Requested project name.
    pub project_name: String,

    /// Scratch archive directory. Defaults to the projects file directory.
    pub output_dir: Option<PathBuf>,

    /// Suppress the spinner and the printed response.
    pub silent: bool,
}

/// Deployment flow entrypoint.
///
/// Resolves the project, archives its sources into a scratch file, uploads the
/// archive and writes the pretty-printed provider response to `output`.
/// The scratch archive is deleted before returning, whatever the outcome.
pub(crate) async fn deploy<P, W>(
    DeployOptions {
        config_file,
        project_name,
        output_dir,
        silent,
    }: DeployOptions,
    provider: &P,
    output: &mut W,
) -> Result<DeploymentResult, DeployError>
where
    P: FunctionCodeProvider,
    W: Write,
{
    let progress = if silent {
        ProgressBar::hidden()
    } else {
        let progress = ProgressBar::new_spinner();
        progress.enable_steady_tick(Duration::from_millis(150));
        progress
    };

    progress.set_message("Reading configuration...");

    let project = ProjectConfig::resolve(&config_file, &project_name)?;

    info!(project = %project.name, "project resolved");

    let destination = output_dir.unwrap_or_else(|| config_directory(&config_file));

    progress.set_message("Archiving...");

    let archive = build_zip_archive(
        &project.archive.source_directory,
        &project.archive.file_name,
        &destination,
        &project.archive.ignore_files,
        &progress,
    )?;

    let payload = archive.read().map_err(|source| DeployError::ReadArchive {
        path: archive.path().display().to_string(),
        source,
    })?;

    info!(
        path = %archive.path().display(),
        bytes = payload.len(),
        "archive ready"
    );

    progress.set_message("Uploading...");

    let result = upload(
        provider,
        &project.deploy.function_identifier,
        payload,
        project.deploy.profile.as_deref(),
        project.deploy.region.as_deref(),
    )
    .await;

    progress.finish_and_clear();

    let result = result?;

    if !silent {
        serde_json::to_writer_pretty(&mut *output, &result)?;
        writeln!(output)?;
    }

    drop(archive);

    Ok(result)
}

/// Directory that holds the projects file.
fn config_directory(config_file: &Path) -> PathBuf {
    match config_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
        _ => PathBuf::from("."),
    }
}
