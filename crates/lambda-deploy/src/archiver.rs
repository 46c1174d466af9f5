use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Errors that may occur during the archive creation process.
///
/// Every message names the path that caused the failure and embeds the
/// underlying error, so none of the variants report a separate source.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ArchiverError {
    /// [`walkdir`]-crate specific error, which carries the failing path itself.
    WalkDir(#[error(not(source))] walkdir::Error),

    /// One of the provided paths is not an existing directory.
    #[from(ignore)]
    #[display(fmt = "the provided {} {} is not a valid directory", role, path)]
    NotADirectory {
        /// Which of the inputs failed the check.
        role: &'static str,

        /// Offending path.
        path: String,
    },

    /// Archive file couldn't be created in the destination directory.
    #[from(ignore)]
    #[display(fmt = "unable to create archive {}: {}", path, source)]
    CreateArchive {
        /// Archive location.
        path: String,

        /// Underlying IO error.
        #[error(not(source))]
        source: io::Error,
    },

    /// Archive contents couldn't be written.
    #[from(ignore)]
    #[display(fmt = "unable to write archive {}: {}", path, source)]
    WriteArchive {
        /// Archive location.
        path: String,

        /// [`zip`]-crate specific error.
        #[error(not(source))]
        source: zip::result::ZipError,
    },

    /// Source file couldn't be read into the archive.
    #[from(ignore)]
    #[display(fmt = "unable to add {} to the archive: {}", path, source)]
    ReadSource {
        /// Source file location.
        path: String,

        /// Underlying IO error.
        #[error(not(source))]
        source: io::Error,
    },
}

/// Archive file that only lives for the duration of a single run.
///
/// The file is removed from disk when the value is dropped, so every exit path
/// after the archive was created cleans it up.
#[derive(Debug)]
pub(crate) struct ScratchArchive {
    /// Archive location.
    path: PathBuf,
}

impl ScratchArchive {
    /// Take ownership of an already created file at `path`.
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Archive location.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole archive into memory.
    pub(crate) fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

impl Drop for ScratchArchive {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch archive removed"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                path = %self.path.display(),
                %error,
                "unable to remove scratch archive"
            ),
        }
    }
}

/// Archive every file under `source_directory` into `destination_directory/file_name`.
///
/// Entry names are flattened to the file's base name, directory structure is
/// discarded. Files whose base name is in `ignore_files` are skipped at any depth.
///
/// Two files with the same base name in different subdirectories map to the same
/// entry. The walk visits entries sorted by file name, and the file visited last
/// wins, so `b/x.txt` replaces `a/x.txt`. Each replacement is logged as a warning.
///
/// A partially written archive is removed if this function fails.
pub(crate) fn build_zip_archive(
    source_directory: &Path,
    file_name: &str,
    destination_directory: &Path,
    ignore_files: &BTreeSet<String>,
    progress: &ProgressBar,
) -> Result<ScratchArchive, ArchiverError> {
    ensure_directory(source_directory, "source directory")?;
    ensure_directory(destination_directory, "destination directory")?;

    let path = destination_directory.join(file_name);

    let create_error = |source| ArchiverError::CreateArchive {
        path: path.display().to_string(),
        source,
    };

    // The walk runs before the archive exists, so a failing walk leaves nothing behind.
    let canonical_path = fs::canonicalize(destination_directory)
        .map_err(create_error)?
        .join(file_name);

    let entries = collect_entries(source_directory, ignore_files, &canonical_path)?;

    let file = File::create(&path).map_err(create_error)?;

    // Declared after the guard, so the handle is closed before the file gets removed.
    let archive = ScratchArchive::new(path);
    let mut writer = ZipWriter::new(file);

    let write_error = |source| ArchiverError::WriteArchive {
        path: archive.path().display().to_string(),
        source,
    };

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, source_path) in &entries {
        progress.set_message(format!("Archiving {name}..."));

        writer.start_file(name.as_str(), options).map_err(write_error)?;

        File::open(source_path)
            .and_then(|mut source_file| io::copy(&mut source_file, &mut writer))
            .map_err(|source| ArchiverError::ReadSource {
                path: source_path.display().to_string(),
                source,
            })?;
    }

    writer.finish().map_err(write_error)?;

    debug!(
        path = %archive.path().display(),
        entries = entries.len(),
        "archive created"
    );

    Ok(archive)
}

/// Fail with [`ArchiverError::NotADirectory`] unless `path` is an existing directory.
fn ensure_directory(path: &Path, role: &'static str) -> Result<(), ArchiverError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ArchiverError::NotADirectory {
            role,
            path: path.display().to_string(),
        })
    }
}

/// Map flattened entry names onto the files that provide their contents.
///
/// `archive_path` is the canonical location of the archive being built, which is
/// never packaged into itself.
fn collect_entries(
    source_directory: &Path,
    ignore_files: &BTreeSet<String>,
    archive_path: &Path,
) -> Result<BTreeMap<String, PathBuf>, ArchiverError> {
    let mut entries = BTreeMap::new();

    for entry in walk_source_directory(source_directory) {
        let entry = entry?;

        if !is_file(&entry) {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "skipping file with non-unicode name");
            continue;
        };

        if ignore_files.contains(name) {
            debug!(path = %entry.path().display(), "ignoring file");
            continue;
        }

        // The archive may be written inside the tree it packages.
        if Some(entry.file_name()) == archive_path.file_name()
            && fs::canonicalize(entry.path()).map_err(|source| ArchiverError::ReadSource {
                path: entry.path().display().to_string(),
                source,
            })? == archive_path
        {
            continue;
        }

        if let Some(replaced) = entries.insert(name.to_owned(), entry.path().to_owned()) {
            warn!(
                name,
                replaced = %replaced.display(),
                by = %entry.path().display(),
                "duplicate file name in flattened archive"
            );
        }
    }

    Ok(entries)
}

/// Recursively iterate over the source tree in a stable order.
///
/// Entries of every directory are yielded sorted by file name.
fn walk_source_directory(dir: &Path) -> impl Iterator<Item = Result<DirEntry, walkdir::Error>> {
    WalkDir::new(dir).sort_by_file_name().into_iter()
}

/// Regular files, including symbolic links that point at one.
fn is_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}
