//! Copy primitives: a single file, or a whole directory tree, to a
//! destination whose parent directories are created as needed.

use log::debug;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copies `src` to `dst`. If `src` is a directory, its contents are copied
/// recursively into `dst`. Returns the number of files copied.
pub fn copy(src: &Path, dst: &Path) -> Result<usize> {
    if src.is_dir() {
        copy_dir(src, dst)
    } else {
        copy_file(src, dst)?;
        Ok(1)
    }
}

/// Copies the file `src` to `dst`, creating `dst`'s parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(dir) = dst.parent() {
        std::fs::create_dir_all(dir).map_err(|err| Error::CreateDir {
            path: dir.to_owned(),
            err,
        })?;
    }
    std::fs::copy(src, dst).map_err(|err| Error::Copy {
        src: src.to_owned(),
        dst: dst.to_owned(),
        err,
    })?;
    debug!("Copied `{}` to `{}`", src.display(), dst.display());
    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for result in WalkDir::new(src).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result.map_err(|err| Error::Copy {
            src: src.to_owned(),
            dst: dst.to_owned(),
            err: err.into(),
        })?;
        if entry.file_type().is_file() {
            // strip_prefix can't fail; every entry lives under `src`
            let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
            copy_file(entry.path(), &dst.join(relative))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// The result of a fallible copy operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed copy.
#[derive(Debug)]
pub enum Error {
    /// Returned when a destination directory can't be created.
    CreateDir { path: PathBuf, err: io::Error },

    /// Returned when the source can't be read or the destination can't be
    /// written.
    Copy {
        src: PathBuf,
        dst: PathBuf,
        err: io::Error,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::CreateDir { path, err } => {
                write!(f, "creating directory `{}`: {}", path.display(), err)
            }
            Error::Copy { src, dst, err } => write!(
                f,
                "copying `{}` to `{}`: {}",
                src.display(),
                dst.display(),
                err
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::CreateDir { path: _, err } => Some(err),
            Error::Copy { err, .. } => Some(err),
        }
    }
}
