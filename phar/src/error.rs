use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use phar_core::Compression;

/// How callers are expected to react to an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedMode,
    Serialization,
    CorruptArchive,
    NotFound,
    Io,
}

#[derive(thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] phar_core::Error),

    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("{context}{}", display_path(path))]
    Io {
        context: &'static str,
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    #[error("{mode} codec failed")]
    Codec {
        mode: Compression,
        #[source]
        source: io::Error,
    },

    #[error("Invalid build config")]
    Config(#[from] toml::de::Error),

    #[error("Manifest dump failed")]
    Dump(#[from] toml::ser::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Core(err) => match err.kind() {
                phar_core::ErrorKind::UnsupportedMode => ErrorKind::UnsupportedMode,
                phar_core::ErrorKind::Serialization => ErrorKind::Serialization,
                phar_core::ErrorKind::CorruptArchive => ErrorKind::CorruptArchive,
            },
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Io { .. } | Error::Config(_) => ErrorKind::Io,
            Error::Codec { .. } => ErrorKind::CorruptArchive,
            Error::Dump(_) => ErrorKind::Serialization,
        }
    }

    /// Build a `map_err` closure that wraps an [`io::Error`] with context.
    /// A missing file becomes [`Error::NotFound`].
    pub(crate) fn io(context: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Error {
        let path = path.to_path_buf();
        move |source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::NotFound { path }
            } else {
                Error::Io {
                    context,
                    path: Some(path),
                    source,
                }
            }
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(": {}", path.display()),
        None => String::new(),
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;

        let mut source = self.source();
        while let Some(err) = source {
            writeln!(f, "\tCaused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}
