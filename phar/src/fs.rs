//! Filesystem access used when building archives from directories.
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::UNIX_EPOCH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    /// Sockets, fifos, devices and anything else that cannot be archived
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Permission bits, masked with `0o777`
    pub permissions: u32,
    /// Modification time in seconds since the Unix epoch
    pub modified: u32,
}

/// Source of files for [`PharBuilder`](crate::PharBuilder)
pub trait SourceFs {
    fn node(&self, path: &Path) -> io::Result<Node>;

    /// Names of the children of the directory at `path`, in any order
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`SourceFs`] over `std::fs`. Symlinks are followed.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdFs;

impl SourceFs for StdFs {
    fn node(&self, path: &Path) -> io::Result<Node> {
        let metadata = fs::metadata(path)?;
        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            NodeKind::Directory
        } else if file_type.is_file() {
            NodeKind::File
        } else {
            NodeKind::Other
        };
        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|since| u32::try_from(since.as_secs()).unwrap_or(u32::MAX))
            .unwrap_or(0);

        Ok(Node {
            kind,
            permissions: metadata.permissions().mode() & 0o777,
            modified,
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}
