use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use phar_core::Archive;
use tracing::{debug, info};

use crate::{Error, StdCodec};

/// Read and fully decode the archive at `path`
pub fn read_archive(path: impl AsRef<Path>) -> Result<Archive, Error> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(Error::io("Read archive", path))?;
    let archive = Archive::deserialize(&bytes, &StdCodec)?;
    info!(
        path = %path.display(),
        entries = archive.len(),
        compression = %archive.compression(),
        "read archive"
    );
    Ok(archive)
}

/// Serialize `archive` to `path`, replacing any existing file
pub fn write_archive(archive: &Archive, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let bytes = archive.serialize(&StdCodec)?;
    fs::write(path, &bytes).map_err(Error::io("Write archive", path))?;
    info!(
        path = %path.display(),
        entries = archive.len(),
        bytes = bytes.len(),
        "wrote archive"
    );
    Ok(())
}

/// Write every entry of `archive` below `base_dir`, restoring permissions.
pub fn extract_archive(archive: &Archive, base_dir: impl AsRef<Path>) -> Result<(), Error> {
    let base_dir = base_dir.as_ref();
    fs::create_dir_all(base_dir).map_err(Error::io("Create base directory", base_dir))?;

    // Directory permissions are applied last so read-only directories can
    // still be filled
    let mut dirs = Vec::new();
    for entry in archive.list() {
        let target = base_dir.join(entry.path());
        debug!(path = entry.path(), "extracting");
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(Error::io("Create directory", &target))?;
            dirs.push((target, entry.permissions));
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(Error::io("Create directory", parent))?;
        }
        fs::write(&target, entry.data()).map_err(Error::io("Write file", &target))?;
        fs::set_permissions(&target, fs::Permissions::from_mode(entry.permissions))
            .map_err(Error::io("Set permissions", &target))?;
    }

    for (dir, permissions) in dirs.into_iter().rev() {
        fs::set_permissions(&dir, fs::Permissions::from_mode(permissions))
            .map_err(Error::io("Set permissions", &dir))?;
    }
    info!(base = %base_dir.display(), entries = archive.len(), "extracted archive");
    Ok(())
}
