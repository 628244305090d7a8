//! Loading code out of an archive by class name.
use std::path::{Path, PathBuf};

use phar_core::{Archive, AutoloadRule, Entry};
use tracing::debug;

use crate::{read_archive, Error};

/// An opened archive plus the rule mapping class names onto its entries
#[derive(Debug)]
pub struct Autoloader {
    path: PathBuf,
    archive: Archive,
    rule: AutoloadRule,
}

/// Open the archive at `path` so its entries can be loaded by class name.
///
/// Any failure to read or verify the archive is returned; whether that is
/// fatal is up to the caller.
pub fn map_phar(path: impl AsRef<Path>, rule: AutoloadRule) -> Result<Autoloader, Error> {
    let path = path.as_ref();
    let archive = read_archive(path)?;
    Ok(Autoloader {
        path: path.to_path_buf(),
        archive,
        rule,
    })
}

impl Autoloader {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn rule(&self) -> &AutoloadRule {
        &self.rule
    }

    /// Entry holding the code for class `name`
    pub fn resolve(&self, name: &str) -> Option<&Entry> {
        let path = self.rule.resolve(name)?;
        let entry = self.archive.get(&path).filter(|entry| !entry.is_dir());
        debug!(class = name, path = %path, found = entry.is_some(), "resolve");
        entry
    }

    /// Source of class `name`, or `None` if the rule does not apply or the
    /// archive has no such file
    pub fn load(&self, name: &str) -> Option<&[u8]> {
        self.resolve(name).map(Entry::data)
    }
}
