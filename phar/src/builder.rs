use std::io::Write;
use std::path::Path;

use phar_core::{stub, Archive, Compression, Entry, Metadata, SignatureKind};
use tracing::{debug, info, warn};

use crate::fs::{NodeKind, SourceFs, StdFs};
use crate::{Error, StdCodec};

/// Builder for archives. Collects entries from the filesystem (or from
/// memory) together with the archive settings, then writes the archive.
///
/// Entry targets are **relative** archive paths with `/` separators; adding
/// an invalid or already used target fails immediately.
///
/// # Example
/// ```
/// use phar::PharBuilder;
/// use phar_core::{Archive, Compression};
///
/// let mut builder = PharBuilder::new();
/// builder
///     .bytes("<?php echo 'hi';", "bin/hello.php").unwrap()
///     .empty_dir("cache").unwrap()
///     .compression(Compression::Gz)
///     .stub("#!/usr/bin/env php\n");
///
/// let mut dest = Vec::new();
/// builder.write_archive(&mut dest).unwrap();
///
/// let archive = Archive::deserialize(&dest, &phar::StdCodec).unwrap();
/// assert_eq!(archive.get("bin/hello.php").unwrap().data(), b"<?php echo 'hi';");
/// ```
pub struct PharBuilder<F: SourceFs = StdFs> {
    fs: F,
    archive: Archive,
}

impl PharBuilder<StdFs> {
    pub fn new() -> PharBuilder<StdFs> {
        PharBuilder::with_fs(StdFs)
    }
}

impl Default for PharBuilder<StdFs> {
    fn default() -> PharBuilder<StdFs> {
        PharBuilder::new()
    }
}

impl<F: SourceFs> PharBuilder<F> {
    pub fn with_fs(fs: F) -> PharBuilder<F> {
        PharBuilder {
            fs,
            archive: Archive::new(),
        }
    }

    /// Walk `root` and add everything below it, with paths relative to
    /// `root`. The root itself gets no entry.
    pub fn dir(&mut self, root: impl AsRef<Path>) -> Result<&mut PharBuilder<F>, Error> {
        self.walk_root(root.as_ref(), None)?;
        Ok(self)
    }

    /// Like [`PharBuilder::dir`], storing every path below `prefix`
    pub fn dir_as(
        &mut self,
        root: impl AsRef<Path>,
        prefix: &str,
    ) -> Result<&mut PharBuilder<F>, Error> {
        let prefix = prefix.replace('\\', "/").trim_matches('/').to_string();
        if prefix.is_empty() {
            self.walk_root(root.as_ref(), None)?;
        } else {
            self.walk_root(root.as_ref(), Some(&prefix))?;
        }
        Ok(self)
    }

    /// Add a regular file. `source` is the position of the file on the build
    /// system.
    pub fn file(
        &mut self,
        source: impl AsRef<Path>,
        target: &str,
    ) -> Result<&mut PharBuilder<F>, Error> {
        let source = source.as_ref();
        let node = self
            .fs
            .node(source)
            .map_err(Error::io("Read file metadata", source))?;
        let data = self
            .fs
            .read(source)
            .map_err(Error::io("Read file", source))?;
        let entry = Entry::file(target, data)?
            .with_permissions(node.permissions)
            .with_timestamp(node.modified);
        self.insert(entry)?;
        Ok(self)
    }

    /// Add a file with contents from memory
    pub fn bytes(
        &mut self,
        data: impl Into<Vec<u8>>,
        target: &str,
    ) -> Result<&mut PharBuilder<F>, Error> {
        self.insert(Entry::file(target, data)?)?;
        Ok(self)
    }

    pub fn empty_dir(&mut self, target: &str) -> Result<&mut PharBuilder<F>, Error> {
        self.archive.add_empty_dir(target)?;
        debug!(path = target, "added empty directory");
        Ok(self)
    }

    pub fn stub(&mut self, stub: impl Into<Vec<u8>>) -> &mut PharBuilder<F> {
        self.archive.set_stub(stub);
        self
    }

    /// Use a PHP file as the stub. A trailing `__HALT_COMPILER();` directive
    /// is removed since the archive writes its own.
    pub fn stub_file(&mut self, path: impl AsRef<Path>) -> Result<&mut PharBuilder<F>, Error> {
        let path = path.as_ref();
        let code = self.fs.read(path).map_err(Error::io("Read stub", path))?;
        self.archive.set_stub(stub::strip_halt(&code));
        Ok(self)
    }

    pub fn metadata(&mut self, metadata: Metadata) -> &mut PharBuilder<F> {
        self.archive.set_metadata(metadata);
        self
    }

    pub fn compression(&mut self, compression: Compression) -> &mut PharBuilder<F> {
        self.archive.set_compression(compression);
        self
    }

    pub fn alias(&mut self, alias: impl Into<String>) -> &mut PharBuilder<F> {
        self.archive.set_alias(alias);
        self
    }

    /// `None` writes an unsigned archive
    pub fn signature(&mut self, signature: Option<SignatureKind>) -> &mut PharBuilder<F> {
        self.archive.set_signature(signature);
        self
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn into_archive(self) -> Archive {
        self.archive
    }

    /// Serialize the archive and write it to `dest`
    pub fn write_archive<W: Write>(&self, mut dest: W) -> Result<(), Error> {
        let bytes = self.archive.serialize(&StdCodec)?;
        dest.write_all(&bytes)
            .and_then(|()| dest.flush())
            .map_err(|source| Error::Io {
                context: "Write archive",
                path: None,
                source,
            })?;
        info!(
            entries = self.archive.len(),
            bytes = bytes.len(),
            compression = %self.archive.compression(),
            "wrote archive"
        );
        Ok(())
    }

    fn insert(&mut self, entry: Entry) -> Result<(), Error> {
        debug!(path = entry.path(), size = entry.size(), "adding entry");
        self.archive.insert(entry)?;
        Ok(())
    }

    fn walk_root(&mut self, root: &Path, prefix: Option<&str>) -> Result<(), Error> {
        let node = self
            .fs
            .node(root)
            .map_err(Error::io("Read source directory", root))?;
        if node.kind != NodeKind::Directory {
            return Err(Error::Io {
                context: "Source is not a directory",
                path: Some(root.to_path_buf()),
                source: std::io::ErrorKind::InvalidInput.into(),
            });
        }
        self.walk(root, prefix)
    }

    fn walk(&mut self, dir: &Path, prefix: Option<&str>) -> Result<(), Error> {
        // Sort each directory's children by file name
        let mut children = self
            .fs
            .read_dir(dir)
            .map_err(Error::io("Read directory", dir))?;
        children.sort();

        for name in children {
            let path = dir.join(&name);
            let name = name
                .to_str()
                .ok_or_else(|| phar_core::Error::InvalidPath(name.to_string_lossy().into_owned()))?;
            let target = match prefix {
                Some(prefix) => format!("{}/{}", prefix, name),
                None => name.to_string(),
            };

            let node = self
                .fs
                .node(&path)
                .map_err(Error::io("Read file metadata", &path))?;
            match node.kind {
                NodeKind::Directory => {
                    let entry = Entry::directory(&target)?
                        .with_permissions(node.permissions)
                        .with_timestamp(node.modified);
                    self.insert(entry)?;
                    self.walk(&path, Some(&target))?;
                }
                NodeKind::File => {
                    let data = self.fs.read(&path).map_err(Error::io("Read file", &path))?;
                    let entry = Entry::file(&target, data)?
                        .with_permissions(node.permissions)
                        .with_timestamp(node.modified);
                    self.insert(entry)?;
                }
                NodeKind::Other => {
                    warn!(path = %path.display(), "skipping unsupported file type");
                }
            }
        }
        Ok(())
    }
}

/// Build an archive from everything below `root`, with default settings
pub fn build_from_directory(root: impl AsRef<Path>) -> Result<Archive, Error> {
    let mut builder = PharBuilder::new();
    builder.dir(root)?;
    Ok(builder.into_archive())
}
