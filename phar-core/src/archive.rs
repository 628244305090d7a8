//! In-memory archive model.
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::{Compression, Error, Metadata, SignatureKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One file or directory stored in an [`Archive`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    path: String,
    kind: EntryKind,
    data: Vec<u8>,
    /// Unix permission bits (`0o777` mask)
    pub permissions: u32,
    /// Modification time, seconds since the Unix epoch
    pub timestamp: u32,
    pub metadata: Option<Metadata>,
}

impl Entry {
    pub fn file(path: &str, data: impl Into<Vec<u8>>) -> Result<Entry, Error> {
        Ok(Entry {
            path: check_path(path)?,
            kind: EntryKind::File,
            data: data.into(),
            permissions: 0o644,
            timestamp: 0,
            metadata: None,
        })
    }

    pub fn directory(path: &str) -> Result<Entry, Error> {
        Ok(Entry {
            path: check_path(path)?,
            kind: EntryKind::Directory,
            data: Vec::new(),
            permissions: 0o755,
            timestamp: 0,
            metadata: None,
        })
    }

    pub fn with_permissions(mut self, permissions: u32) -> Entry {
        self.permissions = permissions & 0o777;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Entry {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Entry {
        self.metadata = Some(metadata);
        self
    }

    /// Relative path with `/` separators and no trailing `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Uncompressed payload; always empty for directories
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether this entry lives somewhere below the directory `dir`
    pub fn is_under(&self, dir: &str) -> bool {
        is_under(&self.path, dir)
    }
}

/// Normalize an entry path: backslashes become `/`, surrounding slashes are
/// trimmed, and the result must consist of normal components only.
pub(crate) fn check_path(path: &str) -> Result<String, Error> {
    let normalized = path.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err(Error::InvalidPath(path.to_string()));
    }
    let trimmed = normalized.trim_end_matches('/');
    if trimmed.is_empty()
        || trimmed
            .split('/')
            .any(|component| matches!(component, "" | "." | ".."))
    {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Order paths component by component, so that everything below a directory
/// sorts directly after it
pub(crate) fn cmp_paths(a: &str, b: &str) -> Ordering {
    a.split('/').cmp(b.split('/'))
}

fn is_under(path: &str, dir: &str) -> bool {
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

/// A package archive: entries, metadata, stub and the settings used when it
/// is serialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<Entry>,
    metadata: Option<Metadata>,
    stub: Option<Vec<u8>>,
    compression: Compression,
    alias: String,
    signature: Option<SignatureKind>,
}

impl Default for Archive {
    fn default() -> Archive {
        Archive {
            entries: Vec::new(),
            metadata: None,
            stub: None,
            compression: Compression::None,
            alias: String::new(),
            signature: Some(SignatureKind::Sha256),
        }
    }
}

impl Archive {
    pub fn new() -> Archive {
        Archive::default()
    }

    /// Add an entry. Paths are unique within an archive, and only
    /// directories may have entries below them.
    pub fn insert(&mut self, entry: Entry) -> Result<(), Error> {
        if self.position(&entry.path).is_some() {
            return Err(Error::DuplicatePath(entry.path));
        }
        self.check_nesting(&entry)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Add a directory entry. Fails if anything exists at or below `path`.
    pub fn add_empty_dir(&mut self, path: &str) -> Result<(), Error> {
        let entry = Entry::directory(path)?;
        if self
            .entries
            .iter()
            .any(|e| e.path == entry.path || e.is_under(&entry.path))
        {
            return Err(Error::DuplicatePath(entry.path));
        }
        self.check_nesting(&entry)?;
        self.entries.push(entry);
        Ok(())
    }

    fn check_nesting(&self, entry: &Entry) -> Result<(), Error> {
        if let Some(file) = self
            .entries
            .iter()
            .find(|e| !e.is_dir() && entry.is_under(&e.path))
        {
            return Err(Error::NestedUnderFile(file.path.clone()));
        }
        if !entry.is_dir() && self.entries.iter().any(|e| e.is_under(&entry.path)) {
            return Err(Error::NestedUnderFile(entry.path.clone()));
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        let path = check_path(path).ok()?;
        self.position(&path).map(|i| &self.entries[i])
    }

    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        let path = check_path(path).ok()?;
        self.position(&path).map(|i| self.entries.remove(i))
    }

    /// Remove `path` and everything below it. Returns the number of entries
    /// removed.
    pub fn remove_dir(&mut self, path: &str) -> usize {
        let Ok(path) = check_path(path) else {
            return 0;
        };
        let before = self.entries.len();
        self.entries
            .retain(|e| e.path != path && !is_under(&e.path, &path));
        before - self.entries.len()
    }

    /// Entries in insertion order (stored index order for a deserialized
    /// archive)
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk the entries like a filesystem: a directory is followed by
    /// everything below it before its next sibling.
    pub fn list(&self) -> List<'_> {
        List::new(&self.entries, |_| true)
    }

    /// Like [`Archive::list`], restricted to entries below `dir`
    pub fn list_under(&self, dir: &str) -> List<'_> {
        match check_path(dir) {
            Ok(dir) => List::new(&self.entries, |e| is_under(&e.path, &dir)),
            Err(_) => List::new(&self.entries, |_| false),
        }
    }

    /// Replaces any previous metadata
    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = Some(metadata);
    }

    pub fn clear_metadata(&mut self) {
        self.metadata = None;
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Set the bytes written in front of the archive. They are stored as-is;
    /// an empty stub removes it.
    pub fn set_stub(&mut self, stub: impl Into<Vec<u8>>) {
        let stub = stub.into();
        self.stub = if stub.is_empty() { None } else { Some(stub) };
    }

    pub fn stub(&self) -> Option<&[u8]> {
        self.stub.as_deref()
    }

    /// Compression applied to every file payload when serialized
    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = compression;
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// `None` writes no signature trailer
    pub fn set_signature(&mut self, signature: Option<SignatureKind>) {
        self.signature = signature;
    }

    pub fn signature(&self) -> Option<SignatureKind> {
        self.signature
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }
}

/// Iterator returned by [`Archive::list`]. Each call to `list` starts a new
/// walk; the iterator can also be cloned to restart from its current
/// position.
#[derive(Clone, Debug)]
pub struct List<'a> {
    entries: &'a [Entry],
    order: Vec<usize>,
    pos: usize,
}

impl<'a> List<'a> {
    fn new(entries: &'a [Entry], filter: impl Fn(&Entry) -> bool) -> List<'a> {
        let mut order: Vec<usize> = (0..entries.len())
            .filter(|&i| filter(&entries[i]))
            .collect();
        order.sort_by(|&a, &b| cmp_paths(&entries[a].path, &entries[b].path));
        List {
            entries,
            order,
            pos: 0,
        }
    }
}

impl<'a> Iterator for List<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<&'a Entry> {
        let index = *self.order.get(self.pos)?;
        self.pos += 1;
        Some(&self.entries[index])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.order.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for List<'_> {}
