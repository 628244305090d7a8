//! The manifest: archive-wide fields followed by one record per entry.
use alloc::string::String;
use alloc::vec::Vec;

use crate::{
    ArchiveFlags, EntryRecord, Error, ManifestHead, Metadata, API_VERSION, ENTRY_RECORD_SIZE,
    MANIFEST_HEAD_SIZE,
};

#[derive(Clone, Debug)]
pub struct ManifestEntry {
    /// Stored name; directories end with `/`
    pub name: String,
    pub record: EntryRecord,
    pub metadata: Option<Metadata>,
    /// Offset of the entry's payload from the start of the payload blocks
    pub offset: u64,
}

impl ManifestEntry {
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

#[derive(Clone, Debug)]
pub struct Manifest {
    pub version: [u8; 2],
    pub flags: ArchiveFlags,
    pub alias: String,
    pub metadata: Option<Metadata>,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(flags: ArchiveFlags, alias: String, metadata: Option<Metadata>) -> Manifest {
        Manifest {
            version: API_VERSION,
            flags,
            alias,
            metadata,
            entries: Vec::new(),
        }
    }

    /// Version as `major.minor.patch`
    pub fn version(&self) -> (u8, u8, u8) {
        (self.version[0] >> 4, self.version[0] & 0x0f, self.version[1] >> 4)
    }

    /// Append an entry, assigning its offset after the previous entries
    pub fn push(&mut self, name: String, record: EntryRecord, metadata: Option<Metadata>) {
        let offset = self.payload_size();
        self.entries.push(ManifestEntry {
            name,
            record,
            metadata,
            offset,
        });
    }

    /// Total length of the payload blocks described by this manifest
    pub fn payload_size(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| u64::from(e.record.compressed_size()))
            .sum()
    }

    /// Parse a manifest from the start of `data`. Returns the manifest and
    /// the number of bytes it occupies.
    pub fn parse(data: &[u8]) -> Result<(Manifest, usize), Error> {
        let head = ManifestHead::from_bytes(data)?;
        if head.major() != 1 {
            return Err(Error::UnsupportedVersion(head.major()));
        }

        let total = usize::try_from(head.len())?
            .checked_add(4)
            .ok_or(Error::Overflow)?;
        let body = data.get(..total).ok_or(Error::Truncated)?;
        if total < MANIFEST_HEAD_SIZE {
            return Err(Error::InvalidManifest("length shorter than header"));
        }

        let mut pos = MANIFEST_HEAD_SIZE;
        let alias = String::from_utf8(read_prefixed(body, &mut pos)?.to_vec())?;
        let metadata = read_metadata(body, &mut pos)?;

        let mut manifest = Manifest {
            version: head.version,
            flags: head.flags(),
            alias,
            metadata,
            entries: Vec::new(),
        };

        for _ in 0..head.count() {
            let name = String::from_utf8(read_prefixed(body, &mut pos)?.to_vec())?;
            let record = EntryRecord::from_bytes(body.get(pos..).ok_or(Error::Truncated)?)?;
            pos += ENTRY_RECORD_SIZE;
            let metadata = read_metadata(body, &mut pos)?;
            manifest.push(name, record, metadata);
        }

        if pos != total {
            return Err(Error::InvalidManifest("length does not match contents"));
        }
        Ok((manifest, total))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        write_prefixed(&mut body, self.alias.as_bytes())?;
        write_metadata(&mut body, self.metadata.as_ref())?;
        for entry in self.entries.iter() {
            write_prefixed(&mut body, entry.name.as_bytes())?;
            body.extend_from_slice(bytemuck::bytes_of(&entry.record));
            write_metadata(&mut body, entry.metadata.as_ref())?;
        }

        let len = u32::try_from(body.len() + MANIFEST_HEAD_SIZE - 4)?;
        let count = u32::try_from(self.entries.len())?;
        let mut head = ManifestHead::new(len, count, self.flags);
        head.version = self.version;

        let mut out = Vec::with_capacity(MANIFEST_HEAD_SIZE + body.len());
        out.extend_from_slice(bytemuck::bytes_of(&head));
        out.extend_from_slice(&body);
        Ok(out)
    }
}

fn read_prefixed<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], Error> {
    let len_bytes = data.get(*pos..*pos + 4).ok_or(Error::Truncated)?;
    let mut len = [0; 4];
    len.copy_from_slice(len_bytes);
    let len = usize::try_from(u32::from_le_bytes(len))?;

    let start = *pos + 4;
    let end = start.checked_add(len).ok_or(Error::Overflow)?;
    let bytes = data.get(start..end).ok_or(Error::Truncated)?;
    *pos = end;
    Ok(bytes)
}

fn read_metadata(data: &[u8], pos: &mut usize) -> Result<Option<Metadata>, Error> {
    let bytes = read_prefixed(data, pos)?;
    if bytes.is_empty() {
        Ok(None)
    } else {
        Metadata::from_bytes(bytes).map(Some)
    }
}

fn write_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), Error> {
    let len = u32::try_from(bytes.len())?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn write_metadata(out: &mut Vec<u8>, metadata: Option<&Metadata>) -> Result<(), Error> {
    match metadata {
        Some(metadata) => write_prefixed(out, &metadata.to_bytes()),
        None => write_prefixed(out, &[]),
    }
}
