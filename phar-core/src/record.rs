//! The packed structs represent the fixed-size parts of the on-disk manifest.
//! Fields are stored little-endian; use the accessors rather than the raw
//! fields.
use bytemuck::{Pod, PodCastError, Zeroable};

use crate::{ArchiveFlags, EntryFlags, Error, API_VERSION};

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(packed, C)]
pub struct ManifestHead {
    /// Length of the manifest, not counting this field
    pub len: u32,
    /// Count of entry records
    pub count: u32,
    /// API version nibbles
    pub version: [u8; 2],
    /// Global flags
    pub flags: u32,
}

impl ManifestHead {
    pub fn new(len: u32, count: u32, flags: ArchiveFlags) -> ManifestHead {
        ManifestHead {
            len: len.to_le(),
            count: count.to_le(),
            version: API_VERSION,
            flags: flags.bits().to_le(),
        }
    }

    /// Parse the head from the first bytes of `data`
    pub fn from_bytes(data: &[u8]) -> Result<ManifestHead, Error> {
        let bytes = data
            .get(..crate::MANIFEST_HEAD_SIZE)
            .ok_or(Error::Truncated)?;
        let head: &ManifestHead = bytemuck::try_from_bytes(bytes).map_err(cast_err)?;
        Ok(*head)
    }

    pub fn len(&self) -> u32 {
        u32::from_le(self.len)
    }

    pub fn count(&self) -> u32 {
        u32::from_le(self.count)
    }

    /// Major API version, the first nibble
    pub fn major(&self) -> u8 {
        self.version[0] >> 4
    }

    pub fn flags(&self) -> ArchiveFlags {
        ArchiveFlags::from_bits_retain(u32::from_le(self.flags))
    }
}

/// The fixed part of an entry record, which follows the entry name
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(packed, C)]
pub struct EntryRecord {
    pub uncompressed_size: u32,
    /// Unix timestamp in seconds
    pub timestamp: u32,
    pub compressed_size: u32,
    /// CRC32 of the uncompressed data
    pub crc32: u32,
    pub flags: u32,
}

impl EntryRecord {
    pub fn new(
        uncompressed_size: u32,
        timestamp: u32,
        compressed_size: u32,
        crc32: u32,
        flags: EntryFlags,
    ) -> EntryRecord {
        EntryRecord {
            uncompressed_size: uncompressed_size.to_le(),
            timestamp: timestamp.to_le(),
            compressed_size: compressed_size.to_le(),
            crc32: crc32.to_le(),
            flags: flags.bits().to_le(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<EntryRecord, Error> {
        let bytes = data.get(..crate::ENTRY_RECORD_SIZE).ok_or(Error::Truncated)?;
        let record: &EntryRecord = bytemuck::try_from_bytes(bytes).map_err(cast_err)?;
        Ok(*record)
    }

    pub fn uncompressed_size(&self) -> u32 {
        u32::from_le(self.uncompressed_size)
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_le(self.timestamp)
    }

    pub fn compressed_size(&self) -> u32 {
        u32::from_le(self.compressed_size)
    }

    pub fn crc32(&self) -> u32 {
        u32::from_le(self.crc32)
    }

    pub fn flags(&self) -> EntryFlags {
        EntryFlags::from_bits_retain(u32::from_le(self.flags))
    }
}

fn cast_err(err: PodCastError) -> Error {
    match err {
        PodCastError::SizeMismatch => Error::Truncated,
        _ => Error::InvalidManifest("misaligned record"),
    }
}
