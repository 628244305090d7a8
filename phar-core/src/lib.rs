#![no_std]
extern crate alloc;

use core::mem;

pub use crate::archive::{Archive, Entry, EntryKind, List};
pub use crate::autoload::AutoloadRule;
pub use crate::codec::{Codec, Stored};
pub use crate::error::{Error, ErrorKind};
pub use crate::flags::{ArchiveFlags, Compression, EntryFlags};
pub use crate::manifest::{Manifest, ManifestEntry};
pub use crate::metadata::Metadata;
pub use crate::record::{EntryRecord, ManifestHead};
pub use crate::signature::SignatureKind;

mod archive;
mod autoload;
mod codec;
mod error;
mod flags;
mod manifest;
mod metadata;
mod package;
mod record;
mod signature;
pub mod stub;

pub const MANIFEST_HEAD_SIZE: usize = mem::size_of::<ManifestHead>();
pub const ENTRY_RECORD_SIZE: usize = mem::size_of::<EntryRecord>();

/// API version written into every manifest, as two bytes of nibbles (1.1.1)
pub const API_VERSION: [u8; 2] = [0x11, 0x10];

/// Trailing magic of the signature block
pub const SIGNATURE_MAGIC: &[u8; 4] = b"GBMB";
