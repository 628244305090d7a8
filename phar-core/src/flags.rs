use alloc::string::ToString;
use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;

use crate::Error;

/// Bits of an entry's flags that select its compression
pub const COMPRESSION_MASK: u32 = 0x0000_f000;

/// Compression applied to file payloads when an archive is written.
///
/// `Gz` is what PHP calls `Phar::GZ`: the payload is a raw deflate stream
/// without zlib or gzip framing. `Bz2` is a complete bzip2 stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    #[default]
    None,
    Gz,
    Bz2,
}

impl Compression {
    pub fn flag(self) -> u32 {
        match self {
            Compression::None => 0,
            Compression::Gz => 0x1000,
            Compression::Bz2 => 0x2000,
        }
    }

    /// Decode the compression nibble of entry flags. Other bits are ignored.
    pub fn from_flags(flags: u32) -> Result<Compression, Error> {
        match flags & COMPRESSION_MASK {
            0 => Ok(Compression::None),
            0x1000 => Ok(Compression::Gz),
            0x2000 => Ok(Compression::Bz2),
            other => Err(Error::UnsupportedMode(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gz => "gz",
            Compression::Bz2 => "bz2",
        }
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Compression, Error> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "store" => Ok(Compression::None),
            "gz" | "gzip" | "deflate" => Ok(Compression::Gz),
            "bz2" | "bzip2" | "bzip" => Ok(Compression::Bz2),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Per-entry flags: permission bits plus the compression nibble
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u32 {
        const PERM = 0o777;
        const COMPRESSED_GZ = 0x1000;
        const COMPRESSED_BZ2 = 0x2000;
    }
}

impl EntryFlags {
    pub fn new(permissions: u32, compression: Compression) -> EntryFlags {
        EntryFlags::from_bits_retain((permissions & EntryFlags::PERM.bits()) | compression.flag())
    }

    pub fn permissions(self) -> u32 {
        self.bits() & EntryFlags::PERM.bits()
    }

    pub fn compression(self) -> Result<Compression, Error> {
        Compression::from_flags(self.bits())
    }
}

bitflags! {
    /// Manifest-wide flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ArchiveFlags: u32 {
        /// At least one entry is deflate-compressed
        const GZ = 0x1000;
        /// At least one entry is bzip2-compressed
        const BZ2 = 0x2000;
        /// The file ends with a signature trailer
        const SIGNATURE = 0x0001_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_from_flags() {
        assert_eq!(Compression::from_flags(0o644), Ok(Compression::None));
        assert_eq!(Compression::from_flags(0x1000 | 0o644), Ok(Compression::Gz));
        assert_eq!(Compression::from_flags(0x2000), Ok(Compression::Bz2));
        assert_eq!(
            Compression::from_flags(0x4000 | 0o600),
            Err(Error::UnsupportedMode(0x4000))
        );
    }

    #[test]
    fn compression_names() {
        assert_eq!("BZ2".parse::<Compression>(), Ok(Compression::Bz2));
        assert_eq!("gzip".parse::<Compression>(), Ok(Compression::Gz));
        assert!("lz4".parse::<Compression>().is_err());
        // raw deflate, not a zlib stream
        assert!("zlib".parse::<Compression>().is_err());
    }

    #[test]
    fn entry_flags_split() {
        let flags = EntryFlags::new(0o100755, Compression::Gz);
        assert_eq!(flags.bits(), 0x1000 | 0o755);
        assert_eq!(flags.permissions(), 0o755);
        assert_eq!(flags.compression(), Ok(Compression::Gz));
    }
}
