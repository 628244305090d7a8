use alloc::format;
use alloc::string::{String, ToString};
use core::error;
use core::fmt::{Display, Formatter, Result};

/// Coarse classification of an [`Error`], matching how callers react to it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A compression mode that is unknown or not implemented by the codec
    UnsupportedMode,
    /// The in-memory archive cannot be written as-is
    Serialization,
    /// The bytes being read are not a well-formed archive
    CorruptArchive,
}

#[derive(Debug, PartialEq)]
pub enum Error {
    UnsupportedMode(u32),
    UnknownMode(String),
    UnknownSignature(String),
    DuplicatePath(String),
    /// Another entry would live below the file at this path
    NestedUnderFile(String),
    InvalidPath(String),
    StubContainsHalt,
    Overflow,
    MissingHalt,
    Truncated,
    InvalidManifest(&'static str),
    InvalidMetadata,
    InvalidUtf8,
    UnsupportedVersion(u8),
    UnsupportedSignature(u32),
    InvalidSignature,
    LengthMismatch {
        path: String,
        expected: u32,
        actual: usize,
    },
    InvalidCrc32(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;

        match self {
            UnsupportedMode(_) | UnknownMode(_) => ErrorKind::UnsupportedMode,
            DuplicatePath(_)
            | NestedUnderFile(_)
            | InvalidPath(_)
            | UnknownSignature(_)
            | StubContainsHalt
            | Overflow => ErrorKind::Serialization,
            MissingHalt
            | Truncated
            | InvalidManifest(_)
            | InvalidMetadata
            | InvalidUtf8
            | UnsupportedVersion(_)
            | UnsupportedSignature(_)
            | InvalidSignature
            | LengthMismatch { .. }
            | InvalidCrc32(_) => ErrorKind::CorruptArchive,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result {
        use Error::*;

        let msg = match self {
            UnsupportedMode(flag) => format!("Unsupported compression mode: {:#06x}", flag),
            UnknownMode(name) => format!("Unknown compression mode: {}", name),
            UnknownSignature(name) => format!("Unknown signature type: {}", name),
            DuplicatePath(path) => format!("Duplicate entry path: {}", path),
            NestedUnderFile(path) => format!("Entries nested under file: {}", path),
            InvalidPath(path) => format!("Invalid entry path: {:?}", path),
            StubContainsHalt => "Stub contains the halt marker".to_string(),
            Overflow => "Overflow".to_string(),
            MissingHalt => "Halt marker not found".to_string(),
            Truncated => "Archive truncated".to_string(),
            InvalidManifest(reason) => format!("Invalid manifest: {}", reason),
            InvalidMetadata => "Invalid serialized metadata".to_string(),
            InvalidUtf8 => "Invalid UTF-8".to_string(),
            UnsupportedVersion(major) => format!("Unsupported API version: {}", major),
            UnsupportedSignature(kind) => format!("Unsupported signature type: {:#x}", kind),
            InvalidSignature => "Signature mismatch".to_string(),
            LengthMismatch {
                path,
                expected,
                actual,
            } => format!(
                "Entry size mismatch for {}: expected {}, got {}",
                path, expected, actual
            ),
            InvalidCrc32(path) => format!("CRC32 mismatch for {}", path),
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {}

impl From<core::num::TryFromIntError> for Error {
    fn from(_: core::num::TryFromIntError) -> Error {
        Error::Overflow
    }
}

impl From<core::str::Utf8Error> for Error {
    fn from(_: core::str::Utf8Error) -> Error {
        Error::InvalidUtf8
    }
}

impl From<alloc::string::FromUtf8Error> for Error {
    fn from(_: alloc::string::FromUtf8Error) -> Error {
        Error::InvalidUtf8
    }
}
