use alloc::vec::Vec;

use crate::{Compression, Error};

/// Byte-level compression used when payloads are written and read.
///
/// Implementations return [`Error::UnsupportedMode`] for modes they do not
/// implement.
pub trait Codec {
    type Err: From<Error>;

    fn compress(&self, mode: Compression, data: &[u8]) -> Result<Vec<u8>, Self::Err>;

    /// `size` is the uncompressed size recorded in the manifest
    fn decompress(&self, mode: Compression, data: &[u8], size: usize) -> Result<Vec<u8>, Self::Err>;
}

/// Codec that only handles [`Compression::None`]
#[derive(Clone, Copy, Debug, Default)]
pub struct Stored;

impl Codec for Stored {
    type Err = Error;

    fn compress(&self, mode: Compression, data: &[u8]) -> Result<Vec<u8>, Error> {
        match mode {
            Compression::None => Ok(data.to_vec()),
            other => Err(Error::UnsupportedMode(other.flag())),
        }
    }

    fn decompress(&self, mode: Compression, data: &[u8], _size: usize) -> Result<Vec<u8>, Error> {
        self.compress(mode, data)
    }
}
