use std::io::{Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use phar_core::{Codec, Compression};

use crate::Error;

/// [`Codec`] backed by `flate2` (raw deflate) and `bzip2`
#[derive(Clone, Copy, Debug, Default)]
pub struct StdCodec;

impl Codec for StdCodec {
    type Err = Error;

    fn compress(&self, mode: Compression, data: &[u8]) -> Result<Vec<u8>, Error> {
        let codec_err = |source| Error::Codec { mode, source };
        match mode {
            Compression::None => Ok(data.to_vec()),
            Compression::Gz => {
                let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data).map_err(codec_err)?;
                encoder.finish().map_err(codec_err)
            }
            Compression::Bz2 => {
                let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::best());
                encoder.write_all(data).map_err(codec_err)?;
                encoder.finish().map_err(codec_err)
            }
        }
    }

    fn decompress(&self, mode: Compression, data: &[u8], size: usize) -> Result<Vec<u8>, Error> {
        // One byte past the recorded size is enough to detect a mismatch
        let limit = size as u64 + 1;
        // The recorded size is untrusted
        let mut out = Vec::with_capacity(size.min(data.len().saturating_mul(8)));
        let res = match mode {
            Compression::None => return Ok(data.to_vec()),
            Compression::Gz => DeflateDecoder::new(data).take(limit).read_to_end(&mut out),
            Compression::Bz2 => BzDecoder::new(data).take(limit).read_to_end(&mut out),
        };
        res.map_err(|source| Error::Codec { mode, source })?;
        Ok(out)
    }
}
