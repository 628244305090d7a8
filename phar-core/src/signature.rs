use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::{Error, SIGNATURE_MAGIC};

/// Digest algorithm of the signature trailer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureKind {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl SignatureKind {
    pub fn flag(self) -> u32 {
        match self {
            SignatureKind::Md5 => 0x0001,
            SignatureKind::Sha1 => 0x0002,
            SignatureKind::Sha256 => 0x0004,
            SignatureKind::Sha512 => 0x0008,
        }
    }

    pub fn from_flag(flag: u32) -> Result<SignatureKind, Error> {
        match flag {
            0x0001 => Ok(SignatureKind::Md5),
            0x0002 => Ok(SignatureKind::Sha1),
            0x0004 => Ok(SignatureKind::Sha256),
            0x0008 => Ok(SignatureKind::Sha512),
            other => Err(Error::UnsupportedSignature(other)),
        }
    }

    /// Length in bytes of the digest
    pub fn digest_len(self) -> usize {
        match self {
            SignatureKind::Md5 => 16,
            SignatureKind::Sha1 => 20,
            SignatureKind::Sha256 => 32,
            SignatureKind::Sha512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            SignatureKind::Md5 => Md5::digest(data).to_vec(),
            SignatureKind::Sha1 => Sha1::digest(data).to_vec(),
            SignatureKind::Sha256 => Sha256::digest(data).to_vec(),
            SignatureKind::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Append the trailer (digest, kind, magic) covering everything in `out`
    pub fn append_trailer(self, out: &mut Vec<u8>) {
        let digest = self.digest(out);
        out.extend_from_slice(&digest);
        out.extend_from_slice(&self.flag().to_le_bytes());
        out.extend_from_slice(SIGNATURE_MAGIC);
    }

    /// Check the trailer at the end of `data` and return the length of the
    /// signed portion, which is also where the payload blocks end.
    pub fn verify_trailer(data: &[u8]) -> Result<(SignatureKind, usize), Error> {
        let magic_start = data.len().checked_sub(4).ok_or(Error::Truncated)?;
        if &data[magic_start..] != SIGNATURE_MAGIC {
            return Err(Error::InvalidManifest("missing signature trailer"));
        }
        let kind_start = magic_start.checked_sub(4).ok_or(Error::Truncated)?;
        let mut flag = [0; 4];
        flag.copy_from_slice(&data[kind_start..magic_start]);
        let kind = SignatureKind::from_flag(u32::from_le_bytes(flag))?;

        let signed_len = kind_start
            .checked_sub(kind.digest_len())
            .ok_or(Error::Truncated)?;
        if kind.digest(&data[..signed_len]) != data[signed_len..kind_start] {
            return Err(Error::InvalidSignature);
        }
        Ok((kind, signed_len))
    }
}

impl FromStr for SignatureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<SignatureKind, Error> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(SignatureKind::Md5),
            "sha1" | "sha-1" => Ok(SignatureKind::Sha1),
            "sha256" | "sha-256" => Ok(SignatureKind::Sha256),
            "sha512" | "sha-512" => Ok(SignatureKind::Sha512),
            _ => Err(Error::UnknownSignature(s.to_string())),
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignatureKind::Md5 => "MD5",
            SignatureKind::Sha1 => "SHA-1",
            SignatureKind::Sha256 => "SHA-256",
            SignatureKind::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}
