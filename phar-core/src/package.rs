//! Serialization of an [`Archive`] to the on-disk layout and back.
use alloc::string::String;
use alloc::vec::Vec;

use crate::archive::cmp_paths;
use crate::stub::{self, HALT_MARKER};
use crate::{
    Archive, ArchiveFlags, Codec, Compression, Entry, EntryFlags, EntryRecord, Error, Manifest,
    SignatureKind,
};

impl Archive {
    /// Write the archive: stub, halt marker, manifest, payload blocks and the
    /// signature trailer if a signature is set.
    ///
    /// Entries are written in path order, so equal archives serialize to
    /// equal bytes.
    pub fn serialize<C: Codec>(&self, codec: &C) -> Result<Vec<u8>, C::Err> {
        let stub = self.stub().unwrap_or_default();
        if stub::contains_halt(stub) {
            return Err(Error::StubContainsHalt.into());
        }

        let mut sorted: Vec<&Entry> = self.entries().iter().collect();
        sorted.sort_by(|a, b| cmp_paths(a.path(), b.path()));
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0].path() == pair[1].path()) {
            return Err(Error::DuplicatePath(String::from(pair[0].path())).into());
        }
        // Children sort directly after their parent
        if let Some(pair) = sorted
            .windows(2)
            .find(|pair| !pair[0].is_dir() && pair[1].is_under(pair[0].path()))
        {
            return Err(Error::NestedUnderFile(String::from(pair[0].path())).into());
        }

        let mode = self.compression();
        let mut flags = ArchiveFlags::empty();
        if sorted.iter().any(|e| !e.is_dir()) {
            flags |= ArchiveFlags::from_bits_truncate(mode.flag());
        }
        if self.signature().is_some() {
            flags |= ArchiveFlags::SIGNATURE;
        }

        let mut manifest = Manifest::new(flags, String::from(self.alias()), self.metadata().cloned());
        let mut payloads = Vec::new();
        for entry in sorted {
            if entry.is_dir() {
                let mut name = String::from(entry.path());
                name.push('/');
                let entry_flags = EntryFlags::new(entry.permissions, Compression::None);
                let record = EntryRecord::new(0, entry.timestamp, 0, 0, entry_flags);
                manifest.push(name, record, entry.metadata.clone());
                continue;
            }

            let data = entry.data();
            let start = payloads.len();
            match mode {
                Compression::None => payloads.extend_from_slice(data),
                _ => payloads.extend_from_slice(&codec.compress(mode, data)?),
            }
            let compressed_size = u32::try_from(payloads.len() - start).map_err(Error::from)?;
            let size = u32::try_from(data.len()).map_err(Error::from)?;

            let record = EntryRecord::new(
                size,
                entry.timestamp,
                compressed_size,
                crc32fast::hash(data),
                EntryFlags::new(entry.permissions, mode),
            );
            manifest.push(String::from(entry.path()), record, entry.metadata.clone());
        }

        let manifest = manifest.to_bytes()?;
        let mut out =
            Vec::with_capacity(stub.len() + HALT_MARKER.len() + manifest.len() + payloads.len());
        out.extend_from_slice(stub);
        out.extend_from_slice(HALT_MARKER);
        out.extend_from_slice(&manifest);
        out.extend_from_slice(&payloads);
        if let Some(kind) = self.signature() {
            kind.append_trailer(&mut out);
        }
        Ok(out)
    }

    /// Read an archive, decompressing and checking every payload.
    pub fn deserialize<C: Codec>(data: &[u8], codec: &C) -> Result<Archive, C::Err> {
        let (stub_len, manifest_start) = stub::find_halt(data).ok_or(Error::MissingHalt)?;
        let (manifest, manifest_len) = Manifest::parse(&data[manifest_start..])?;

        let (signature, payload_end) = if manifest.flags.contains(ArchiveFlags::SIGNATURE) {
            let (kind, signed_len) = SignatureKind::verify_trailer(data)?;
            (Some(kind), signed_len)
        } else {
            (None, data.len())
        };

        let payload_start = manifest_start + manifest_len;
        let payload_size = usize::try_from(manifest.payload_size()).map_err(Error::from)?;
        let payloads = data
            .get(payload_start..payload_end)
            .filter(|payloads| payloads.len() >= payload_size)
            .ok_or(Error::Truncated)?;

        let mut archive = Archive::new();
        archive.set_stub(&data[..stub_len]);
        archive.set_alias(manifest.alias);
        archive.set_signature(signature);
        if let Some(metadata) = manifest.metadata {
            archive.set_metadata(metadata);
        }

        let mut compression = None;
        for record in manifest.entries {
            let flags = record.record.flags();
            let mut entry = if record.is_dir() {
                Entry::directory(&record.name)
            } else {
                let mode = flags.compression()?;
                if compression.is_none() {
                    compression = Some(mode);
                }

                let offset = usize::try_from(record.offset).map_err(Error::from)?;
                let len = usize::try_from(record.record.compressed_size()).map_err(Error::from)?;
                let block = &payloads[offset..offset + len];
                let size = usize::try_from(record.record.uncompressed_size()).map_err(Error::from)?;
                let contents = match mode {
                    Compression::None => block.to_vec(),
                    _ => codec.decompress(mode, block, size)?,
                };

                if contents.len() != size {
                    return Err(Error::LengthMismatch {
                        path: record.name,
                        expected: record.record.uncompressed_size(),
                        actual: contents.len(),
                    }
                    .into());
                }
                if crc32fast::hash(&contents) != record.record.crc32() {
                    return Err(Error::InvalidCrc32(record.name).into());
                }
                Entry::file(&record.name, contents)
            }
            .map_err(|_| Error::InvalidManifest("invalid entry path"))?;

            entry.permissions = flags.permissions();
            entry.timestamp = record.record.timestamp();
            entry.metadata = record.metadata;
            archive.insert(entry).map_err(|err| match err {
                Error::NestedUnderFile(_) => Error::InvalidManifest("entry nested under a file"),
                _ => Error::InvalidManifest("duplicate entry path"),
            })?;
        }
        archive.set_compression(compression.unwrap_or_default());

        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;
    use crate::{ErrorKind, Metadata, Stored, MANIFEST_HEAD_SIZE};

    fn sample() -> Archive {
        let mut archive = Archive::new();
        archive.set_stub(&b"STUB\n"[..]);
        archive.set_metadata([("creator", "RAID")].into_iter().collect());
        archive
            .insert(Entry::file("Image/Foo.php", "0123456789").unwrap().with_timestamp(1_600_000_000))
            .unwrap();
        archive.insert(Entry::directory("Image/Bar").unwrap()).unwrap();
        archive
            .insert(
                Entry::file("Image/Bar/Baz.php", "01234")
                    .unwrap()
                    .with_permissions(0o600)
                    .with_metadata([("role", "helper")].into_iter().collect()),
            )
            .unwrap();
        archive
    }

    fn paths(archive: &Archive) -> Vec<&str> {
        archive.list().map(Entry::path).collect()
    }

    #[test]
    fn layout() {
        let bytes = sample().serialize(&Stored).unwrap();
        assert!(bytes.starts_with(b"STUB\n__HALT_COMPILER(); ?>\r\n"));
        assert!(bytes.ends_with(b"\x04\0\0\0GBMB"));

        let (manifest, len) = Manifest::parse(&bytes[28..]).unwrap();
        let names: Vec<&str> = manifest.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Image/Bar/", "Image/Bar/Baz.php", "Image/Foo.php"]);
        assert!(len > MANIFEST_HEAD_SIZE);

        // stored payloads are the raw bytes, back to back
        let payload_start = 28 + len;
        assert_eq!(&bytes[payload_start..payload_start + 15], b"012340123456789");
        assert_eq!(bytes.len(), payload_start + 15 + 32 + 8);
    }

    #[test]
    fn round_trip() {
        let archive = sample();
        let bytes = archive.serialize(&Stored).unwrap();
        let read = Archive::deserialize(&bytes, &Stored).unwrap();

        assert_eq!(paths(&read), vec!["Image/Bar", "Image/Bar/Baz.php", "Image/Foo.php"]);
        assert_eq!(read.stub(), Some(&b"STUB\n"[..]));
        assert_eq!(read.metadata().and_then(|m| m.get("creator")), Some("RAID"));
        assert_eq!(read.signature(), Some(SignatureKind::Sha256));
        assert_eq!(read.compression(), Compression::None);

        for entry in archive.entries() {
            assert_eq!(read.get(entry.path()), Some(entry));
        }
    }

    #[test]
    fn serialize_is_idempotent() {
        let bytes = sample().serialize(&Stored).unwrap();
        let again = Archive::deserialize(&bytes, &Stored)
            .unwrap()
            .serialize(&Stored)
            .unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut reversed = Archive::new();
        reversed.set_stub(&b"STUB\n"[..]);
        reversed.set_metadata(sample().metadata().cloned().unwrap_or_default());
        for entry in sample().entries().iter().rev() {
            reversed.insert(entry.clone()).unwrap();
        }
        assert_eq!(
            reversed.serialize(&Stored).unwrap(),
            sample().serialize(&Stored).unwrap()
        );
    }

    #[test]
    fn empty_archive() {
        let mut archive = Archive::new();
        archive.set_signature(None);
        let bytes = archive.serialize(&Stored).unwrap();
        assert!(bytes.starts_with(HALT_MARKER));

        let read = Archive::deserialize(&bytes, &Stored).unwrap();
        assert!(read.is_empty());
        assert_eq!(read.stub(), None);
        assert_eq!(read.metadata(), None);
        assert_eq!(read.signature(), None);
    }

    #[test]
    fn stub_with_halt_token() {
        let mut archive = sample();
        archive.set_stub(&b"<?php __HALT_COMPILER(); ?>"[..]);
        let err = archive.serialize(&Stored).unwrap_err();
        assert_eq!(err, Error::StubContainsHalt);
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn codec_without_mode() {
        let mut archive = sample();
        archive.set_compression(Compression::Gz);
        let err = archive.serialize(&Stored).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedMode);
    }

    #[test]
    fn directories_only_need_no_codec() {
        let mut archive = Archive::new();
        archive.set_compression(Compression::Bz2);
        archive.add_empty_dir("Empty").unwrap();
        let bytes = archive.serialize(&Stored).unwrap();
        let read = Archive::deserialize(&bytes, &Stored).unwrap();
        assert!(read.get("Empty").unwrap().is_dir());
        assert_eq!(read.compression(), Compression::None);
    }

    #[test]
    fn missing_halt() {
        let err = Archive::deserialize(b"just some text", &Stored).unwrap_err();
        assert_eq!(err, Error::MissingHalt);
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
    }

    #[test]
    fn tampered_payload() {
        let mut bytes = sample().serialize(&Stored).unwrap();
        let len = bytes.len();
        bytes[len - 41] ^= 0xff;
        assert_eq!(
            Archive::deserialize(&bytes, &Stored).unwrap_err(),
            Error::InvalidSignature
        );
    }

    #[test]
    fn bad_crc_without_signature() {
        let mut archive = sample();
        archive.set_signature(None);
        let mut bytes = archive.serialize(&Stored).unwrap();
        let len = bytes.len();
        bytes[len - 1] ^= 0xff;
        assert_eq!(
            Archive::deserialize(&bytes, &Stored).unwrap_err(),
            Error::InvalidCrc32("Image/Foo.php".to_string())
        );
    }

    #[test]
    fn truncated_payload() {
        let mut archive = sample();
        archive.set_signature(None);
        let bytes = archive.serialize(&Stored).unwrap();
        assert_eq!(
            Archive::deserialize(&bytes[..bytes.len() - 1], &Stored).unwrap_err(),
            Error::Truncated
        );
    }

    #[test]
    fn unknown_entry_mode() {
        let mut archive = Archive::new();
        archive.set_signature(None);
        archive.insert(Entry::file("a", "x").unwrap()).unwrap();
        let mut bytes = archive.serialize(&Stored).unwrap();

        // flags are the last field of the only entry record, before its
        // empty metadata length
        let flags_at = bytes.len() - 1 - 4 - 4;
        bytes[flags_at + 1] |= 0x80;
        let err = Archive::deserialize(&bytes, &Stored).unwrap_err();
        assert_eq!(err, Error::UnsupportedMode(0x8000));
        assert_eq!(err.kind(), ErrorKind::UnsupportedMode);
    }

    /// Unsigned archive bytes with the given stored (name, data) entries
    fn raw_archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut manifest = Manifest::new(ArchiveFlags::empty(), String::new(), None);
        let mut payloads = Vec::new();
        for (name, data) in entries {
            let size = data.len() as u32;
            let flags = EntryFlags::new(0o644, Compression::None);
            let crc = crc32fast::hash(data.as_bytes());
            manifest.push(name.to_string(), EntryRecord::new(size, 0, size, crc, flags), None);
            payloads.extend_from_slice(data.as_bytes());
        }
        let mut bytes = HALT_MARKER.to_vec();
        bytes.extend_from_slice(&manifest.to_bytes().unwrap());
        bytes.extend_from_slice(&payloads);
        bytes
    }

    #[test]
    fn stored_file_with_children() {
        let bytes = raw_archive(&[("Image", "x"), ("Image/Foo.php", "y")]);
        let err = Archive::deserialize(&bytes, &Stored).unwrap_err();
        assert_eq!(err, Error::InvalidManifest("entry nested under a file"));
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);

        // same conflict with the child stored first
        let bytes = raw_archive(&[("Image/Foo.php", "y"), ("Image", "x")]);
        assert_eq!(
            Archive::deserialize(&bytes, &Stored).unwrap_err(),
            Error::InvalidManifest("entry nested under a file")
        );

        let bytes = raw_archive(&[("a", "x"), ("a", "y")]);
        assert_eq!(
            Archive::deserialize(&bytes, &Stored).unwrap_err(),
            Error::InvalidManifest("duplicate entry path")
        );
    }

    #[test]
    fn entry_metadata_survives() {
        let bytes = sample().serialize(&Stored).unwrap();
        let read = Archive::deserialize(&bytes, &Stored).unwrap();
        let expected: Metadata = [("role", "helper")].into_iter().collect();
        let baz = read.get("Image/Bar/Baz.php").unwrap();
        assert_eq!(baz.metadata.as_ref(), Some(&expected));
        assert_eq!(baz.permissions, 0o600);
    }
}
