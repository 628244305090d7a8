//! Manifest export to toml and back.
use std::collections::BTreeMap;

use phar_core::{Archive, EntryKind, Metadata};
use serde::{Deserialize, Serialize};

use crate::{BuildConfig, Error};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DumpKind {
    File,
    Directory,
}

impl From<EntryKind> for DumpKind {
    fn from(kind: EntryKind) -> DumpKind {
        match kind {
            EntryKind::File => DumpKind::File,
            EntryKind::Directory => DumpKind::Directory,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EntryDump {
    pub path: String,
    pub kind: DumpKind,
    pub size: u64,
    pub permissions: u32,
    pub timestamp: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Everything in an archive except payloads and the stub body, as a toml
/// document.
///
/// ```toml
/// alias = "image.phar"
/// compression = "gz"
/// signature = "SHA-256"
/// stub_len = 5
///
/// [metadata]
/// creator = "RAID"
///
/// [[entry]]
/// path = "Image/Foo.php"
/// kind = "file"
/// size = 10
/// permissions = 420
/// timestamp = 0
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ManifestDump {
    pub alias: String,
    pub compression: String,
    /// Digest name, or `"none"`
    pub signature: String,
    pub stub_len: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, rename = "entry")]
    pub entries: Vec<EntryDump>,
}

fn metadata_map(metadata: Option<&Metadata>) -> BTreeMap<String, String> {
    metadata.map(|m| m.clone().into_inner()).unwrap_or_default()
}

impl ManifestDump {
    /// Entries are listed in [`Archive::list`] order
    pub fn from_archive(archive: &Archive) -> ManifestDump {
        let entries = archive
            .list()
            .map(|entry| EntryDump {
                path: entry.path().to_string(),
                kind: entry.kind().into(),
                size: entry.size() as u64,
                permissions: entry.permissions,
                timestamp: entry.timestamp,
                metadata: metadata_map(entry.metadata.as_ref()),
            })
            .collect();

        ManifestDump {
            alias: archive.alias().to_string(),
            compression: archive.compression().to_string(),
            signature: archive
                .signature()
                .map_or_else(|| String::from("none"), |kind| kind.to_string()),
            stub_len: archive.stub().map_or(0, <[u8]>::len) as u64,
            metadata: metadata_map(archive.metadata()),
            entries,
        }
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml::to_string(self)?)
    }

    pub fn from_toml(s: &str) -> Result<ManifestDump, Error> {
        Ok(toml::from_str(s)?)
    }
}

/// The archive-wide settings of a dump, ready to build a new archive with
impl From<&ManifestDump> for BuildConfig {
    fn from(dump: &ManifestDump) -> BuildConfig {
        BuildConfig {
            alias: Some(dump.alias.clone()).filter(|alias| !alias.is_empty()),
            compression: Some(dump.compression.clone()),
            signature: Some(dump.signature.clone()),
            stub: None,
            prefix: None,
            metadata: dump.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use phar_core::{Compression, SignatureKind};

    use super::*;
    use crate::PharBuilder;

    fn image() -> Archive {
        let mut builder = PharBuilder::new();
        builder
            .empty_dir("Image/Bar")
            .unwrap()
            .bytes("0123456789", "Image/Foo.php")
            .unwrap()
            .bytes("01234", "Image/Bar/Baz.php")
            .unwrap()
            .metadata([("creator", "RAID")].into_iter().collect())
            .compression(Compression::Gz)
            .signature(Some(SignatureKind::Sha512))
            .alias("image.phar")
            .stub("STUB\n");
        builder.into_archive()
    }

    #[test]
    fn dump_lists_entries() {
        let dump = ManifestDump::from_archive(&image());
        assert_eq!(dump.alias, "image.phar");
        assert_eq!(dump.compression, "gz");
        assert_eq!(dump.signature, "SHA-512");
        assert_eq!(dump.stub_len, 5);
        assert_eq!(dump.metadata.get("creator").map(String::as_str), Some("RAID"));

        let entries: Vec<(&str, DumpKind, u64)> = dump
            .entries
            .iter()
            .map(|e| (e.path.as_str(), e.kind, e.size))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("Image/Bar", DumpKind::Directory, 0),
                ("Image/Bar/Baz.php", DumpKind::File, 5),
                ("Image/Foo.php", DumpKind::File, 10),
            ]
        );
    }

    #[test]
    fn toml_reads_back() {
        let dump = ManifestDump::from_archive(&image());
        let text = dump.to_toml().unwrap();
        assert!(text.contains("[[entry]]"));
        assert!(text.contains("kind = \"directory\""));
        assert_eq!(ManifestDump::from_toml(&text).unwrap(), dump);

        let err = ManifestDump::from_toml("alias = 1").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }

    #[test]
    fn settings_carry_over() {
        let dump = ManifestDump::from_archive(&image());
        let config = BuildConfig::from(&dump);

        let mut builder = PharBuilder::new();
        config.apply(&mut builder).unwrap();
        let archive = builder.archive();
        assert_eq!(archive.alias(), "image.phar");
        assert_eq!(archive.compression(), Compression::Gz);
        assert_eq!(archive.signature(), Some(SignatureKind::Sha512));
        assert_eq!(archive.metadata(), image().metadata());

        let mut unsigned = dump.clone();
        unsigned.signature = String::from("none");
        unsigned.alias.clear();
        let config = BuildConfig::from(&unsigned);
        assert_eq!(config.alias, None);
        assert_eq!(config.signature().unwrap(), None);
    }
}
