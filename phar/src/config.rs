use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use phar_core::{Compression, Metadata, SignatureKind};
use serde::Deserialize;

use crate::fs::SourceFs;
use crate::{Error, PharBuilder};

/// Settings for `phar create`, read from a toml file.
///
/// ```toml
/// alias = "app.phar"
/// compression = "bz2"
/// signature = "sha512"
/// stub = "stub.php"
/// prefix = "Image"
///
/// [metadata]
/// creator = "RAID"
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub alias: Option<String>,
    pub compression: Option<String>,
    /// Digest name, or `"none"` for an unsigned archive
    pub signature: Option<String>,
    pub stub: Option<PathBuf>,
    pub prefix: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl BuildConfig {
    pub fn open(file: &Path) -> Result<BuildConfig, Error> {
        let s = fs::read_to_string(file).map_err(Error::io("Read config", file))?;
        BuildConfig::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<BuildConfig, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn compression(&self) -> Result<Compression, Error> {
        match &self.compression {
            Some(name) => Ok(name.parse()?),
            None => Ok(Compression::None),
        }
    }

    pub fn signature(&self) -> Result<Option<SignatureKind>, Error> {
        match self.signature.as_deref() {
            None => Ok(Some(SignatureKind::Sha256)),
            Some(name) if name.eq_ignore_ascii_case("none") => Ok(None),
            Some(name) => Ok(Some(name.parse()?)),
        }
    }

    /// Copy these settings onto `builder`. The source tree is added
    /// separately since `prefix` only applies to it.
    pub fn apply<F: SourceFs>(&self, builder: &mut PharBuilder<F>) -> Result<(), Error> {
        builder
            .compression(self.compression()?)
            .signature(self.signature()?);
        if let Some(alias) = &self.alias {
            builder.alias(alias.as_str());
        }
        if let Some(stub) = &self.stub {
            builder.stub_file(stub)?;
        }
        if !self.metadata.is_empty() {
            builder.metadata(Metadata::from(self.metadata.clone()));
        }
        Ok(())
    }
}
