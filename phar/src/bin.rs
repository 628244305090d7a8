//! Implementations of the `phar` subcommands.
use std::io::{self, Write};
use std::path::Path;

use crate::{read_archive, Autoloader, BuildConfig, Error, ManifestDump, PharBuilder};

fn stdout_err(source: io::Error) -> Error {
    Error::Io {
        context: "Write output",
        path: None,
        source,
    }
}

/// Build an archive at `archive_path` from the contents of `folder`
pub fn create(
    config: &BuildConfig,
    archive_path: impl AsRef<Path>,
    folder: impl AsRef<Path>,
) -> Result<(), Error> {
    let mut builder = PharBuilder::new();
    config.apply(&mut builder)?;
    match &config.prefix {
        Some(prefix) => builder.dir_as(folder, prefix)?,
        None => builder.dir(folder)?,
    };

    // Serialized before the file is opened, so a failed build leaves an
    // existing archive alone
    crate::write_archive(builder.archive(), archive_path)
}

/// Print one line per entry; directories end with `/`
pub fn list(archive_path: impl AsRef<Path>) -> Result<(), Error> {
    let archive = read_archive(archive_path)?;
    let mut stdout = io::stdout().lock();
    for entry in archive.list() {
        let suffix = if entry.is_dir() { "/" } else { "" };
        writeln!(stdout, "{}{}", entry.path(), suffix).map_err(stdout_err)?;
    }
    Ok(())
}

/// Print the archive-wide settings and metadata
pub fn info(archive_path: impl AsRef<Path>) -> Result<(), Error> {
    let archive = read_archive(archive_path)?;
    let mut stdout = io::stdout().lock();
    let signature = archive
        .signature()
        .map_or_else(|| String::from("none"), |kind| kind.to_string());
    writeln!(stdout, "entries: {}", archive.len()).map_err(stdout_err)?;
    writeln!(stdout, "alias: {}", archive.alias()).map_err(stdout_err)?;
    writeln!(stdout, "compression: {}", archive.compression()).map_err(stdout_err)?;
    writeln!(stdout, "signature: {}", signature).map_err(stdout_err)?;
    writeln!(stdout, "stub: {} bytes", archive.stub().map_or(0, <[u8]>::len)).map_err(stdout_err)?;
    if let Some(metadata) = archive.metadata() {
        for (key, value) in metadata {
            writeln!(stdout, "metadata.{}: {}", key, value).map_err(stdout_err)?;
        }
    }
    Ok(())
}

/// Print the manifest as toml
pub fn dump(archive_path: impl AsRef<Path>) -> Result<(), Error> {
    let archive = read_archive(archive_path)?;
    let text = ManifestDump::from_archive(&archive).to_toml()?;
    io::stdout().write_all(text.as_bytes()).map_err(stdout_err)
}

pub fn extract(archive_path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Result<(), Error> {
    let archive = read_archive(archive_path)?;
    crate::extract_archive(&archive, base_dir)
}

/// Write the source of `class` from a mapped archive to `out`
pub fn autoload<W: Write>(loader: &Autoloader, class: &str, mut out: W) -> Result<(), Error> {
    let source = loader.load(class).ok_or_else(|| Error::NotFound {
        path: loader
            .rule()
            .resolve(class)
            .unwrap_or_else(|| class.to_string())
            .into(),
    })?;
    out.write_all(source).map_err(stdout_err)
}
