use std::env;
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use phar::phar_core::{Archive, Compression, EntryKind, Metadata, SignatureKind};
use phar::{BuildConfig, ErrorKind, PharBuilder, StdCodec};

struct TestDir {
    tmpdir: tempfile::TempDir,
}

impl TestDir {
    fn new() -> io::Result<TestDir> {
        Ok(TestDir {
            tmpdir: tempfile::tempdir()?,
        })
    }

    fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.tmpdir.path().join(path)
    }

    /// Source tree with `Image/Foo.php` (10 bytes) and `Image/Bar/Baz.php`
    /// (5 bytes)
    fn image(&self) -> io::Result<PathBuf> {
        fs::create_dir_all(self.path("Image/Bar"))?;
        fs::write(self.path("Image/Foo.php"), b"0123456789")?;
        fs::write(self.path("Image/Bar/Baz.php"), b"01234")?;
        Ok(self.path("Image"))
    }
}

const MANIFEST_DIR: &str = env!("CARGO_MANIFEST_DIR");

fn paths(archive: &Archive) -> Vec<(&str, EntryKind)> {
    archive.list().map(|e| (e.path(), e.kind())).collect()
}

#[test]
fn build_image_archive() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let image = tmp.image()?;

    let metadata: Metadata = [("creator", "RAID")].into_iter().collect();
    let mut builder = PharBuilder::new();
    builder
        .dir_as(&image, "Image")?
        .metadata(metadata.clone())
        .compression(Compression::Bz2)
        .stub("STUB\n");
    builder.write_archive(fs::File::create(tmp.path("image.phar"))?)?;

    let bytes = fs::read(tmp.path("image.phar"))?;
    assert!(bytes.starts_with(b"STUB\n__HALT_COMPILER(); ?>\r\n"));

    let archive = phar::read_archive(tmp.path("image.phar"))?;
    assert_eq!(
        paths(&archive),
        vec![
            ("Image/Bar", EntryKind::Directory),
            ("Image/Bar/Baz.php", EntryKind::File),
            ("Image/Foo.php", EntryKind::File),
        ]
    );
    assert_eq!(archive.metadata(), Some(&metadata));
    assert_eq!(archive.stub(), Some(&b"STUB\n"[..]));
    assert_eq!(archive.compression(), Compression::Bz2);
    assert_eq!(archive.signature(), Some(SignatureKind::Sha256));
    assert_eq!(archive.get("Image/Foo.php").unwrap().data(), b"0123456789");
    assert_eq!(archive.get("Image/Bar/Baz.php").unwrap().data(), b"01234");
    Ok(())
}

#[test]
fn gz_round_trip_is_idempotent() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let image = tmp.image()?;

    let mut builder = PharBuilder::new();
    builder
        .dir(&image)?
        .compression(Compression::Gz)
        .signature(Some(SignatureKind::Sha512))
        .alias("image.phar");
    let first = builder.archive().serialize(&StdCodec)?;

    let read = Archive::deserialize(&first, &StdCodec)?;
    assert_eq!(read.compression(), Compression::Gz);
    assert_eq!(read.alias(), "image.phar");
    for entry in builder.archive().entries() {
        assert_eq!(read.get(entry.path()), Some(entry));
    }

    let second = read.serialize(&StdCodec)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn build_from_copied_sources() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let src = PathBuf::from(MANIFEST_DIR).join("src");
    copy_dir::copy_dir(&src, tmp.path("buildroot"))?;

    let archive = phar::build_from_directory(tmp.path("buildroot"))?;
    assert_eq!(archive.len(), fs::read_dir(&src)?.count());
    for entry in archive.list() {
        assert_eq!(entry.kind(), EntryKind::File);
        assert_eq!(entry.data(), &fs::read(src.join(entry.path()))?[..]);
    }

    phar::write_archive(&archive, tmp.path("src.phar"))?;
    let read = phar::read_archive(tmp.path("src.phar"))?;
    assert_eq!(read.entries(), archive.list().cloned().collect::<Vec<_>>().as_slice());
    Ok(())
}

#[test]
fn extract_restores_tree() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let image = tmp.image()?;

    let mut builder = PharBuilder::new();
    builder
        .dir(&image)?
        .empty_dir("cache")?
        .compression(Compression::Bz2);
    phar::write_archive(builder.archive(), tmp.path("image.phar"))?;

    phar::extract(tmp.path("image.phar"), tmp.path("out"))?;
    assert_eq!(fs::read(tmp.path("out/Foo.php"))?, b"0123456789");
    assert_eq!(fs::read(tmp.path("out/Bar/Baz.php"))?, b"01234");
    assert!(tmp.path("out/cache").is_dir());
    Ok(())
}

#[test]
fn missing_source_directory() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let err = phar::build_from_directory(tmp.path("nope")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = phar::read_archive(tmp.path("nope.phar")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn corrupt_archive_file() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let image = tmp.image()?;

    let mut builder = PharBuilder::new();
    builder.dir(&image)?.compression(Compression::Bz2).signature(None);
    let mut bytes = builder.archive().serialize(&StdCodec)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(tmp.path("bad.phar"), &bytes)?;

    let err = phar::read_archive(tmp.path("bad.phar")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);

    fs::write(tmp.path("text.phar"), b"<?php echo 1;")?;
    let err = phar::read_archive(tmp.path("text.phar")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptArchive);
    Ok(())
}

#[test]
fn failed_create_keeps_existing_archive() -> Result<(), Box<dyn Error>> {
    let tmp = TestDir::new()?;
    let image = tmp.image()?;
    fs::write(tmp.path("image.phar"), b"PREVIOUS GOOD ARCHIVE")?;

    // the halt token is not trailing, so it stays in the stub
    fs::write(tmp.path("stub.php"), b"<?php __HALT_COMPILER(); ?>\necho 1;\n")?;
    let config = BuildConfig {
        stub: Some(tmp.path("stub.php")),
        ..BuildConfig::default()
    };
    let err = phar::create(&config, tmp.path("image.phar"), &image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert_eq!(fs::read(tmp.path("image.phar"))?, b"PREVIOUS GOOD ARCHIVE");

    phar::create(&BuildConfig::default(), tmp.path("image.phar"), &image)?;
    let archive = phar::read_archive(tmp.path("image.phar"))?;
    assert_eq!(archive.len(), 3);
    Ok(())
}
