#![no_main]
use libfuzzer_sys::fuzz_target;
use phar_core::{Archive, Stored};

fuzz_target!(|data: &[u8]| {
    if let Ok(archive) = Archive::deserialize(data, &Stored) {
        let _ = archive.list().count();
        let _ = archive.serialize(&Stored);
    }
});
