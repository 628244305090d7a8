#![no_main]
use libfuzzer_sys::fuzz_target;
use phar_core::Metadata;

fuzz_target!(|data: &[u8]| {
    if let Ok(metadata) = Metadata::from_bytes(data) {
        assert_eq!(Metadata::from_bytes(&metadata.to_bytes()), Ok(metadata));
    }
});
