//! Fuzz target for exchange JSON parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run exchange_json_parse

#![no_main]

use labelport::exchange::from_exchange_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for an exchange document.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(document) = from_exchange_slice(data) {
        for annotation in &document.annotations {
            let _ = annotation.geometry();
        }
    }
});
