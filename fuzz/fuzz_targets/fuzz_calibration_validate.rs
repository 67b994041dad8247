//! Fuzz target: calibration spec validation
//!
//! Arbitrary JSON values through `validate`/`from_document`/`apply`:
//! - No panics under any value shape
//! - Accepted specs always round-trip through their document form
//!
//! cargo fuzz run fuzz_calibration_validate

#![no_main]

use libfuzzer_sys::fuzz_target;

use gpionode::calibration::CalibrationSpec;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };

    if let Ok(spec) = CalibrationSpec::validate(&value) {
        // Accepted specs are applicable and serialisable.
        let _ = spec.apply(1234.0);
        let doc = spec.to_value().expect("validated specs have document form");
        // JSON input can only carry finite numbers, so the document form
        // must validate back to the same spec.
        assert_eq!(CalibrationSpec::validate(&doc), Ok(spec));
    }

    let _ = CalibrationSpec::from_document(Some(&value));
});
