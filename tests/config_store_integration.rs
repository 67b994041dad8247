//! Integration tests: document load → bind → query → calibration lifecycle.
//!
//! Everything runs against the in-memory GPIO and document stores, so the
//! full load/persist path is exercised on the host with no hardware.

#![cfg(not(target_os = "espidf"))]

use std::sync::Arc;

use serde_json::json;

use gpionode::adapters::file_store::MemoryStore;
use gpionode::adapters::gpio::SimGpio;
use gpionode::config::ConfigStore;
use gpionode::error::{ConfigError, StoreError, ValidationError};
use gpionode::ports::GpioBackend;

// ── Fixtures ──────────────────────────────────────────────────

/// A representative document: two sensors (one calibrated, one raw), one
/// LED, one motor.
fn garden_document() -> String {
    json!({
        "wifi": {"ssid": "greenhouse", "password": "hunter2"},
        "server": {"port": 8080},
        "leds": {
            "roof_light": {"pin": 2, "color": "white", "location": "roof", "type": "led"},
        },
        "sensors": {
            "soil": {
                "pin": 26, "type": "moisture", "location": "bed_a", "unit": "%",
                "adc": true,
                "config": {"type": "linear", "params": {"m": 0.1, "b": -5.0}},
            },
            "door": {
                "pin": 27, "type": "contact", "location": "entry", "unit": "bool",
            },
        },
        "motors": {
            "pump1": {"pin_on": 4, "pin_dir": 5, "type": "dc", "location": "bed_a"},
        },
    })
    .to_string()
}

fn open_garden() -> (Arc<SimGpio>, Arc<MemoryStore>, ConfigStore<Arc<MemoryStore>>) {
    let gpio = Arc::new(SimGpio::new());
    let backend: Arc<dyn GpioBackend> = gpio.clone();
    let mem = Arc::new(MemoryStore::new(garden_document()));
    let store = ConfigStore::open(mem.clone(), &backend).unwrap();
    (gpio, mem, store)
}

// ── Load + bind ───────────────────────────────────────────────

#[test]
fn load_binds_every_descriptor() {
    let (gpio, _mem, store) = open_garden();

    // 1 LED + 2 sensors + 2 motor pins.
    assert_eq!(gpio.claimed_count(), 5);

    let leds = store.leds(None, None);
    assert_eq!(leds.len(), 1);
    assert_eq!(leds[0].id, "roof_light");
    assert!(!leds[0].state);

    let sensors = store.sensors(None, None);
    assert_eq!(sensors.len(), 2);

    let motors = store.motors(None, None);
    assert_eq!(motors.len(), 1);
    assert!(!motors[0].state);

    let cfg = store.configuration();
    assert_eq!(cfg.wifi().ssid, "greenhouse");
    assert_eq!(cfg.server().port, 8080);
}

#[test]
fn store_debug_summarises_resources() {
    // Debug is what lets `unwrap_err` name the store in failure output.
    let (_gpio, _mem, store) = open_garden();
    let rendered = format!("{store:?}");
    assert!(rendered.contains("leds: 1"), "{rendered}");
    assert!(rendered.contains("sensors: 2"), "{rendered}");
    assert!(rendered.contains("motors: 1"), "{rendered}");
}

#[test]
fn listings_honour_attribute_filters() {
    let (_gpio, _mem, store) = open_garden();

    assert_eq!(store.sensors(Some("moisture"), None).len(), 1);
    assert_eq!(store.sensors(Some("nope"), None).len(), 0);
    // Either matching attribute admits the entry.
    assert_eq!(store.sensors(Some("nope"), Some("entry")).len(), 1);
    assert_eq!(store.leds(None, Some("roof")).len(), 1);
    assert_eq!(store.motors(Some("dc"), None).len(), 1);
}

#[test]
fn missing_section_binds_nothing() {
    let gpio = Arc::new(SimGpio::new());
    let backend: Arc<dyn GpioBackend> = gpio.clone();
    let doc = json!({
        "wifi": {"ssid": "s", "password": "p"},
        "server": {"port": 80},
        "leds": {
            "roof_light": {"pin": 2, "color": "white", "location": "roof", "type": "led"},
        },
        // no "sensors"
    })
    .to_string();

    let err = ConfigStore::open(MemoryStore::new(doc), &backend).unwrap_err();
    assert_eq!(err, ConfigError::MissingSection("sensors"));
    // Section checks run before any pin is claimed.
    assert_eq!(gpio.claimed_count(), 0);
}

#[test]
fn motors_section_is_optional() {
    let gpio = Arc::new(SimGpio::new());
    let backend: Arc<dyn GpioBackend> = gpio.clone();
    let doc = json!({
        "wifi": {"ssid": "s", "password": "p"},
        "server": {},
        "leds": {},
        "sensors": {},
    })
    .to_string();

    let store = ConfigStore::open(MemoryStore::new(doc), &backend).unwrap();
    assert!(store.motors(None, None).is_empty());
    assert_eq!(store.configuration().server().port, 80);
}

#[test]
fn duplicate_pin_fails_load_and_releases_bindings() {
    let gpio = Arc::new(SimGpio::new());
    let backend: Arc<dyn GpioBackend> = gpio.clone();
    let doc = json!({
        "wifi": {"ssid": "s", "password": "p"},
        "server": {"port": 80},
        "leds": {
            "a": {"pin": 2, "color": "red", "location": "x", "type": "led"},
        },
        "sensors": {
            "soil": {"pin": 2, "type": "moisture", "location": "x", "unit": "%"},
        },
    })
    .to_string();

    let err = ConfigStore::open(MemoryStore::new(doc), &backend).unwrap_err();
    assert_eq!(
        err,
        ConfigError::DuplicatePin {
            pin: 2,
            entry: "soil".into(),
        }
    );
    // The LED binding created before the failure was dropped with the load.
    assert_eq!(gpio.claimed_count(), 0);
}

#[test]
fn invalid_field_names_entry_and_field() {
    let gpio = Arc::new(SimGpio::new());
    let backend: Arc<dyn GpioBackend> = gpio.clone();
    let doc = json!({
        "wifi": {"ssid": "s", "password": "p"},
        "server": {"port": 80},
        "leds": {
            "roof_light": {"pin": "two", "color": "red", "location": "x", "type": "led"},
        },
        "sensors": {},
    })
    .to_string();

    let err = ConfigStore::open(MemoryStore::new(doc), &backend).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidField {
            entry: "roof_light".into(),
            field: "pin",
        }
    );
}

#[test]
fn embedded_calibration_is_validated_at_load() {
    let gpio = Arc::new(SimGpio::new());
    let backend: Arc<dyn GpioBackend> = gpio.clone();
    let doc = json!({
        "wifi": {"ssid": "s", "password": "p"},
        "server": {"port": 80},
        "leds": {},
        "sensors": {
            "soil": {
                "pin": 26, "type": "moisture", "location": "x", "unit": "%",
                "config": {"type": "spline", "params": {}},
            },
        },
    })
    .to_string();

    let err = ConfigStore::open(MemoryStore::new(doc), &backend).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidCalibration {
            sensor: "soil".into(),
            source: ValidationError::UnknownType("spline".into()),
        }
    );
    assert_eq!(gpio.claimed_count(), 0);
}

#[test]
fn unparseable_document_is_a_read_failure() {
    let gpio: Arc<dyn GpioBackend> = Arc::new(SimGpio::new());
    let err = ConfigStore::open(MemoryStore::new("{not json"), &gpio).unwrap_err();
    assert_eq!(err, ConfigError::Store(StoreError::ReadFailed));

    let err = ConfigStore::open(MemoryStore::empty(), &gpio).unwrap_err();
    assert_eq!(err, ConfigError::Store(StoreError::ReadFailed));
}

// ── Sensor reads ──────────────────────────────────────────────

#[test]
fn analog_read_applies_calibration() {
    let (gpio, _mem, store) = open_garden();
    gpio.set_raw(26, 350);

    let reading = store.read_sensor("soil").unwrap();
    assert_eq!(reading.raw, 350);
    // 0.1 * 350 - 5.0
    assert!((reading.calibrated - 30.0).abs() < 1e-9);
    assert_eq!(reading.unit, "%");
}

#[test]
fn digital_read_passes_level_through_identity() {
    let (gpio, _mem, store) = open_garden();
    gpio.set_level(27, true);

    let reading = store.read_sensor("door").unwrap();
    assert_eq!(reading.raw, 1);
    assert_eq!(reading.calibrated, 1.0);

    assert_eq!(
        store.read_sensor("ghost").unwrap_err(),
        ConfigError::UnknownSensor("ghost".into())
    );
}

#[test]
fn preview_converts_without_touching_hardware() {
    let (gpio, _mem, store) = open_garden();
    let value = store.calibration_preview("soil", 100).unwrap();
    assert!((value - 5.0).abs() < 1e-9);
    // No write, no read recorded against the pin.
    assert!(gpio.write_history(26).is_empty());
}

// ── Calibration lifecycle ─────────────────────────────────────

#[test]
fn accepted_update_swaps_spec_and_persists() {
    let (_gpio, mem, store) = open_garden();

    store
        .update_sensor_calibration(
            "soil",
            &json!({"type": "polynomial", "params": {"coefficients": [0, 0.1]}}),
        )
        .unwrap();

    // In-memory spec replaced.
    assert!((store.calibration_preview("soil", 100).unwrap() - 10.0).abs() < 1e-9);

    // Persisted document reflects the new spec and re-binds cleanly.
    let written = mem.written().unwrap();
    let gpio2: Arc<dyn GpioBackend> = Arc::new(SimGpio::new());
    let reopened = ConfigStore::open(MemoryStore::new(written), &gpio2).unwrap();
    assert!((reopened.calibration_preview("soil", 100).unwrap() - 10.0).abs() < 1e-9);
}

#[test]
fn rejected_update_leaves_spec_untouched() {
    let (_gpio, mem, store) = open_garden();
    let before = mem.written().unwrap();

    let err = store
        .update_sensor_calibration("soil", &json!({"type": "linear", "params": {"b": 1}}))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidCalibration {
            sensor: "soil".into(),
            source: ValidationError::MissingParameter("m"),
        }
    );

    // Prior spec still answers, document unwritten.
    assert!((store.calibration_preview("soil", 100).unwrap() - 5.0).abs() < 1e-9);
    assert_eq!(mem.written().unwrap(), before);

    assert_eq!(
        store
            .update_sensor_calibration("ghost", &json!({"type": "linear"}))
            .unwrap_err(),
        ConfigError::UnknownSensor("ghost".into())
    );
}

#[test]
fn persist_failure_keeps_memory_authoritative() {
    let (_gpio, mem, store) = open_garden();
    mem.set_fail_writes(true);

    let err = store
        .update_sensor_calibration(
            "soil",
            &json!({"type": "linear", "params": {"m": 1.0, "b": 0.0}}),
        )
        .unwrap_err();
    assert_eq!(err, ConfigError::Store(StoreError::WriteFailed));

    // The swap already happened; the running process serves the new spec.
    assert!((store.calibration_preview("soil", 100).unwrap() - 100.0).abs() < 1e-9);
}

#[test]
fn persisted_document_round_trips() {
    let (_gpio, mem, store) = open_garden();
    store.persist().unwrap();

    let written = mem.written().unwrap();
    let gpio2: Arc<dyn GpioBackend> = Arc::new(SimGpio::new());
    let reopened = ConfigStore::open(MemoryStore::new(written), &gpio2).unwrap();

    assert_eq!(reopened.leds(None, None), store.leds(None, None));
    assert_eq!(reopened.sensors(None, None), store.sensors(None, None));
    assert_eq!(reopened.motors(None, None), store.motors(None, None));
    assert_eq!(reopened.configuration().wifi(), store.configuration().wifi());
}
