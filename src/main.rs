//! gpionode firmware — main entry point.
//!
//! Hexagonal layout: the pure core (config, calibration, actuator
//! command model) lives in the library crate and is exercised through
//! port traits. This binary wires the ESP-IDF adapters to the core,
//! loads `config.json` from SPIFFS, and drives a small async executor
//! for the periodic telemetry task.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Adapters (outer ring)                   │
//! │                                                      │
//! │  EspGpio          FileStore        TimerDelay        │
//! │  (GpioBackend)    (DocumentStore)  (DelayPort)       │
//! │                                                      │
//! │  ─────────── Port Trait Boundary ──────────────      │
//! │                                                      │
//! │  ┌────────────────────────────────────────────┐      │
//! │  │   ConfigStore · ActuatorController         │      │
//! │  │   (pure logic, host-testable)              │      │
//! │  └────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use gpionode::actuator::ActuatorController;
use gpionode::adapters::file_store::FileStore;
use gpionode::adapters::gpio::EspGpio;
use gpionode::config::ConfigStore;
use gpionode::ports::GpioBackend;

/// Path of the configuration document on the SPIFFS partition.
const CONFIG_PATH: &str = "/spiffs/config.json";

/// Telemetry period for the sensor read loop.
const TELEMETRY_PERIOD: Duration = Duration::from_secs(10);

/// Register the SPIFFS partition at `/spiffs` so the config document
/// is reachable through the std filesystem API.
fn mount_spiffs() -> Result<()> {
    use esp_idf_svc::sys::{esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register, ESP_OK};

    let base_path = c"/spiffs";
    let conf = esp_vfs_spiffs_conf_t {
        base_path: base_path.as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };

    let err = unsafe { esp_vfs_spiffs_register(&conf) };
    anyhow::ensure!(err == ESP_OK as i32, "SPIFFS mount failed: {}", err);
    Ok(())
}

/// Periodic sensor telemetry — logs every calibrated reading so field
/// units can be observed over the serial console without the HTTP
/// layer attached.
async fn telemetry_loop(store: Arc<ConfigStore<FileStore>>) {
    loop {
        for sensor in store.sensors(None, None) {
            match store.read_sensor(&sensor.id) {
                Ok(reading) => info!(
                    "telemetry: {} raw={} calibrated={:.3} {}",
                    reading.id, reading.raw, reading.calibrated, reading.unit
                ),
                Err(e) => warn!("telemetry: {} read failed: {}", sensor.id, e),
            }
        }
        async_io_mini::Timer::after(TELEMETRY_PERIOD).await;
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("gpionode v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Storage + hardware adapters ────────────────────────
    mount_spiffs().context("mounting SPIFFS")?;

    let gpio: Arc<dyn GpioBackend> = Arc::new(EspGpio::new().context("initialising GPIO/ADC")?);
    let file_store = FileStore::new(CONFIG_PATH);

    // ── 3. Load, validate and bind the configuration ──────────
    let store = Arc::new(
        ConfigStore::open(file_store, &gpio).context("loading configuration document")?,
    );
    // Handed to the request layer once it is attached.
    let _actuators = ActuatorController::new(store.configuration());

    info!("system ready, entering telemetry loop");

    // ── 4. Async executor ─────────────────────────────────────
    // async-io-mini drives the reactor timers while edge-executor
    // drives the spawned tasks.
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    executor.spawn(telemetry_loop(store.clone())).detach();

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    unreachable!("executor drives non-terminating tasks");
}
