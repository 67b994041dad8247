//! Configuration store — load, bind, query, persist.
//!
//! `ConfigStore` turns the declarative document into a fully bound,
//! queryable [`BoundConfiguration`] (descriptors + exclusive pin bindings),
//! applies calibration updates atomically, and reconstructs the whole
//! document from live state on every persist. Binding is all-or-nothing:
//! any load failure drops the bindings created so far, releasing their pins.

pub mod document;

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::calibration::CalibrationSpec;
use crate::drivers::binding::DeviceBinding;
use crate::error::{ConfigError, StoreError};
use crate::ports::{DocumentStore, GpioBackend, PinMode};

pub use document::{Document, ServerConfig, WifiConfig};

// ───────────────────────────────────────────────────────────────
// Descriptors — persisted, hardware-independent metadata
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedDescriptor {
    pub id: String,
    pub pin: u8,
    pub color: String,
    pub location: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub id: String,
    pub pin: u8,
    pub analog: bool,
    pub kind: String,
    pub location: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotorDescriptor {
    pub id: String,
    pub pin_on: u8,
    pub pin_dir: u8,
    pub kind: String,
    pub location: String,
}

// ───────────────────────────────────────────────────────────────
// Bound resources — descriptor + live pin ownership
// ───────────────────────────────────────────────────────────────

pub(crate) struct BoundLed {
    pub(crate) desc: LedDescriptor,
    pub(crate) binding: DeviceBinding,
}

pub(crate) struct BoundSensor {
    pub(crate) desc: SensorDescriptor,
    pub(crate) binding: DeviceBinding,
    /// The only runtime-mutable descriptor field. Swapped whole, never
    /// patched, so no reader observes a half-updated spec.
    pub(crate) calibration: Mutex<CalibrationSpec>,
}

pub(crate) struct BoundMotor {
    pub(crate) desc: MotorDescriptor,
    pub(crate) enable: DeviceBinding,
    pub(crate) direction: DeviceBinding,
    /// Serialises pin-write sections for this motor (arrival order);
    /// never held across a timed wait.
    pub(crate) command_lock: embassy_sync::mutex::Mutex<CriticalSectionRawMutex, ()>,
    /// Bumped on every run/stop; a pending auto-off only fires if the
    /// generation it captured is still current.
    pub(crate) generation: AtomicU32,
}

/// The fully bound configuration: owned, explicitly constructed at load,
/// shared by reference with the controller and the HTTP layer. There is no
/// ambient global state.
pub struct BoundConfiguration {
    wifi: WifiConfig,
    server: ServerConfig,
    leds: BTreeMap<String, BoundLed>,
    sensors: BTreeMap<String, BoundSensor>,
    motors: BTreeMap<String, BoundMotor>,
}

impl BoundConfiguration {
    pub fn wifi(&self) -> &WifiConfig {
        &self.wifi
    }

    pub fn server(&self) -> ServerConfig {
        self.server
    }

    pub(crate) fn led(&self, id: &str) -> Option<&BoundLed> {
        self.leds.get(id)
    }

    pub(crate) fn motor(&self, id: &str) -> Option<&BoundMotor> {
        self.motors.get(id)
    }

    pub(crate) fn sensor(&self, id: &str) -> Option<&BoundSensor> {
        self.sensors.get(id)
    }
}

// ───────────────────────────────────────────────────────────────
// Live-state snapshots for the request layer
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedStatus {
    pub id: String,
    pub color: String,
    pub location: String,
    pub kind: String,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorInfo {
    pub id: String,
    pub kind: String,
    pub location: String,
    pub unit: String,
    pub analog: bool,
    /// Document form of the current calibration (`None` = identity).
    pub calibration: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub id: String,
    pub raw: u16,
    pub calibrated: f64,
    pub kind: String,
    pub location: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotorStatus {
    pub id: String,
    /// Enable-pin level.
    pub state: bool,
    /// Direction decoded from the pin pair (a stopped motor reads cw).
    pub direction: crate::actuator::Direction,
    pub kind: String,
    pub location: String,
}

impl BoundMotor {
    pub(crate) fn status(&self) -> MotorStatus {
        let direction = if self.direction.read_digital() {
            crate::actuator::Direction::Ccw
        } else {
            crate::actuator::Direction::Cw
        };
        MotorStatus {
            id: self.desc.id.clone(),
            state: self.enable.read_digital(),
            direction,
            kind: self.desc.kind.clone(),
            location: self.desc.location.clone(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ConfigStore
// ───────────────────────────────────────────────────────────────

/// Owns the bound configuration and its persistence path.
pub struct ConfigStore<S: DocumentStore> {
    store: S,
    config: Arc<BoundConfiguration>,
}

// Manual impl: the store adapter and the calibration mutexes are not
// Debug, so summarize by resource counts.
impl<S: DocumentStore> core::fmt::Debug for ConfigStore<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("leds", &self.config.leds.len())
            .field("sensors", &self.config.sensors.len())
            .field("motors", &self.config.motors.len())
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> ConfigStore<S> {
    /// Read the persisted document from `store`, bind every descriptor to
    /// hardware via `gpio`, and return the live store.
    ///
    /// Structural errors here are fatal to startup: the process must not
    /// serve traffic with a partially bound configuration.
    pub fn open(store: S, gpio: &Arc<dyn GpioBackend>) -> Result<Self, ConfigError> {
        let text = store.read()?;
        let doc: Document = serde_json::from_str(&text).map_err(|e| {
            warn!("config: document is not valid JSON: {e}");
            StoreError::ReadFailed
        })?;
        let config = Arc::new(BoundConfiguration::bind(&doc, gpio)?);
        Ok(Self { store, config })
    }

    /// Assemble a store around an already bound configuration (used when
    /// the document was delivered out-of-band, and by tests).
    pub fn with_configuration(store: S, config: Arc<BoundConfiguration>) -> Self {
        Self { store, config }
    }
}

impl BoundConfiguration {
    /// Validate the document and bind each descriptor to a fresh
    /// [`DeviceBinding`].
    ///
    /// Fail-fast: the first error aborts the load and drops every binding
    /// created so far (their pins are released on drop). Duplicate pin
    /// numbers across descriptors are rejected at load time, since
    /// double-binding is undefined at the hardware layer.
    pub fn bind(doc: &Document, gpio: &Arc<dyn GpioBackend>) -> Result<Self, ConfigError> {
        // Required sections first, so nothing binds when one is absent.
        let wifi = doc
            .wifi
            .clone()
            .ok_or(ConfigError::MissingSection("wifi"))?;
        let server = doc.server.ok_or(ConfigError::MissingSection("server"))?;
        let led_entries = doc
            .leds
            .as_ref()
            .ok_or(ConfigError::MissingSection("leds"))?;
        let sensor_entries = doc
            .sensors
            .as_ref()
            .ok_or(ConfigError::MissingSection("sensors"))?;
        let empty = Map::new();
        let motor_entries = doc.motors.as_ref().unwrap_or(&empty);

        let mut leds = BTreeMap::new();
        for (id, entry) in led_entries {
            let desc = LedDescriptor {
                id: id.clone(),
                pin: document::require_pin(entry, id, "pin")?,
                color: document::require_str(entry, id, "color")?,
                location: document::require_str(entry, id, "location")?,
                kind: document::require_str(entry, id, "type")?,
            };
            let binding = claim(gpio, desc.pin, PinMode::DigitalOut, id)?;
            leds.insert(id.clone(), BoundLed { desc, binding });
        }

        let mut sensors = BTreeMap::new();
        for (id, entry) in sensor_entries {
            let desc = SensorDescriptor {
                id: id.clone(),
                pin: document::require_pin(entry, id, "pin")?,
                analog: document::optional_bool(entry, "adc"),
                kind: document::require_str(entry, id, "type")?,
                location: document::require_str(entry, id, "location")?,
                unit: document::require_str(entry, id, "unit")?,
            };
            let calibration = CalibrationSpec::from_document(entry.get("config")).map_err(
                |source| ConfigError::InvalidCalibration {
                    sensor: id.clone(),
                    source,
                },
            )?;
            let mode = if desc.analog {
                PinMode::AnalogIn
            } else {
                PinMode::DigitalIn
            };
            let binding = claim(gpio, desc.pin, mode, id)?;
            sensors.insert(
                id.clone(),
                BoundSensor {
                    desc,
                    binding,
                    calibration: Mutex::new(calibration),
                },
            );
        }

        let mut motors = BTreeMap::new();
        for (id, entry) in motor_entries {
            let desc = MotorDescriptor {
                id: id.clone(),
                pin_on: document::require_pin(entry, id, "pin_on")?,
                pin_dir: document::require_pin(entry, id, "pin_dir")?,
                kind: document::require_str(entry, id, "type")?,
                location: document::require_str(entry, id, "location")?,
            };
            let enable = claim(gpio, desc.pin_on, PinMode::DigitalOut, id)?;
            let direction = claim(gpio, desc.pin_dir, PinMode::DigitalOut, id)?;
            motors.insert(
                id.clone(),
                BoundMotor {
                    desc,
                    enable,
                    direction,
                    command_lock: embassy_sync::mutex::Mutex::new(()),
                    generation: AtomicU32::new(0),
                },
            );
        }

        info!(
            "configuration loaded: {} LEDs, {} sensors, {} motors",
            leds.len(),
            sensors.len(),
            motors.len()
        );

        Ok(Self {
            wifi,
            server,
            leds,
            sensors,
            motors,
        })
    }
}

impl<S: DocumentStore> ConfigStore<S> {
    /// Shared handle to the bound configuration (for the controller and
    /// the request layer).
    pub fn configuration(&self) -> Arc<BoundConfiguration> {
        self.config.clone()
    }

    // ── Calibration lifecycle ─────────────────────────────────

    /// Replace a sensor's calibration and persist the document.
    ///
    /// A rejected candidate leaves the stored spec untouched. On success
    /// the swap is atomic, then the document is rewritten; a persistence
    /// failure is surfaced as `ConfigError::Store` but the in-memory spec
    /// stays replaced — memory is authoritative for the running process.
    pub fn update_sensor_calibration(
        &self,
        sensor_id: &str,
        candidate: &Value,
    ) -> Result<CalibrationSpec, ConfigError> {
        let sensor = self
            .config
            .sensors
            .get(sensor_id)
            .ok_or_else(|| ConfigError::UnknownSensor(sensor_id.to_owned()))?;

        let spec = CalibrationSpec::validate(candidate).map_err(|source| {
            ConfigError::InvalidCalibration {
                sensor: sensor_id.to_owned(),
                source,
            }
        })?;

        *sensor.calibration.lock().unwrap() = spec.clone();
        info!("sensor '{sensor_id}': calibration updated");

        if let Err(e) = self.persist() {
            warn!("sensor '{sensor_id}': calibration accepted but persist failed: {e}");
            return Err(ConfigError::Store(e));
        }
        Ok(spec)
    }

    /// Serialize the *current in-memory* state — a full reconstruction,
    /// never a patch of the loaded document — and write it whole.
    pub fn persist(&self) -> Result<(), StoreError> {
        let doc = self.render();
        self.store.write(&doc.to_string())
    }

    fn render(&self) -> Value {
        let cfg = &*self.config;

        let mut leds = Map::new();
        for (id, led) in &cfg.leds {
            leds.insert(
                id.clone(),
                json!({
                    "pin": led.desc.pin,
                    "color": led.desc.color,
                    "location": led.desc.location,
                    "type": led.desc.kind,
                }),
            );
        }

        let mut motors = Map::new();
        for (id, motor) in &cfg.motors {
            motors.insert(
                id.clone(),
                json!({
                    "pin_on": motor.desc.pin_on,
                    "pin_dir": motor.desc.pin_dir,
                    "type": motor.desc.kind,
                    "location": motor.desc.location,
                }),
            );
        }

        let mut sensors = Map::new();
        for (id, sensor) in &cfg.sensors {
            let mut entry = json!({
                "pin": sensor.desc.pin,
                "type": sensor.desc.kind,
                "location": sensor.desc.location,
                "unit": sensor.desc.unit,
                "adc": sensor.desc.analog,
            });
            if let Some(cal) = sensor.calibration.lock().unwrap().to_value() {
                entry["config"] = cal;
            }
            sensors.insert(id.clone(), entry);
        }

        json!({
            "wifi": cfg.wifi,
            "server": cfg.server,
            "leds": leds,
            "motors": motors,
            "sensors": sensors,
        })
    }

    // ── Read accessors for the request layer ──────────────────

    /// All LEDs with live output state, optionally filtered by color or
    /// location (an entry matches if either given attribute matches;
    /// no filters returns everything).
    pub fn leds(&self, color: Option<&str>, location: Option<&str>) -> Vec<LedStatus> {
        self.config
            .leds
            .values()
            .filter(|led| {
                matches_filter(
                    &[
                        (color, led.desc.color.as_str()),
                        (location, led.desc.location.as_str()),
                    ],
                )
            })
            .map(|led| LedStatus {
                id: led.desc.id.clone(),
                color: led.desc.color.clone(),
                location: led.desc.location.clone(),
                kind: led.desc.kind.clone(),
                state: led.binding.read_digital(),
            })
            .collect()
    }

    /// All sensors with their current calibration, optionally filtered by
    /// kind or location.
    pub fn sensors(&self, kind: Option<&str>, location: Option<&str>) -> Vec<SensorInfo> {
        self.config
            .sensors
            .values()
            .filter(|s| {
                matches_filter(
                    &[
                        (kind, s.desc.kind.as_str()),
                        (location, s.desc.location.as_str()),
                    ],
                )
            })
            .map(|s| SensorInfo {
                id: s.desc.id.clone(),
                kind: s.desc.kind.clone(),
                location: s.desc.location.clone(),
                unit: s.desc.unit.clone(),
                analog: s.desc.analog,
                calibration: s.calibration.lock().unwrap().to_value(),
            })
            .collect()
    }

    /// All motors with live enable state, optionally filtered by kind or
    /// location.
    pub fn motors(&self, kind: Option<&str>, location: Option<&str>) -> Vec<MotorStatus> {
        self.config
            .motors
            .values()
            .filter(|m| {
                matches_filter(
                    &[
                        (kind, m.desc.kind.as_str()),
                        (location, m.desc.location.as_str()),
                    ],
                )
            })
            .map(BoundMotor::status)
            .collect()
    }

    /// Sample a sensor and apply its calibration.
    pub fn read_sensor(&self, sensor_id: &str) -> Result<SensorReading, ConfigError> {
        let sensor = self
            .config
            .sensors
            .get(sensor_id)
            .ok_or_else(|| ConfigError::UnknownSensor(sensor_id.to_owned()))?;

        let raw = if sensor.desc.analog {
            sensor.binding.read_raw()
        } else {
            u16::from(sensor.binding.read_digital())
        };
        let calibrated = sensor.calibration.lock().unwrap().apply(f64::from(raw));

        Ok(SensorReading {
            id: sensor.desc.id.clone(),
            raw,
            calibrated,
            kind: sensor.desc.kind.clone(),
            location: sensor.desc.location.clone(),
            unit: sensor.desc.unit.clone(),
        })
    }

    /// Example conversion through the sensor's current calibration —
    /// what a given raw count would read as, without touching hardware.
    pub fn calibration_preview(&self, sensor_id: &str, raw: u16) -> Result<f64, ConfigError> {
        let sensor = self
            .config
            .sensors
            .get(sensor_id)
            .ok_or_else(|| ConfigError::UnknownSensor(sensor_id.to_owned()))?;
        Ok(sensor.calibration.lock().unwrap().apply(f64::from(raw)))
    }
}

fn claim(
    gpio: &Arc<dyn GpioBackend>,
    pin: u8,
    mode: PinMode,
    entry: &str,
) -> Result<DeviceBinding, ConfigError> {
    DeviceBinding::bind(gpio.clone(), pin, mode).map_err(|e| ConfigError::DuplicatePin {
        pin: e.pin,
        entry: entry.to_owned(),
    })
}

/// Filter semantics of the original resource listings: an entry matches if
/// any present filter matches its attribute; with no filters, everything
/// matches.
fn matches_filter(pairs: &[(Option<&str>, &str)]) -> bool {
    let any_set = pairs.iter().any(|(f, _)| f.is_some());
    if !any_set {
        return true;
    }
    pairs
        .iter()
        .any(|(f, attr)| f.is_some_and(|wanted| wanted == *attr))
}
