//! Port traits — the boundary between the core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ConfigStore / ActuatorController
//! ```
//!
//! Driven adapters (GPIO backend, document store, delay source) implement
//! these traits. The core consumes them via generics or trait objects, so it
//! never touches hardware or the filesystem directly and every operation is
//! testable with mock adapters on the host.

use core::future::Future;
use core::time::Duration;

use crate::error::StoreError;

// ───────────────────────────────────────────────────────────────
// GPIO backend (driven adapter: core ↔ pins)
// ───────────────────────────────────────────────────────────────

/// How a claimed pin is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    DigitalOut,
    DigitalIn,
    /// ADC input channel.
    AnalogIn,
}

/// Claim refused: the pin is already owned by another binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinClaimError {
    pub pin: u8,
}

/// Capability interface over one GPIO controller.
///
/// Implementations use interior mutability so bindings can share the backend
/// behind an `Arc`. A pin must be `claim`ed before any read or write; the
/// claim registry is what makes double-binding a load-time error instead of
/// undefined hardware behaviour.
pub trait GpioBackend: Send + Sync {
    /// Acquire exclusive ownership of `pin` and configure it for `mode`.
    fn claim(&self, pin: u8, mode: PinMode) -> Result<(), PinClaimError>;

    /// Return a claimed pin to the pool. Idempotent.
    fn release(&self, pin: u8);

    /// Drive a digital output level.
    fn write_digital(&self, pin: u8, high: bool);

    /// Read the current digital level (output pins read back their
    /// last-driven level).
    fn read_digital(&self, pin: u8) -> bool;

    /// Invert a digital output and return the new level.
    fn toggle(&self, pin: u8) -> bool;

    /// Read a raw ADC sample from an analog-in pin.
    fn read_raw(&self, pin: u8) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Document store (driven adapter: core ↔ persistent document)
// ───────────────────────────────────────────────────────────────

/// Whole-document persistence for the configuration JSON.
///
/// Reads and writes are whole-file; implementations must make `write`
/// atomic (no torn documents visible to a later `read`) and serialize
/// concurrent writers.
pub trait DocumentStore: Send + Sync {
    fn read(&self) -> Result<String, StoreError>;
    fn write(&self, contents: &str) -> Result<(), StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    fn read(&self) -> Result<String, StoreError> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        (**self).write(contents)
    }
}

// ───────────────────────────────────────────────────────────────
// Delay source (driven adapter: core ↔ time)
// ───────────────────────────────────────────────────────────────

/// Cooperative timed wait.
///
/// Timed actuator runs and the stepper's inter-phase hold suspend on this
/// port instead of sleeping the thread, so unrelated requests stay servable.
/// On target the adapter is a reactor timer; host tests inject a
/// deterministic mock.
pub trait DelayPort {
    fn delay(&self, duration: Duration) -> impl Future<Output = ()>;
}
