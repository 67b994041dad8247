//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter      | Implements      | Connects to                       |
//! |--------------|-----------------|-----------------------------------|
//! | `gpio`       | GpioBackend     | ESP32 GPIO/ADC or in-memory sim   |
//! | `file_store` | DocumentStore   | Flash VFS file or in-memory store |
//! | `delay`      | DelayPort       | Reactor timer or test clock       |

pub mod delay;
pub mod file_store;
pub mod gpio;

#[cfg(not(target_os = "espidf"))]
pub use delay::{ManualDelay, NoopDelay};
#[cfg(target_os = "espidf")]
pub use delay::TimerDelay;
