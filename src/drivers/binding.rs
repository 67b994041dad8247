//! Exclusive ownership of one physical pin/channel.
//!
//! A [`DeviceBinding`] is created exactly once per descriptor at
//! configuration load and lives for the process lifetime. Ownership is
//! enforced through the backend's claim registry; dropping a binding
//! releases the claim, which is what makes a failed load attempt leave no
//! pins dangling.

use std::sync::Arc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use crate::ports::{GpioBackend, PinClaimError, PinMode};

/// Runtime object exclusively owning a physical pin in one mode.
pub struct DeviceBinding {
    gpio: Arc<dyn GpioBackend>,
    pin: u8,
    mode: PinMode,
}

impl DeviceBinding {
    /// Claim `pin` from the backend and configure it for `mode`.
    pub fn bind(
        gpio: Arc<dyn GpioBackend>,
        pin: u8,
        mode: PinMode,
    ) -> Result<Self, PinClaimError> {
        gpio.claim(pin, mode)?;
        Ok(Self { gpio, pin, mode })
    }

    /// Stable pin identifier this binding owns.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn mode(&self) -> PinMode {
        self.mode
    }

    pub fn write_digital(&self, high: bool) {
        self.gpio.write_digital(self.pin, high);
    }

    pub fn read_digital(&self) -> bool {
        self.gpio.read_digital(self.pin)
    }

    /// Invert the output level and return the new state.
    pub fn toggle(&self) -> bool {
        self.gpio.toggle(self.pin)
    }

    /// Raw ADC sample (analog-in bindings).
    pub fn read_raw(&self) -> u16 {
        self.gpio.read_raw(self.pin)
    }
}

impl Drop for DeviceBinding {
    fn drop(&mut self) {
        self.gpio.release(self.pin);
    }
}

impl core::fmt::Debug for DeviceBinding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceBinding")
            .field("pin", &self.pin)
            .field("mode", &self.mode)
            .finish()
    }
}

// ── embedded-hal digital traits ───────────────────────────────
//
// Lets generic drivers (the stepper sequencer) drive a binding through the
// standard HAL vocabulary instead of a bespoke interface.

impl ErrorType for DeviceBinding {
    type Error = core::convert::Infallible;
}

impl OutputPin for DeviceBinding {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_digital(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_digital(true);
        Ok(())
    }
}

impl StatefulOutputPin for DeviceBinding {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_digital())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read_digital())
    }
}

impl InputPin for DeviceBinding {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_digital())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read_digital())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::adapters::gpio::SimGpio;

    #[test]
    fn double_claim_is_rejected() {
        let gpio: Arc<dyn GpioBackend> = Arc::new(SimGpio::new());
        let first = DeviceBinding::bind(gpio.clone(), 5, PinMode::DigitalOut).unwrap();
        let second = DeviceBinding::bind(gpio.clone(), 5, PinMode::DigitalIn);
        assert_eq!(second.unwrap_err(), PinClaimError { pin: 5 });
        drop(first);
        // Released on drop — rebinding succeeds.
        assert!(DeviceBinding::bind(gpio, 5, PinMode::AnalogIn).is_ok());
    }

    #[test]
    fn toggle_inverts_level() {
        let gpio: Arc<dyn GpioBackend> = Arc::new(SimGpio::new());
        let led = DeviceBinding::bind(gpio, 2, PinMode::DigitalOut).unwrap();
        assert!(!led.read_digital());
        assert!(led.toggle());
        assert!(!led.toggle());
    }
}
