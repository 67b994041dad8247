//! Four-coil stepper sequencer (28BYJ-48 / ULN2003 class drivers).
//!
//! Walks the fixed 8-phase half-step sequence across four digital outputs.
//! The inter-phase hold is a hard timing contract, not a tunable: advancing
//! the coils faster than the rotor can follow causes missed steps and
//! stall on real coil drivers.

use core::time::Duration;
use std::sync::Arc;

use embedded_hal::digital::OutputPin;

use crate::actuator::Direction;
use crate::drivers::binding::DeviceBinding;
use crate::error::ActuatorError;
use crate::ports::{DelayPort, GpioBackend, PinClaimError, PinMode};

/// Half-step coil energisation sequence, IN1..IN4.
pub const HALF_STEP_SEQUENCE: [[bool; 4]; 8] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

/// Hold time between phase transitions.
pub const INTER_PHASE_DELAY: Duration = Duration::from_millis(2);

/// A stepper modeled as four exclusively owned digital outputs.
pub struct Stepper {
    coils: [DeviceBinding; 4],
}

impl Stepper {
    /// Claim the four coil pins (IN1..IN4 order).
    pub fn bind(gpio: &Arc<dyn GpioBackend>, pins: [u8; 4]) -> Result<Self, PinClaimError> {
        let [p1, p2, p3, p4] = pins;
        Ok(Self {
            coils: [
                DeviceBinding::bind(gpio.clone(), p1, PinMode::DigitalOut)?,
                DeviceBinding::bind(gpio.clone(), p2, PinMode::DigitalOut)?,
                DeviceBinding::bind(gpio.clone(), p3, PinMode::DigitalOut)?,
                DeviceBinding::bind(gpio.clone(), p4, PinMode::DigitalOut)?,
            ],
        })
    }

    /// Walk the half-step sequence `steps` times in `direction` (cw walks
    /// forward, ccw reversed), holding [`INTER_PHASE_DELAY`] after every
    /// phase transition. Returns the number of phase transitions driven.
    ///
    /// The hold suspends on the delay port, so long moves do not block
    /// unrelated requests.
    pub async fn run(
        &mut self,
        direction: Direction,
        steps: i64,
        delay: &impl DelayPort,
    ) -> Result<u32, ActuatorError> {
        if steps <= 0 {
            return Err(ActuatorError::InvalidSteps(steps));
        }

        let mut transitions = 0u32;
        for _ in 0..steps {
            for idx in 0..HALF_STEP_SEQUENCE.len() {
                let phase = match direction {
                    Direction::Cw => HALF_STEP_SEQUENCE[idx],
                    Direction::Ccw => HALF_STEP_SEQUENCE[HALF_STEP_SEQUENCE.len() - 1 - idx],
                };
                self.set_phase(phase);
                transitions += 1;
                delay.delay(INTER_PHASE_DELAY).await;
            }
        }
        Ok(transitions)
    }

    /// De-energise all coils (free-spinning hold release).
    pub fn off(&mut self) {
        self.set_phase([false; 4]);
    }

    fn set_phase(&mut self, phase: [bool; 4]) {
        for (coil, energise) in self.coils.iter_mut().zip(phase) {
            // Infallible on this binding type.
            let _ = if energise {
                coil.set_high()
            } else {
                coil.set_low()
            };
        }
    }
}
