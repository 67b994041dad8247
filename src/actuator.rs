//! Actuator command model — LEDs and timed, direction-aware motor runs.
//!
//! Timed runs are cooperative: the caller's own response suspends on the
//! [`DelayPort`] until the auto-off fires, while commands against other
//! resources stay servable. A manual stop pre-empts a pending auto-off by
//! deasserting immediately and bumping the motor's generation counter, so
//! the stale auto-off is a no-op when it later fires instead of
//! re-asserting old direction state.

use core::sync::atomic::Ordering;
use core::time::Duration;
use std::sync::Arc;

use log::info;

use crate::config::{BoundConfiguration, BoundMotor, MotorStatus};
use crate::error::{ActuatorError, ConfigError};
use crate::ports::DelayPort;

/// Motor rotation direction.
///
/// Encoded on the H-bridge input pair the way the board wires it:
/// CW drives enable=1/dir=0, CCW drives enable=0/dir=1. The two states are
/// distinct on the pin pair; "state" in [`MotorStatus`] reports the
/// enable-pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Cw,
    Ccw,
}

impl Direction {
    /// Parse a request token. Only "cw" and "ccw" are recognised.
    pub fn from_token(token: &str) -> Result<Self, ActuatorError> {
        match token {
            "cw" => Ok(Self::Cw),
            "ccw" => Ok(Self::Ccw),
            other => Err(ActuatorError::InvalidDirection(other.to_owned())),
        }
    }
}

impl BoundMotor {
    pub(crate) fn engage(&self, direction: Direction) {
        match direction {
            Direction::Cw => {
                self.direction.write_digital(false);
                self.enable.write_digital(true);
            }
            Direction::Ccw => {
                self.direction.write_digital(true);
                self.enable.write_digital(false);
            }
        }
    }

    /// Deassert both pins (coast). Safe to call on a stopped motor.
    pub(crate) fn disengage(&self) {
        self.enable.write_digital(false);
        self.direction.write_digital(false);
    }
}

/// Exposes toggle/on/off for LEDs and timed run commands for motors,
/// operating on the bound resources of one [`BoundConfiguration`].
pub struct ActuatorController {
    config: Arc<BoundConfiguration>,
}

impl ActuatorController {
    pub fn new(config: Arc<BoundConfiguration>) -> Self {
        Self { config }
    }

    // ── LEDs ──────────────────────────────────────────────────

    /// Turn an LED on; returns the resulting output state.
    pub fn led_on(&self, id: &str) -> Result<bool, ConfigError> {
        let led = self.led(id)?;
        led.binding.write_digital(true);
        Ok(led.binding.read_digital())
    }

    /// Turn an LED off; returns the resulting output state.
    pub fn led_off(&self, id: &str) -> Result<bool, ConfigError> {
        let led = self.led(id)?;
        led.binding.write_digital(false);
        Ok(led.binding.read_digital())
    }

    /// Invert an LED; returns the resulting output state.
    pub fn led_toggle(&self, id: &str) -> Result<bool, ConfigError> {
        Ok(self.led(id)?.binding.toggle())
    }

    fn led<'a>(&'a self, id: &str) -> Result<&'a crate::config::BoundLed, ConfigError> {
        self.config
            .led(id)
            .ok_or_else(|| ConfigError::UnknownLed(id.to_owned()))
    }

    // ── Motors ────────────────────────────────────────────────

    /// Run a motor in `direction`. With `duration_secs > 0` the motor is
    /// automatically stopped after the duration elapses; the await spans
    /// the wait so the command's response reflects the completed run.
    /// With `duration_secs == 0` the motor runs until [`stop_motor`].
    ///
    /// [`stop_motor`]: Self::stop_motor
    pub async fn run_motor(
        &self,
        id: &str,
        direction: Direction,
        duration_secs: u32,
        delay: &impl DelayPort,
    ) -> Result<MotorStatus, ConfigError> {
        let motor = self.motor(id)?;

        let run_generation = {
            let _cmd = motor.command_lock.lock().await;
            motor.engage(direction);
            motor.generation.fetch_add(1, Ordering::AcqRel) + 1
        };
        info!(
            "motor '{id}': on ({direction:?}, {})",
            if duration_secs > 0 {
                format!("{duration_secs}s")
            } else {
                "until stopped".to_owned()
            }
        );

        if duration_secs > 0 {
            delay
                .delay(Duration::from_secs(u64::from(duration_secs)))
                .await;
            let _cmd = motor.command_lock.lock().await;
            // A manual stop (or a newer run) moved the generation on;
            // this auto-off is stale and must not touch the pins.
            if motor.generation.load(Ordering::Acquire) == run_generation {
                motor.disengage();
                info!("motor '{id}': auto-off after {duration_secs}s");
            }
        }

        Ok(self.motor_status(motor))
    }

    /// Stop a motor immediately. Idempotent; pre-empts a pending auto-off.
    pub async fn stop_motor(&self, id: &str) -> Result<MotorStatus, ConfigError> {
        let motor = self.motor(id)?;
        let _cmd = motor.command_lock.lock().await;
        motor.generation.fetch_add(1, Ordering::AcqRel);
        motor.disengage();
        info!("motor '{id}': off");
        Ok(self.motor_status(motor))
    }

    fn motor<'a>(&'a self, id: &str) -> Result<&'a BoundMotor, ConfigError> {
        self.config
            .motor(id)
            .ok_or_else(|| ConfigError::UnknownMotor(id.to_owned()))
    }

    fn motor_status(&self, motor: &BoundMotor) -> MotorStatus {
        motor.status()
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::adapters::gpio::SimGpio;
    use crate::config::Document;
    use crate::ports::GpioBackend;

    fn bound() -> (Arc<SimGpio>, Arc<BoundConfiguration>) {
        let gpio = Arc::new(SimGpio::new());
        let doc: Document = serde_json::from_value(serde_json::json!({
            "wifi": {"ssid": "net", "password": "pw"},
            "server": {"port": 80},
            "leds": {
                "porch": {"pin": 2, "color": "red", "location": "porch", "type": "led"},
            },
            "sensors": {},
            "motors": {
                "pump1": {"pin_on": 4, "pin_dir": 5, "type": "dc", "location": "garden"},
            },
        }))
        .unwrap();
        let backend: Arc<dyn GpioBackend> = gpio.clone();
        let config = Arc::new(BoundConfiguration::bind(&doc, &backend).unwrap());
        (gpio, config)
    }

    #[test]
    fn led_ops_report_resulting_state() {
        let (_gpio, config) = bound();
        let ctl = ActuatorController::new(config);
        assert!(ctl.led_on("porch").unwrap());
        assert!(!ctl.led_off("porch").unwrap());
        assert!(ctl.led_toggle("porch").unwrap());
        assert_eq!(
            ctl.led_on("missing").unwrap_err(),
            ConfigError::UnknownLed("missing".into())
        );
    }

    #[test]
    fn direction_tokens() {
        assert_eq!(Direction::from_token("cw").unwrap(), Direction::Cw);
        assert_eq!(Direction::from_token("ccw").unwrap(), Direction::Ccw);
        assert_eq!(
            Direction::from_token("up").unwrap_err(),
            ActuatorError::InvalidDirection("up".into())
        );
    }

    #[test]
    fn indefinite_run_and_idempotent_stop() {
        let (gpio, config) = bound();
        let ctl = ActuatorController::new(config);
        let delay = crate::adapters::NoopDelay;

        let status = futures_lite::future::block_on(async {
            ctl.run_motor("pump1", Direction::Cw, 0, &delay).await
        })
        .unwrap();
        assert!(status.state);
        assert!(gpio.level(4));
        assert!(!gpio.level(5));

        for _ in 0..2 {
            let status =
                futures_lite::future::block_on(ctl.stop_motor("pump1")).unwrap();
            assert!(!status.state);
            assert!(!gpio.level(4));
            assert!(!gpio.level(5));
        }
    }

    #[test]
    fn ccw_engages_direction_pin() {
        let (gpio, config) = bound();
        let ctl = ActuatorController::new(config);
        let delay = crate::adapters::NoopDelay;
        futures_lite::future::block_on(ctl.run_motor("pump1", Direction::Ccw, 0, &delay))
            .unwrap();
        assert!(!gpio.level(4));
        assert!(gpio.level(5));
    }
}
