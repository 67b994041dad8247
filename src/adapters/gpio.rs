//! GPIO backend adapters.
//!
//! [`EspGpio`] drives real pins through raw ESP-IDF sys calls (GPIO config +
//! one-shot ADC, mirroring the boot-time peripheral setup pattern).
//! [`SimGpio`] is the host-target twin: an in-memory pin table that records
//! every write so tests can assert on full pin histories.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ports::{GpioBackend, PinClaimError, PinMode};

// ───────────────────────────────────────────────────────────────
// Host simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
struct SimPin {
    mode: PinMode,
    claimed: bool,
    level: bool,
    raw: u16,
    writes: Vec<bool>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimPin {
    fn default() -> Self {
        Self {
            mode: PinMode::DigitalIn,
            claimed: false,
            level: false,
            raw: 0,
            writes: Vec::new(),
        }
    }
}

/// In-memory GPIO backend for host tests.
#[cfg(not(target_os = "espidf"))]
pub struct SimGpio {
    pins: Mutex<HashMap<u8, SimPin>>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimGpio {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl SimGpio {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(HashMap::new()),
        }
    }

    /// Inject a raw ADC sample for an analog pin.
    pub fn set_raw(&self, pin: u8, raw: u16) {
        self.pins.lock().unwrap().entry(pin).or_default().raw = raw;
    }

    /// Inject a digital input level.
    pub fn set_level(&self, pin: u8, high: bool) {
        self.pins.lock().unwrap().entry(pin).or_default().level = high;
    }

    /// Current driven/injected level of a pin.
    pub fn level(&self, pin: u8) -> bool {
        self.pins
            .lock()
            .unwrap()
            .get(&pin)
            .is_some_and(|p| p.level)
    }

    /// Every digital write issued against `pin`, in order.
    pub fn write_history(&self, pin: u8) -> Vec<bool> {
        self.pins
            .lock()
            .unwrap()
            .get(&pin)
            .map(|p| p.writes.clone())
            .unwrap_or_default()
    }

    /// Number of pins currently claimed (load fail-fast assertions).
    pub fn claimed_count(&self) -> usize {
        self.pins
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.claimed)
            .count()
    }
}

#[cfg(not(target_os = "espidf"))]
impl GpioBackend for SimGpio {
    fn claim(&self, pin: u8, mode: PinMode) -> Result<(), PinClaimError> {
        let mut pins = self.pins.lock().unwrap();
        let entry = pins.entry(pin).or_default();
        if entry.claimed {
            return Err(PinClaimError { pin });
        }
        entry.claimed = true;
        entry.mode = mode;
        if mode == PinMode::DigitalOut {
            entry.level = false;
        }
        Ok(())
    }

    fn release(&self, pin: u8) {
        if let Some(entry) = self.pins.lock().unwrap().get_mut(&pin) {
            entry.claimed = false;
        }
    }

    fn write_digital(&self, pin: u8, high: bool) {
        let mut pins = self.pins.lock().unwrap();
        let entry = pins.entry(pin).or_default();
        entry.level = high;
        entry.writes.push(high);
    }

    fn read_digital(&self, pin: u8) -> bool {
        self.pins
            .lock()
            .unwrap()
            .get(&pin)
            .is_some_and(|p| p.level)
    }

    fn toggle(&self, pin: u8) -> bool {
        let mut pins = self.pins.lock().unwrap();
        let entry = pins.entry(pin).or_default();
        entry.level = !entry.level;
        let level = entry.level;
        entry.writes.push(level);
        level
    }

    fn read_raw(&self, pin: u8) -> u16 {
        self.pins.lock().unwrap().get(&pin).map_or(0, |p| p.raw)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

/// Real GPIO/ADC backend over raw `esp_idf_svc::sys` calls.
///
/// Output levels are shadowed in memory because output pins do not have
/// their input buffers enabled; `read_digital`/`toggle` on outputs use the
/// shadow, inputs go to the hardware register.
#[cfg(target_os = "espidf")]
pub struct EspGpio {
    state: Mutex<EspState>,
}

#[cfg(target_os = "espidf")]
struct EspState {
    claimed: HashMap<u8, PinMode>,
    levels: HashMap<u8, bool>,
    adc1: esp_idf_svc::sys::adc_oneshot_unit_handle_t,
}

// SAFETY: the raw ADC handle is only touched under the state mutex.
#[cfg(target_os = "espidf")]
unsafe impl Send for EspGpio {}
#[cfg(target_os = "espidf")]
unsafe impl Sync for EspGpio {}

#[cfg(target_os = "espidf")]
impl EspGpio {
    /// Create the backend and bring up the ADC1 one-shot unit.
    pub fn new() -> anyhow::Result<Self> {
        use esp_idf_svc::sys::*;

        let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        // SAFETY: called once before any binding exists.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut handle) };
        if ret != ESP_OK as i32 {
            anyhow::bail!("ADC1 one-shot init failed (rc={ret})");
        }

        Ok(Self {
            state: Mutex::new(EspState {
                claimed: HashMap::new(),
                levels: HashMap::new(),
                adc1: handle,
            }),
        })
    }

    fn configure(&self, pin: u8, mode: PinMode, state: &mut EspState) -> bool {
        use esp_idf_svc::sys::*;

        match mode {
            PinMode::DigitalOut | PinMode::DigitalIn => {
                let cfg = gpio_config_t {
                    pin_bit_mask: 1u64 << pin,
                    mode: if mode == PinMode::DigitalOut {
                        gpio_mode_t_GPIO_MODE_OUTPUT
                    } else {
                        gpio_mode_t_GPIO_MODE_INPUT
                    },
                    pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                    pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
                    intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
                };
                // SAFETY: pin ownership is guaranteed by the claim registry.
                unsafe { gpio_config(&cfg) == ESP_OK as i32 }
            }
            PinMode::AnalogIn => {
                let mut unit: adc_unit_t = 0;
                let mut channel: adc_channel_t = 0;
                // SAFETY: pure lookup from GPIO number to ADC channel.
                let ret =
                    unsafe { adc_oneshot_io_to_channel(i32::from(pin), &mut unit, &mut channel) };
                if ret != ESP_OK as i32 || unit != adc_unit_t_ADC_UNIT_1 {
                    return false;
                }
                let chan_cfg = adc_oneshot_chan_cfg_t {
                    atten: adc_atten_t_ADC_ATTEN_DB_11,
                    bitwidth: adc_bitwidth_t_ADC_BITWIDTH_DEFAULT,
                };
                // SAFETY: handle is live for the adapter's lifetime.
                unsafe { adc_oneshot_config_channel(state.adc1, channel, &chan_cfg) == ESP_OK as i32 }
            }
        }
    }
}

#[cfg(target_os = "espidf")]
impl GpioBackend for EspGpio {
    fn claim(&self, pin: u8, mode: PinMode) -> Result<(), PinClaimError> {
        let mut state = self.state.lock().unwrap();
        if state.claimed.contains_key(&pin) {
            return Err(PinClaimError { pin });
        }
        if !self.configure(pin, mode, &mut state) {
            log::warn!("gpio: configure failed for pin {pin} ({mode:?})");
            return Err(PinClaimError { pin });
        }
        state.claimed.insert(pin, mode);
        state.levels.insert(pin, false);
        Ok(())
    }

    fn release(&self, pin: u8) {
        let mut state = self.state.lock().unwrap();
        state.claimed.remove(&pin);
        state.levels.remove(&pin);
    }

    fn write_digital(&self, pin: u8, high: bool) {
        use esp_idf_svc::sys::gpio_set_level;
        let mut state = self.state.lock().unwrap();
        // SAFETY: pin was configured as output at claim time.
        unsafe {
            gpio_set_level(i32::from(pin), u32::from(high));
        }
        state.levels.insert(pin, high);
    }

    fn read_digital(&self, pin: u8) -> bool {
        use esp_idf_svc::sys::gpio_get_level;
        let state = self.state.lock().unwrap();
        match state.claimed.get(&pin) {
            Some(PinMode::DigitalOut) => state.levels.get(&pin).copied().unwrap_or(false),
            // SAFETY: input pins read the level register directly.
            _ => unsafe { gpio_get_level(i32::from(pin)) != 0 },
        }
    }

    fn toggle(&self, pin: u8) -> bool {
        let next = !self.read_digital(pin);
        self.write_digital(pin, next);
        next
    }

    fn read_raw(&self, pin: u8) -> u16 {
        use esp_idf_svc::sys::*;
        let state = self.state.lock().unwrap();
        let mut unit: adc_unit_t = 0;
        let mut channel: adc_channel_t = 0;
        let mut sample: core::ffi::c_int = 0;
        // SAFETY: channel was configured at claim time; handle is live.
        let ret = unsafe {
            if adc_oneshot_io_to_channel(i32::from(pin), &mut unit, &mut channel) != ESP_OK as i32 {
                return 0;
            }
            adc_oneshot_read(state.adc1, channel, &mut sample)
        };
        if ret != ESP_OK as i32 {
            log::warn!("gpio: ADC read failed on pin {pin} (rc={ret})");
            return 0;
        }
        sample as u16
    }
}
