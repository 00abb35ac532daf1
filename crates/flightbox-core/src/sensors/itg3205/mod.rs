//! ITG-3205 3-axis rate gyroscope
//!
//! Register configuration goes through explicit masks: callers combine
//! flags with `|` before the call and the driver writes, sets or clears
//! exactly those bits.

pub mod registers;

use embedded_hal::i2c::{ErrorKind, I2c};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::bus::Registers;
use crate::sensors::{Sensor, SensorError, SensorReadings};

pub use registers::{
    ClockSource, InterruptConfig, InterruptStatus, Itg3205Register, LowPassFilter, PowerFlags,
    PowerManagement,
};
use registers::{DEFAULT_ADDRESS, FULL_SCALE_2000_DPS, SENSITIVITY_LSB_PER_DPS};

const SENSOR_NAME: &str = "ITG3205";

/// Register values written when the driver is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GyroscopeConfig {
    pub address: u8,
    pub power: PowerManagement,
    /// Output rate = internal rate / (divider + 1)
    pub sample_rate_divider: u8,
    pub low_pass: LowPassFilter,
    pub interrupt: InterruptConfig,
}

impl Default for GyroscopeConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            power: PowerManagement::default(),
            sample_rate_divider: 0x07,
            low_pass: LowPassFilter::default(),
            interrupt: InterruptConfig::default(),
        }
    }
}

/// Angular rates in milli-degrees per second.
pub struct GyroscopeReadings {
    pub x_milli_dps: i32,
    pub y_milli_dps: i32,
    pub z_milli_dps: i32,
}

impl SensorReadings<3> for GyroscopeReadings {
    fn to_array(self) -> [i32; 3] {
        [self.x_milli_dps, self.y_milli_dps, self.z_milli_dps]
    }
}

pub struct Itg3205<I> {
    registers: Registers<I>,
}

impl<I: I2c> Itg3205<I> {
    /// Create the driver and write the power, sample rate, filter and
    /// interrupt registers from `config`.
    pub fn new(i2c: I, config: GyroscopeConfig) -> Result<Self, SensorError> {
        let mut gyro = Self {
            registers: Registers::new(i2c, config.address),
        };

        gyro.set_power_management(config.power)?;
        gyro.set_sample_rate_divider(config.sample_rate_divider)?;
        gyro.set_dlpf(config.low_pass)?;
        gyro.set_interrupt_config(config.interrupt)?;

        info!(
            "ITG3205: configured at 0x{:02x}, DLPF {:?}, divider {}",
            config.address, config.low_pass, config.sample_rate_divider
        );

        Ok(gyro)
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.registers.release()
    }

    pub fn read_register(&mut self, register: Itg3205Register) -> Result<u8, SensorError> {
        self.registers
            .read_u8(register as u8)
            .map_err(transport("read register"))
    }

    /// Overwrite `register` with `mask`.
    pub fn set_register(&mut self, register: Itg3205Register, mask: u8) -> Result<(), SensorError> {
        debug!("ITG3205: {:?} <- {:#010b}", register, mask);
        self.registers
            .write_byte(register as u8, mask)
            .map_err(transport("write register"))
    }

    /// Set the bits of `mask` in `register`, keeping the others.
    pub fn add_to_register(
        &mut self,
        register: Itg3205Register,
        mask: u8,
    ) -> Result<(), SensorError> {
        let current = self.read_register(register)?;
        self.set_register(register, current | mask)
    }

    /// Clear the bits of `mask` in `register`, keeping the others.
    pub fn remove_from_register(
        &mut self,
        register: Itg3205Register,
        mask: u8,
    ) -> Result<(), SensorError> {
        let current = self.read_register(register)?;
        self.set_register(register, current & !mask)
    }

    /// Bits of `register`, most significant first.
    pub fn register_bits(&mut self, register: Itg3205Register) -> Result<[bool; 8], SensorError> {
        let value = self.read_register(register)?;
        Ok(core::array::from_fn(|i| value & (0x80 >> i) != 0))
    }

    pub fn set_power_management(&mut self, power: PowerManagement) -> Result<(), SensorError> {
        self.set_register(Itg3205Register::PowerManagement, power.bits())
    }

    pub fn set_sample_rate_divider(&mut self, divider: u8) -> Result<(), SensorError> {
        self.set_register(Itg3205Register::SampleRateDivider, divider)
    }

    /// Select the filter bandwidth. The full-scale bits are always written
    /// along with it.
    pub fn set_dlpf(&mut self, filter: LowPassFilter) -> Result<(), SensorError> {
        self.set_register(
            Itg3205Register::DlpfFullScale,
            FULL_SCALE_2000_DPS | filter as u8,
        )
    }

    pub fn set_interrupt_config(&mut self, config: InterruptConfig) -> Result<(), SensorError> {
        self.set_register(Itg3205Register::InterruptConfig, config.bits())
    }

    pub fn who_am_i(&mut self) -> Result<u8, SensorError> {
        self.read_register(Itg3205Register::WhoAmI)
    }

    pub fn interrupt_status(&mut self) -> Result<InterruptStatus, SensorError> {
        let value = self.read_register(Itg3205Register::InterruptStatus)?;
        Ok(InterruptStatus::from_bits_truncate(value))
    }

    /// Die temperature in °C.
    pub fn die_temperature(&mut self) -> Result<f64, SensorError> {
        let raw = self
            .registers
            .read_i16(Itg3205Register::TempOutH as u8)
            .map_err(transport("read temperature"))?;

        Ok(35.0 + (f64::from(raw) + 13_200.0) / 280.0)
    }

    /// Raw angular rates for the X, Y and Z axes.
    pub fn axes(&mut self) -> Result<(i16, i16, i16), SensorError> {
        let mut buf = [0u8; 6];
        self.registers
            .read_bytes(Itg3205Register::GyroXoutH as u8, &mut buf)
            .map_err(transport("read axes"))?;

        Ok((
            i16::from_be_bytes([buf[0], buf[1]]),
            i16::from_be_bytes([buf[2], buf[3]]),
            i16::from_be_bytes([buf[4], buf[5]]),
        ))
    }

    /// Angular rates in °/s.
    pub fn deg_per_sec_axes(&mut self) -> Result<(f64, f64, f64), SensorError> {
        let (x, y, z) = self.axes()?;
        Ok((to_dps(x), to_dps(y), to_dps(z)))
    }
}

impl<I: I2c> Sensor<3> for Itg3205<I> {
    type Readings = GyroscopeReadings;

    fn read(&mut self) -> Result<GyroscopeReadings, SensorError> {
        let (x, y, z) = self.axes()?;
        Ok(GyroscopeReadings {
            x_milli_dps: to_milli_dps(x),
            y_milli_dps: to_milli_dps(y),
            z_milli_dps: to_milli_dps(z),
        })
    }
}

fn to_dps(raw: i16) -> f64 {
    f64::from(raw) / SENSITIVITY_LSB_PER_DPS
}

// 14.375 LSB/(°/s) == 115/8, so this stays in integers
fn to_milli_dps(raw: i16) -> i32 {
    i32::from(raw) * 8_000 / 115
}

fn transport(operation: &'static str) -> impl FnOnce(ErrorKind) -> SensorError {
    move |kind| {
        error!("ITG3205 {} failed: {:?}", operation, kind);
        SensorError::Transport {
            sensor: SENSOR_NAME,
            operation,
            kind,
        }
    }
}
