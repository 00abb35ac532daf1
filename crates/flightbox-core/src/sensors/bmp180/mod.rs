//! BMP180 barometric pressure and temperature sensor
//!
//! The driver owns its bus handle and delay provider. Calibration is loaded
//! once in [`Bmp180::new`]; every read after that triggers a fresh one-shot
//! conversion, blocks for the configured settle time and compensates the
//! result. Nothing is cached between reads.

pub mod calibration;
pub mod compensation;
pub mod config;
pub mod registers;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, I2c};
use log::{debug, error, info};

use crate::altitude;
use crate::bus::Registers;
use crate::sensors::{Sensor, SensorError, SensorReadings};

pub use calibration::CalibrationSet;
pub use compensation::{CompensatedReading, CompensationError, RawSample, TrueTemperature};
pub use config::{BarometerConfig, ConversionTiming, OperatingMode};
use registers::{Bmp180Register, READ_TEMPERATURE_CMD};

pub(crate) const SENSOR_NAME: &str = "BMP180";

/// Typed readings from the BMP180 sensor.
pub struct BarometerReadings {
    pub temperature_milli_celsius: i32,
    pub pressure_pa: i32,
}

impl SensorReadings<2> for BarometerReadings {
    fn to_array(self) -> [i32; 2] {
        [self.temperature_milli_celsius, self.pressure_pa]
    }
}

pub struct Bmp180<I, D> {
    registers: Registers<I>,
    delay: D,
    mode: OperatingMode,
    timing: ConversionTiming,
    calibration: CalibrationSet,
}

impl<I: I2c, D: DelayNs> Bmp180<I, D> {
    /// Create the driver and load the factory calibration.
    ///
    /// # Errors
    /// `SensorError::Transport` if any calibration word cannot be read.
    pub fn new(i2c: I, delay: D, config: BarometerConfig) -> Result<Self, SensorError> {
        let mut registers = Registers::new(i2c, config.address);
        let calibration = CalibrationSet::load(&mut registers)?;

        info!(
            "BMP180: calibration loaded from 0x{:02x}, mode {:?}",
            config.address, config.mode
        );

        Ok(Self {
            registers,
            delay,
            mode: config.mode,
            timing: config.timing,
            calibration,
        })
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn timing(&self) -> &ConversionTiming {
        &self.timing
    }

    /// Give the bus and delay provider back.
    pub fn release(self) -> (I, D) {
        (self.registers.release(), self.delay)
    }

    /// Read the chip identification register (0x55 on a BMP180).
    pub fn chip_id(&mut self) -> Result<u8, SensorError> {
        self.registers
            .read_u8(Bmp180Register::ChipId as u8)
            .map_err(transport("read chip id"))
    }

    /// Start a temperature conversion and read the raw UT word.
    pub fn read_raw_temperature(&mut self) -> Result<i16, SensorError> {
        self.registers
            .write_byte(Bmp180Register::Control as u8, READ_TEMPERATURE_CMD)
            .map_err(transport("start temperature conversion"))?;

        self.delay.delay_us(self.timing.temperature_us);

        let raw = self
            .registers
            .read_i16(Bmp180Register::Data as u8)
            .map_err(transport("read raw temperature"))?;

        debug!("BMP180: UT = {}", raw);
        Ok(raw)
    }

    /// Start a pressure conversion in the configured mode and read the raw
    /// UP word, already shifted down to `16 + oss` significant bits.
    pub fn read_raw_pressure(&mut self) -> Result<u32, SensorError> {
        self.registers
            .write_byte(Bmp180Register::Control as u8, self.mode.pressure_command())
            .map_err(transport("start pressure conversion"))?;

        self.delay
            .delay_us(self.timing.pressure_settle_us(self.mode));

        let raw = self
            .registers
            .read_u24(Bmp180Register::Data as u8)
            .map_err(transport("read raw pressure"))?
            >> self.mode.raw_pressure_shift();

        debug!("BMP180: UP = {} (mode {:?})", raw, self.mode);
        Ok(raw)
    }

    /// Capture a temperature sample followed by a pressure sample.
    pub fn read_raw_sample(&mut self) -> Result<RawSample, SensorError> {
        let raw_temp = self.read_raw_temperature()?;
        let raw_pressure = self.read_raw_pressure()?;

        Ok(RawSample {
            raw_temp,
            raw_pressure,
        })
    }

    /// Compensated temperature in °C (0.1 °C resolution).
    pub fn read_temperature(&mut self) -> Result<f64, SensorError> {
        let raw_temp = self.read_raw_temperature()?;
        let temperature = compensation::compensate_temperature(&self.calibration, raw_temp)
            .inspect_err(|e| error!("BMP180: {}", e))?;

        Ok(temperature.celsius())
    }

    /// Compensated pressure in Pa.
    ///
    /// Samples temperature first; the pressure formula needs B5 from a
    /// temperature taken alongside the pressure.
    pub fn read_pressure(&mut self) -> Result<i32, SensorError> {
        Ok(self.read_compensated()?.pressure_pa)
    }

    /// Temperature and pressure from one raw sample pair.
    pub fn read_compensated(&mut self) -> Result<CompensatedReading, SensorError> {
        let sample = self.read_raw_sample()?;
        let reading = compensation::compensate(&self.calibration, sample, self.mode)
            .inspect_err(|e| error!("BMP180: {}", e))?;

        debug!(
            "BMP180: {} °C, {} Pa",
            reading.temperature_c, reading.pressure_pa
        );
        Ok(reading)
    }

    /// Altitude in metres relative to the given sea-level pressure.
    ///
    /// Pass [`altitude::STANDARD_SEA_LEVEL_PA`] when no local reference is
    /// known.
    pub fn read_altitude(&mut self, sealevel_pa: f64) -> Result<f64, SensorError> {
        let pressure = self.read_pressure()?;
        Ok(altitude::altitude(f64::from(pressure), sealevel_pa))
    }

    /// Sea-level pressure in Pa, given the sensor's known altitude in metres.
    pub fn read_sealevel_pressure(&mut self, altitude_m: f64) -> Result<f64, SensorError> {
        let pressure = self.read_pressure()?;
        Ok(altitude::sealevel_pressure(altitude_m, f64::from(pressure)))
    }
}

impl<I: I2c, D: DelayNs> Sensor<2> for Bmp180<I, D> {
    type Readings = BarometerReadings;

    fn read(&mut self) -> Result<BarometerReadings, SensorError> {
        let sample = self.read_raw_sample()?;
        let temperature = compensation::compensate_temperature(&self.calibration, sample.raw_temp)
            .inspect_err(|e| error!("BMP180: {}", e))?;
        let pressure_pa = compensation::compensate_pressure(
            &self.calibration,
            &temperature,
            sample.raw_pressure,
            self.mode,
        )
        .inspect_err(|e| error!("BMP180: {}", e))?;

        Ok(BarometerReadings {
            temperature_milli_celsius: temperature.deci_celsius() * 100,
            pressure_pa,
        })
    }
}

fn transport(operation: &'static str) -> impl FnOnce(ErrorKind) -> SensorError {
    move |kind| {
        error!("BMP180 {} failed: {:?}", operation, kind);
        SensorError::Transport {
            sensor: SENSOR_NAME,
            operation,
            kind,
        }
    }
}
