//! BMP180 factory calibration coefficients.
//!
//! Eleven 16-bit words programmed into the sensor's E2PROM at 0xAA-0xBF
//! (datasheet section 3.4). They are read once per driver instance and feed
//! every step of the compensation pipeline.

use embedded_hal::i2c::I2c;
use log::{debug, error};

use super::SENSOR_NAME;
use super::registers::Bmp180Register;
use crate::bus::Registers;
use crate::sensors::SensorError;

/// Factory-trimmed calibration coefficients.
///
/// Deliberately not `Default`: an all-zero set makes the
/// temperature divisor `X1 + MD` vanish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSet {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl CalibrationSet {
    /// Read all eleven coefficients from the device.
    ///
    /// # Errors
    /// `SensorError::Transport` on the first failed read. No partially loaded
    /// set is ever returned.
    pub fn load<I: I2c>(registers: &mut Registers<I>) -> Result<Self, SensorError> {
        let calibration = Self {
            ac1: signed(registers, Bmp180Register::CalAc1)?,
            ac2: signed(registers, Bmp180Register::CalAc2)?,
            ac3: signed(registers, Bmp180Register::CalAc3)?,
            ac4: unsigned(registers, Bmp180Register::CalAc4)?,
            ac5: unsigned(registers, Bmp180Register::CalAc5)?,
            ac6: unsigned(registers, Bmp180Register::CalAc6)?,
            b1: signed(registers, Bmp180Register::CalB1)?,
            b2: signed(registers, Bmp180Register::CalB2)?,
            mb: signed(registers, Bmp180Register::CalMb)?,
            mc: signed(registers, Bmp180Register::CalMc)?,
            md: signed(registers, Bmp180Register::CalMd)?,
        };

        debug!("BMP180: calibration {:?}", calibration);

        Ok(calibration)
    }
}

fn signed<I: I2c>(
    registers: &mut Registers<I>,
    register: Bmp180Register,
) -> Result<i16, SensorError> {
    registers
        .read_i16(register as u8)
        .map_err(|kind| load_failed(register, kind))
}

fn unsigned<I: I2c>(
    registers: &mut Registers<I>,
    register: Bmp180Register,
) -> Result<u16, SensorError> {
    registers
        .read_u16(register as u8)
        .map_err(|kind| load_failed(register, kind))
}

fn load_failed(register: Bmp180Register, kind: embedded_hal::i2c::ErrorKind) -> SensorError {
    error!("BMP180 calibration read of {:?} failed: {:?}", register, kind);
    SensorError::Transport {
        sensor: SENSOR_NAME,
        operation: "load calibration",
        kind,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec::Vec;

    use crate::sensors::bmp180::registers::DEFAULT_ADDRESS;

    /// Worked example from the datasheet, section 3.5.
    pub(crate) const DATASHEET: CalibrationSet = CalibrationSet {
        ac1: 408,
        ac2: -72,
        ac3: -14383,
        ac4: 32741,
        ac5: 32757,
        ac6: 23153,
        b1: 6190,
        b2: 4,
        mb: -32768,
        mc: -8711,
        md: 2868,
    };

    /// The eleven register reads `load` performs, answered with `cal`.
    pub(crate) fn load_transactions(cal: &CalibrationSet) -> Vec<I2cTransaction> {
        let words: [(Bmp180Register, [u8; 2]); 11] = [
            (Bmp180Register::CalAc1, cal.ac1.to_be_bytes()),
            (Bmp180Register::CalAc2, cal.ac2.to_be_bytes()),
            (Bmp180Register::CalAc3, cal.ac3.to_be_bytes()),
            (Bmp180Register::CalAc4, cal.ac4.to_be_bytes()),
            (Bmp180Register::CalAc5, cal.ac5.to_be_bytes()),
            (Bmp180Register::CalAc6, cal.ac6.to_be_bytes()),
            (Bmp180Register::CalB1, cal.b1.to_be_bytes()),
            (Bmp180Register::CalB2, cal.b2.to_be_bytes()),
            (Bmp180Register::CalMb, cal.mb.to_be_bytes()),
            (Bmp180Register::CalMc, cal.mc.to_be_bytes()),
            (Bmp180Register::CalMd, cal.md.to_be_bytes()),
        ];
        words
            .iter()
            .map(|(register, bytes)| {
                I2cTransaction::write_read(DEFAULT_ADDRESS, vec![*register as u8], bytes.to_vec())
            })
            .collect()
    }

    #[test]
    fn loads_signed_and_unsigned_words() {
        let mut i2c = I2cMock::new(&load_transactions(&DATASHEET));
        let mut registers = Registers::new(&mut i2c, DEFAULT_ADDRESS);

        let calibration = CalibrationSet::load(&mut registers).unwrap();

        assert_eq!(calibration, DATASHEET);
        i2c.done();
    }

    #[test]
    fn unsigned_words_are_not_sign_extended() {
        let cal = CalibrationSet {
            ac4: 0xFFFE,
            ..DATASHEET
        };
        let mut i2c = I2cMock::new(&load_transactions(&cal));
        let mut registers = Registers::new(&mut i2c, DEFAULT_ADDRESS);

        let calibration = CalibrationSet::load(&mut registers).unwrap();

        assert_eq!(calibration.ac4, 65534);
        i2c.done();
    }

    #[test]
    fn bus_failure_aborts_the_load() {
        let mut expectations = load_transactions(&DATASHEET);
        expectations.truncate(4);
        let failing = expectations.pop().unwrap().with_error(ErrorKind::Other);
        expectations.push(failing);

        let mut i2c = I2cMock::new(&expectations);
        let mut registers = Registers::new(&mut i2c, DEFAULT_ADDRESS);

        let result = CalibrationSet::load(&mut registers);

        assert_eq!(
            result,
            Err(SensorError::Transport {
                sensor: SENSOR_NAME,
                operation: "load calibration",
                kind: ErrorKind::Other,
            })
        );
        i2c.done();
    }
}
