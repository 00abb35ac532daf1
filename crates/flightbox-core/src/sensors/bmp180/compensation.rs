//! BMP180 compensation engine.
//!
//! Turns raw temperature (UT) and raw pressure (UP) words into °C and Pa
//! using the factory calibration, following the integer algorithm of the
//! datasheet (section 3.5, "Calculating pressure and temperature").
//!
//! Every step is reproduced exactly:
//! - right shifts on signed terms are arithmetic (sign preserving),
//! - every division is truncating integer division,
//! - B4 and B7 are unsigned 32-bit quantities and wrap like the reference C.
//!
//! Signed intermediates are carried in `i64`, which holds every product of the
//! pipeline without overflow. For inputs the 32-bit reference handles without
//! overflowing, the results are identical.
//!
//! The functions are pure and hold no state: identical calibration and raw
//! inputs always produce identical readings.

use thiserror_no_std::Error;

use super::calibration::CalibrationSet;
use super::config::OperatingMode;

/// Degenerate calibration or raw data.
///
/// Both variants are division by zero inside the pipeline. They point at a
/// corrupted calibration set or a transport fault, never at a transient
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompensationError {
    /// `X1 + MD == 0` in the temperature pipeline
    #[error("temperature divisor X1 + MD is zero")]
    TemperatureDivisorZero,
    /// `B4 == 0` in the pressure pipeline
    #[error("pressure divisor B4 is zero")]
    PressureDivisorZero,
}

/// One raw temperature and one raw pressure word, captured back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub raw_temp: i16,
    /// Already shifted by `8 - oss`
    pub raw_pressure: u32,
}

/// Temperature and pressure derived from one [`RawSample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensatedReading {
    pub temperature_c: f64,
    pub pressure_pa: i32,
}

/// Output of the temperature pipeline.
///
/// Carries B5, which the pressure pipeline needs from the same temperature
/// sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrueTemperature {
    b5: i32,
    deci_celsius: i32,
}

impl TrueTemperature {
    pub const fn b5(&self) -> i32 {
        self.b5
    }

    /// Temperature in 0.1 °C steps, as the sensor resolves it.
    pub const fn deci_celsius(&self) -> i32 {
        self.deci_celsius
    }

    pub fn celsius(&self) -> f64 {
        f64::from(self.deci_celsius) / 10.0
    }
}

/// Temperature pipeline.
///
/// ```text
/// X1 = ((UT - AC6) * AC5) >> 15
/// X2 = (MC << 11) / (X1 + MD)
/// B5 = X1 + X2
/// T  = (B5 + 8) >> 4            [0.1 °C]
/// ```
pub fn compensate_temperature(
    calibration: &CalibrationSet,
    raw_temp: i16,
) -> Result<TrueTemperature, CompensationError> {
    let x1 = ((i64::from(raw_temp) - i64::from(calibration.ac6)) * i64::from(calibration.ac5)) >> 15;

    let divisor = x1 + i64::from(calibration.md);
    if divisor == 0 {
        return Err(CompensationError::TemperatureDivisorZero);
    }
    let x2 = (i64::from(calibration.mc) << 11) / divisor;

    // |X1| < 2^18 and |X2| <= 2^26, so B5 fits in 32 bits
    let b5 = (x1 + x2) as i32;
    let deci_celsius = (b5 + 8) >> 4;

    Ok(TrueTemperature { b5, deci_celsius })
}

/// Pressure pipeline, using B5 from a contemporaneous temperature sample.
///
/// ```text
/// B6 = B5 - 4000
/// X1 = (B2 * (B6 * B6 >> 12)) >> 11
/// X2 = (AC2 * B6) >> 11
/// X3 = X1 + X2
/// B3 = (((AC1 * 4 + X3) << oss) + 2) / 4
/// X1 = (AC3 * B6) >> 13
/// X2 = (B1 * (B6 * B6 >> 12)) >> 16
/// X3 = ((X1 + X2) + 2) >> 2
/// B4 = AC4 * (X3 + 32768) >> 15            unsigned
/// B7 = (UP - B3) * (50000 >> oss)          unsigned
/// p  = B7 < 0x80000000 ? (B7 * 2) / B4 : (B7 / B4) * 2
/// X1 = ((p >> 8) * (p >> 8) * 3038) >> 16
/// X2 = (-7357 * p) >> 16
/// p  = p + ((X1 + X2 + 3791) >> 4)        [Pa]
/// ```
pub fn compensate_pressure(
    calibration: &CalibrationSet,
    temperature: &TrueTemperature,
    raw_pressure: u32,
    mode: OperatingMode,
) -> Result<i32, CompensationError> {
    let oss = mode.oversampling();

    let b6 = i64::from(temperature.b5) - 4000;
    let b6_squared = (b6 * b6) >> 12;

    let x1 = (i64::from(calibration.b2) * b6_squared) >> 11;
    let x2 = (i64::from(calibration.ac2) * b6) >> 11;
    let x3 = x1 + x2;
    let b3 = (((i64::from(calibration.ac1) * 4 + x3) << oss) + 2) / 4;

    let x1 = (i64::from(calibration.ac3) * b6) >> 13;
    let x2 = (i64::from(calibration.b1) * b6_squared) >> 16;
    let x3 = ((x1 + x2) + 2) >> 2;
    let b4 = u32::from(calibration.ac4).wrapping_mul((x3 + 32768) as u32) >> 15;

    let b7 = raw_pressure
        .wrapping_sub(b3 as u32)
        .wrapping_mul(50_000 >> oss);

    let p = i64::from(scale_pressure(b7, b4)? as i32);

    let x1 = (((p >> 8) * (p >> 8)) * 3038) >> 16;
    let x2 = (-7357 * p) >> 16;

    Ok((p + ((x1 + x2 + 3791) >> 4)) as i32)
}

/// Step 11: divide B7 by B4 and double, in whichever order keeps the
/// intermediate inside 32 unsigned bits.
pub(crate) fn scale_pressure(b7: u32, b4: u32) -> Result<u32, CompensationError> {
    if b4 == 0 {
        return Err(CompensationError::PressureDivisorZero);
    }

    if b7 < 0x8000_0000 {
        Ok((b7 * 2) / b4)
    } else {
        Ok((b7 / b4).wrapping_mul(2))
    }
}

/// Run both pipelines on one raw sample.
pub fn compensate(
    calibration: &CalibrationSet,
    sample: RawSample,
    mode: OperatingMode,
) -> Result<CompensatedReading, CompensationError> {
    let temperature = compensate_temperature(calibration, sample.raw_temp)?;
    let pressure_pa = compensate_pressure(calibration, &temperature, sample.raw_pressure, mode)?;

    Ok(CompensatedReading {
        temperature_c: temperature.celsius(),
        pressure_pa,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::bmp180::calibration::tests::DATASHEET;

    const UT: i16 = 27898;
    const UP: u32 = 23843;

    #[test]
    fn datasheet_temperature() {
        let temperature = compensate_temperature(&DATASHEET, UT).unwrap();

        assert_eq!(temperature.b5(), 2400);
        assert_eq!(temperature.deci_celsius(), 150);
        assert_eq!(temperature.celsius(), 15.0);
    }

    #[test]
    fn datasheet_pressure() {
        // The datasheet example is computed with oss = 0.
        let reading = compensate(
            &DATASHEET,
            RawSample {
                raw_temp: UT,
                raw_pressure: UP,
            },
            OperatingMode::UltraLowPower,
        )
        .unwrap();

        assert_eq!(reading.temperature_c, 15.0);
        assert_eq!(reading.pressure_pa, 69964);
    }

    #[test]
    fn oversampling_scales_b3_and_b7() {
        let temperature = compensate_temperature(&DATASHEET, UT).unwrap();

        // Same UP word read in standard mode carries half the pressure.
        assert_eq!(
            compensate_pressure(&DATASHEET, &temperature, UP, OperatingMode::Standard),
            Ok(34416)
        );
        // The same atmosphere sampled with one more bit of resolution.
        assert_eq!(
            compensate_pressure(&DATASHEET, &temperature, UP * 2, OperatingMode::Standard),
            Ok(69962)
        );
        assert_eq!(
            compensate_pressure(&DATASHEET, &temperature, UP * 8, OperatingMode::UltraHighRes),
            Ok(69963)
        );
    }

    #[test]
    fn identical_inputs_give_identical_readings() {
        let sample = RawSample {
            raw_temp: 25123,
            raw_pressure: 41234,
        };
        let first = compensate(&DATASHEET, sample, OperatingMode::Standard);
        let second = compensate(&DATASHEET, sample, OperatingMode::Standard);

        assert_eq!(first, second);
    }

    #[test]
    fn scale_pressure_is_consistent_across_the_branch_boundary() {
        let b4 = 33457;
        let below = scale_pressure(0x7FFF_FFFF, b4).unwrap();
        let above = scale_pressure(0x8000_0000, b4).unwrap();

        assert_eq!(below, 128_372);
        assert_eq!(above, 128_372);

        // Around the boundary the quotient never steps backwards.
        let mut previous = scale_pressure(0x7FFF_FF00, b4).unwrap();
        for b7 in 0x7FFF_FF01..=0x8000_0100u32 {
            let p = scale_pressure(b7, b4).unwrap();
            assert!(p >= previous, "p decreased at B7 = {b7:#x}");
            assert!(p - previous <= 2, "p jumped at B7 = {b7:#x}");
            previous = p;
        }
    }

    #[test]
    fn pressure_is_monotonic_in_raw_pressure() {
        for mode in OperatingMode::ALL {
            let temperature = compensate_temperature(&DATASHEET, UT).unwrap();
            let start = 15_000u32 << mode.oversampling();
            let end = 40_000u32 << mode.oversampling();

            let mut previous =
                compensate_pressure(&DATASHEET, &temperature, start, mode).unwrap();
            for up in (start + 1)..end {
                let p = compensate_pressure(&DATASHEET, &temperature, up, mode).unwrap();
                assert!(p >= previous, "{mode:?}: pressure decreased at UP = {up}");
                previous = p;
            }
        }
    }

    #[test]
    fn zero_temperature_divisor_is_an_error() {
        let calibration = CalibrationSet {
            mc: 0,
            md: 0,
            ..DATASHEET
        };
        // UT == AC6 makes X1 zero
        let raw_temp = calibration.ac6 as i16;

        assert_eq!(
            compensate_temperature(&calibration, raw_temp),
            Err(CompensationError::TemperatureDivisorZero)
        );
    }

    #[test]
    fn zero_pressure_divisor_is_an_error() {
        let calibration = CalibrationSet { ac4: 0, ..DATASHEET };

        assert_eq!(
            compensate(
                &calibration,
                RawSample {
                    raw_temp: UT,
                    raw_pressure: UP,
                },
                OperatingMode::UltraLowPower,
            ),
            Err(CompensationError::PressureDivisorZero)
        );
    }

    #[test]
    fn temperature_division_truncates_toward_zero() {
        // X1 = ((23153 + 1 - 23153) * 32757) >> 15 = 0, X2 = (-8711 << 11) / 2868
        // = -6220.3.. which truncates to -6220 (floor would give -6221).
        let temperature = compensate_temperature(&DATASHEET, 23154).unwrap();

        assert_eq!(temperature.b5(), -6220);
        assert_eq!(temperature.deci_celsius(), (-6220 + 8) >> 4);
    }
}
