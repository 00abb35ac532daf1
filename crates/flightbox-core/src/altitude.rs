//! Barometric altitude conversions (international barometric formula,
//! BMP180 datasheet section 3.6 and 3.7).
//!
//! Pure floating-point functions. A negative pressure ratio has no real
//! fractional power; the result is NaN and is passed through unchanged.

/// ISA mean sea-level pressure in Pa
pub const STANDARD_SEA_LEVEL_PA: f64 = 101_325.0;

const SCALE_HEIGHT_M: f64 = 44_330.0;
const EXPONENT: f64 = 5.255;

/// Altitude in metres of a point where `pressure_pa` is measured, relative to
/// a reference `sealevel_pa`.
///
/// `44330 * (1 - (p / p0)^(1 / 5.255))`
pub fn altitude(pressure_pa: f64, sealevel_pa: f64) -> f64 {
    SCALE_HEIGHT_M * (1.0 - libm::pow(pressure_pa / sealevel_pa, 1.0 / EXPONENT))
}

/// Pressure at sea level in Pa, given the pressure measured at a known
/// altitude in metres. Inverse of [`altitude`].
///
/// `p / (1 - h / 44330)^5.255`
pub fn sealevel_pressure(altitude_m: f64, measured_pressure_pa: f64) -> f64 {
    measured_pressure_pa / libm::pow(1.0 - altitude_m / SCALE_HEIGHT_M, EXPONENT)
}
