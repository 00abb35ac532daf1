use serde::{Deserialize, Serialize};

use super::registers::{DEFAULT_ADDRESS, READ_PRESSURE_CMD};

/// Pressure oversampling setting (oss, bits 7:6 of the pressure command).
///
/// | Variant       | oss | Internal samples | Conversion time (max) | RMS noise (typ) |
/// |---------------|-----|------------------|-----------------------|-----------------|
/// | UltraLowPower | 0   | 1                | 4.5 ms                | 6 Pa            |
/// | Standard      | 1   | 2                | 7.5 ms                | 5 Pa            |
/// | HighRes       | 2   | 4                | 13.5 ms               | 4 Pa            |
/// | UltraHighRes  | 3   | 8                | 25.5 ms               | 3 Pa            |
///
/// The raw pressure word gains one significant bit per step (16 to 19 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperatingMode {
    UltraLowPower = 0,
    #[default]
    Standard = 1,
    HighRes = 2,
    UltraHighRes = 3,
}

impl OperatingMode {
    pub const ALL: [Self; 4] = [
        Self::UltraLowPower,
        Self::Standard,
        Self::HighRes,
        Self::UltraHighRes,
    ];

    /// The oversampling setting `oss` used by the compensation formulas.
    pub const fn oversampling(self) -> u32 {
        self as u32
    }

    /// Control register value that starts a pressure conversion in this mode.
    pub const fn pressure_command(self) -> u8 {
        READ_PRESSURE_CMD | ((self as u8) << 6)
    }

    /// Right shift applied to the 24-bit pressure register read.
    pub const fn raw_pressure_shift(self) -> u32 {
        8 - self.oversampling()
    }
}

/// Settle times waited between starting a conversion and reading its result.
///
/// The defaults are the datasheet maxima. Sensor revisions differ, so the
/// table can be overridden per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionTiming {
    /// Temperature conversion, independent of the operating mode.
    pub temperature_us: u32,
    /// Pressure conversion, indexed by [`OperatingMode`].
    pub pressure_us: [u32; 4],
}

impl ConversionTiming {
    pub const DATASHEET: Self = Self {
        temperature_us: 4_500,
        pressure_us: [4_500, 7_500, 13_500, 25_500],
    };

    pub const fn pressure_settle_us(&self, mode: OperatingMode) -> u32 {
        self.pressure_us[mode as usize]
    }
}

impl Default for ConversionTiming {
    fn default() -> Self {
        Self::DATASHEET
    }
}

/// Construction parameters of a [`Bmp180`](super::Bmp180).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarometerConfig {
    pub address: u8,
    pub mode: OperatingMode,
    pub timing: ConversionTiming,
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            mode: OperatingMode::default(),
            timing: ConversionTiming::default(),
        }
    }
}
