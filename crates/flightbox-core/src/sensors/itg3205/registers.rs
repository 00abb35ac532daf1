use serde::{Deserialize, Serialize};

/// ITG-3205 register map (InvenSense PS-ITG-3205A-00).
///
/// Data registers are 16-bit two's complement, MSB first, and the axis
/// registers are consecutive so all three can be burst-read from `GyroXoutH`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Itg3205Register {
    WhoAmI = 0x00,
    SampleRateDivider = 0x15,
    DlpfFullScale = 0x16,
    InterruptConfig = 0x17,
    InterruptStatus = 0x1A,
    TempOutH = 0x1B,
    TempOutL = 0x1C,
    GyroXoutH = 0x1D,
    GyroXoutL = 0x1E,
    GyroYoutH = 0x1F,
    GyroYoutL = 0x20,
    GyroZoutH = 0x21,
    GyroZoutL = 0x22,
    PowerManagement = 0x3E,
}

/// AD0 pulled high
pub const DEFAULT_ADDRESS: u8 = 0x69;
/// AD0 pulled low
pub const ALTERNATE_ADDRESS: u8 = 0x68;

/// FS_SEL = 3, the only full-scale setting the part supports (±2000 °/s).
/// Must be set after every reset.
pub const FULL_SCALE_2000_DPS: u8 = 0x18;

/// LSB per °/s at ±2000 °/s full scale
pub const SENSITIVITY_LSB_PER_DPS: f64 = 14.375;

/// Digital low-pass filter bandwidth / internal sample rate (DLPF_CFG, bits 2:0).
///
/// | Variant | Bandwidth | Internal sample rate |
/// |---------|-----------|----------------------|
/// | Hz256   | 256 Hz    | 8 kHz                |
/// | Hz188   | 188 Hz    | 1 kHz                |
/// | Hz98    | 98 Hz     | 1 kHz                |
/// | Hz42    | 42 Hz     | 1 kHz                |
/// | Hz20    | 20 Hz     | 1 kHz                |
/// | Hz10    | 10 Hz     | 1 kHz                |
/// | Hz5     | 5 Hz      | 1 kHz                |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LowPassFilter {
    Hz256 = 0x00,
    #[default]
    Hz188 = 0x01,
    Hz98 = 0x02,
    Hz42 = 0x03,
    Hz20 = 0x04,
    Hz10 = 0x05,
    Hz5 = 0x06,
}

/// Clock source selection (CLK_SEL, bits 2:0 of PWR_MGM).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClockSource {
    #[default]
    Internal = 0x00,
    GyroX = 0x01,
    GyroY = 0x02,
    GyroZ = 0x03,
    External32kHz = 0x04,
    External19MHz = 0x05,
}

bitflags::bitflags! {
    /// PWR_MGM bits 7:3
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct PowerFlags: u8 {
        /// Reset device and registers to power-up defaults
        const H_RESET = 1 << 7;
        /// Low power sleep mode
        const SLEEP   = 1 << 6;
        const STBY_XG = 1 << 5;
        const STBY_YG = 1 << 4;
        const STBY_ZG = 1 << 3;
    }
}

/// Full content of the PWR_MGM register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerManagement {
    pub flags: PowerFlags,
    pub clock: ClockSource,
}

impl PowerManagement {
    pub const fn bits(self) -> u8 {
        self.flags.bits() | self.clock as u8
    }
}

bitflags::bitflags! {
    /// INT_CFG
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InterruptConfig: u8 {
        /// INT pin active low
        const ACTIVE_LOW       = 1 << 7;
        /// INT pin open drain
        const OPEN_DRAIN       = 1 << 6;
        /// Latch until the interrupt is cleared
        const LATCH            = 1 << 5;
        /// Any register read clears the latch, not only INT_STATUS
        const CLEAR_ON_ANY_READ = 1 << 4;
        const ON_DEVICE_READY  = 1 << 2;
        const ON_DATA_READY    = 1 << 0;
    }
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self::LATCH | Self::ON_DEVICE_READY | Self::ON_DATA_READY
    }
}

bitflags::bitflags! {
    /// INT_STATUS
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InterruptStatus: u8 {
        /// PLL ready
        const ITG_READY  = 1 << 2;
        const DATA_READY = 1 << 0;
    }
}
