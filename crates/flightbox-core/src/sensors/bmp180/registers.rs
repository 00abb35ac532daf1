/// BMP180 register map (Bosch Sensortec BMP180 datasheet, BST-BMP180-DS000).
///
/// Calibration words are 16-bit big-endian, MSB at the listed address.
/// The control register takes a conversion command; the result is read back
/// from the data register (2 bytes for temperature, 3 for pressure).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Bmp180Register {
    CalAc1 = 0xAA,
    CalAc2 = 0xAC,
    CalAc3 = 0xAE,
    CalAc4 = 0xB0,
    CalAc5 = 0xB2,
    CalAc6 = 0xB4,
    CalB1 = 0xB6,
    CalB2 = 0xB8,
    CalMb = 0xBA,
    CalMc = 0xBC,
    CalMd = 0xBE,
    // Must read 0x55
    ChipId = 0xD0,
    Control = 0xF4,
    // MSB 0xF6, LSB 0xF7, XLSB 0xF8
    Data = 0xF6,
}

pub const DEFAULT_ADDRESS: u8 = 0x77;
pub const BMP180_CHIP_ID: u8 = 0x55;

pub const READ_TEMPERATURE_CMD: u8 = 0x2E;
// Oversampling setting goes in bits 7:6
pub const READ_PRESSURE_CMD: u8 = 0x34;
