//! Register-addressed access to I2C peripherals
//!
//! Both sensors expose their state as 8-bit register addresses holding
//! big-endian values. [`Registers`] pairs an I2C bus with a device address and
//! provides the 1-3 byte reads and single byte writes the drivers are built
//! on. Failures are reduced to the portable [`ErrorKind`] so drivers can
//! report them without carrying the bus error type around.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c, SevenBitAddress};

/// A device on an I2C bus, addressed by register.
pub struct Registers<I> {
    i2c: I,
    address: SevenBitAddress,
}

impl<I> Registers<I> {
    /// Create a register accessor for the device at `address`.
    #[inline]
    pub const fn new(i2c: I, address: SevenBitAddress) -> Self {
        Self { i2c, address }
    }

    /// 7-bit address of the device.
    pub const fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> Registers<I> {
    /// Fill `buf` with consecutive registers starting at `register`.
    pub fn read_bytes(&mut self, register: u8, buf: &mut [u8]) -> Result<(), ErrorKind> {
        self.i2c
            .write_read(self.address, &[register], buf)
            .map_err(|e| e.kind())
    }

    /// Write a single byte to `register`.
    pub fn write_byte(&mut self, register: u8, value: u8) -> Result<(), ErrorKind> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| e.kind())
    }

    pub fn read_u8(&mut self, register: u8) -> Result<u8, ErrorKind> {
        let mut buf = [0u8; 1];
        self.read_bytes(register, &mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self, register: u8) -> Result<u16, ErrorKind> {
        let mut buf = [0u8; 2];
        self.read_bytes(register, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_i16(&mut self, register: u8) -> Result<i16, ErrorKind> {
        let mut buf = [0u8; 2];
        self.read_bytes(register, &mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Read a 24-bit big-endian value (MSB, LSB, XLSB).
    pub fn read_u24(&mut self, register: u8) -> Result<u32, ErrorKind> {
        let mut buf = [0u8; 3];
        self.read_bytes(register, &mut buf)?;
        Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
    }
}
