//! I2C bus sharing
//!
//! The barometer and the gyroscope sit on the same physical bus but each
//! driver owns its transport by value. [`SharedI2cDevice`] is a cheap handle
//! that implements the blocking `I2c` trait by locking a shared bus for the
//! duration of every transfer.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

/// A bus that several [`SharedI2cDevice`]s can borrow.
pub type SharedBus<T> = Mutex<CriticalSectionRawMutex, RefCell<T>>;

/// Wrap `bus` so it can be handed to several drivers.
pub const fn shared_bus<T>(bus: T) -> SharedBus<T> {
    Mutex::new(RefCell::new(bus))
}

/// One device's handle on a [`SharedBus`].
///
/// Each transfer runs inside a single critical section, so transfers from
/// different handles never interleave.
///
/// # Example
///
/// ```ignore
/// let bus = shared_bus(i2c);
///
/// let barometer = Bmp180::new(SharedI2cDevice::new(&bus), delay, config.barometer)?;
/// let gyroscope = Itg3205::new(SharedI2cDevice::new(&bus), config.gyroscope)?;
/// ```
pub struct SharedI2cDevice<'a, T> {
    bus: &'a SharedBus<T>,
}

impl<'a, T> SharedI2cDevice<'a, T> {
    #[inline]
    pub const fn new(bus: &'a SharedBus<T>) -> Self {
        Self { bus }
    }
}

impl<T> ErrorType for SharedI2cDevice<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for SharedI2cDevice<'_, T>
where
    T: I2c,
{
    #[inline]
    fn read(&mut self, address: SevenBitAddress, read: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock(|bus| bus.borrow_mut().read(address, read))
    }

    #[inline]
    fn write(&mut self, address: SevenBitAddress, write: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock(|bus| bus.borrow_mut().write(address, write))
    }

    #[inline]
    fn write_read(
        &mut self,
        address: SevenBitAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.bus
            .lock(|bus| bus.borrow_mut().write_read(address, write, read))
    }

    #[inline]
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus
            .lock(|bus| bus.borrow_mut().transaction(address, operations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Registers;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn devices_take_turns_on_one_bus() {
        let mut mock = I2cMock::new(&[
            I2cTransaction::write_read(0x77, vec![0xD0], vec![0x55]),
            I2cTransaction::write(0x69, vec![0x3E, 0x00]),
            I2cTransaction::write_read(0x69, vec![0x00], vec![0x69]),
            I2cTransaction::write_read(0x77, vec![0xF6], vec![0x6C, 0xFA]),
        ]);

        {
            let bus = shared_bus(&mut mock);
            let mut barometer = Registers::new(SharedI2cDevice::new(&bus), 0x77);
            let mut gyroscope = Registers::new(SharedI2cDevice::new(&bus), 0x69);

            assert_eq!(barometer.read_u8(0xD0), Ok(0x55));
            assert_eq!(gyroscope.write_byte(0x3E, 0x00), Ok(()));
            assert_eq!(gyroscope.read_u8(0x00), Ok(0x69));
            assert_eq!(barometer.read_i16(0xF6), Ok(27898));
        }

        mock.done();
    }
}
