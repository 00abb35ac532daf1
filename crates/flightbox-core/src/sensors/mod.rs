pub mod bmp180;
pub mod itg3205;

use core::marker::PhantomData;
use embedded_hal::i2c::ErrorKind;
use thiserror_no_std::Error;

pub use bmp180::compensation::CompensationError;

/// Maximum number of integer values carried by one sample
pub const MAX_VALUES: usize = 8;

/// Errors raised by the sensor drivers.
///
/// Bus failures and compensation failures are kept apart: the first is a
/// transfer that did not complete, the second means the calibration or raw
/// data is degenerate and no reading can be derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("{sensor}: bus transfer failed during {operation} ({kind:?})")]
    Transport {
        sensor: &'static str,
        operation: &'static str,
        kind: ErrorKind,
    },
    #[error("BMP180 compensation failed: {0}")]
    Compensation(#[from] CompensationError),
}

/// Trait for sensor reading data structures.
/// Provides compile-time guarantees about the number of values and their conversion to arrays.
pub trait SensorReadings<const COUNT: usize> {
    /// Convert the readings into a fixed-size array.
    fn to_array(self) -> [i32; COUNT];
}

/// Trait for sensors that produce typed readings.
pub trait Sensor<const COUNT: usize> {
    /// The type of readings this sensor produces.
    type Readings: SensorReadings<COUNT>;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> Result<Self::Readings, SensorError>;
}

// Type-level index markers
pub struct Idx<const N: usize>;

pub struct IndexedSensor<S, const START: usize, const COUNT: usize>
where
    S: Sensor<COUNT>,
{
    sensor: S,
    _marker: PhantomData<Idx<START>>,
}

impl<S, const START: usize, const COUNT: usize> From<S> for IndexedSensor<S, START, COUNT>
where
    S: Sensor<COUNT>,
{
    fn from(value: S) -> Self {
        Self::new(value)
    }
}

impl<S, const START: usize, const COUNT: usize> IndexedSensor<S, START, COUNT>
where
    S: Sensor<COUNT>,
{
    const FITS: () = assert!(START + COUNT <= MAX_VALUES, "sensor slot exceeds MAX_VALUES");

    pub const fn new(sensor: S) -> Self {
        let () = Self::FITS;
        Self {
            sensor,
            _marker: PhantomData,
        }
    }

    /// Read and write to the values array at the correct indices.
    /// On error the array is left untouched.
    pub fn read_into(&mut self, values: &mut [i32; MAX_VALUES]) -> Result<(), SensorError> {
        let readings = self.sensor.read()?;
        let data = readings.to_array();
        values[START..START + COUNT].copy_from_slice(&data);
        Ok(())
    }

    /// Access the wrapped driver.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn into_inner(self) -> S {
        self.sensor
    }

    /// Get the starting index where this sensor's data is stored.
    pub const fn start_index() -> usize {
        START
    }

    /// Get the number of values this sensor produces.
    pub const fn value_count() -> usize {
        COUNT
    }

    /// Get the absolute index for a specific reading within this sensor.
    pub const fn reading_index(offset: usize) -> usize {
        START + offset
    }
}

pub mod indices {
    use crate::sensors::IndexedSensor;
    use crate::sensors::bmp180::Bmp180;
    use crate::sensors::itg3205::Itg3205;

    // Slots must not overlap. IndexedSensor only checks that each slot fits
    // inside MAX_VALUES, not that two sensors claim different ranges.
    pub type Bmp180Indexed<I, D> = IndexedSensor<Bmp180<I, D>, 0, 2>;
    pub type Itg3205Indexed<I> = IndexedSensor<Itg3205<I>, 2, 3>;

    pub const TEMPERATURE: usize = 0;
    pub const PRESSURE: usize = 1;
    pub const RATE_X: usize = 2;
    pub const RATE_Y: usize = 3;
    pub const RATE_Z: usize = 4;
}

pub use bmp180::Bmp180;
pub use indices::*;
pub use itg3205::Itg3205;

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        values: [i32; 2],
        fail: bool,
    }

    struct FixedReadings([i32; 2]);

    impl SensorReadings<2> for FixedReadings {
        fn to_array(self) -> [i32; 2] {
            self.0
        }
    }

    impl Sensor<2> for Fixed {
        type Readings = FixedReadings;

        fn read(&mut self) -> Result<FixedReadings, SensorError> {
            if self.fail {
                return Err(SensorError::Transport {
                    sensor: "fixed",
                    operation: "read",
                    kind: ErrorKind::Bus,
                });
            }
            Ok(FixedReadings(self.values))
        }
    }

    #[test]
    fn read_into_writes_declared_slot() {
        let mut sensor: IndexedSensor<Fixed, 3, 2> = Fixed {
            values: [7, -9],
            fail: false,
        }
        .into();
        let mut values = [0; MAX_VALUES];

        sensor.read_into(&mut values).unwrap();

        assert_eq!(values, [0, 0, 0, 7, -9, 0, 0, 0]);
        assert_eq!(IndexedSensor::<Fixed, 3, 2>::reading_index(1), 4);
    }

    #[test]
    fn failed_read_leaves_values_untouched() {
        let mut sensor: IndexedSensor<Fixed, 0, 2> = IndexedSensor::new(Fixed {
            values: [1, 2],
            fail: true,
        });
        let mut values = [5; MAX_VALUES];

        assert!(sensor.read_into(&mut values).is_err());
        assert_eq!(values, [5; MAX_VALUES]);
    }
}
