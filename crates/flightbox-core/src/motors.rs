//! Dual H-bridge motor driver
//!
//! Each motor is driven by two PWM channels, one per direction. A ratio in
//! `[-1, 1]` selects direction and duty cycle; the opposing channel is always
//! switched off before the driving channel is switched on, so both sides of
//! a bridge are never driven together.

use embedded_hal::pwm::{Error as _, ErrorKind, SetDutyCycle};
use log::{debug, error};
use thiserror_no_std::Error;

/// Duty cycles are applied as `n / DUTY_RESOLUTION`
const DUTY_RESOLUTION: u16 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MotorError {
    #[error("{side:?} motor: {channel:?} PWM channel rejected duty cycle ({kind:?})")]
    Pwm {
        side: Side,
        channel: Channel,
        kind: ErrorKind,
    },
}

/// One motor behind an H-bridge.
pub struct HBridge<F, B> {
    side: Side,
    forward: F,
    backward: B,
    ratio: f64,
}

impl<F, B> HBridge<F, B>
where
    F: SetDutyCycle,
    B: SetDutyCycle,
{
    pub fn new(side: Side, forward: F, backward: B) -> Self {
        Self {
            side,
            forward,
            backward,
            ratio: 0.0,
        }
    }

    /// Last applied ratio, after clamping.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Drive the motor at `ratio` of full speed. Positive is forward,
    /// negative is backward. Values outside `[-1, 1]` are clamped and NaN
    /// stops the motor.
    pub fn set_ratio(&mut self, ratio: f64) -> Result<(), MotorError> {
        let ratio = if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(-1.0, 1.0)
        };
        let duty = libm::round(libm::fabs(ratio) * f64::from(DUTY_RESOLUTION)) as u16;

        if ratio > 0.0 {
            self.apply(Channel::Backward, 0)?;
            self.apply(Channel::Forward, duty)?;
        } else if ratio < 0.0 {
            self.apply(Channel::Forward, 0)?;
            self.apply(Channel::Backward, duty)?;
        } else {
            self.apply(Channel::Forward, 0)?;
            self.apply(Channel::Backward, 0)?;
        }

        debug!("{:?} motor: ratio {}", self.side, ratio);
        self.ratio = ratio;
        Ok(())
    }

    pub fn release(self) -> (F, B) {
        (self.forward, self.backward)
    }

    fn apply(&mut self, channel: Channel, duty: u16) -> Result<(), MotorError> {
        let result = match channel {
            Channel::Forward => set_duty(&mut self.forward, duty).map_err(|e| e.kind()),
            Channel::Backward => set_duty(&mut self.backward, duty).map_err(|e| e.kind()),
        };

        result.map_err(|kind| {
            error!("{:?} motor: {:?} channel failed: {:?}", self.side, channel, kind);
            MotorError::Pwm {
                side: self.side,
                channel,
                kind,
            }
        })
    }
}

fn set_duty<P: SetDutyCycle>(pwm: &mut P, duty: u16) -> Result<(), P::Error> {
    if duty == 0 {
        pwm.set_duty_cycle_fully_off()
    } else {
        pwm.set_duty_cycle_fraction(duty, DUTY_RESOLUTION)
    }
}

/// Left and right motors of a differential drive.
pub struct DualMotorDriver<LF, LB, RF, RB> {
    left: HBridge<LF, LB>,
    right: HBridge<RF, RB>,
}

impl<LF, LB, RF, RB> DualMotorDriver<LF, LB, RF, RB>
where
    LF: SetDutyCycle,
    LB: SetDutyCycle,
    RF: SetDutyCycle,
    RB: SetDutyCycle,
{
    /// Take ownership of the four PWM channels. Motors start stopped.
    pub fn new(
        left_forward: LF,
        left_backward: LB,
        right_forward: RF,
        right_backward: RB,
    ) -> Result<Self, MotorError> {
        let mut driver = Self {
            left: HBridge::new(Side::Left, left_forward, left_backward),
            right: HBridge::new(Side::Right, right_forward, right_backward),
        };
        driver.all_stop()?;
        Ok(driver)
    }

    pub fn set_ratio(&mut self, side: Side, ratio: f64) -> Result<(), MotorError> {
        match side {
            Side::Left => self.left.set_ratio(ratio),
            Side::Right => self.right.set_ratio(ratio),
        }
    }

    pub fn ratio(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left.ratio(),
            Side::Right => self.right.ratio(),
        }
    }

    /// Stop both motors. The right motor is stopped even if the left one
    /// fails; the first failure is returned.
    pub fn all_stop(&mut self) -> Result<(), MotorError> {
        let left = self.left.set_ratio(0.0);
        let right = self.right.set_ratio(0.0);
        left.and(right)
    }

    pub fn release(self) -> (HBridge<LF, LB>, HBridge<RF, RB>) {
        (self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use embedded_hal::pwm::ErrorType;
    use std::rc::Rc;
    use std::vec::Vec;

    type Log = Rc<RefCell<Vec<(&'static str, u16)>>>;

    /// PWM channel with a 0..=1000 duty range that records every update.
    struct FakePwm {
        name: &'static str,
        log: Log,
        fail: bool,
    }

    impl FakePwm {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                fail: false,
            }
        }

        fn failing(name: &'static str, log: &Log) -> Self {
            Self {
                fail: true,
                ..Self::new(name, log)
            }
        }
    }

    impl ErrorType for FakePwm {
        type Error = ErrorKind;
    }

    impl SetDutyCycle for FakePwm {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), ErrorKind> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            self.log.borrow_mut().push((self.name, duty));
            Ok(())
        }
    }

    fn driver(log: &Log) -> DualMotorDriver<FakePwm, FakePwm, FakePwm, FakePwm> {
        let driver = DualMotorDriver::new(
            FakePwm::new("lf", log),
            FakePwm::new("lb", log),
            FakePwm::new("rf", log),
            FakePwm::new("rb", log),
        )
        .unwrap();
        log.borrow_mut().clear();
        driver
    }

    #[test]
    fn new_driver_starts_stopped() {
        let log = Log::default();
        let driver = DualMotorDriver::new(
            FakePwm::new("lf", &log),
            FakePwm::new("lb", &log),
            FakePwm::new("rf", &log),
            FakePwm::new("rb", &log),
        )
        .unwrap();

        assert_eq!(
            *log.borrow(),
            [("lf", 0), ("lb", 0), ("rf", 0), ("rb", 0)]
        );
        assert_eq!(driver.ratio(Side::Left), 0.0);
        assert_eq!(driver.ratio(Side::Right), 0.0);
    }

    #[test]
    fn forward_clears_backward_first() {
        let log = Log::default();
        let mut driver = driver(&log);

        driver.set_ratio(Side::Left, 0.5).unwrap();

        assert_eq!(*log.borrow(), [("lb", 0), ("lf", 500)]);
        assert_eq!(driver.ratio(Side::Left), 0.5);
    }

    #[test]
    fn backward_clears_forward_first() {
        let log = Log::default();
        let mut driver = driver(&log);

        driver.set_ratio(Side::Right, -0.25).unwrap();

        assert_eq!(*log.borrow(), [("rf", 0), ("rb", 250)]);
        assert_eq!(driver.ratio(Side::Right), -0.25);
    }

    #[test]
    fn out_of_range_ratio_is_clamped() {
        let log = Log::default();
        let mut driver = driver(&log);

        driver.set_ratio(Side::Left, 3.0).unwrap();
        driver.set_ratio(Side::Right, -7.5).unwrap();

        assert_eq!(
            *log.borrow(),
            [("lb", 0), ("lf", 1000), ("rf", 0), ("rb", 1000)]
        );
        assert_eq!(driver.ratio(Side::Left), 1.0);
        assert_eq!(driver.ratio(Side::Right), -1.0);
    }

    #[test]
    fn nan_stops_the_motor() {
        let log = Log::default();
        let mut driver = driver(&log);
        driver.set_ratio(Side::Left, 0.8).unwrap();
        log.borrow_mut().clear();

        driver.set_ratio(Side::Left, f64::NAN).unwrap();

        assert_eq!(*log.borrow(), [("lf", 0), ("lb", 0)]);
        assert_eq!(driver.ratio(Side::Left), 0.0);
    }

    #[test]
    fn all_stop_zeroes_both_motors() {
        let log = Log::default();
        let mut driver = driver(&log);
        driver.set_ratio(Side::Left, 1.0).unwrap();
        driver.set_ratio(Side::Right, -1.0).unwrap();
        log.borrow_mut().clear();

        driver.all_stop().unwrap();

        assert_eq!(
            *log.borrow(),
            [("lf", 0), ("lb", 0), ("rf", 0), ("rb", 0)]
        );
        assert_eq!(driver.ratio(Side::Left), 0.0);
        assert_eq!(driver.ratio(Side::Right), 0.0);
    }

    #[test]
    fn pwm_failure_names_side_and_channel() {
        let log = Log::default();
        let mut motor = HBridge::new(
            Side::Right,
            FakePwm::new("rf", &log),
            FakePwm::failing("rb", &log),
        );

        assert_eq!(
            motor.set_ratio(0.3),
            Err(MotorError::Pwm {
                side: Side::Right,
                channel: Channel::Backward,
                kind: ErrorKind::Other,
            })
        );
        // The failed update is not recorded as applied
        assert_eq!(motor.ratio(), 0.0);
        assert!(log.borrow().is_empty());
    }
}
