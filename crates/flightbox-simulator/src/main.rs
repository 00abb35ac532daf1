//! Desktop simulator for the flightbox peripheral drivers.
//!
//! Runs the real `flightbox-core` drivers against simulated hardware: a BMP180
//! and an ITG-3205 register file sharing one I2C bus, and four PWM channels
//! standing in for the motor H-bridges. The simulated aircraft climbs and
//! sinks slowly while yawing back and forth; every tick the readings are
//! logged and the motors are commanded to counter the yaw rate.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info flightbox-simulator [config.bin]
//! ```
//!
//! `config.bin` is an optional postcard-encoded `Config` blob. Without it the
//! driver defaults are used and the encoded default is logged.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, NoAcknowledgeSource, Operation, SevenBitAddress};
use embedded_hal::pwm::{self, SetDutyCycle};
use log::{debug, error, info, warn};

use flightbox_core::altitude::{self, STANDARD_SEA_LEVEL_PA};
use flightbox_core::config::MAX_ENCODED_LEN;
use flightbox_core::motors::{DualMotorDriver, Side};
use flightbox_core::sensors::bmp180::compensation::{compensate_pressure, compensate_temperature};
use flightbox_core::sensors::bmp180::{CalibrationSet, OperatingMode};
use flightbox_core::sensors::{
    Bmp180, Bmp180Indexed, Itg3205, Itg3205Indexed, MAX_VALUES, PRESSURE, RATE_X, RATE_Y, RATE_Z,
    TEMPERATURE,
};
use flightbox_core::shared_bus::{SharedI2cDevice, shared_bus};
use flightbox_core::{Config, SensorError};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Interval between sampling ticks.
const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Field elevation of the simulated take-off site, in metres.
const FIELD_ELEVATION_M: f64 = 250.0;

/// Yaw rate at which the motors are driven at full differential, in °/s.
const FULL_CORRECTION_DPS: f64 = 250.0;

/// Calibration burned into the simulated BMP180 (datasheet example unit).
const SIM_CALIBRATION: CalibrationSet = CalibrationSet {
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

// ---------------------------------------------------------------------------
// Simulated atmosphere and motion
// ---------------------------------------------------------------------------

/// Ground truth the simulated sensors report, as a function of time.
#[derive(Clone, Copy)]
struct Flight {
    start: Instant,
}

impl Flight {
    fn seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn altitude_m(&self) -> f64 {
        let t = self.seconds();
        FIELD_ELEVATION_M + 40.0 * (t / 20.0).sin()
    }

    fn pressure_pa(&self) -> f64 {
        STANDARD_SEA_LEVEL_PA * (1.0 - self.altitude_m() / 44_330.0).powf(5.255)
    }

    fn temperature_c(&self) -> f64 {
        let t = self.seconds();
        18.0 + 2.5 * (t / 45.0).sin()
    }

    /// Angular rates in °/s.
    fn rates_dps(&self) -> [f64; 3] {
        let t = self.seconds();
        [
            5.0 * (t / 3.0).sin(),
            -3.0 * (t / 4.0).cos(),
            120.0 * (t / 6.0).sin(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Simulated I2C peripherals
// ---------------------------------------------------------------------------

/// A register-addressed device: the first written byte selects the register,
/// further bytes and reads auto-increment from there.
trait RegisterFile {
    fn registers(&mut self) -> &mut [u8];
    fn pointer(&mut self) -> &mut u8;

    /// Hook run after `register` was written.
    fn on_write(&mut self, _register: u8) {}

    /// Hook run before a read starting at `register`.
    fn on_read(&mut self, _register: u8) {}

    fn write(&mut self, bytes: &[u8]) {
        let Some((&register, values)) = bytes.split_first() else {
            return;
        };
        *self.pointer() = register;
        for (offset, &value) in values.iter().enumerate() {
            let reg = register.wrapping_add(offset as u8);
            if let Some(slot) = self.registers().get_mut(usize::from(reg)) {
                *slot = value;
            }
            self.on_write(reg);
        }
    }

    fn read(&mut self, buf: &mut [u8]) {
        let start = *self.pointer();
        self.on_read(start);
        let registers = self.registers();
        for (offset, byte) in buf.iter_mut().enumerate() {
            let reg = usize::from(start) + offset;
            *byte = registers.get(reg).copied().unwrap_or(0);
        }
    }
}

/// BMP180 whose conversions produce the raw words that compensate to the
/// current [`Flight`] temperature and pressure.
struct SimBmp180 {
    registers: [u8; 0x100],
    pointer: u8,
    flight: Flight,
    raw_temp: i16,
}

impl SimBmp180 {
    const ADDRESS: u8 = 0x77;

    fn new(flight: Flight) -> Self {
        let mut registers = [0u8; 0x100];
        let c = SIM_CALIBRATION;
        let words: [[u8; 2]; 11] = [
            c.ac1.to_be_bytes(),
            c.ac2.to_be_bytes(),
            c.ac3.to_be_bytes(),
            c.ac4.to_be_bytes(),
            c.ac5.to_be_bytes(),
            c.ac6.to_be_bytes(),
            c.b1.to_be_bytes(),
            c.b2.to_be_bytes(),
            c.mb.to_be_bytes(),
            c.mc.to_be_bytes(),
            c.md.to_be_bytes(),
        ];
        for (i, word) in words.iter().enumerate() {
            registers[0xAA + 2 * i..0xAA + 2 * i + 2].copy_from_slice(word);
        }
        registers[0xD0] = 0x55;

        Self {
            registers,
            pointer: 0,
            flight,
            raw_temp: c.ac6 as i16,
        }
    }

    /// Smallest UT whose compensated temperature reaches `target_c`.
    fn solve_raw_temperature(target_c: f64) -> i16 {
        let target = (target_c * 10.0).round() as i32;
        let (mut low, mut high) = (21_000i32, 40_000i32);
        while low < high {
            let mid = (low + high) / 2;
            let deci = compensate_temperature(&SIM_CALIBRATION, mid as i16)
                .map(|t| t.deci_celsius())
                .unwrap_or(i32::MIN);
            if deci < target {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low as i16
    }

    /// Smallest UP whose compensated pressure reaches `target_pa` in `mode`.
    fn solve_raw_pressure(&self, target_pa: f64, mode: OperatingMode) -> u32 {
        let target = target_pa.round() as i32;
        let Ok(temperature) = compensate_temperature(&SIM_CALIBRATION, self.raw_temp) else {
            return 0;
        };
        let oss = mode.oversampling();
        let (mut low, mut high) = (15_000u32 << oss, 40_000u32 << oss);
        while low < high {
            let mid = low + (high - low) / 2;
            let p = compensate_pressure(&SIM_CALIBRATION, &temperature, mid, mode)
                .unwrap_or(i32::MIN);
            if p < target {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    fn start_conversion(&mut self, command: u8) {
        match command {
            0x2E => {
                self.raw_temp = Self::solve_raw_temperature(self.flight.temperature_c());
                let [msb, lsb] = self.raw_temp.to_be_bytes();
                self.registers[0xF6..0xF9].copy_from_slice(&[msb, lsb, 0]);
            }
            cmd if cmd & 0x3F == 0x34 => {
                let mode = OperatingMode::ALL[usize::from(cmd >> 6)];
                let up = self.solve_raw_pressure(self.flight.pressure_pa(), mode);
                let word = up << mode.raw_pressure_shift();
                let [_, msb, lsb, xlsb] = word.to_be_bytes();
                self.registers[0xF6..0xF9].copy_from_slice(&[msb, lsb, xlsb]);
            }
            other => warn!("SimBmp180: unknown control command 0x{:02x}", other),
        }
    }
}

impl RegisterFile for SimBmp180 {
    fn registers(&mut self) -> &mut [u8] {
        &mut self.registers
    }

    fn pointer(&mut self) -> &mut u8 {
        &mut self.pointer
    }

    fn on_write(&mut self, register: u8) {
        if register == 0xF4 {
            self.start_conversion(self.registers[0xF4]);
        }
    }
}

/// ITG-3205 reporting the current [`Flight`] rates and die temperature.
struct SimItg3205 {
    registers: [u8; 0x40],
    pointer: u8,
    flight: Flight,
}

impl SimItg3205 {
    const ADDRESS: u8 = 0x69;

    fn new(flight: Flight) -> Self {
        let mut sim = Self {
            registers: [0u8; 0x40],
            pointer: 0,
            flight,
        };
        sim.reset();
        sim
    }

    fn reset(&mut self) {
        self.registers = [0u8; 0x40];
        self.registers[0x00] = Self::ADDRESS;
        self.registers[0x3E] = 0x00;
    }

    fn sample(&mut self) {
        let die = ((self.flight.temperature_c() + 5.0 - 35.0) * 280.0 - 13_200.0) as i16;
        self.registers[0x1B..0x1D].copy_from_slice(&die.to_be_bytes());

        for (i, rate) in self.flight.rates_dps().iter().enumerate() {
            let raw = (rate * 14.375) as i16;
            let reg = 0x1D + 2 * i;
            self.registers[reg..reg + 2].copy_from_slice(&raw.to_be_bytes());
        }
        // Data ready, PLL ready
        self.registers[0x1A] = 0x05;
    }
}

impl RegisterFile for SimItg3205 {
    fn registers(&mut self) -> &mut [u8] {
        &mut self.registers
    }

    fn pointer(&mut self) -> &mut u8 {
        &mut self.pointer
    }

    fn on_write(&mut self, register: u8) {
        if register == 0x3E && self.registers[0x3E] & 0x80 != 0 {
            debug!("SimItg3205: hardware reset");
            self.reset();
        }
    }

    fn on_read(&mut self, register: u8) {
        if (0x1A..=0x22).contains(&register) {
            self.sample();
        }
    }
}

/// The physical I2C bus with both simulated peripherals attached.
struct SimBus {
    barometer: SimBmp180,
    gyroscope: SimItg3205,
}

impl SimBus {
    fn device(&mut self, address: SevenBitAddress) -> Result<&mut dyn RegisterFile, i2c::ErrorKind> {
        match address {
            SimBmp180::ADDRESS => Ok(&mut self.barometer),
            SimItg3205::ADDRESS => Ok(&mut self.gyroscope),
            _ => Err(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
        }
    }
}

impl i2c::ErrorType for SimBus {
    type Error = i2c::ErrorKind;
}

impl i2c::I2c for SimBus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let device = self.device(address)?;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => device.write(bytes),
                Operation::Read(buf) => device.read(buf),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Delay and PWM
// ---------------------------------------------------------------------------

/// Blocking delay backed by the host scheduler.
struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// 8-bit PWM channel that logs every duty cycle change.
struct LoggedPwm {
    name: &'static str,
    duty: u16,
}

impl LoggedPwm {
    const fn new(name: &'static str) -> Self {
        Self { name, duty: 0 }
    }
}

impl pwm::ErrorType for LoggedPwm {
    type Error = pwm::ErrorKind;
}

impl SetDutyCycle for LoggedPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if duty != self.duty {
            debug!("PWM {}: {}/255", self.name, duty);
            self.duty = duty;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Load the configuration blob named on the command line, or fall back to
/// the defaults.
fn load_config() -> Config {
    let Some(path) = std::env::args().nth(1) else {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        match Config::default().to_slice(&mut buf) {
            Ok(encoded) => info!("Using default configuration ({:02x?})", encoded),
            Err(e) => warn!("Using default configuration ({})", e),
        }
        return Config::default();
    };

    match std::fs::read(&path) {
        Ok(bytes) => match Config::from_bytes(&bytes) {
            Ok(config) => {
                info!("Loaded configuration from {}", path);
                config
            }
            Err(e) => {
                warn!("{}: {}, using defaults", path, e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("Cannot read {}: {}, using defaults", path, e);
            Config::default()
        }
    }
}

fn main() -> Result<(), SensorError> {
    env_logger::init();
    info!("Starting flightbox simulator");

    let config = load_config();
    let flight = Flight {
        start: Instant::now(),
    };
    let bus = shared_bus(SimBus {
        barometer: SimBmp180::new(flight),
        gyroscope: SimItg3205::new(flight),
    });

    let mut barometer: Bmp180Indexed<_, _> =
        Bmp180::new(SharedI2cDevice::new(&bus), StdDelay, config.barometer)?.into();
    let mut gyroscope: Itg3205Indexed<_> =
        Itg3205::new(SharedI2cDevice::new(&bus), config.gyroscope)?.into();

    info!(
        "BMP180 chip id 0x{:02x}, ITG-3205 WHO_AM_I 0x{:02x}",
        barometer.sensor_mut().chip_id()?,
        gyroscope.sensor_mut().who_am_i()?
    );

    let mut motors = match DualMotorDriver::new(
        LoggedPwm::new("left forward"),
        LoggedPwm::new("left backward"),
        LoggedPwm::new("right forward"),
        LoggedPwm::new("right backward"),
    ) {
        Ok(motors) => motors,
        Err(e) => {
            error!("Motor driver: {}", e);
            return Ok(());
        }
    };

    // Reference pressure from the known field elevation, measured once
    let sealevel_pa = barometer
        .sensor_mut()
        .read_sealevel_pressure(FIELD_ELEVATION_M)?;
    info!("Sea-level reference: {:.0} Pa", sealevel_pa);

    let mut values = [0i32; MAX_VALUES];
    loop {
        let tick = Instant::now();

        if let Err(e) = barometer.read_into(&mut values) {
            error!("Barometer sample failed: {}", e);
        }
        if let Err(e) = gyroscope.read_into(&mut values) {
            error!("Gyroscope sample failed: {}", e);
        }

        let altitude_m = altitude::altitude(f64::from(values[PRESSURE]), sealevel_pa);
        info!(
            "T {:.1} °C  p {} Pa  h {:.1} m (true {:.1} m)  rate [{:.2} {:.2} {:.2}] °/s",
            f64::from(values[TEMPERATURE]) / 1000.0,
            values[PRESSURE],
            altitude_m,
            flight.altitude_m(),
            f64::from(values[RATE_X]) / 1000.0,
            f64::from(values[RATE_Y]) / 1000.0,
            f64::from(values[RATE_Z]) / 1000.0,
        );

        match gyroscope.sensor_mut().die_temperature() {
            Ok(die) => debug!("Gyroscope die temperature {:.1} °C", die),
            Err(e) => error!("Gyroscope temperature failed: {}", e),
        }

        // Counter the yaw rate with differential thrust
        let correction = -(f64::from(values[RATE_Z]) / 1000.0) / FULL_CORRECTION_DPS;
        let commanded = motors
            .set_ratio(Side::Left, correction)
            .and_then(|()| motors.set_ratio(Side::Right, -correction));
        if let Err(e) = commanded {
            error!("{}", e);
            if let Err(e) = motors.all_stop() {
                error!("All stop failed: {}", e);
            }
        }
        info!(
            "Motors L {:+.2}  R {:+.2}",
            motors.ratio(Side::Left),
            motors.ratio(Side::Right)
        );

        let elapsed = tick.elapsed();
        if elapsed < TICK_INTERVAL {
            std::thread::sleep(TICK_INTERVAL - elapsed);
        }
    }
}
