use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::sensors::bmp180::config::BarometerConfig;
use crate::sensors::itg3205::GyroscopeConfig;

/// Upper bound of an encoded [`Config`], in bytes.
pub const MAX_ENCODED_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("configuration blob is invalid: {0}")]
    Decode(postcard::Error),
    #[error("configuration does not fit in {capacity} bytes: {error}")]
    Encode {
        capacity: usize,
        error: postcard::Error,
    },
}

/// Configuration of every peripheral driver.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub barometer: BarometerConfig,
    pub gyroscope: GyroscopeConfig,
}

impl Config {
    /// Decode a configuration blob produced by [`Config::to_slice`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|e| {
            log::error!("Failed to decode configuration: {}", e);
            ConfigError::Decode(e)
        })
    }

    /// Encode into `buf`, returning the used prefix.
    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        let capacity = buf.len();
        postcard::to_slice(self, buf).map_err(|error| {
            log::error!("Failed to encode configuration: {}", error);
            ConfigError::Encode { capacity, error }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::bmp180::config::OperatingMode;
    use crate::sensors::itg3205::{InterruptConfig, LowPassFilter};

    #[test]
    fn custom_config_survives_encoding() {
        let mut config = Config::default();
        config.barometer.mode = OperatingMode::UltraHighRes;
        config.barometer.timing.pressure_us[3] = 26_000;
        config.gyroscope.low_pass = LowPassFilter::Hz5;
        config.gyroscope.interrupt = InterruptConfig::ACTIVE_LOW | InterruptConfig::ON_DATA_READY;

        let mut buf = [0u8; MAX_ENCODED_LEN];
        let encoded = config.to_slice(&mut buf).unwrap();

        assert_eq!(Config::from_bytes(encoded), Ok(config));
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let encoded = Config::default().to_slice(&mut buf).unwrap();
        let len = encoded.len();

        assert!(matches!(
            Config::from_bytes(&buf[..len - 1]),
            Err(ConfigError::Decode(_))
        ));
    }

    #[test]
    fn small_buffer_reports_capacity() {
        let mut buf = [0u8; 4];

        assert!(matches!(
            Config::default().to_slice(&mut buf),
            Err(ConfigError::Encode { capacity: 4, .. })
        ));
    }
}
