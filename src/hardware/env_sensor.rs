use std::path::{Path, PathBuf};

use leaf_health_core::EnvironmentReading;
use log::debug;

/// DHT22 の仕様上の測定範囲
pub const TEMPERATURE_RANGE_CELSIUS: (f32, f32) = (-40.0, 80.0);
pub const HUMIDITY_RANGE_PERCENT: (f32, f32) = (0.0, 100.0);

const TEMPERATURE_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

/// センサー読み取りエラー
#[derive(Debug, thiserror::Error)]
pub enum SensorReadError {
    #[error("センサーを読み取れません: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("センサー値が不正です: {0}")]
    InvalidData(String),

    #[error("GPIOの読み取りに失敗しました: {0}")]
    Bus(String),
}

/// 温湿度センサー
///
/// 温度と湿度は両方揃って返すか、エラーにする（片方だけは返さない）。
pub trait EnvironmentSensor {
    fn read(&mut self) -> Result<EnvironmentReading, SensorReadError>;
}

/// Linux IIO の dht11 ドライバ経由で読む DHT22
pub struct IioDhtSensor {
    device_dir: PathBuf,
}

impl IioDhtSensor {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    fn read_milli(&self, file: &str) -> Result<f32, SensorReadError> {
        let path = self.device_dir.join(file);
        let text = std::fs::read_to_string(&path)
            .map_err(|source| SensorReadError::Io { path: path.clone(), source })?;
        parse_milli(&path, &text)
    }
}

fn parse_milli(path: &Path, text: &str) -> Result<f32, SensorReadError> {
    text.trim()
        .parse::<i64>()
        .map(|milli| milli as f32 / 1000.0)
        .map_err(|_| {
            SensorReadError::InvalidData(format!("{}: {:?}", path.display(), text.trim()))
        })
}

fn check_range(name: &str, value: f32, (low, high): (f32, f32)) -> Result<f32, SensorReadError> {
    if (low..=high).contains(&value) {
        Ok(value)
    } else {
        Err(SensorReadError::InvalidData(format!(
            "{} {:.1} が範囲外です ({}〜{})",
            name, value, low, high
        )))
    }
}

impl EnvironmentSensor for IioDhtSensor {
    fn read(&mut self) -> Result<EnvironmentReading, SensorReadError> {
        let temperature = self.read_milli(TEMPERATURE_FILE)?;
        let humidity = self.read_milli(HUMIDITY_FILE)?;

        let reading = EnvironmentReading {
            temperature_celsius: check_range("温度", temperature, TEMPERATURE_RANGE_CELSIUS)?,
            humidity_percent: check_range("湿度", humidity, HUMIDITY_RANGE_PERCENT)?,
        };
        debug!(
            "DHT22: {:.1}°C, {:.1}%",
            reading.temperature_celsius, reading.humidity_percent
        );
        Ok(reading)
    }
}
