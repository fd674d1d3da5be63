use embedded_hal::digital::InputPin;
use leaf_health_core::SoilMoisture;
use log::info;

use super::env_sensor::SensorReadError;

/// 土壌水分センサー（乾湿2値）
pub trait MoistureSensor {
    fn read(&mut self) -> Result<SoilMoisture, SensorReadError>;
}

/// デジタル出力の土壌水分センサー
pub struct DigitalMoistureSensor<P> {
    pin: P,
    wet_when_low: bool,
}

impl<P: InputPin> DigitalMoistureSensor<P> {
    /// `wet_when_low`: 一般的な比較器モジュールは湿っているとLOWを出す
    pub fn new(pin: P, wet_when_low: bool) -> Self {
        Self { pin, wet_when_low }
    }
}

impl<P: InputPin> MoistureSensor for DigitalMoistureSensor<P> {
    fn read(&mut self) -> Result<SoilMoisture, SensorReadError> {
        let low = self
            .pin
            .is_low()
            .map_err(|e| SensorReadError::Bus(format!("{:?}", e)))?;

        let moisture = if low == self.wet_when_low {
            SoilMoisture::Wet
        } else {
            SoilMoisture::Dry
        };
        info!(
            "土壌水分: {}",
            match moisture {
                SoilMoisture::Wet => "wet",
                SoilMoisture::Dry => "dry",
            }
        );
        Ok(moisture)
    }
}
