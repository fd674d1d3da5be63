use embedded_hal::delay::DelayNs;
use leaf_health_core::PhCalibration;
use log::info;
use mcp3208::{Mcp3208, RawSample, SerialBus};

/// pH読み取りエラー
#[derive(Debug, thiserror::Error)]
pub enum PhReadError {
    #[error("ADCチャンネルが無効です: {0}")]
    InvalidChannel(u8),

    #[error("ADCバスを操作できません: {0}")]
    BusUnavailable(String),
}

impl<E: std::fmt::Debug> From<mcp3208::Error<E>> for PhReadError {
    fn from(error: mcp3208::Error<E>) -> Self {
        match error {
            mcp3208::Error::InvalidChannel(channel) => PhReadError::InvalidChannel(channel),
            mcp3208::Error::BusUnavailable(e) => PhReadError::BusUnavailable(format!("{:?}", e)),
        }
    }
}

/// 1回分のpH測定値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhReading {
    pub raw: RawSample,
    pub voltage: f32,
    pub ph: f32,
}

/// pHプローブ
pub trait PhProbe {
    fn read_ph(&mut self) -> Result<PhReading, PhReadError>;
}

/// MCP3208 に接続したアナログ pH プローブ
///
/// 1回の測定につき ADC を1回だけ読む（平均化・リトライなし）。
pub struct AdcPhSensor<B, D> {
    adc: Mcp3208<B, D>,
    channel: u8,
    calibration: PhCalibration,
}

impl<B, D> AdcPhSensor<B, D>
where
    B: SerialBus,
    D: DelayNs,
{
    pub fn new(adc: Mcp3208<B, D>, channel: u8, calibration: PhCalibration) -> Self {
        Self {
            adc,
            channel,
            calibration,
        }
    }
}

impl<B, D> PhProbe for AdcPhSensor<B, D>
where
    B: SerialBus,
    D: DelayNs,
{
    fn read_ph(&mut self) -> Result<PhReading, PhReadError> {
        let raw = self.adc.read_channel(self.channel)?;
        let voltage = self.calibration.raw_to_voltage(raw);
        let ph = self.calibration.voltage_to_ph(voltage);

        info!("ADC: {} | Voltage: {:.2} V | pH: {:.2}", raw, voltage, ph);

        Ok(PhReading { raw, voltage, ph })
    }
}
