use std::path::PathBuf;
use std::time::Duration;

use leaf_health_core::PhCalibration;

use crate::core::config_validation::{
    parse_camera_command, validate_adc_channel, validate_full_scale, validate_gpio_pins,
    validate_non_empty, validate_non_zero, validate_positive, ValidationError,
};

/// アプリケーション設定
///
/// この構造体はビルド時に`cfg.toml`ファイルから読み込まれた設定を保持します。
/// ピン番号は BCM 番号です。
#[toml_cfg::toml_config]
pub struct Config {
    #[default("/dev/gpiochip0")] // Raspberry Pi 5 は gpiochip4
    gpio_chip: &'static str,

    // MCP3208
    #[default(26)]
    adc_cs_pin: u8,

    #[default(17)]
    adc_clk_pin: u8,

    #[default(22)]
    adc_din_pin: u8,

    #[default(27)]
    adc_dout_pin: u8,

    #[default(1000)] // 500kHz クロック
    adc_clock_half_period_ns: u32,

    // pH プローブ
    #[default(0)]
    ph_adc_channel: u8,

    #[default(3.3)]
    adc_vref: f32,

    #[default(4095)]
    adc_full_scale: u16,

    #[default(3.30)] // pH 7.0 緩衝液での実測値
    ph_voltage_at_ph7: f32,

    #[default(0.18)]
    ph_volts_per_ph: f32,

    // 土壌水分センサー
    #[default(13)]
    moisture_pin: u8,

    #[default(true)] // LOW = 湿
    moisture_wet_when_low: bool,

    // DHT22
    #[default("/sys/bus/iio/devices/iio:device0")]
    iio_device_path: &'static str,

    // アラート LED
    #[default(21)]
    led_pin: u8,

    #[default(false)]
    led_active_low: bool,

    #[default(5000)]
    alert_duration_ms: u64,

    // カメラ
    #[default("fswebcam -r 1280x720 --no-banner {output}")]
    camera_command: &'static str,

    #[default("unprocessed_images")]
    image_dir: &'static str,

    // 記録
    #[default("data")]
    data_dir: &'static str,

    #[default("timeseries_data.csv")]
    data_file: &'static str,

    #[default("models/health_model.json")]
    model_path: &'static str,

    #[default(600)] // 10分
    cycle_interval_seconds: u64,

    #[default(false)]
    debug_mode: bool,
}

/// 設定エラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("設定値が不正です: {0:?}。cfg.tomlを確認してください。")]
    Invalid(ValidationError),
}

impl From<ValidationError> for ConfigError {
    fn from(error: ValidationError) -> Self {
        ConfigError::Invalid(error)
    }
}

/// MCP3208 の接続ピン
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcPins {
    pub cs: u8,
    pub clk: u8,
    pub din: u8,
    pub dout: u8,
}

/// アプリケーション設定を表す構造体
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// GPIO キャラクタデバイス
    pub gpio_chip: PathBuf,
    pub adc_pins: AdcPins,
    pub adc_clock_half_period_ns: u32,

    /// pH プローブを接続した ADC チャンネル (0-7)
    pub ph_adc_channel: u8,
    pub ph_calibration: PhCalibration,

    pub moisture_pin: u8,
    pub moisture_wet_when_low: bool,

    /// DHT22 を公開している IIO デバイスのディレクトリ
    pub iio_device_path: PathBuf,

    pub led_pin: u8,
    pub led_active_low: bool,
    /// 病気検出時に LED を点灯し続ける時間
    pub alert_duration: Duration,

    /// 撮影コマンド（引数分割済み、`{output}` を含む）
    pub camera_command: Vec<String>,
    pub image_dir: PathBuf,

    /// 時系列 CSV のパス
    pub data_path: PathBuf,
    pub model_path: PathBuf,

    /// サイクル間のスリープ時間
    pub cycle_interval: Duration,

    pub debug_mode: bool,
}

impl AppConfig {
    /// 設定ファイルから設定をロードします
    pub fn load() -> Result<Self, ConfigError> {
        // toml_cfg によって生成された定数
        Self::from_config(&CONFIG)
    }

    fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let adc_pins = AdcPins {
            cs: config.adc_cs_pin,
            clk: config.adc_clk_pin,
            din: config.adc_din_pin,
            dout: config.adc_dout_pin,
        };
        validate_gpio_pins(&[
            adc_pins.cs,
            adc_pins.clk,
            adc_pins.din,
            adc_pins.dout,
            config.moisture_pin,
            config.led_pin,
        ])?;

        let adc_clock_half_period_ns = validate_non_zero(
            "adc_clock_half_period_ns",
            u64::from(config.adc_clock_half_period_ns),
        )? as u32;

        let ph_calibration = PhCalibration {
            vref: validate_positive("adc_vref", config.adc_vref)?,
            full_scale: validate_full_scale(config.adc_full_scale)?,
            voltage_at_ph7: validate_positive("ph_voltage_at_ph7", config.ph_voltage_at_ph7)?,
            volts_per_ph: validate_positive("ph_volts_per_ph", config.ph_volts_per_ph)?,
        };

        let alert_duration = Duration::from_millis(validate_non_zero(
            "alert_duration_ms",
            config.alert_duration_ms,
        )?);
        let cycle_interval = Duration::from_secs(validate_non_zero(
            "cycle_interval_seconds",
            config.cycle_interval_seconds,
        )?);

        let data_dir = validate_non_empty("data_dir", config.data_dir)?;
        let data_file = validate_non_empty("data_file", config.data_file)?;

        Ok(AppConfig {
            gpio_chip: PathBuf::from(validate_non_empty("gpio_chip", config.gpio_chip)?),
            adc_pins,
            adc_clock_half_period_ns,
            ph_adc_channel: validate_adc_channel(config.ph_adc_channel)?,
            ph_calibration,
            moisture_pin: config.moisture_pin,
            moisture_wet_when_low: config.moisture_wet_when_low,
            iio_device_path: PathBuf::from(validate_non_empty(
                "iio_device_path",
                config.iio_device_path,
            )?),
            led_pin: config.led_pin,
            led_active_low: config.led_active_low,
            alert_duration,
            camera_command: parse_camera_command(config.camera_command)?,
            image_dir: PathBuf::from(validate_non_empty("image_dir", config.image_dir)?),
            data_path: PathBuf::from(data_dir).join(data_file),
            model_path: PathBuf::from(validate_non_empty("model_path", config.model_path)?),
            cycle_interval,
            debug_mode: config.debug_mode,
        })
    }
}
