use anyhow::anyhow;
use log::{error, info};
use tracing_subscriber::EnvFilter;

use leaf_monitor::config::AppConfig;
use leaf_monitor::core::MonitoringCycle;
use leaf_monitor::VERSION;

/// ログ出力の初期化（RUST_LOG があればそれを優先）
fn init_logging(debug_mode: bool) {
    let default_level = if debug_mode { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 機器を初期化して測定サイクルを組み立てる
#[cfg(target_os = "linux")]
fn build_cycle(config: &AppConfig) -> anyhow::Result<MonitoringCycle> {
    use leaf_health_core::{DiseaseClassifier, HealthModel, TreeEnsemble};
    use leaf_monitor::core::{CsvRecordLog, CycleDevices, CycleSettings};
    use leaf_monitor::hardware::gpio::GpioChip;
    use leaf_monitor::hardware::{
        AdcPhSensor, CommandCamera, DigitalMoistureSensor, IioDhtSensor, StatusLed,
    };
    use leaf_monitor::power::ThreadSleep;
    use linux_embedded_hal::Delay;
    use mcp3208::{Mcp3208, PinBus};

    // モデルはピンを確保する前に読む
    let model: Box<dyn HealthModel> = Box::new(TreeEnsemble::load(&config.model_path)?);

    info!("GPIOを初期化しています: {}", config.gpio_chip.display());
    let mut chip = GpioChip::open(&config.gpio_chip)?;

    let pins = config.adc_pins;
    let bus = PinBus::new(
        chip.output(pins.cs, true)?, // CS は LOW でアクティブ
        chip.output(pins.clk, false)?,
        chip.output(pins.din, false)?,
        chip.input(pins.dout)?,
    );
    let adc = Mcp3208::new(bus, Delay).with_half_period_ns(config.adc_clock_half_period_ns);
    let ph = AdcPhSensor::new(adc, config.ph_adc_channel, config.ph_calibration);
    info!(
        "MCP3208: CS={}, CLK={}, DIN={}, DOUT={}, pH ch={}",
        pins.cs, pins.clk, pins.din, pins.dout, config.ph_adc_channel
    );

    let moisture = DigitalMoistureSensor::new(
        chip.input(config.moisture_pin)?,
        config.moisture_wet_when_low,
    );

    let mut led = StatusLed::new(
        chip.output(config.led_pin, config.led_active_low)?,
        Delay,
        config.led_active_low,
    )?;
    if config.debug_mode {
        led.blink_success()?;
    }

    let devices = CycleDevices {
        environment: Box::new(IioDhtSensor::new(&config.iio_device_path)),
        moisture: Box::new(moisture),
        ph: Box::new(ph),
        camera: Box::new(CommandCamera::new(
            config.camera_command.clone(),
            &config.image_dir,
        )),
        alert: Box::new(led),
    };

    Ok(MonitoringCycle::new(
        devices,
        DiseaseClassifier::new(model),
        Box::new(CsvRecordLog::new(&config.data_path)),
        Box::new(ThreadSleep),
        CycleSettings {
            alert_duration: config.alert_duration,
            cycle_interval: config.cycle_interval,
        },
    ))
}

#[cfg(not(target_os = "linux"))]
fn build_cycle(_config: &AppConfig) -> anyhow::Result<MonitoringCycle> {
    Err(anyhow!("GPIOは Linux (Raspberry Pi) でのみ使用できます"))
}

/// アプリケーションのメインエントリーポイント
fn main() -> anyhow::Result<()> {
    let loaded = AppConfig::load();
    init_logging(loaded.as_ref().is_ok_and(|c| c.debug_mode));

    info!("leaf-monitor v{} を起動します", VERSION);

    // 設定ファイル読み込み
    let app_config = loaded.map_err(|e| {
        error!("設定ファイルの読み込みに失敗しました: {}", e);
        anyhow!("設定ファイルの読み込みエラー: {}", e)
    })?;
    info!(
        "記録先: {}, 画像: {}, モデル: {}",
        app_config.data_path.display(),
        app_config.image_dir.display(),
        app_config.model_path.display()
    );

    let mut cycle = build_cycle(&app_config).inspect_err(|e| {
        error!("初期化に失敗しました: {:#}", e);
    })?;

    cycle.run()
}
