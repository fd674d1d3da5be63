//! テスト用のハードウェアモック
//!
//! 実機を使わずに測定サイクルを動かすための実装。呼び出しを記録し、
//! エラーを注入できる。クローンは同じ記録を共有する。

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::ErrorKind;
use leaf_health_core::{EnvironmentReading, SoilMoisture};
use mcp3208::SerialBus;

use super::camera::{Camera, CameraError, CameraHandle};
use super::env_sensor::{EnvironmentSensor, SensorReadError};
use super::led::{AlertActuator, LedError};
use super::moisture_sensor::MoistureSensor;
use super::ph_sensor::{PhProbe, PhReadError, PhReading};

/// 待たない DelayNs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Debug, Default)]
struct AdcState {
    codes: [u16; 8],
    selected: bool,
    clock_high: bool,
    data_in: bool,
    rising_edges: u8,
    command: u8,
    operations: usize,
    channels_read: Vec<u8>,
    bus_error: bool,
}

/// MCP3208 の応答を模擬するバス
#[derive(Debug, Clone, Default)]
pub struct MockAdcBus {
    state: Arc<Mutex<AdcState>>,
}

impl MockAdcBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用: チャンネルが返す値を設定
    pub fn set_code(&self, channel: usize, code: u16) {
        self.state.lock().unwrap().codes[channel] = code & mcp3208::FULL_SCALE;
    }

    /// テスト用: バス操作をすべて失敗させる
    pub fn set_bus_error(&self, enable: bool) {
        self.state.lock().unwrap().bus_error = enable;
    }

    /// テスト用: コマンドで指定されたチャンネルの履歴
    pub fn get_channels_read(&self) -> Vec<u8> {
        self.state.lock().unwrap().channels_read.clone()
    }

    pub fn operation_count(&self) -> usize {
        self.state.lock().unwrap().operations
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut AdcState) -> T) -> Result<T, ErrorKind> {
        let mut state = self.state.lock().unwrap();
        state.operations += 1;
        if state.bus_error {
            return Err(ErrorKind::Other);
        }
        Ok(f(&mut state))
    }
}

impl SerialBus for MockAdcBus {
    type Error = ErrorKind;

    fn set_select(&mut self, active: bool) -> Result<(), ErrorKind> {
        self.with_state(|s| {
            if active && !s.selected {
                s.rising_edges = 0;
                s.command = 0;
            }
            s.selected = active;
        })
    }

    fn set_clock(&mut self, high: bool) -> Result<(), ErrorKind> {
        self.with_state(|s| {
            if high && !s.clock_high && s.selected {
                s.rising_edges += 1;
                if s.rising_edges <= 5 {
                    s.command = (s.command << 1) | u8::from(s.data_in);
                    if s.rising_edges == 5 {
                        let channel = s.command & 0x07;
                        s.channels_read.push(channel);
                    }
                }
            }
            s.clock_high = high;
        })
    }

    fn set_data(&mut self, high: bool) -> Result<(), ErrorKind> {
        self.with_state(|s| s.data_in = high)
    }

    fn read_data(&mut self) -> Result<bool, ErrorKind> {
        self.with_state(|s| {
            // 立ち上がり 7〜18 回目で B11..B0 を出力
            if !s.selected || !(7..=18).contains(&s.rising_edges) {
                return false;
            }
            let code = s.codes[usize::from(s.command & 0x07)];
            (code >> (11 - (s.rising_edges - 7))) & 1 == 1
        })
    }
}

/// 温湿度センサーのモック
#[derive(Debug, Clone)]
pub struct MockEnvironmentSensor {
    pub reading: Arc<Mutex<EnvironmentReading>>,
    pub simulate_error: Arc<Mutex<bool>>,
    pub read_count: Arc<Mutex<usize>>,
}

impl MockEnvironmentSensor {
    pub fn new(temperature_celsius: f32, humidity_percent: f32) -> Self {
        Self {
            reading: Arc::new(Mutex::new(EnvironmentReading {
                temperature_celsius,
                humidity_percent,
            })),
            simulate_error: Arc::new(Mutex::new(false)),
            read_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_reading(&self, temperature_celsius: f32, humidity_percent: f32) {
        *self.reading.lock().unwrap() = EnvironmentReading {
            temperature_celsius,
            humidity_percent,
        };
    }

    /// テスト用: 読み取りエラーをシミュレート
    pub fn set_error(&self, enable: bool) {
        *self.simulate_error.lock().unwrap() = enable;
    }

    pub fn get_read_count(&self) -> usize {
        *self.read_count.lock().unwrap()
    }
}

impl EnvironmentSensor for MockEnvironmentSensor {
    fn read(&mut self) -> Result<EnvironmentReading, SensorReadError> {
        *self.read_count.lock().unwrap() += 1;
        if *self.simulate_error.lock().unwrap() {
            return Err(SensorReadError::InvalidData("Simulated DHT error".to_string()));
        }
        Ok(*self.reading.lock().unwrap())
    }
}

#[derive(Debug, Clone)]
pub struct MockMoistureSensor {
    pub moisture: Arc<Mutex<SoilMoisture>>,
    pub simulate_error: Arc<Mutex<bool>>,
}

impl MockMoistureSensor {
    pub fn new(moisture: SoilMoisture) -> Self {
        Self {
            moisture: Arc::new(Mutex::new(moisture)),
            simulate_error: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_moisture(&self, moisture: SoilMoisture) {
        *self.moisture.lock().unwrap() = moisture;
    }

    pub fn set_error(&self, enable: bool) {
        *self.simulate_error.lock().unwrap() = enable;
    }
}

impl MoistureSensor for MockMoistureSensor {
    fn read(&mut self) -> Result<SoilMoisture, SensorReadError> {
        if *self.simulate_error.lock().unwrap() {
            return Err(SensorReadError::Bus("Simulated GPIO error".to_string()));
        }
        Ok(*self.moisture.lock().unwrap())
    }
}

/// pHプローブのモック（pH値をそのまま返す）
#[derive(Debug, Clone)]
pub struct MockPhProbe {
    pub ph: Arc<Mutex<f32>>,
    pub simulate_error: Arc<Mutex<Option<u8>>>,
    pub read_count: Arc<Mutex<usize>>,
}

impl MockPhProbe {
    pub fn new(ph: f32) -> Self {
        Self {
            ph: Arc::new(Mutex::new(ph)),
            simulate_error: Arc::new(Mutex::new(None)),
            read_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_ph(&self, ph: f32) {
        *self.ph.lock().unwrap() = ph;
    }

    /// テスト用: 無効チャンネルエラーをシミュレート
    pub fn set_invalid_channel(&self, channel: Option<u8>) {
        *self.simulate_error.lock().unwrap() = channel;
    }

    pub fn get_read_count(&self) -> usize {
        *self.read_count.lock().unwrap()
    }
}

impl PhProbe for MockPhProbe {
    fn read_ph(&mut self) -> Result<PhReading, PhReadError> {
        *self.read_count.lock().unwrap() += 1;
        if let Some(channel) = *self.simulate_error.lock().unwrap() {
            return Err(PhReadError::InvalidChannel(channel));
        }
        Ok(PhReading {
            raw: 0,
            voltage: 0.0,
            ph: *self.ph.lock().unwrap(),
        })
    }
}

/// カメラ操作の記録
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    Open,
    Capture,
    Close,
}

/// カメラのモック
///
/// 撮影ごとにキューの先頭の画像パスを返す（キューが空なら既定のパス）。
#[derive(Debug, Clone)]
pub struct MockCamera {
    pub events: Arc<Mutex<Vec<CameraEvent>>>,
    pub image_queue: Arc<Mutex<VecDeque<PathBuf>>>,
    pub default_image: Arc<Mutex<PathBuf>>,
    pub simulate_open_error: Arc<Mutex<bool>>,
    pub simulate_capture_error: Arc<Mutex<bool>>,
    pub is_open: Arc<Mutex<bool>>,
}

impl MockCamera {
    pub fn new(default_image: impl Into<PathBuf>) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            image_queue: Arc::new(Mutex::new(VecDeque::new())),
            default_image: Arc::new(Mutex::new(default_image.into())),
            simulate_open_error: Arc::new(Mutex::new(false)),
            simulate_capture_error: Arc::new(Mutex::new(false)),
            is_open: Arc::new(Mutex::new(false)),
        }
    }

    pub fn queue_image(&self, path: impl Into<PathBuf>) {
        self.image_queue.lock().unwrap().push_back(path.into());
    }

    pub fn set_open_error(&self, enable: bool) {
        *self.simulate_open_error.lock().unwrap() = enable;
    }

    pub fn set_capture_error(&self, enable: bool) {
        *self.simulate_capture_error.lock().unwrap() = enable;
    }

    pub fn get_events(&self) -> Vec<CameraEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn is_open(&self) -> bool {
        *self.is_open.lock().unwrap()
    }
}

impl Camera for MockCamera {
    fn open(&mut self) -> Result<CameraHandle, CameraError> {
        self.events.lock().unwrap().push(CameraEvent::Open);
        if *self.simulate_open_error.lock().unwrap() {
            return Err(CameraError::CaptureFailed("Simulated init error".to_string()));
        }
        let mut is_open = self.is_open.lock().unwrap();
        if *is_open {
            return Err(CameraError::Busy);
        }
        *is_open = true;
        Ok(CameraHandle::new())
    }

    fn capture(&mut self, _handle: &CameraHandle) -> Result<PathBuf, CameraError> {
        self.events.lock().unwrap().push(CameraEvent::Capture);
        if *self.simulate_capture_error.lock().unwrap() {
            return Err(CameraError::CaptureFailed("Simulated capture error".to_string()));
        }
        let queued = self.image_queue.lock().unwrap().pop_front();
        Ok(queued.unwrap_or_else(|| self.default_image.lock().unwrap().clone()))
    }

    fn close(&mut self, _handle: CameraHandle) {
        self.events.lock().unwrap().push(CameraEvent::Close);
        *self.is_open.lock().unwrap() = false;
    }
}

/// アラート出力のモック
#[derive(Debug, Clone, Default)]
pub struct MockAlert {
    pub alerts: Arc<Mutex<Vec<Duration>>>,
    pub simulate_error: Arc<Mutex<bool>>,
}

impl MockAlert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, enable: bool) {
        *self.simulate_error.lock().unwrap() = enable;
    }

    pub fn get_alerts(&self) -> Vec<Duration> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertActuator for MockAlert {
    fn raise_alert(&mut self, duration: Duration) -> Result<(), LedError> {
        if *self.simulate_error.lock().unwrap() {
            return Err(LedError::ControlFailed("Simulated LED error".to_string()));
        }
        self.alerts.lock().unwrap().push(duration);
        Ok(())
    }
}
