//! テスト用のモック（記録・モデル・スリープ）

use std::sync::{Arc, Mutex};
use std::time::Duration;

use leaf_health_core::{ClassifierError, FeatureVector, HealthModel, SensorFrame};

use super::record_log::{RecordLog, RecordLogError};
use crate::power::SleepPlatform;

/// 記録のモック
#[derive(Debug, Clone, Default)]
pub struct MockRecordLog {
    pub records: Arc<Mutex<Vec<SensorFrame>>>,
    pub simulate_error: Arc<Mutex<bool>>,
}

impl MockRecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用: 書き込みエラーをシミュレート
    pub fn set_error(&self, enable: bool) {
        *self.simulate_error.lock().unwrap() = enable;
    }

    pub fn get_records(&self) -> Vec<SensorFrame> {
        self.records.lock().unwrap().clone()
    }
}

impl RecordLog for MockRecordLog {
    fn append(&mut self, frame: &SensorFrame) -> Result<(), RecordLogError> {
        if *self.simulate_error.lock().unwrap() {
            return Err(RecordLogError::Io {
                path: "mock.csv".into(),
                source: std::io::Error::other("Simulated write error"),
            });
        }
        self.records.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

/// 固定値を返すモデル
#[derive(Debug, Clone)]
pub struct MockHealthModel {
    pub output: Arc<Mutex<u8>>,
    pub inputs: Arc<Mutex<Vec<[f32; 4]>>>,
}

impl MockHealthModel {
    pub fn new(output: u8) -> Self {
        Self {
            output: Arc::new(Mutex::new(output)),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_output(&self, output: u8) {
        *self.output.lock().unwrap() = output;
    }

    pub fn get_inputs(&self) -> Vec<[f32; 4]> {
        self.inputs.lock().unwrap().clone()
    }
}

impl HealthModel for MockHealthModel {
    fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
        self.inputs.lock().unwrap().push(*features.values());
        Ok(*self.output.lock().unwrap())
    }
}

/// スリープのモック（待たずに記録だけする）
#[derive(Debug, Clone, Default)]
pub struct MockSleep {
    pub sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl MockSleep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl SleepPlatform for MockSleep {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
