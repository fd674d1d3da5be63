/// コアシステムモジュール
pub mod app_controller;
pub mod config_validation;
// Mock実装（テストと mock フィーチャーでのみ使用可能）
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod record_log;

pub use app_controller::{
    CycleDevices, CycleError, CycleOutcome, CycleSettings, CycleStage, CycleStats,
    MonitoringCycle,
};
pub use record_log::{CsvRecordLog, RecordLog, RecordLogError};
