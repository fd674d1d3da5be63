/*!
 * # Leaf Monitor Library
 *
 * 植物の環境値と葉の画像を定期的に取得し、黄変の画像判定と学習済みモデルを
 * 組み合わせて病気の可能性を判定、記録・アラートを行うためのライブラリ
 *
 * ## モジュール構成
 * - `config`: ビルド時設定（cfg.toml）の読み込みと検証
 * - `core`: 測定サイクルの制御、記録、設定値の検証
 * - `hardware`: センサー・カメラ・LED の制御（pH は MCP3208 経由）
 * - `power`: サイクル間のスリープ
 *
 * 画像判定・病気判定のロジックは `leaf_health_core`、ADC ドライバは
 * `mcp3208` クレートにある。
 */

pub mod config;
pub mod core;
pub mod hardware;
pub mod power;

// 内部で使用する型をまとめてエクスポート
pub use config::{AppConfig, ConfigError};
pub use crate::core::{
    CsvRecordLog, CycleError, CycleOutcome, CycleStage, MonitoringCycle, RecordLog,
};
pub use hardware::led::{LedError, StatusLed};

/// ライブラリのバージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
