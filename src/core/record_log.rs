use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use leaf_health_core::SensorFrame;
use log::debug;

/// 時系列CSVのヘッダー行
pub const CSV_HEADER: &str =
    "timestamp,ph,temperature,soil_moisture,humidity,yellowing,image_filepath";

/// 記録エラー
#[derive(Debug, thiserror::Error)]
pub enum RecordLogError {
    #[error("記録ファイルに書き込めません: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 追記専用の測定記録
pub trait RecordLog {
    fn append(&mut self, frame: &SensorFrame) -> Result<(), RecordLogError>;
}

/// CSVファイルへの追記
///
/// ファイルが無い（または空の）ときだけヘッダーを書く。既存の行には触れない。
pub struct CsvRecordLog {
    path: PathBuf,
}

impl CsvRecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> RecordLogError {
        RecordLogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordLog for CsvRecordLog {
    fn append(&mut self, frame: &SensorFrame) -> Result<(), RecordLogError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let is_new = file.metadata().map_err(|e| self.io_error(e))?.len() == 0;

        let mut text = String::new();
        if is_new {
            text.push_str(CSV_HEADER);
            text.push('\n');
        }
        text.push_str(&format_row(frame));
        text.push('\n');

        file.write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| self.io_error(e))?;

        debug!("記録しました: {}", self.path.display());
        Ok(())
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// 1フレーム分のCSV行（改行なし）
///
/// タイムスタンプはエポックミリ秒、測定値は丸めずにそのまま書く。
pub fn format_row(frame: &SensorFrame) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        frame.timestamp_ms,
        frame.ph,
        frame.temperature_celsius,
        frame.soil_moisture.as_u8(),
        frame.humidity_percent,
        frame.yellowing.as_u8(),
        escape_field(&frame.image_path.to_string_lossy())
    )
}
