use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::core::config_validation::OUTPUT_PLACEHOLDER;

/// カメラ制御のエラー
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("カメラは既に使用中です")]
    Busy,

    #[error("撮影に失敗しました: {0}")]
    CaptureFailed(String),

    #[error("画像ディレクトリを準備できません: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// オープン中のカメラを表すトークン
///
/// `Camera::open` でしか作れず、`Camera::close` で消費される。複製できない。
#[derive(Debug)]
pub struct CameraHandle {
    _private: (),
}

impl CameraHandle {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// カメラ
pub trait Camera {
    fn open(&mut self) -> Result<CameraHandle, CameraError>;

    /// 1枚撮影して保存先のパスを返す
    fn capture(&mut self, handle: &CameraHandle) -> Result<PathBuf, CameraError>;

    fn close(&mut self, handle: CameraHandle);
}

/// 外部コマンド（fswebcam など）で撮影するカメラ
///
/// コマンド引数中の `{output}` を保存先パスに置き換えて実行する。
pub struct CommandCamera {
    command: Vec<String>,
    image_dir: PathBuf,
    opened: bool,
}

impl CommandCamera {
    pub fn new(command: Vec<String>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            image_dir: image_dir.into(),
            opened: false,
        }
    }

    /// 記録のタイムスタンプと同じ UTC で、ミリ秒まで含めたファイル名
    fn image_path(&self, now: DateTime<Utc>) -> PathBuf {
        self.image_dir
            .join(now.format("%Y%m%d_%H%M%S_%3f.jpg").to_string())
    }

    /// 既存の画像は上書きしない
    fn capture_to(&self, path: PathBuf) -> Result<PathBuf, CameraError> {
        if path.exists() {
            return Err(CameraError::CaptureFailed(format!(
                "画像ファイルが既に存在します: {}",
                path.display()
            )));
        }
        self.run(&path)?;

        if !path.is_file() {
            return Err(CameraError::CaptureFailed(format!(
                "画像ファイルが作成されませんでした: {}",
                path.display()
            )));
        }
        info!("画像を保存しました: {}", path.display());
        Ok(path)
    }

    fn run(&self, output: &Path) -> Result<(), CameraError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| CameraError::CaptureFailed("撮影コマンドが空です".to_string()))?;
        let output = output.to_string_lossy();
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect();

        debug!("撮影コマンド: {} {}", program, args.join(" "));
        let result = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| CameraError::CaptureFailed(format!("{}: {}", program, e)))?;

        if !result.status.success() {
            return Err(CameraError::CaptureFailed(format!(
                "{} が終了コード {:?} で失敗しました: {}",
                program,
                result.status.code(),
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Camera for CommandCamera {
    fn open(&mut self) -> Result<CameraHandle, CameraError> {
        if self.opened {
            return Err(CameraError::Busy);
        }
        std::fs::create_dir_all(&self.image_dir).map_err(|source| CameraError::Io {
            path: self.image_dir.clone(),
            source,
        })?;
        self.opened = true;
        debug!("カメラを開きました");
        Ok(CameraHandle::new())
    }

    fn capture(&mut self, _handle: &CameraHandle) -> Result<PathBuf, CameraError> {
        self.capture_to(self.image_path(Utc::now()))
    }

    fn close(&mut self, _handle: CameraHandle) {
        if !self.opened {
            warn!("開いていないカメラを閉じようとしました");
        }
        self.opened = false;
        debug!("カメラを閉じました");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(command: &str, dir: &Path) -> CommandCamera {
        CommandCamera::new(
            command.split_whitespace().map(str::to_string).collect(),
            dir.join("unprocessed_images"),
        )
    }

    #[test]
    fn test_capture_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("touch {output}", dir.path());

        let handle = camera.open().unwrap();
        let path = camera.capture(&handle).unwrap();
        camera.close(handle);

        assert!(path.is_file());
        assert_eq!(path.parent().unwrap(), dir.path().join("unprocessed_images"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        // YYYYmmdd_HHMMSS_mmm.jpg
        assert_eq!(name.len(), 23);
        assert!(name.ends_with(".jpg"));
        assert_eq!(&name[8..9], "_");
        assert_eq!(&name[15..16], "_");
    }

    #[test]
    fn test_image_name_uses_utc_with_millis() {
        let dir = tempfile::tempdir().unwrap();
        let camera = camera("touch {output}", dir.path());
        let now = DateTime::from_timestamp_millis(1_704_110_400_123).unwrap();

        let path = camera.image_path(now);
        assert_eq!(
            path,
            dir.path().join("unprocessed_images").join("20240101_120000_123.jpg")
        );
    }

    #[test]
    fn test_existing_image_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("touch {output}", dir.path());
        let handle = camera.open().unwrap();

        let now = DateTime::from_timestamp_millis(1_704_110_400_123).unwrap();
        let first = camera.capture_to(camera.image_path(now)).unwrap();
        std::fs::write(&first, b"leaf").unwrap();

        let second = camera.capture_to(camera.image_path(now));
        assert!(matches!(second, Err(CameraError::CaptureFailed(_))));
        assert_eq!(std::fs::read(&first).unwrap(), b"leaf");
        camera.close(handle);
    }

    #[test]
    fn test_double_open_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("touch {output}", dir.path());

        let handle = camera.open().unwrap();
        assert!(matches!(camera.open(), Err(CameraError::Busy)));

        camera.close(handle);
        let handle = camera.open().unwrap();
        camera.close(handle);
    }

    #[test]
    fn test_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("false {output}", dir.path());

        let handle = camera.open().unwrap();
        assert!(matches!(
            camera.capture(&handle),
            Err(CameraError::CaptureFailed(_))
        ));
        camera.close(handle);
    }

    #[test]
    fn test_command_without_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("true {output}", dir.path());

        let handle = camera.open().unwrap();
        assert!(matches!(
            camera.capture(&handle),
            Err(CameraError::CaptureFailed(_))
        ));
        camera.close(handle);
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("no-such-capture-tool {output}", dir.path());

        let handle = camera.open().unwrap();
        assert!(matches!(
            camera.capture(&handle),
            Err(CameraError::CaptureFailed(_))
        ));
        camera.close(handle);
    }
}
