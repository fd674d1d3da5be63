use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use leaf_health_core::{
    Acquisition, ClassifierDecision, ClassifierError, DiseaseClassifier, HealthModel, ScoreError,
    SensorFrame, YellowingFlag, YellownessScorer,
};
use log::{error, info, warn};

use crate::core::record_log::{RecordLog, RecordLogError};
use crate::hardware::{
    AlertActuator, Camera, CameraError, EnvironmentSensor, LedError, MoistureSensor, PhProbe,
    PhReadError, SensorReadError,
};
use crate::power::SleepPlatform;

/// 測定サイクルの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Idle,
    Acquiring,
    Scoring,
    Deciding,
    Persisting,
    Alerting,
    Sleeping,
}

/// サイクルを中断したエラー（段階と機器が分かる）
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("温湿度センサーの読み取りに失敗しました: {0}")]
    Environment(#[source] SensorReadError),

    #[error("土壌水分センサーの読み取りに失敗しました: {0}")]
    Moisture(#[source] SensorReadError),

    #[error("pHの読み取りに失敗しました: {0}")]
    Ph(#[from] PhReadError),

    #[error("撮影に失敗しました: {0}")]
    Camera(#[from] CameraError),

    #[error("黄変率を算出できません: {0}")]
    Scoring(#[from] ScoreError),

    #[error("病気判定に失敗しました: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("測定記録の保存に失敗しました: {0}")]
    Persistence(#[from] RecordLogError),

    #[error("アラートを出せませんでした: {0}")]
    Alert(#[from] LedError),
}

impl CycleError {
    pub fn stage(&self) -> CycleStage {
        match self {
            CycleError::Environment(_)
            | CycleError::Moisture(_)
            | CycleError::Ph(_)
            | CycleError::Camera(_) => CycleStage::Acquiring,
            CycleError::Scoring(_) => CycleStage::Scoring,
            CycleError::Classifier(_) => CycleStage::Deciding,
            CycleError::Persistence(_) => CycleStage::Persisting,
            CycleError::Alert(_) => CycleStage::Alerting,
        }
    }

    /// 失敗した機器・処理の名前（ログ用）
    pub fn sensor(&self) -> &'static str {
        match self {
            CycleError::Environment(_) => "DHT22",
            CycleError::Moisture(_) => "soil_moisture",
            CycleError::Ph(_) => "ph_probe",
            CycleError::Camera(_) => "camera",
            CycleError::Scoring(_) => "yellowness_scorer",
            CycleError::Classifier(_) => "disease_classifier",
            CycleError::Persistence(_) => "record_log",
            CycleError::Alert(_) => "alert_led",
        }
    }
}

/// 1サイクルの結果
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub frame: SensorFrame,
    pub decision: ClassifierDecision,
    pub yellow_percent: f32,
}

/// サイクルで使う機器一式
pub struct CycleDevices {
    pub environment: Box<dyn EnvironmentSensor>,
    pub moisture: Box<dyn MoistureSensor>,
    pub ph: Box<dyn PhProbe>,
    pub camera: Box<dyn Camera>,
    pub alert: Box<dyn AlertActuator>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSettings {
    pub alert_duration: Duration,
    pub cycle_interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub completed: u64,
    pub failed: u64,
}

/// 測定サイクルの制御
///
/// `Acquiring → Scoring → Deciding → Persisting → (Alerting) → Sleeping` を
/// 1サイクルとして繰り返す。どこで失敗してもその回の記録は残さず、
/// 必ず Sleeping を経て次のサイクルに進む。カメラは撮影のたびに開いて
/// すぐ閉じるので、スリープ中に開いたままになることはない。
pub struct MonitoringCycle {
    devices: CycleDevices,
    scorer: YellownessScorer,
    classifier: DiseaseClassifier<Box<dyn HealthModel>>,
    record_log: Box<dyn RecordLog>,
    sleeper: Box<dyn SleepPlatform>,
    settings: CycleSettings,
    stage: CycleStage,
    stats: CycleStats,
}

impl MonitoringCycle {
    pub fn new(
        devices: CycleDevices,
        classifier: DiseaseClassifier<Box<dyn HealthModel>>,
        record_log: Box<dyn RecordLog>,
        sleeper: Box<dyn SleepPlatform>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            devices,
            scorer: YellownessScorer::new(),
            classifier,
            record_log,
            sleeper,
            settings,
            stage: CycleStage::Idle,
            stats: CycleStats::default(),
        }
    }

    pub fn stage(&self) -> CycleStage {
        self.stage
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// 終了するまでサイクルを繰り返す
    pub fn run(&mut self) -> ! {
        info!(
            "=== 監視ループを開始します (間隔 {}秒) ===",
            self.settings.cycle_interval.as_secs()
        );
        loop {
            // 結果は tick 内でログ済み
            let _ = self.tick();
        }
    }

    /// 1サイクル実行してからスリープする
    pub fn tick(&mut self) -> Result<CycleOutcome, CycleError> {
        let result = self.run_cycle();
        match &result {
            Ok(outcome) => {
                self.stats.completed += 1;
                info!(
                    "✓ サイクル完了 (黄変率 {:.1}%, 病気: {}) 成功:{} 失敗:{}",
                    outcome.yellow_percent,
                    outcome.decision.is_disease(),
                    self.stats.completed,
                    self.stats.failed
                );
            }
            Err(e) => {
                self.stats.failed += 1;
                error!(
                    "✗ サイクル失敗 [{:?} / {}]: {} 成功:{} 失敗:{}",
                    e.stage(),
                    e.sensor(),
                    e,
                    self.stats.completed,
                    self.stats.failed
                );
            }
        }

        self.stage = CycleStage::Sleeping;
        self.sleeper.sleep(self.settings.cycle_interval);
        result
    }

    /// スリープを含まない1サイクル
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        self.stage = CycleStage::Acquiring;
        let acquisition = self.acquire()?;

        self.stage = CycleStage::Scoring;
        let yellow_percent = self.scorer.score(&acquisition.image_path)?;
        let frame = SensorFrame::new(acquisition, YellowingFlag::from_percentage(yellow_percent));
        info!("測定データ: {}", frame.get_summary());

        self.stage = CycleStage::Deciding;
        let decision = self.classifier.decide(&frame)?;

        self.stage = CycleStage::Persisting;
        let persisted = self.record_log.append(&frame);

        if decision.is_disease() {
            self.stage = CycleStage::Alerting;
            warn!("病気の可能性があります。アラートを出します");
            let alerted = self.devices.alert.raise_alert(self.settings.alert_duration);
            if let Err(e) = persisted {
                if let Err(alert_error) = alerted {
                    error!("アラートも失敗しました: {}", alert_error);
                }
                return Err(e.into());
            }
            alerted?;
        } else {
            persisted?;
        }

        Ok(CycleOutcome {
            frame,
            decision,
            yellow_percent,
        })
    }

    fn acquire(&mut self) -> Result<Acquisition, CycleError> {
        let timestamp_ms = Utc::now().timestamp_millis();
        let environment = self
            .devices
            .environment
            .read()
            .map_err(CycleError::Environment)?;
        let soil_moisture = self
            .devices
            .moisture
            .read()
            .map_err(CycleError::Moisture)?;
        let ph = self.devices.ph.read_ph()?.ph;
        let image_path = self.take_photo()?;

        Ok(Acquisition {
            timestamp_ms,
            environment,
            soil_moisture,
            ph,
            image_path,
        })
    }

    /// 開く → 撮影 → 閉じる（撮影に失敗しても閉じる）
    fn take_photo(&mut self) -> Result<PathBuf, CameraError> {
        let handle = self.devices.camera.open()?;
        let captured = self.devices.camera.capture(&handle);
        self.devices.camera.close(handle);
        captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::{MockHealthModel, MockRecordLog, MockSleep};
    use crate::hardware::mock::{
        MockAlert, MockCamera, MockEnvironmentSensor, MockMoistureSensor, MockPhProbe,
    };
    use leaf_health_core::SoilMoisture;

    fn cycle_with_image(image: &std::path::Path) -> (MonitoringCycle, MockRecordLog, MockSleep) {
        let record_log = MockRecordLog::new();
        let sleep = MockSleep::new();
        let model: Box<dyn HealthModel> = Box::new(MockHealthModel::new(1));
        let cycle = MonitoringCycle::new(
            CycleDevices {
                environment: Box::new(MockEnvironmentSensor::new(22.0, 70.0)),
                moisture: Box::new(MockMoistureSensor::new(SoilMoisture::Wet)),
                ph: Box::new(MockPhProbe::new(7.0)),
                camera: Box::new(MockCamera::new(image)),
                alert: Box::new(MockAlert::new()),
            },
            DiseaseClassifier::new(model),
            Box::new(record_log.clone()),
            Box::new(sleep.clone()),
            CycleSettings {
                alert_duration: Duration::from_secs(5),
                cycle_interval: Duration::from_secs(600),
            },
        );
        (cycle, record_log, sleep)
    }

    #[test]
    fn test_stage_starts_idle_and_ends_sleeping() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("leaf.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([40, 160, 40]))
            .save(&image)
            .unwrap();

        let (mut cycle, record_log, sleep) = cycle_with_image(&image);
        assert_eq!(cycle.stage(), CycleStage::Idle);

        let outcome = cycle.tick().unwrap();
        assert_eq!(cycle.stage(), CycleStage::Sleeping);
        assert_eq!(outcome.yellow_percent, 0.0);
        assert_eq!(record_log.get_records().len(), 1);
        assert_eq!(sleep.get_sleeps(), vec![Duration::from_secs(600)]);
        assert_eq!(cycle.stats(), CycleStats { completed: 1, failed: 0 });
    }

    #[test]
    fn test_undecodable_image_fails_at_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("missing.jpg");

        let (mut cycle, record_log, sleep) = cycle_with_image(&image);
        let error = cycle.tick().unwrap_err();

        assert_eq!(error.stage(), CycleStage::Scoring);
        assert_eq!(error.sensor(), "yellowness_scorer");
        assert!(record_log.get_records().is_empty());
        assert_eq!(sleep.get_sleeps().len(), 1);
        assert_eq!(cycle.stats(), CycleStats { completed: 0, failed: 1 });
    }

    #[test]
    fn test_error_stage_mapping() {
        let error = CycleError::Environment(SensorReadError::InvalidData("x".to_string()));
        assert_eq!(error.stage(), CycleStage::Acquiring);
        assert_eq!(error.sensor(), "DHT22");

        let error = CycleError::from(PhReadError::InvalidChannel(9));
        assert_eq!(error.stage(), CycleStage::Acquiring);
        assert_eq!(error.sensor(), "ph_probe");

        let error = CycleError::from(LedError::ControlFailed("x".to_string()));
        assert_eq!(error.stage(), CycleStage::Alerting);
    }
}
