//! 病気判定
//!
//! 学習済みモデルは「環境ストレスで黄変が説明できるか」を 0/1 で返す。
//! モデルが 0（説明できない）を返し、画像に黄変があり、しかも環境が
//! 最適範囲内にある場合に限って病気と判定する。

use log::debug;

use crate::frame::{SensorFrame, SoilMoisture};

/// 特徴量の並び（モデルの入力順は固定）
pub const FEATURE_NAMES: [&str; 4] = ["temperature", "humidity", "soil_moisture", "ph"];

/// 分類器のエラー
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("分類器の入力が不正です: {feature} = {value}")]
    MalformedInput { feature: &'static str, value: f32 },

    #[error("分類器の出力が 0/1 ではありません: {0}")]
    InvalidOutput(u8),

    #[error("モデル推論エラー: {0}")]
    Model(String),
}

/// `[temperature, humidity, soil_moisture, ph]`（欠損値なし）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; 4]);

impl FeatureVector {
    pub fn new(values: [f32; 4]) -> Result<Self, ClassifierError> {
        for (value, feature) in values.iter().zip(FEATURE_NAMES) {
            if !value.is_finite() {
                return Err(ClassifierError::MalformedInput {
                    feature,
                    value: *value,
                });
            }
        }
        Ok(Self(values))
    }

    pub fn from_frame(frame: &SensorFrame) -> Result<Self, ClassifierError> {
        Self::new([
            frame.temperature_celsius,
            frame.humidity_percent,
            frame.soil_moisture.as_feature(),
            frame.ph,
        ])
    }

    pub fn values(&self) -> &[f32; 4] {
        &self.0
    }
}

/// 学習済み二値分類器（4特徴量・出力 0/1 の契約は固定）
pub trait HealthModel {
    fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError>;
}

impl<M: HealthModel + ?Sized> HealthModel for Box<M> {
    fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
        (**self).predict(features)
    }
}

/// モデルの予測ラベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictedLabel {
    /// 環境では黄変を説明できない
    Healthy,
    /// 環境ストレスによる黄変
    Yellowing,
}

impl TryFrom<u8> for PredictedLabel {
    type Error = ClassifierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PredictedLabel::Healthy),
            1 => Ok(PredictedLabel::Yellowing),
            other => Err(ClassifierError::InvalidOutput(other)),
        }
    }
}

/// 最終判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalLabel {
    NoDisease,
    Disease,
}

/// 1フレーム分の判定結果（記録はせず、アラートの駆動にのみ使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierDecision {
    pub predicted: PredictedLabel,
    pub override_applied: bool,
    pub label: FinalLabel,
}

impl ClassifierDecision {
    pub fn is_disease(&self) -> bool {
        self.label == FinalLabel::Disease
    }
}

/// 植物にとってストレスのない環境の範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalEnvelope {
    pub temperature_celsius: (f32, f32),
    pub humidity_percent: (f32, f32),
    pub soil_moisture: SoilMoisture,
    pub ph: (f32, f32),
}

impl Default for OptimalEnvelope {
    fn default() -> Self {
        Self {
            temperature_celsius: (20.0, 30.0),
            humidity_percent: (50.0, 80.0),
            soil_moisture: SoilMoisture::Wet,
            ph: (6.0, 7.5),
        }
    }
}

impl OptimalEnvelope {
    pub fn contains(&self, frame: &SensorFrame) -> bool {
        within(frame.temperature_celsius, self.temperature_celsius)
            && within(frame.humidity_percent, self.humidity_percent)
            && frame.soil_moisture == self.soil_moisture
            && within(frame.ph, self.ph)
    }
}

fn within(value: f32, (low, high): (f32, f32)) -> bool {
    low <= value && value <= high
}

/// 病気判定器
pub struct DiseaseClassifier<M> {
    model: M,
    envelope: OptimalEnvelope,
}

impl<M: HealthModel> DiseaseClassifier<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            envelope: OptimalEnvelope::default(),
        }
    }

    pub fn with_envelope(mut self, envelope: OptimalEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn envelope(&self) -> &OptimalEnvelope {
        &self.envelope
    }

    pub fn decide(&self, frame: &SensorFrame) -> Result<ClassifierDecision, ClassifierError> {
        let features = FeatureVector::from_frame(frame)?;
        let predicted = PredictedLabel::try_from(self.model.predict(&features)?)?;

        let in_envelope = self.envelope.contains(frame);
        let override_applied =
            predicted == PredictedLabel::Healthy && frame.yellowing.is_set() && in_envelope;

        debug!(
            "予測:{:?}, 黄変:{}, 最適環境:{} → 病気:{}",
            predicted,
            frame.yellowing.as_u8(),
            in_envelope,
            override_applied
        );

        Ok(ClassifierDecision {
            predicted,
            override_applied,
            label: if override_applied {
                FinalLabel::Disease
            } else {
                FinalLabel::NoDisease
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Acquisition, EnvironmentReading, YellowingFlag};
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// 固定値を返し、受け取った特徴量を記録するモデル
    struct FixedModel {
        output: u8,
        seen: RefCell<Vec<[f32; 4]>>,
    }

    impl FixedModel {
        fn new(output: u8) -> Self {
            Self {
                output,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl HealthModel for FixedModel {
        fn predict(&self, features: &FeatureVector) -> Result<u8, ClassifierError> {
            self.seen.borrow_mut().push(*features.values());
            Ok(self.output)
        }
    }

    fn frame(temp: f32, humidity: f32, moisture: SoilMoisture, ph: f32, flag: YellowingFlag) -> SensorFrame {
        SensorFrame::new(
            Acquisition {
                timestamp_ms: 0,
                environment: EnvironmentReading {
                    temperature_celsius: temp,
                    humidity_percent: humidity,
                },
                soil_moisture: moisture,
                ph,
                image_path: PathBuf::from("leaf.jpg"),
            },
            flag,
        )
    }

    #[test]
    fn test_optimal_conditions_with_yellowing_is_disease() {
        let classifier = DiseaseClassifier::new(FixedModel::new(0));
        let decision = classifier
            .decide(&frame(22.0, 70.0, SoilMoisture::Wet, 7.0, YellowingFlag::SET))
            .unwrap();

        assert!(decision.is_disease());
        assert!(decision.override_applied);
        assert_eq!(decision.predicted, PredictedLabel::Healthy);
    }

    #[test]
    fn test_acidic_soil_explains_yellowing() {
        let classifier = DiseaseClassifier::new(FixedModel::new(0));
        let decision = classifier
            .decide(&frame(22.0, 70.0, SoilMoisture::Wet, 4.0, YellowingFlag::SET))
            .unwrap();

        assert!(!decision.is_disease());
        assert!(!decision.override_applied);
    }

    #[test]
    fn test_no_yellowing_never_disease() {
        for output in [0, 1] {
            let classifier = DiseaseClassifier::new(FixedModel::new(output));
            let decision = classifier
                .decide(&frame(22.0, 70.0, SoilMoisture::Wet, 7.0, YellowingFlag::CLEAR))
                .unwrap();
            assert!(!decision.is_disease(), "model output {}", output);
        }
    }

    #[test]
    fn test_model_attributes_yellowing_to_stress() {
        let classifier = DiseaseClassifier::new(FixedModel::new(1));
        let decision = classifier
            .decide(&frame(22.0, 70.0, SoilMoisture::Wet, 7.0, YellowingFlag::SET))
            .unwrap();

        assert_eq!(decision.predicted, PredictedLabel::Yellowing);
        assert_eq!(decision.label, FinalLabel::NoDisease);
    }

    #[test]
    fn test_dry_soil_is_outside_envelope() {
        let classifier = DiseaseClassifier::new(FixedModel::new(0));
        let decision = classifier
            .decide(&frame(22.0, 70.0, SoilMoisture::Dry, 7.0, YellowingFlag::SET))
            .unwrap();
        assert!(!decision.is_disease());
    }

    #[test]
    fn test_envelope_bounds_are_inclusive() {
        let envelope = OptimalEnvelope::default();
        let at = |t, h, p| frame(t, h, SoilMoisture::Wet, p, YellowingFlag::SET);

        assert!(envelope.contains(&at(20.0, 50.0, 6.0)));
        assert!(envelope.contains(&at(30.0, 80.0, 7.5)));
        assert!(!envelope.contains(&at(19.9, 70.0, 7.0)));
        assert!(!envelope.contains(&at(30.1, 70.0, 7.0)));
        assert!(!envelope.contains(&at(25.0, 49.9, 7.0)));
        assert!(!envelope.contains(&at(25.0, 80.1, 7.0)));
        assert!(!envelope.contains(&at(25.0, 70.0, 5.9)));
        assert!(!envelope.contains(&at(25.0, 70.0, 7.6)));
    }

    #[test]
    fn test_feature_order() {
        let model = FixedModel::new(0);
        let classifier = DiseaseClassifier::new(model);
        classifier
            .decide(&frame(23.5, 64.0, SoilMoisture::Wet, 6.4, YellowingFlag::CLEAR))
            .unwrap();

        let seen = classifier.model.seen.borrow();
        assert_eq!(seen.as_slice(), &[[23.5, 64.0, 1.0, 6.4]]);
    }

    #[test]
    fn test_nan_input_is_malformed() {
        let classifier = DiseaseClassifier::new(FixedModel::new(0));
        let result = classifier.decide(&frame(f32::NAN, 70.0, SoilMoisture::Wet, 7.0, YellowingFlag::SET));

        assert!(matches!(
            result,
            Err(ClassifierError::MalformedInput { feature: "temperature", .. })
        ));
        assert!(classifier.model.seen.borrow().is_empty());
    }

    #[test]
    fn test_out_of_contract_output_is_rejected() {
        let classifier = DiseaseClassifier::new(FixedModel::new(2));
        let result = classifier.decide(&frame(22.0, 70.0, SoilMoisture::Wet, 7.0, YellowingFlag::SET));
        assert!(matches!(result, Err(ClassifierError::InvalidOutput(2))));
    }

    #[test]
    fn test_boxed_model() {
        let model: Box<dyn HealthModel> = Box::new(FixedModel::new(0));
        let classifier = DiseaseClassifier::new(model);
        let decision = classifier
            .decide(&frame(22.0, 70.0, SoilMoisture::Wet, 7.0, YellowingFlag::SET))
            .unwrap();
        assert!(decision.is_disease());
    }
}
