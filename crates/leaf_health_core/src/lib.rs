//! 葉の健康診断ロジック（ハードウェア非依存）
//!
//! - `ph`: ADC値 → 電圧 → pH の換算
//! - `frame`: 1サイクル分の測定レコード
//! - `yellowness`: HSV色域による黄変率の算出
//! - `diagnosis`: 学習済みモデルと最適環境ルールによる病気判定
//! - `model`: 勾配ブースティング木（JSONダンプ）の推論

pub mod diagnosis;
pub mod frame;
pub mod model;
pub mod ph;
pub mod yellowness;

pub use diagnosis::{
    ClassifierDecision, ClassifierError, DiseaseClassifier, FeatureVector, FinalLabel,
    HealthModel, OptimalEnvelope, PredictedLabel,
};
pub use frame::{
    Acquisition, EnvironmentReading, SensorFrame, SoilMoisture, YellowingFlag,
    YELLOWING_THRESHOLD_PERCENT,
};
pub use model::{ModelError, TreeEnsemble};
pub use ph::PhCalibration;
pub use yellowness::{HsvBand, ScoreError, YellownessScorer};
