use std::path::PathBuf;

/// 黄変フラグを立てる黄色ピクセル比率（%、この値を含む）
pub const YELLOWING_THRESHOLD_PERCENT: f32 = 20.0;

/// 土壌水分（デジタル出力の乾湿2値）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilMoisture {
    Wet,
    Dry,
}

impl SoilMoisture {
    /// 分類器の特徴量表現（湿=1.0, 乾=0.0）
    pub fn as_feature(self) -> f32 {
        match self {
            SoilMoisture::Wet => 1.0,
            SoilMoisture::Dry => 0.0,
        }
    }

    /// 記録用の値（湿=1, 乾=0）
    pub fn as_u8(self) -> u8 {
        match self {
            SoilMoisture::Wet => 1,
            SoilMoisture::Dry => 0,
        }
    }
}

/// 黄変フラグ (0/1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YellowingFlag(bool);

impl YellowingFlag {
    pub const CLEAR: YellowingFlag = YellowingFlag(false);
    pub const SET: YellowingFlag = YellowingFlag(true);

    /// 黄変率（%）から固定閾値でフラグを決める
    pub fn from_percentage(yellow_percent: f32) -> Self {
        YellowingFlag(yellow_percent >= YELLOWING_THRESHOLD_PERCENT)
    }

    pub fn is_set(self) -> bool {
        self.0
    }

    pub fn as_u8(self) -> u8 {
        u8::from(self.0)
    }
}

/// 温湿度センサーの1回分の読み取り
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

/// Acquiring 段階で揃えた実測値一式
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub timestamp_ms: i64,
    pub environment: EnvironmentReading,
    pub soil_moisture: SoilMoisture,
    pub ph: f32,
    pub image_path: PathBuf,
}

/// 1サイクル分の測定レコード
///
/// すべての項目が実測値から埋まった状態でしか作れない。
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    pub timestamp_ms: i64,
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub soil_moisture: SoilMoisture,
    pub ph: f32,
    pub image_path: PathBuf,
    pub yellowing: YellowingFlag,
}

impl SensorFrame {
    pub fn new(acquisition: Acquisition, yellowing: YellowingFlag) -> Self {
        Self {
            timestamp_ms: acquisition.timestamp_ms,
            temperature_celsius: acquisition.environment.temperature_celsius,
            humidity_percent: acquisition.environment.humidity_percent,
            soil_moisture: acquisition.soil_moisture,
            ph: acquisition.ph,
            image_path: acquisition.image_path,
            yellowing,
        }
    }

    /// 測定データのサマリを取得
    pub fn get_summary(&self) -> String {
        let moisture = match self.soil_moisture {
            SoilMoisture::Wet => "湿",
            SoilMoisture::Dry => "乾",
        };
        format!(
            "温度:{:.1}°C, 湿度:{:.1}%, 土壌:{}, pH:{:.2}, 黄変:{}, 画像:{}",
            self.temperature_celsius,
            self.humidity_percent,
            moisture,
            self.ph,
            self.yellowing.as_u8(),
            self.image_path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquisition() -> Acquisition {
        Acquisition {
            timestamp_ms: 1_700_000_000_000,
            environment: EnvironmentReading {
                temperature_celsius: 24.5,
                humidity_percent: 61.0,
            },
            soil_moisture: SoilMoisture::Wet,
            ph: 6.8,
            image_path: PathBuf::from("unprocessed_images/20240101_120000.jpg"),
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(YellowingFlag::from_percentage(20.0).is_set());
        assert!(YellowingFlag::from_percentage(100.0).is_set());
        assert!(!YellowingFlag::from_percentage(19.999).is_set());
        assert!(!YellowingFlag::from_percentage(0.0).is_set());
    }

    #[test]
    fn test_flag_as_u8() {
        assert_eq!(YellowingFlag::SET.as_u8(), 1);
        assert_eq!(YellowingFlag::CLEAR.as_u8(), 0);
        assert_eq!(YellowingFlag::default(), YellowingFlag::CLEAR);
    }

    #[test]
    fn test_moisture_encodings() {
        assert_eq!(SoilMoisture::Wet.as_feature(), 1.0);
        assert_eq!(SoilMoisture::Dry.as_feature(), 0.0);
        assert_eq!(SoilMoisture::Wet.as_u8(), 1);
        assert_eq!(SoilMoisture::Dry.as_u8(), 0);
    }

    #[test]
    fn test_frame_copies_acquisition() {
        let frame = SensorFrame::new(acquisition(), YellowingFlag::SET);

        assert_eq!(frame.timestamp_ms, 1_700_000_000_000);
        assert_eq!(frame.temperature_celsius, 24.5);
        assert_eq!(frame.humidity_percent, 61.0);
        assert_eq!(frame.soil_moisture, SoilMoisture::Wet);
        assert_eq!(frame.ph, 6.8);
        assert_eq!(frame.yellowing, YellowingFlag::SET);
    }

    #[test]
    fn test_get_summary() {
        let frame = SensorFrame::new(acquisition(), YellowingFlag::CLEAR);
        assert_eq!(
            frame.get_summary(),
            "温度:24.5°C, 湿度:61.0%, 土壌:湿, pH:6.80, 黄変:0, 画像:unprocessed_images/20240101_120000.jpg"
        );
    }
}
