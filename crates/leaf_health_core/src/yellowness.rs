//! 黄変率スコアリング
//!
//! 画像を HSV（OpenCV の 8bit 表現: H 0-179, S/V 0-255）に変換し、
//! 固定の緑色域・黄色域でマスクを作る。黄変率は
//! `100 * 黄色ピクセル数 / (緑 ∪ 黄) ピクセル数` で、葉が写っていない
//! 画像（分母0）は 0.0 を返す。閾値判定はここでは行わない。

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use log::debug;

/// 黄変スコアリングのエラー
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("画像を読み込めません: {path}: {source}")]
    InvalidImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// HSV の範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvBand {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvBand {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

/// 黄変部の色域
pub const YELLOW_BAND: HsvBand = HsvBand::new([15, 80, 100], [40, 255, 255]);

/// 健康な葉の色域
pub const GREEN_BAND: HsvBand = HsvBand::new([35, 40, 40], [85, 255, 255]);

/// RGB → HSV（OpenCV 8bit 互換）
pub fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { diff * 255.0 / v };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let mut h = (h / 2.0).round();
    if h >= 180.0 {
        h -= 180.0;
    }

    [h as u8, s.round() as u8, v as u8]
}

/// マスクの集計結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelCounts {
    pub yellow: u64,
    /// 緑 ∪ 黄
    pub combined: u64,
}

impl PixelCounts {
    pub fn yellow_percentage(&self) -> f32 {
        if self.combined == 0 {
            return 0.0;
        }
        100.0 * self.yellow as f32 / self.combined as f32
    }
}

/// 黄変率スコアラー（色域は固定、適応なし）
#[derive(Debug, Clone)]
pub struct YellownessScorer {
    yellow: HsvBand,
    green: HsvBand,
}

impl Default for YellownessScorer {
    fn default() -> Self {
        Self {
            yellow: YELLOW_BAND,
            green: GREEN_BAND,
        }
    }
}

impl YellownessScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, image: &RgbImage) -> PixelCounts {
        let mut counts = PixelCounts::default();
        for pixel in image.pixels() {
            let hsv = rgb_to_hsv(*pixel);
            let is_yellow = self.yellow.contains(hsv);
            if is_yellow {
                counts.yellow += 1;
            }
            if is_yellow || self.green.contains(hsv) {
                counts.combined += 1;
            }
        }
        counts
    }

    /// デコード済み画像の黄変率（0.0〜100.0）
    pub fn score_image(&self, image: &RgbImage) -> f32 {
        let counts = self.count(image);
        let percentage = counts.yellow_percentage();
        debug!(
            "黄色:{}px / 緑+黄:{}px → {:.2}%",
            counts.yellow, counts.combined, percentage
        );
        percentage
    }

    /// 画像ファイルの黄変率（0.0〜100.0）
    pub fn score(&self, path: &Path) -> Result<f32, ScoreError> {
        let image = image::open(path)
            .map_err(|source| ScoreError::InvalidImage {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        Ok(self.score_image(&image))
    }
}
