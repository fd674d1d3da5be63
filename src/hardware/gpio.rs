use std::path::Path;

use anyhow::Context;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::CdevPin;

const CONSUMER: &str = "leaf-monitor";

/// GPIO キャラクタデバイス（/dev/gpiochipN）からピンを取得する
pub struct GpioChip {
    chip: Chip,
}

impl GpioChip {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let chip = Chip::new(path)
            .with_context(|| format!("GPIOチップを開けません: {}", path.display()))?;
        Ok(Self { chip })
    }

    pub fn output(&mut self, pin: u8, initial_high: bool) -> anyhow::Result<CdevPin> {
        let handle = self
            .chip
            .get_line(u32::from(pin))
            .and_then(|line| {
                line.request(LineRequestFlags::OUTPUT, u8::from(initial_high), CONSUMER)
            })
            .with_context(|| format!("GPIO{} を出力に設定できません", pin))?;
        CdevPin::new(handle).with_context(|| format!("GPIO{} の初期化に失敗しました", pin))
    }

    pub fn input(&mut self, pin: u8) -> anyhow::Result<CdevPin> {
        let handle = self
            .chip
            .get_line(u32::from(pin))
            .and_then(|line| line.request(LineRequestFlags::INPUT, 0, CONSUMER))
            .with_context(|| format!("GPIO{} を入力に設定できません", pin))?;
        CdevPin::new(handle).with_context(|| format!("GPIO{} の初期化に失敗しました", pin))
    }
}
