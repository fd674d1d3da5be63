use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use log::warn;

/// LEDの制御に関するエラー
#[derive(Debug, thiserror::Error)]
pub enum LedError {
    #[error("LEDの初期化に失敗しました: {0}")]
    InitFailed(String),

    #[error("LEDの点灯制御に失敗しました: {0}")]
    ControlFailed(String),
}

/// 病気検出時のアラート出力
pub trait AlertActuator {
    /// `duration` の間アラートを出し続け、止めてから戻る
    fn raise_alert(&mut self, duration: Duration) -> Result<(), LedError>;
}

/// ステータスLED制御
pub struct StatusLed<P, D> {
    led: P,
    delay: D,
    active_low: bool,
}

impl<P: OutputPin, D: DelayNs> StatusLed<P, D> {
    /// 新しいステータスLEDコントローラーを作成します（消灯状態で開始）
    ///
    /// # エラー
    ///
    /// LEDの初期化に失敗した場合にエラーを返します
    pub fn new(pin: P, delay: D, active_low: bool) -> Result<Self, LedError> {
        let mut led = Self {
            led: pin,
            delay,
            active_low,
        };
        led.set(false)
            .map_err(|e| LedError::InitFailed(e.to_string()))?;
        Ok(led)
    }

    fn set(&mut self, on: bool) -> Result<(), LedError> {
        self.led
            .set_state(PinState::from(on != self.active_low))
            .map_err(|e| LedError::ControlFailed(format!("{:?}", e)))
    }

    /// LEDを点灯させます
    pub fn turn_on(&mut self) -> Result<(), LedError> {
        self.set(true)
    }

    /// LEDを消灯させます
    pub fn turn_off(&mut self) -> Result<(), LedError> {
        self.set(false)
    }

    /// 成功時のLED点滅（短い点滅）
    ///
    /// 起動完了の合図に使う。
    pub fn blink_success(&mut self) -> Result<(), LedError> {
        for _ in 0..2 {
            self.turn_on()?;
            self.delay.delay_ms(100);
            self.turn_off()?;
            self.delay.delay_ms(100);
        }
        Ok(())
    }
}

impl<P: OutputPin, D: DelayNs> AlertActuator for StatusLed<P, D> {
    fn raise_alert(&mut self, duration: Duration) -> Result<(), LedError> {
        self.turn_on()?;
        self.delay
            .delay_ms(u32::try_from(duration.as_millis()).unwrap_or(u32::MAX));
        self.turn_off().inspect_err(|e| {
            warn!("アラート後にLEDを消灯できませんでした: {}", e);
        })
    }
}
