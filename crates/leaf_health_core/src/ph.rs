/// pHプローブの校正値
///
/// 電圧は `raw * (vref / full_scale)`、pH は
/// `7.0 + (voltage_at_ph7 - voltage) / volts_per_ph` で求める。
/// 0〜14 へのクランプは行わない（校正がずれていれば範囲外の値がそのまま出る）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhCalibration {
    /// ADC基準電圧（V）
    pub vref: f32,
    /// ADCの最大コード
    pub full_scale: u16,
    /// pH 7.0 の緩衝液で測った電圧（V）
    pub voltage_at_ph7: f32,
    /// pH 1 あたりの電圧変化（V）
    pub volts_per_ph: f32,
}

impl Default for PhCalibration {
    fn default() -> Self {
        Self {
            vref: 3.3,
            full_scale: 4095,
            voltage_at_ph7: 3.30,
            volts_per_ph: 0.18,
        }
    }
}

impl PhCalibration {
    pub fn raw_to_voltage(&self, raw: u16) -> f32 {
        raw as f32 * (self.vref / self.full_scale as f32)
    }

    pub fn voltage_to_ph(&self, voltage: f32) -> f32 {
        7.0 + (self.voltage_at_ph7 - voltage) / self.volts_per_ph
    }

    pub fn raw_to_ph(&self, raw: u16) -> f32 {
        self.voltage_to_ph(self.raw_to_voltage(raw))
    }
}
