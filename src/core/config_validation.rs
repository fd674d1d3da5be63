/// Raspberry Pi の BCM GPIO 番号の上限
pub const MAX_GPIO_PIN: u8 = 27;

/// カメラコマンド中で撮影先パスに置き換える文字列
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidAdcChannel(u8),
    InvalidGpioPin(u8),
    DuplicateGpioPin(u8),
    InvalidFullScale(u16),
    NotPositive(&'static str),
    EmptyValue(&'static str),
    MissingOutputPlaceholder(String),
}

pub fn validate_adc_channel(channel: u8) -> Result<u8, ValidationError> {
    if channel < mcp3208::CHANNEL_COUNT {
        Ok(channel)
    } else {
        Err(ValidationError::InvalidAdcChannel(channel))
    }
}

/// すべて BCM 0〜27 の範囲で、重複がないこと
pub fn validate_gpio_pins(pins: &[u8]) -> Result<(), ValidationError> {
    for (i, &pin) in pins.iter().enumerate() {
        if pin > MAX_GPIO_PIN {
            return Err(ValidationError::InvalidGpioPin(pin));
        }
        if pins[..i].contains(&pin) {
            return Err(ValidationError::DuplicateGpioPin(pin));
        }
    }
    Ok(())
}

pub fn validate_full_scale(value: u16) -> Result<u16, ValidationError> {
    if value == 0 || value > mcp3208::FULL_SCALE {
        Err(ValidationError::InvalidFullScale(value))
    } else {
        Ok(value)
    }
}

pub fn validate_positive(name: &'static str, value: f32) -> Result<f32, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive(name))
    }
}

pub fn validate_non_zero(name: &'static str, value: u64) -> Result<u64, ValidationError> {
    if value == 0 {
        Err(ValidationError::NotPositive(name))
    } else {
        Ok(value)
    }
}

pub fn validate_non_empty<'a>(name: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyValue(name))
    } else {
        Ok(value)
    }
}

/// 空白区切りで引数に分解する（`{output}` を含む引数が必要）
pub fn parse_camera_command(command: &str) -> Result<Vec<String>, ValidationError> {
    let args: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if args.is_empty() {
        return Err(ValidationError::EmptyValue("camera_command"));
    }
    if !args.iter().skip(1).any(|arg| arg.contains(OUTPUT_PLACEHOLDER)) {
        return Err(ValidationError::MissingOutputPlaceholder(command.to_string()));
    }
    Ok(args)
}
