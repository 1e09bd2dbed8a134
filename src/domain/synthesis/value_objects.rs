//! Synthesis Context - Value Objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ParamError;

/// 韵律参数允许的最大偏移量（百分比或 Hz 均适用）
pub const PROSODY_LIMIT: i32 = 50;

/// 默认音色
pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";

/// 韵律参数单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProsodyUnit {
    Percent,
    Hertz,
}

impl ProsodyUnit {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Hertz => "Hz",
        }
    }
}

/// 带符号的韵律偏移量，如 `+10%`、`-5Hz`
///
/// 不变量:
/// - 数值在 [-PROSODY_LIMIT, PROSODY_LIMIT] 区间内
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProsodyValue {
    value: i32,
    unit: ProsodyUnit,
}

impl ProsodyValue {
    pub fn new(value: i32, unit: ProsodyUnit) -> Result<Self, ParamError> {
        if !(-PROSODY_LIMIT..=PROSODY_LIMIT).contains(&value) {
            return Err(ParamError::OutOfRange {
                value: format!("{}{}", value, unit.suffix()),
                limit: PROSODY_LIMIT,
            });
        }
        Ok(Self { value, unit })
    }

    pub fn zero(unit: ProsodyUnit) -> Self {
        Self { value: 0, unit }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn unit(&self) -> ProsodyUnit {
        self.unit
    }
}

impl fmt::Display for ProsodyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 后端要求显式符号，0 也写成 "+0"
        write!(f, "{:+}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for ProsodyValue {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, unit) = if let Some(n) = trimmed.strip_suffix('%') {
            (n, ProsodyUnit::Percent)
        } else if let Some(n) = trimmed
            .strip_suffix("Hz")
            .or_else(|| trimmed.strip_suffix("hz"))
        {
            (n, ProsodyUnit::Hertz)
        } else {
            return Err(ParamError::Malformed(s.to_string()));
        };

        let value: i32 = number
            .trim()
            .parse()
            .map_err(|_| ParamError::Malformed(s.to_string()))?;

        Self::new(value, unit)
    }
}

/// 音色参数
///
/// 构造时完成校验，之后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceParams {
    voice_id: String,
    rate: ProsodyValue,
    volume: ProsodyValue,
    pitch: ProsodyValue,
}

impl VoiceParams {
    /// 从字符串参数构造
    ///
    /// - rate / volume 只接受百分比
    /// - pitch 接受百分比或 Hz
    pub fn parse(voice_id: &str, rate: &str, volume: &str, pitch: &str) -> Result<Self, ParamError> {
        let voice_id = voice_id.trim();
        if voice_id.is_empty() {
            return Err(ParamError::EmptyVoice);
        }

        let rate: ProsodyValue = rate.parse()?;
        if rate.unit() != ProsodyUnit::Percent {
            return Err(ParamError::WrongUnit {
                field: "rate",
                value: rate.to_string(),
            });
        }

        let volume: ProsodyValue = volume.parse()?;
        if volume.unit() != ProsodyUnit::Percent {
            return Err(ParamError::WrongUnit {
                field: "volume",
                value: volume.to_string(),
            });
        }

        let pitch: ProsodyValue = pitch.parse()?;

        Ok(Self {
            voice_id: voice_id.to_string(),
            rate,
            volume,
            pitch,
        })
    }

    /// 指定音色，其余参数为零偏移
    pub fn with_voice(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            rate: ProsodyValue::zero(ProsodyUnit::Percent),
            volume: ProsodyValue::zero(ProsodyUnit::Percent),
            pitch: ProsodyValue::zero(ProsodyUnit::Hertz),
        }
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn rate(&self) -> ProsodyValue {
        self.rate
    }

    pub fn volume(&self) -> ProsodyValue {
        self.volume
    }

    pub fn pitch(&self) -> ProsodyValue {
        self.pitch
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::with_voice(DEFAULT_VOICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signed_values() {
        let v: ProsodyValue = "+10%".parse().unwrap();
        assert_eq!(v.value(), 10);
        assert_eq!(v.unit(), ProsodyUnit::Percent);

        let v: ProsodyValue = "-5Hz".parse().unwrap();
        assert_eq!(v.value(), -5);
        assert_eq!(v.unit(), ProsodyUnit::Hertz);
    }

    #[test]
    fn test_missing_sign_is_normalised() {
        let v: ProsodyValue = "20%".parse().unwrap();
        assert_eq!(v.to_string(), "+20%");

        let zero: ProsodyValue = "0Hz".parse().unwrap();
        assert_eq!(zero.to_string(), "+0Hz");
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            "+51%".parse::<ProsodyValue>(),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!("-50%".parse::<ProsodyValue>().is_ok());
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!("fast".parse::<ProsodyValue>(), Err(ParamError::Malformed(_))));
        assert!(matches!("+10".parse::<ProsodyValue>(), Err(ParamError::Malformed(_))));
    }

    #[test]
    fn test_voice_params_units() {
        let params = VoiceParams::parse("en-US-AriaNeural", "+0%", "-10%", "+2Hz").unwrap();
        assert_eq!(params.voice_id(), "en-US-AriaNeural");
        assert_eq!(params.volume().to_string(), "-10%");

        let err = VoiceParams::parse("en-US-AriaNeural", "+5Hz", "+0%", "+0Hz").unwrap_err();
        assert!(matches!(err, ParamError::WrongUnit { field: "rate", .. }));

        assert!(matches!(
            VoiceParams::parse("  ", "+0%", "+0%", "+0Hz"),
            Err(ParamError::EmptyVoice)
        ));
    }

    #[test]
    fn test_default_params() {
        let params = VoiceParams::default();
        assert_eq!(params.voice_id(), DEFAULT_VOICE);
        assert_eq!(params.rate().to_string(), "+0%");
        assert_eq!(params.pitch().to_string(), "+0Hz");
    }
}
