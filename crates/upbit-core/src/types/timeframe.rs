//! 캔들스틱 데이터를 위한 타임프레임 정의.
//!
//! 업비트 캔들 API가 지원하는 단위(초/분/일/주/월/년)를 모두 다룹니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

/// 캔들스틱 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    /// 1초봉
    S1,
    /// 1분봉
    M1,
    /// 3분봉
    M3,
    /// 5분봉
    M5,
    /// 10분봉
    M10,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉 (업비트 60분봉)
    H1,
    /// 4시간봉 (업비트 240분봉)
    H4,
    /// 일봉
    D1,
    /// 주봉
    W1,
    /// 월봉
    MN1,
    /// 연봉
    Y1,
}

impl Timeframe {
    /// 지원하는 모든 타임프레임.
    pub const ALL: [Timeframe; 13] = [
        Timeframe::S1,
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M10,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
        Timeframe::Y1,
    ];

    /// 고정 길이 단위의 초 값. 월봉/연봉은 달력 단위이므로 `None`.
    pub fn fixed_secs(&self) -> Option<i64> {
        match self {
            Timeframe::S1 => Some(1),
            Timeframe::M1 => Some(60),
            Timeframe::M3 => Some(3 * 60),
            Timeframe::M5 => Some(5 * 60),
            Timeframe::M10 => Some(10 * 60),
            Timeframe::M15 => Some(15 * 60),
            Timeframe::M30 => Some(30 * 60),
            Timeframe::H1 => Some(60 * 60),
            Timeframe::H4 => Some(4 * 60 * 60),
            Timeframe::D1 => Some(24 * 60 * 60),
            Timeframe::W1 => Some(7 * 24 * 60 * 60),
            Timeframe::MN1 | Timeframe::Y1 => None,
        }
    }

    /// 달력 기반 단위의 개월 수 (월봉 1, 연봉 12).
    pub fn calendar_months(&self) -> Option<u32> {
        match self {
            Timeframe::MN1 => Some(1),
            Timeframe::Y1 => Some(12),
            _ => None,
        }
    }

    /// 이 타임프레임의 기간을 반환합니다.
    ///
    /// 월봉과 연봉은 30일/365일 근사값입니다 (표시용).
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::MN1 => Duration::from_secs(30 * 24 * 60 * 60),
            Timeframe::Y1 => Duration::from_secs(365 * 24 * 60 * 60),
            _ => Duration::from_secs(self.fixed_secs().unwrap_or_default() as u64),
        }
    }

    /// 이 타임프레임의 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> u64 {
        self.duration().as_secs()
    }

    /// 업비트 캔들 API 경로 세그먼트.
    ///
    /// 예: `minutes/5`, `days`, `seconds`
    pub fn api_endpoint(&self) -> String {
        match self.minute_unit() {
            Some(unit) => format!("minutes/{}", unit),
            None => match self {
                Timeframe::S1 => "seconds".to_string(),
                Timeframe::D1 => "days".to_string(),
                Timeframe::W1 => "weeks".to_string(),
                Timeframe::MN1 => "months".to_string(),
                _ => "years".to_string(),
            },
        }
    }

    /// 분봉 API 단위 (1, 3, 5, 10, 15, 30, 60, 240).
    pub fn minute_unit(&self) -> Option<u32> {
        match self {
            Timeframe::M1 => Some(1),
            Timeframe::M3 => Some(3),
            Timeframe::M5 => Some(5),
            Timeframe::M10 => Some(10),
            Timeframe::M15 => Some(15),
            Timeframe::M30 => Some(30),
            Timeframe::H1 => Some(60),
            Timeframe::H4 => Some(240),
            _ => None,
        }
    }

    /// 짧은 문자열 표기 ("1m", "4h", "1M" 등).
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::S1 => "1s",
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M10 => "10m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
            Timeframe::MN1 => "1M",
            Timeframe::Y1 => "1y",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1s" => Ok(Timeframe::S1),
            "1m" => Ok(Timeframe::M1),
            "3m" => Ok(Timeframe::M3),
            "5m" => Ok(Timeframe::M5),
            "10m" => Ok(Timeframe::M10),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" | "60m" => Ok(Timeframe::H1),
            "4h" | "240m" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            "1w" => Ok(Timeframe::W1),
            "1M" => Ok(Timeframe::MN1),
            "1y" => Ok(Timeframe::Y1),
            other => Err(CoreError::UnsupportedTimeframe(other.to_string())),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.as_str().to_string()
    }
}
