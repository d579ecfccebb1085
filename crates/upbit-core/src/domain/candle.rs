//! 업비트 캔들 데이터 타입.
//!
//! 업비트 캔들 응답의 필드 이름을 그대로 사용합니다. 업비트는 항상 최신 캔들부터
//! (newest-first) 반환하므로 이 모듈의 병합 함수도 같은 순서를 유지합니다.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// OHLCV 캔들 (업비트 형식).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 마켓 코드 (예: "KRW-BTC")
    pub market: String,
    /// 캔들 기준 시각 (UTC). 저장소의 중복 제거 키입니다.
    pub candle_date_time_utc: DateTime<Utc>,
    /// 캔들 기준 시각 (KST)
    pub candle_date_time_kst: NaiveDateTime,
    /// 시가
    pub opening_price: Decimal,
    /// 고가
    pub high_price: Decimal,
    /// 저가
    pub low_price: Decimal,
    /// 종가
    pub trade_price: Decimal,
    /// 마지막 틱 타임스탬프 (ms)
    pub timestamp: i64,
    /// 누적 거래 금액
    pub candle_acc_trade_price: Decimal,
    /// 누적 거래량
    pub candle_acc_trade_volume: Decimal,
    /// 분 단위 (분봉 전용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<u32>,
    /// 전일 종가 (일봉 전용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_closing_price: Option<Decimal>,
    /// 전일 종가 대비 변화 금액 (일봉 전용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_price: Option<Decimal>,
    /// 전일 종가 대비 변화율 (일봉 전용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_rate: Option<Decimal>,
    /// 캔들 기간의 가장 첫 날 (주/월/연봉)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_day_of_period: Option<String>,
}

/// newest-first 목록의 가장 오래된 캔들 시각.
pub fn oldest_time(candles: &[Candle]) -> Option<DateTime<Utc>> {
    candles.iter().map(|c| c.candle_date_time_utc).min()
}

/// newest-first 목록의 가장 최근 캔들 시각.
pub fn newest_time(candles: &[Candle]) -> Option<DateTime<Utc>> {
    candles.iter().map(|c| c.candle_date_time_utc).max()
}

/// 두 캔들 목록을 병합합니다.
///
/// `candle_date_time_utc` 기준으로 중복을 제거하고 최신순으로 정렬합니다.
/// 같은 시각이 양쪽에 있으면 `preferred` 쪽 캔들을 유지합니다.
pub fn merge_newest_first(preferred: Vec<Candle>, other: Vec<Candle>) -> Vec<Candle> {
    let mut by_time: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
    for candle in other {
        by_time.insert(candle.candle_date_time_utc, candle);
    }
    for candle in preferred {
        by_time.insert(candle.candle_date_time_utc, candle);
    }
    by_time.into_values().rev().collect()
}
