//! 캔들 저장소.
//!
//! 수집 파이프라인은 [`CandleRepository`] trait만 사용합니다.
//! 기본 구현은 SQLite 기반 [`SqliteCandleRepository`]입니다.

pub mod candles;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use upbit_core::{Candle, Timeframe};

use crate::error::Result;

pub use candles::{CandleRecord, SqliteCandleRepository};

/// 캔들 저장소 인터페이스.
///
/// 모든 조회 결과는 업비트와 같은 최신순(newest-first)입니다.
/// 저장은 upsert 방식이므로 이미 저장된 캔들을 다시 저장해도 에러가 아닙니다.
#[async_trait]
pub trait CandleRepository: Send + Sync {
    /// 캔들 묶음 저장. 저장(삽입 또는 갱신)된 행 수를 반환합니다.
    async fn save_candle_chunk(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<usize>;

    /// `[oldest, newest]` 구간(양끝 포함)의 캔들 조회.
    async fn get_candles_by_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        oldest: DateTime<Utc>,
        newest: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;

    /// 가장 최근 `count`개 캔들 조회.
    async fn get_latest_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>>;

    /// `[oldest, newest]` 구간에 저장된 캔들 시각 목록.
    ///
    /// 겹침 분석용 경량 조회입니다.
    async fn get_candle_times_in_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        oldest: DateTime<Utc>,
        newest: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>>;
}
