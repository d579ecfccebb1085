//! 캔들 조회 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use upbit_core::{Candle, Timeframe};

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 업비트 캔들 API 1회 요청의 최대 개수.
pub const MAX_CANDLES_PER_REQUEST: usize = 200;

/// 과거 캔들 조회 인터페이스.
///
/// 수집 파이프라인은 이 trait만 사용하므로 테스트에서는 스크립트된 가짜 구현으로
/// 교체할 수 있습니다.
#[async_trait]
pub trait CandleApiClient: Send + Sync {
    /// `to` 이전(exclusive) 캔들을 최신순으로 최대 `count`개 조회.
    ///
    /// `to`가 `None`이면 현재 진행 중인 캔들부터 반환합니다.
    /// 반환 개수가 `count`보다 적으면 거래소 이력이 끝났다는 뜻입니다.
    async fn fetch_candles(
        &self,
        market: &str,
        timeframe: Timeframe,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>>;
}
