//! 캔들 수집 실행 모듈.

use chrono::{DateTime, Utc};
use upbit_core::{Candle, Timeframe};

use crate::models::CollectionStatus;
use crate::provider::CandleDataProvider;
use crate::Result;

/// 수집 대상
#[derive(Debug, Clone)]
pub struct CandleTarget {
    pub market: String,
    pub timeframe: Timeframe,
    pub count: Option<usize>,
    pub to: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// 청크 단위로 수집하며 진행 상황을 로그로 남깁니다.
///
/// 완료 후 최종 상태를 반환합니다. 끝난 수집은 레지스트리에 남으며
/// `cleanup_completed_collections`로 정리됩니다.
pub async fn collect_with_progress(
    provider: &mut CandleDataProvider,
    target: &CandleTarget,
) -> Result<CollectionStatus> {
    let request_id = provider.start_collection(
        &target.market,
        target.timeframe,
        target.count,
        target.to,
        target.end,
    )?;

    while let Some(chunk) = provider.get_next_chunk(&request_id)? {
        let done = provider.mark_chunk_completed(&request_id).await?;

        let remaining = provider.get_realtime_remaining_time(&request_id)?;
        tracing::info!(
            chunk_id = %chunk.chunk_id,
            progress = format!("{:.1}%", remaining.progress_percentage),
            remaining_chunks = remaining.remaining_chunks,
            eta = format!("{:.1}s", remaining.remaining_seconds),
            "진행 상황"
        );

        if done {
            break;
        }
    }

    provider.get_collection_status(&request_id)
}

/// 저장된 최신 캔들 조회
pub async fn latest_candles(
    provider: &CandleDataProvider,
    market: &str,
    timeframe: Timeframe,
    count: usize,
) -> Result<Vec<Candle>> {
    let candles = provider
        .repository()
        .get_latest_candles(market, timeframe, count)
        .await?;

    if candles.is_empty() {
        tracing::warn!(market = market, timeframe = %timeframe, "저장된 캔들이 없습니다");
    }
    Ok(candles)
}
