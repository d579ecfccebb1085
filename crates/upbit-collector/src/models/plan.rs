//! 수집 계획.

use chrono::{DateTime, Utc};
use serde::Serialize;
use upbit_core::Timeframe;

use super::request::RequestType;

/// 첫 청크 요청 파라미터.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirstChunkParams {
    pub market: String,
    pub count: usize,
    /// 업비트 `to` (exclusive). 기준 시각이 없는 요청은 `None`.
    pub to: Option<DateTime<Utc>>,
}

/// 요청을 청크로 나눈 수집 계획.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionPlan {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub request_type: RequestType,
    pub total_count: u64,
    pub estimated_chunks: u64,
    /// 초당 요청 한도 기준 예상 소요 시간 (표시용)
    pub estimated_duration_seconds: f64,
    pub first_chunk_params: FirstChunkParams,
}
