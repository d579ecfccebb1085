//! 청크: API 요청 1회 분량의 작업 단위.

use chrono::{DateTime, Utc};
use serde::Serialize;
use upbit_core::{get_time_by_ticks, Timeframe};
use upbit_data::TimeRange;

/// 청크 처리 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// 청크 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub symbol: String,
    pub timeframe: Timeframe,
    /// 요청 캔들 수 (최대 200)
    pub count: usize,
    /// 업비트 `to` 파라미터 (exclusive). 기준 시각이 없는 첫 청크는 `None`.
    pub to: Option<DateTime<Utc>>,
    pub status: ChunkStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChunkInfo {
    pub fn new(
        chunk_index: usize,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            chunk_id: Self::make_chunk_id(&symbol, timeframe, chunk_index),
            chunk_index,
            symbol,
            timeframe,
            count,
            to,
            status: ChunkStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// `KRW-BTC_1m_chunk_007` 형식의 ID.
    pub fn make_chunk_id(symbol: &str, timeframe: Timeframe, index: usize) -> String {
        format!("{}_{}_chunk_{:03}", symbol, timeframe, index)
    }

    /// 청크가 덮는 캔들 구간 (양끝 포함).
    ///
    /// `to`가 없는 청크는 구간을 미리 알 수 없으므로 `None`입니다.
    pub fn target_range(&self) -> Option<TimeRange> {
        let to = self.to?;
        let newest = get_time_by_ticks(to, self.timeframe, -1);
        let oldest = get_time_by_ticks(newest, self.timeframe, -(self.count.max(1) as i64 - 1));
        Some(TimeRange::new(newest, oldest))
    }

    pub fn mark_processing(&mut self) {
        self.status = ChunkStatus::Processing;
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = ChunkStatus::Completed;
        self.completed_at = Some(at);
    }

    pub fn mark_failed(&mut self) {
        self.status = ChunkStatus::Failed;
    }

    /// 재개를 위해 대기 상태로 되돌립니다.
    pub fn reset(&mut self) {
        self.status = ChunkStatus::Pending;
        self.completed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_chunk_id_is_zero_padded() {
        let chunk = ChunkInfo::new(7, "KRW-BTC", Timeframe::M1, 200, None);
        assert_eq!(chunk.chunk_id, "KRW-BTC_1m_chunk_007");
        assert_eq!(chunk.status, ChunkStatus::Pending);
    }

    #[test]
    fn test_target_range_excludes_to() {
        let to = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let chunk = ChunkInfo::new(0, "KRW-BTC", Timeframe::M1, 60, Some(to));
        let range = chunk.target_range().unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 59, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.candle_count(Timeframe::M1), 60);

        assert!(ChunkInfo::new(0, "KRW-BTC", Timeframe::M1, 60, None).target_range().is_none());
    }

    #[test]
    fn test_status_transitions() {
        let mut chunk = ChunkInfo::new(0, "KRW-BTC", Timeframe::D1, 10, None);
        chunk.mark_processing();
        assert_eq!(chunk.status, ChunkStatus::Processing);
        chunk.mark_failed();
        assert_eq!(chunk.status, ChunkStatus::Failed);
        chunk.reset();
        assert_eq!(chunk.status, ChunkStatus::Pending);
        let at = Utc::now();
        chunk.mark_completed(at);
        assert_eq!(chunk.completed_at, Some(at));
    }
}
