//! 진행 중인 수집 1건의 상태.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::chunk::ChunkInfo;
use super::request::RequestInfo;
use crate::stats::CollectionStats;

/// 수집 종료 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// 요청한 개수를 모두 수집
    TargetCountReached,
    /// 종료 시각(`end`)까지 수집
    TargetEndReached,
    /// 거래소에 더 오래된 데이터가 없음
    UpstreamExhausted,
}

/// 수집 상태.
///
/// 수집 중에는 `current_chunk`가 항상 있고, 완료되면 `None`이 됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionState {
    pub request_id: String,
    pub request_info: RequestInfo,
    pub chunk_size: usize,

    pub total_requested: u64,
    pub total_collected: u64,
    pub completed_chunks: Vec<ChunkInfo>,
    pub current_chunk: Option<ChunkInfo>,
    /// 지금까지 수집한 가장 오래된 캔들 시각 (다음 청크의 `to`)
    pub last_candle_time: Option<DateTime<Utc>>,
    /// 지금까지 수집한 가장 최신 캔들 시각
    pub newest_candle_time: Option<DateTime<Utc>>,

    pub is_completed: bool,
    pub completion_reason: Option<CompletionReason>,
    /// API 응답이 요청보다 짧았던 적이 있는지
    pub reached_upstream_end: bool,
    pub error_message: Option<String>,
    pub target_end: Option<DateTime<Utc>>,

    pub start_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// 청크당 평균 소요 시간 (초)
    pub avg_chunk_duration: f64,
    pub remaining_chunks: u64,
    pub estimated_remaining_seconds: f64,
    pub estimated_completion_time: Option<DateTime<Utc>>,

    pub stats: CollectionStats,
}

impl CollectionState {
    pub fn new(
        request_id: String,
        request_info: RequestInfo,
        first_chunk: ChunkInfo,
        chunk_size: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let total_requested = request_info.expected_count();
        let target_end = request_info.aligned_end();

        Self {
            request_id,
            request_info,
            chunk_size,
            total_requested,
            total_collected: 0,
            completed_chunks: Vec::new(),
            current_chunk: Some(first_chunk),
            last_candle_time: None,
            newest_candle_time: None,
            is_completed: false,
            completion_reason: None,
            reached_upstream_end: false,
            error_message: None,
            target_end,
            start_time: now,
            last_update_time: now,
            completed_at: None,
            avg_chunk_duration: 0.0,
            remaining_chunks: chunks_for(total_requested, chunk_size),
            estimated_remaining_seconds: 0.0,
            estimated_completion_time: None,
            stats: CollectionStats::new(),
        }
    }

    /// 남은 캔들 수.
    pub fn remaining_count(&self) -> u64 {
        self.total_requested.saturating_sub(self.total_collected)
    }

    /// 진행률 (%). 완료된 수집은 항상 100.
    pub fn progress_percentage(&self) -> f64 {
        if self.is_completed {
            return 100.0;
        }
        if self.total_requested == 0 {
            return 0.0;
        }
        (self.total_collected as f64 / self.total_requested as f64 * 100.0).min(100.0)
    }

    /// 경과 시간 (초). 완료 후에는 완료 시점 기준으로 고정됩니다.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        let until = self.completed_at.unwrap_or(now);
        seconds(until - self.start_time)
    }

    /// 마지막 청크가 실패한 상태인지.
    pub fn is_failed(&self) -> bool {
        !self.is_completed && self.error_message.is_some()
    }

    /// 완료된 청크 기준으로 ETA를 다시 계산합니다.
    pub fn update_eta(&mut self, now: DateTime<Utc>) {
        self.last_update_time = now;

        let done = self.completed_chunks.len();
        if done > 0 {
            self.avg_chunk_duration = self.elapsed_seconds(now) / done as f64;
        }

        self.remaining_chunks = if self.is_completed {
            0
        } else {
            chunks_for(self.remaining_count(), self.chunk_size)
        };
        self.estimated_remaining_seconds = self.avg_chunk_duration * self.remaining_chunks as f64;
        let remaining_ms = (self.estimated_remaining_seconds * 1000.0).round() as i64;
        self.estimated_completion_time = Some(now + Duration::milliseconds(remaining_ms));
    }

    /// 수집을 완료 상태로 전환합니다.
    pub fn complete(&mut self, reason: CompletionReason, now: DateTime<Utc>) {
        self.is_completed = true;
        self.completion_reason = Some(reason);
        self.current_chunk = None;
        self.completed_at = Some(now);
        self.update_eta(now);
    }
}

fn chunks_for(count: u64, chunk_size: usize) -> u64 {
    count.div_ceil(chunk_size.max(1) as u64)
}

fn seconds(duration: Duration) -> f64 {
    duration.num_milliseconds().max(0) as f64 / 1000.0
}
