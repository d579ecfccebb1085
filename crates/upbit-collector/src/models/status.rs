//! 수집 상태 조회 결과.
//!
//! 모두 [`CollectionState`](super::CollectionState)에서 읽기만 해서 만든 값입니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use upbit_core::Timeframe;

use super::request::RequestType;
use super::state::{CollectionState, CompletionReason};

/// 수집 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPhase {
    Collecting,
    Completed,
    Failed,
}

/// 수집 상태 요약.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStatus {
    pub request_id: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub request_type: RequestType,
    pub phase: CollectionPhase,
    pub total_requested: u64,
    pub total_collected: u64,
    pub progress_percentage: f64,
    pub completed_chunks: usize,
    pub current_chunk_id: Option<String>,
    pub last_candle_time: Option<DateTime<Utc>>,
    pub target_end: Option<DateTime<Utc>>,
    pub completion_reason: Option<CompletionReason>,
    pub reached_upstream_end: bool,
    pub error_message: Option<String>,
    pub start_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    pub estimated_remaining_seconds: f64,
    pub estimated_completion_time: Option<DateTime<Utc>>,
}

impl CollectionStatus {
    pub fn from_state(state: &CollectionState) -> Self {
        let phase = if state.is_completed {
            CollectionPhase::Completed
        } else if state.is_failed() {
            CollectionPhase::Failed
        } else {
            CollectionPhase::Collecting
        };

        Self {
            request_id: state.request_id.clone(),
            symbol: state.request_info.symbol().to_string(),
            timeframe: state.request_info.timeframe(),
            request_type: state.request_info.request_type(),
            phase,
            total_requested: state.total_requested,
            total_collected: state.total_collected,
            progress_percentage: state.progress_percentage(),
            completed_chunks: state.completed_chunks.len(),
            current_chunk_id: state.current_chunk.as_ref().map(|c| c.chunk_id.clone()),
            last_candle_time: state.last_candle_time,
            target_end: state.target_end,
            completion_reason: state.completion_reason,
            reached_upstream_end: state.reached_upstream_end,
            error_message: state.error_message.clone(),
            start_time: state.start_time,
            last_update_time: state.last_update_time,
            estimated_remaining_seconds: state.estimated_remaining_seconds,
            estimated_completion_time: state.estimated_completion_time,
        }
    }
}

/// 실시간 남은 시간 추정.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemainingTime {
    pub request_id: String,
    pub current_time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub avg_chunk_duration: f64,
    pub remaining_chunks: u64,
    /// 마지막 ETA 갱신 이후 흐른 시간을 뺀 남은 시간
    pub remaining_seconds: f64,
    pub estimated_completion_time: Option<DateTime<Utc>>,
    pub progress_percentage: f64,
    pub is_completed: bool,
}

impl RemainingTime {
    pub fn from_state(state: &CollectionState, now: DateTime<Utc>) -> Self {
        let remaining_seconds = match (state.is_completed, state.estimated_completion_time) {
            (true, _) => 0.0,
            (false, Some(eta)) => (eta - now).num_milliseconds().max(0) as f64 / 1000.0,
            (false, None) => state.estimated_remaining_seconds,
        };

        Self {
            request_id: state.request_id.clone(),
            current_time: now,
            elapsed_seconds: state.elapsed_seconds(now),
            avg_chunk_duration: state.avg_chunk_duration,
            remaining_chunks: state.remaining_chunks,
            remaining_seconds,
            estimated_completion_time: state.estimated_completion_time,
            progress_percentage: state.progress_percentage(),
            is_completed: state.is_completed,
        }
    }
}
