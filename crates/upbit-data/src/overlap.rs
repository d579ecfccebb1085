//! 저장된 캔들과 수집 대상 구간의 겹침 분석.
//!
//! 수집기는 청크마다 대상 구간을 저장소와 비교해 어디서 데이터를 가져올지
//! 결정합니다. 모든 구간은 업비트 순서를 따라 `start`가 최신, `end`가 가장
//! 오래된 시각이며 양끝을 포함합니다.
//!
//! | 저장된 시각 `T` | 결과 |
//! |---|---|
//! | 없음 | `NoOverlap` |
//! | `target_count`개 이상 | `CompleteOverlap` |
//! | 연속, 최신 쪽이 `target_start`에 붙음 | `PartialStart` |
//! | 연속, 오래된 쪽이 `target_end`에 붙음 | `PartialMiddleContinuous` |
//! | 그 외 | `PartialMiddleFragment` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use upbit_core::{calculate_expected_count, get_time_by_ticks, Timeframe};

use crate::error::Result;
use crate::storage::CandleRepository;

/// 겹침 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapStatus {
    /// 저장된 데이터 없음
    NoOverlap,
    /// 대상 구간 전체가 저장되어 있음
    CompleteOverlap,
    /// 최신 쪽 일부만 저장되어 있음
    PartialStart,
    /// 오래된 쪽 일부만 저장되어 있음
    PartialMiddleContinuous,
    /// 저장된 데이터가 조각나 있음
    PartialMiddleFragment,
}

/// 시간 구간 (`start`: 최신, `end`: 가장 오래된 시각, 양끝 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// 구간에 포함된 캔들 수.
    pub fn candle_count(&self, timeframe: Timeframe) -> u64 {
        calculate_expected_count(self.start, self.end, timeframe)
    }
}

/// 겹침 분석 요청.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// 대상 구간의 최신 시각
    pub target_start: DateTime<Utc>,
    /// 대상 구간의 가장 오래된 시각
    pub target_end: DateTime<Utc>,
    pub target_count: usize,
}

impl OverlapRequest {
    pub fn target_range(&self) -> TimeRange {
        TimeRange::new(self.target_start, self.target_end)
    }
}

/// 겹침 분석 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapResult {
    pub status: OverlapStatus,
    /// 저장소에서 읽을 구간
    pub db_range: Option<TimeRange>,
    /// API로 받아야 할 구간
    pub api_range: Option<TimeRange>,
}

impl OverlapResult {
    fn no_overlap(target: TimeRange) -> Self {
        Self {
            status: OverlapStatus::NoOverlap,
            db_range: None,
            api_range: Some(target),
        }
    }

    fn complete(target: TimeRange) -> Self {
        Self {
            status: OverlapStatus::CompleteOverlap,
            db_range: Some(target),
            api_range: None,
        }
    }

    fn fragment(target: TimeRange) -> Self {
        Self {
            status: OverlapStatus::PartialMiddleFragment,
            db_range: None,
            api_range: Some(target),
        }
    }
}

/// 겹침 분석 인터페이스.
#[async_trait]
pub trait OverlapAnalysis: Send + Sync {
    async fn analyze_overlap(&self, request: &OverlapRequest) -> Result<OverlapResult>;
}

/// 저장소 기반 겹침 분석기.
pub struct OverlapAnalyzer {
    repository: Arc<dyn CandleRepository>,
}

impl OverlapAnalyzer {
    pub fn new(repository: Arc<dyn CandleRepository>) -> Self {
        Self { repository }
    }

    /// 저장된 시각 목록으로 분류합니다 (`times`는 대상 구간 안의 시각).
    pub fn classify(request: &OverlapRequest, times: &[DateTime<Utc>]) -> OverlapResult {
        let target = request.target_range();
        let tf = request.timeframe;

        let (Some(&newest), Some(&oldest)) = (times.iter().max(), times.iter().min()) else {
            return OverlapResult::no_overlap(target);
        };

        if times.len() >= request.target_count {
            return OverlapResult::complete(target);
        }

        let contiguous = times.len() as u64 == calculate_expected_count(newest, oldest, tf);
        if !contiguous {
            return OverlapResult::fragment(target);
        }

        if newest == request.target_start && oldest > request.target_end {
            return OverlapResult {
                status: OverlapStatus::PartialStart,
                db_range: Some(TimeRange::new(request.target_start, oldest)),
                api_range: Some(TimeRange::new(
                    get_time_by_ticks(oldest, tf, -1),
                    request.target_end,
                )),
            };
        }

        if oldest == request.target_end && newest < request.target_start {
            return OverlapResult {
                status: OverlapStatus::PartialMiddleContinuous,
                db_range: Some(TimeRange::new(newest, request.target_end)),
                api_range: Some(TimeRange::new(
                    request.target_start,
                    get_time_by_ticks(newest, tf, 1),
                )),
            };
        }

        OverlapResult::fragment(target)
    }
}

#[async_trait]
impl OverlapAnalysis for OverlapAnalyzer {
    async fn analyze_overlap(&self, request: &OverlapRequest) -> Result<OverlapResult> {
        let times = self
            .repository
            .get_candle_times_in_range(
                &request.symbol,
                request.timeframe,
                request.target_end,
                request.target_start,
            )
            .await?;

        let result = Self::classify(request, &times);

        debug!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            stored = times.len(),
            target_count = request.target_count,
            status = ?result.status,
            "겹침 분석"
        );

        Ok(result)
    }
}
