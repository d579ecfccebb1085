//! 캔들 수집 요청.
//!
//! 호출자가 넘긴 `(count, to, end)` 조합을 검증하고, 네 가지 요청 형태 중
//! 하나로 분류한 뒤 정렬된 경계 시각과 예상 캔들 수를 미리 계산합니다.
//! 생성 이후에는 변경되지 않습니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use upbit_core::{align_to_candle_boundary, calculate_expected_count, CoreError, CoreResult, Timeframe};

/// 요청 형태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// 현재부터 `count`개
    CountOnly,
    /// `to`부터 `count`개
    CountWithTo,
    /// `[end, to]` 구간 전체
    ToWithEnd,
    /// `[end, 현재]` 구간 전체
    EndOnly,
}

impl RequestType {
    /// 명시적인 기준 시각(`to`)이 있는 형태인지 확인합니다.
    pub fn has_anchor(&self) -> bool {
        matches!(self, Self::CountWithTo | Self::ToWithEnd)
    }

    /// 종료 시각(`end`)이 있는 형태인지 확인합니다.
    pub fn has_end(&self) -> bool {
        matches!(self, Self::ToWithEnd | Self::EndOnly)
    }
}

/// 검증된 수집 요청.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestInfo {
    symbol: String,
    timeframe: Timeframe,
    count: Option<usize>,
    to: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    request_type: RequestType,
    aligned_to: DateTime<Utc>,
    aligned_end: Option<DateTime<Utc>>,
    expected_count: u64,
    requested_at: DateTime<Utc>,
}

impl RequestInfo {
    /// 현재 시각 기준으로 요청을 생성합니다.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        count: Option<usize>,
        to: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> CoreResult<Self> {
        Self::new_at(symbol, timeframe, count, to, end, Utc::now())
    }

    /// `now`를 현재 시각으로 간주하여 요청을 생성합니다.
    pub fn new_at(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        count: Option<usize>,
        to: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(CoreError::InvalidRequest("symbol이 비어 있습니다".to_string()));
        }

        let request_type = match (count, to, end) {
            (Some(0), _, _) => {
                return Err(CoreError::InvalidRequest(
                    "count는 1 이상이어야 합니다".to_string(),
                ))
            }
            (Some(_), _, Some(_)) => {
                return Err(CoreError::InvalidRequest(
                    "count와 end는 함께 사용할 수 없습니다".to_string(),
                ))
            }
            (Some(_), None, None) => RequestType::CountOnly,
            (Some(_), Some(_), None) => RequestType::CountWithTo,
            (None, Some(to), Some(end)) => {
                if to <= end {
                    return Err(CoreError::InvalidRequest(format!(
                        "to({})는 end({})보다 이후여야 합니다",
                        to, end
                    )));
                }
                RequestType::ToWithEnd
            }
            (None, None, Some(_)) => RequestType::EndOnly,
            (None, _, None) => {
                return Err(CoreError::InvalidRequest(
                    "count 또는 end 중 하나는 필요합니다".to_string(),
                ))
            }
        };

        let anchor = to.unwrap_or(now);
        let aligned_to = align_to_candle_boundary(anchor, timeframe);
        let aligned_end = end.map(|e| align_to_candle_boundary(e, timeframe));

        let expected_count = match (count, aligned_end) {
            (Some(n), _) => n as u64,
            (None, Some(e)) => calculate_expected_count(aligned_to, e, timeframe),
            (None, None) => 0,
        };

        Ok(Self {
            symbol,
            timeframe,
            count,
            to,
            end,
            request_type,
            aligned_to,
            aligned_end,
            expected_count,
            requested_at: now,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn count(&self) -> Option<usize> {
        self.count
    }

    pub fn to(&self) -> Option<DateTime<Utc>> {
        self.to
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// 경계에 맞춘 시작(최신) 시각. `to`가 없으면 생성 시점의 현재 시각 기준.
    pub fn aligned_to(&self) -> DateTime<Utc> {
        self.aligned_to
    }

    /// 경계에 맞춘 종료(가장 오래된) 시각.
    pub fn aligned_end(&self) -> Option<DateTime<Utc>> {
        self.aligned_end
    }

    /// 예상 총 캔들 수.
    pub fn expected_count(&self) -> u64 {
        self.expected_count
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// 시작 기준 시각을 캔들 경계에 맞춰 사용해야 하는지.
    pub fn needs_to_time_alignment(&self) -> bool {
        self.request_type.has_anchor()
    }

    /// 첫 청크에서 겹침 분석을 건너뛰어야 하는지.
    pub fn should_skip_overlap_analysis(&self) -> bool {
        !self.request_type.has_anchor()
    }
}
