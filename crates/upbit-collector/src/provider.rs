//! 캔들 수집 오케스트레이터.
//!
//! 사용자 요청을 청크 단위로 나누고, 청크마다 저장소와 겹침을 분석해
//! 저장소 조회, API 조회, 또는 둘의 병합 중 하나로 데이터를 모읍니다.
//!
//! # 청크 연속성
//!
//! 업비트 `to`는 exclusive입니다.
//! - 기준 시각이 있는 요청의 첫 청크: `to = aligned_to + 1 tick`
//! - 기준 시각이 없는 요청의 첫 청크: `to` 없음 (현재 시각 기준)
//! - 이후 모든 청크: `to = 지금까지 수집한 가장 오래된 캔들 시각`
//!
//! 따라서 청크 사이에 빈 캔들이나 중복 캔들이 생기지 않습니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! let mut provider = CandleDataProvider::new(repo, api, overlap, ProviderConfig::default())?;
//!
//! let id = provider.start_collection("KRW-BTC", Timeframe::M1, Some(1000), None, None)?;
//! while provider.get_next_chunk(&id)?.is_some() {
//!     if provider.mark_chunk_completed(&id).await? {
//!         break;
//!     }
//!     let eta = provider.get_realtime_remaining_time(&id)?;
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};
use upbit_core::{
    calculate_expected_count, get_time_by_ticks, merge_newest_first, newest_time, oldest_time,
    Candle, Timeframe,
};
use upbit_data::{
    CandleRepository, OverlapAnalysis, OverlapRequest, OverlapStatus, TimeRange,
};
use upbit_exchange::{CandleApiClient, MAX_CANDLES_PER_REQUEST};

use crate::error::{CollectorError, Result};
use crate::models::{
    ChunkInfo, CollectionPlan, CollectionState, CollectionStatus, CompletionReason,
    FirstChunkParams, RemainingTime, RequestInfo,
};
use crate::stats::CollectionStats;

// ============================================================================
// 설정
// ============================================================================

/// 수집기 설정.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// 청크당 캔들 수 (1 ~ 200)
    pub chunk_size: usize,
    /// ETA 계산에 쓰는 초당 요청 수 (실제 제한은 API 클라이언트 담당)
    pub requests_per_second: f64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_CANDLES_PER_REQUEST,
            requests_per_second: 10.0,
        }
    }
}

impl ProviderConfig {
    /// 검증된 설정 생성.
    pub fn new(chunk_size: usize, requests_per_second: f64) -> Result<Self> {
        let config = Self {
            chunk_size,
            requests_per_second,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CANDLES_PER_REQUEST {
            return Err(CollectorError::Config(format!(
                "chunk_size는 1 ~ {} 사이여야 합니다: {}",
                MAX_CANDLES_PER_REQUEST, self.chunk_size
            )));
        }
        if self.requests_per_second.is_nan() || self.requests_per_second <= 0.0 {
            return Err(CollectorError::Config(format!(
                "requests_per_second는 0보다 커야 합니다: {}",
                self.requests_per_second
            )));
        }
        Ok(())
    }
}

// ============================================================================
// 청크 데이터 수집
// ============================================================================

/// 청크 1개에서 모은 데이터.
struct ChunkData {
    /// API에서 받은 캔들 (저장 대상)
    fetched: Vec<Candle>,
    /// 저장소에서 읽은 캔들
    stored: Vec<Candle>,
    /// API 응답이 요청보다 짧았고, 그 응답이 청크의 가장 오래된 쪽까지 덮는 요청이었는지
    short_response: bool,
}

impl ChunkData {
    fn from_api(fetched: Vec<Candle>, short_response: bool) -> Self {
        Self {
            fetched,
            stored: Vec::new(),
            short_response,
        }
    }
}

/// 청크 처리 결과.
struct ChunkOutcome {
    /// 최신순, 중복 제거된 청크 캔들
    candles: Vec<Candle>,
    short_response: bool,
    /// 청크가 종료 시각까지 덮었는지 (종료 시각 캔들이 업비트에 없어도 참)
    reached_end: bool,
}

/// 수집기가 사용하는 외부 협력자.
struct ChunkSources {
    repository: Arc<dyn CandleRepository>,
    api: Arc<dyn CandleApiClient>,
    overlap: Arc<dyn OverlapAnalysis>,
}

impl ChunkSources {
    /// 청크 데이터를 모으고, 종료 시각 밖 캔들을 제거한 뒤 API 데이터를 저장합니다.
    async fn run_chunk(
        &self,
        request: &RequestInfo,
        chunk: &ChunkInfo,
        target_end: Option<DateTime<Utc>>,
        stats: &mut CollectionStats,
    ) -> Result<ChunkOutcome> {
        let mut data = self.collect(request, chunk, stats).await?;

        let mut reached_end = false;
        if let Some(end) = target_end {
            let before = data.fetched.len() + data.stored.len();
            data.fetched.retain(|c| c.candle_date_time_utc >= end);
            data.stored.retain(|c| c.candle_date_time_utc >= end);
            let trimmed = before > data.fetched.len() + data.stored.len();
            let covers_end = chunk.target_range().is_some_and(|r| r.end <= end);
            reached_end = trimmed || covers_end;
        }

        if !data.fetched.is_empty() {
            let saved = self
                .repository
                .save_candle_chunk(request.symbol(), request.timeframe(), &data.fetched)
                .await?;
            stats.saved_candles += saved;
        }

        Ok(ChunkOutcome {
            candles: merge_newest_first(data.fetched, data.stored),
            short_response: data.short_response,
            reached_end,
        })
    }

    async fn collect(
        &self,
        request: &RequestInfo,
        chunk: &ChunkInfo,
        stats: &mut CollectionStats,
    ) -> Result<ChunkData> {
        let symbol = request.symbol();
        let tf = request.timeframe();

        let skip_overlap = chunk.chunk_index == 0 && request.should_skip_overlap_analysis();
        let target = if skip_overlap { None } else { chunk.target_range() };

        let Some(target) = target else {
            debug!(chunk_id = %chunk.chunk_id, "겹침 분석 생략, API 직접 조회");
            let (fetched, short) = self.fetch(symbol, tf, chunk.count, chunk.to, stats).await?;
            return Ok(ChunkData::from_api(fetched, short));
        };

        let overlap = self
            .overlap
            .analyze_overlap(&OverlapRequest {
                symbol: symbol.to_string(),
                timeframe: tf,
                target_start: target.start,
                target_end: target.end,
                target_count: chunk.count,
            })
            .await?;

        debug!(
            chunk_id = %chunk.chunk_id,
            status = ?overlap.status,
            target_start = %target.start,
            target_end = %target.end,
            "겹침 분석 결과"
        );

        match (overlap.status, overlap.db_range, overlap.api_range) {
            (OverlapStatus::CompleteOverlap, Some(db), _) => {
                let stored = self.read(symbol, tf, db, stats).await?;
                Ok(ChunkData {
                    fetched: Vec::new(),
                    stored,
                    short_response: false,
                })
            }
            (status @ OverlapStatus::PartialStart, Some(db), Some(api))
            | (status @ OverlapStatus::PartialMiddleContinuous, Some(db), Some(api)) => {
                let stored = self.read(symbol, tf, db, stats).await?;
                let count = api.candle_count(tf) as usize;
                let to = get_time_by_ticks(api.start, tf, 1);
                let (fetched, short) = self.fetch(symbol, tf, count, Some(to), stats).await?;
                stats.merges += 1;

                // 최신 쪽만 API로 받는 경우 짧은 응답은 과거 데이터 소진을 뜻하지 않음
                let short_response = short && status == OverlapStatus::PartialStart;
                Ok(ChunkData {
                    fetched,
                    stored,
                    short_response,
                })
            }
            (OverlapStatus::PartialMiddleFragment, _, _) => {
                stats.fallbacks += 1;
                let (fetched, short) = self.fetch(symbol, tf, chunk.count, chunk.to, stats).await?;
                Ok(ChunkData::from_api(fetched, short))
            }
            _ => {
                let (fetched, short) = self.fetch(symbol, tf, chunk.count, chunk.to, stats).await?;
                Ok(ChunkData::from_api(fetched, short))
            }
        }
    }

    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
        to: Option<DateTime<Utc>>,
        stats: &mut CollectionStats,
    ) -> Result<(Vec<Candle>, bool)> {
        let candles = self.api.fetch_candles(symbol, timeframe, count, to).await?;
        stats.api_calls += 1;
        stats.api_candles += candles.len();

        let short = candles.len() < count;
        if short {
            warn!(
                symbol = symbol,
                timeframe = %timeframe,
                requested = count,
                received = candles.len(),
                "요청보다 적은 캔들 수신, 업비트 데이터 끝에 도달"
            );
        }
        Ok((candles, short))
    }

    async fn read(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        range: TimeRange,
        stats: &mut CollectionStats,
    ) -> Result<Vec<Candle>> {
        let candles = self
            .repository
            .get_candles_by_range(symbol, timeframe, range.end, range.start)
            .await?;
        stats.storage_reads += 1;
        stats.storage_candles += candles.len();
        Ok(candles)
    }
}

// ============================================================================
// CandleDataProvider
// ============================================================================

/// 캔들 수집기.
///
/// 진행 중인 수집은 이 인스턴스가 소유한 레지스트리에 `request_id`로 보관됩니다.
/// 하나의 `request_id`는 한 호출자만 진행해야 합니다.
pub struct CandleDataProvider {
    sources: ChunkSources,
    config: ProviderConfig,
    active_collections: HashMap<String, CollectionState>,
    next_seq: u64,
}

impl CandleDataProvider {
    /// 설정을 검증한 뒤 수집기를 생성합니다.
    pub fn new(
        repository: Arc<dyn CandleRepository>,
        api: Arc<dyn CandleApiClient>,
        overlap: Arc<dyn OverlapAnalysis>,
        config: ProviderConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sources: ChunkSources {
                repository,
                api,
                overlap,
            },
            config,
            active_collections: HashMap::new(),
            next_seq: 0,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn CandleRepository> {
        &self.sources.repository
    }

    /// 레지스트리에 있는 수집 수.
    pub fn active_count(&self) -> usize {
        self.active_collections.len()
    }

    pub fn collection_state(&self, request_id: &str) -> Option<&CollectionState> {
        self.active_collections.get(request_id)
    }

    /// 수집 계획 생성.
    pub fn plan_collection(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: Option<usize>,
        to: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CollectionPlan> {
        let request = Self::build_request(symbol, timeframe, count, to, end, Utc::now())?;
        Ok(self.build_plan(&request))
    }

    /// 수집 시작. 첫 청크를 만들고 `request_id`를 반환합니다.
    pub fn start_collection(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: Option<usize>,
        to: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<String> {
        let now = Utc::now();
        let request = Self::build_request(symbol, timeframe, count, to, end, now)?;
        let plan = self.build_plan(&request);

        let request_id = self.next_request_id(symbol, timeframe, now);
        let first_chunk = ChunkInfo::new(
            0,
            symbol,
            timeframe,
            plan.first_chunk_params.count,
            plan.first_chunk_params.to,
        );

        info!(
            request_id = %request_id,
            request_type = ?plan.request_type,
            total_count = plan.total_count,
            estimated_chunks = plan.estimated_chunks,
            estimated_seconds = plan.estimated_duration_seconds,
            "수집 시작"
        );

        let state = CollectionState::new(
            request_id.clone(),
            request,
            first_chunk,
            self.config.chunk_size,
            now,
        );
        self.active_collections.insert(request_id.clone(), state);

        Ok(request_id)
    }

    /// 처리할 청크 조회. 수집이 끝났으면 `None`.
    pub fn get_next_chunk(&mut self, request_id: &str) -> Result<Option<ChunkInfo>> {
        let state = self.state_mut(request_id)?;
        if state.is_completed {
            return Ok(None);
        }

        Ok(state.current_chunk.as_mut().map(|chunk| {
            chunk.mark_processing();
            debug!(chunk_id = %chunk.chunk_id, count = chunk.count, to = ?chunk.to, "청크 처리 시작");
            chunk.clone()
        }))
    }

    /// 현재 청크를 처리하고 다음 청크를 준비합니다.
    ///
    /// 수집이 끝났으면 `true`를 반환합니다. 처리 중 에러가 나면 청크를
    /// 실패로 표시하고 에러 메시지를 기록한 뒤 에러를 그대로 반환합니다.
    #[instrument(skip(self))]
    pub async fn mark_chunk_completed(&mut self, request_id: &str) -> Result<bool> {
        let chunk_size = self.config.chunk_size;
        let state = self
            .active_collections
            .get_mut(request_id)
            .ok_or_else(|| CollectorError::UnknownRequest(request_id.to_string()))?;

        if state.is_completed {
            return Ok(true);
        }

        let Some(mut chunk) = state.current_chunk.take() else {
            return Err(CollectorError::InvalidState(format!(
                "{}: 진행 중인 청크가 없습니다",
                request_id
            )));
        };
        chunk.mark_processing();

        let started = Instant::now();
        let outcome = self
            .sources
            .run_chunk(&state.request_info, &chunk, state.target_end, &mut state.stats)
            .await;

        match outcome {
            Ok(outcome) => {
                debug!(
                    chunk_id = %chunk.chunk_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "청크 데이터 확보"
                );
                Ok(Self::advance(state, chunk, outcome, chunk_size, Utc::now()))
            }
            Err(e) => {
                chunk.mark_failed();
                error!(chunk_id = %chunk.chunk_id, error = %e, "청크 처리 실패");
                state.error_message = Some(e.to_string());
                state.last_update_time = Utc::now();
                state.current_chunk = Some(chunk);
                Err(e)
            }
        }
    }

    /// 실패했거나 중단된 수집을 재개합니다.
    ///
    /// 현재 청크를 대기 상태로 되돌리고 에러 메시지를 지웁니다.
    /// 이미 완료된 수집은 `None`을 반환합니다.
    pub fn resume_collection(&mut self, request_id: &str) -> Result<Option<ChunkInfo>> {
        let state = self.state_mut(request_id)?;
        if state.is_completed {
            return Ok(None);
        }

        state.error_message = None;
        let chunk = state.current_chunk.as_mut().map(|chunk| {
            chunk.reset();
            chunk.clone()
        });

        if let Some(chunk) = &chunk {
            info!(
                request_id = request_id,
                chunk_id = %chunk.chunk_id,
                collected = state.total_collected,
                "수집 재개"
            );
        }
        Ok(chunk)
    }

    /// 수집 상태 요약.
    pub fn get_collection_status(&self, request_id: &str) -> Result<CollectionStatus> {
        Ok(CollectionStatus::from_state(self.state(request_id)?))
    }

    /// 현재 시각 기준 남은 시간 추정.
    pub fn get_realtime_remaining_time(&self, request_id: &str) -> Result<RemainingTime> {
        Ok(RemainingTime::from_state(self.state(request_id)?, Utc::now()))
    }

    /// 수집 전체를 실행하고 결과 캔들을 최신순으로 반환합니다.
    ///
    /// 끝난 수집은 레지스트리에서 제거됩니다.
    #[instrument(skip(self))]
    pub async fn get_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        count: Option<usize>,
        to: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let request_id = self.start_collection(symbol, timeframe, count, to, end)?;

        if let Err(e) = self.run_to_completion(&request_id).await {
            self.remove_collection(&request_id);
            return Err(e);
        }

        let state = self
            .remove_collection(&request_id)
            .ok_or_else(|| CollectorError::UnknownRequest(request_id.clone()))?;

        match (state.last_candle_time, state.newest_candle_time) {
            (Some(oldest), Some(newest)) => Ok(self
                .sources
                .repository
                .get_candles_by_range(symbol, timeframe, oldest, newest)
                .await?),
            _ => Ok(Vec::new()),
        }
    }

    /// `max_age`보다 오래전에 완료된 수집을 정리합니다. 제거된 수를 반환합니다.
    pub fn cleanup_completed_collections(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let before = self.active_collections.len();

        self.active_collections.retain(|_, state| {
            !(state.is_completed && state.completed_at.is_some_and(|at| at <= cutoff))
        });

        let removed = before - self.active_collections.len();
        if removed > 0 {
            info!(removed = removed, remaining = self.active_collections.len(), "완료된 수집 정리");
        }
        removed
    }

    /// 수집을 레지스트리에서 제거합니다.
    pub fn remove_collection(&mut self, request_id: &str) -> Option<CollectionState> {
        self.active_collections.remove(request_id)
    }

    // ------------------------------------------------------------------------
    // 내부
    // ------------------------------------------------------------------------

    async fn run_to_completion(&mut self, request_id: &str) -> Result<()> {
        loop {
            if self.get_next_chunk(request_id)?.is_none() {
                return Ok(());
            }
            if self.mark_chunk_completed(request_id).await? {
                return Ok(());
            }
        }
    }

    fn build_request(
        symbol: &str,
        timeframe: Timeframe,
        count: Option<usize>,
        to: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<RequestInfo> {
        let request = RequestInfo::new_at(symbol, timeframe, count, to, end, now)?;

        for (name, time) in [("to", to), ("end", end)] {
            match time {
                Some(t) if t > now => {
                    return Err(CollectorError::Range(format!(
                        "{}({})가 현재 시각({})보다 미래입니다",
                        name, t, now
                    )))
                }
                _ => {}
            }
        }

        Ok(request)
    }

    fn build_plan(&self, request: &RequestInfo) -> CollectionPlan {
        let total_count = request.expected_count();
        let chunk_size = self.config.chunk_size;
        let estimated_chunks = total_count.div_ceil(chunk_size as u64);

        let to = if request.needs_to_time_alignment() {
            Some(get_time_by_ticks(request.aligned_to(), request.timeframe(), 1))
        } else {
            None
        };

        CollectionPlan {
            symbol: request.symbol().to_string(),
            timeframe: request.timeframe(),
            request_type: request.request_type(),
            total_count,
            estimated_chunks,
            estimated_duration_seconds: estimated_chunks as f64 / self.config.requests_per_second,
            first_chunk_params: FirstChunkParams {
                market: request.symbol().to_string(),
                count: total_count.min(chunk_size as u64) as usize,
                to,
            },
        }
    }

    /// 청크 결과를 상태에 반영하고 종료 여부를 판단합니다.
    fn advance(
        state: &mut CollectionState,
        mut chunk: ChunkInfo,
        outcome: ChunkOutcome,
        chunk_size: usize,
        now: DateTime<Utc>,
    ) -> bool {
        let received = outcome.candles.len();
        state.total_collected += received as u64;

        if let Some(oldest) = oldest_time(&outcome.candles) {
            state.last_candle_time = Some(state.last_candle_time.map_or(oldest, |t| t.min(oldest)));
        }
        if let Some(newest) = newest_time(&outcome.candles) {
            state.newest_candle_time =
                Some(state.newest_candle_time.map_or(newest, |t| t.max(newest)));
        }
        if outcome.short_response {
            state.reached_upstream_end = true;
        }

        chunk.mark_completed(now);
        info!(
            request_id = %state.request_id,
            chunk_id = %chunk.chunk_id,
            received = received,
            collected = state.total_collected,
            requested = state.total_requested,
            "청크 완료"
        );
        state.completed_chunks.push(chunk);
        state.error_message = None;

        let end_reached = outcome.reached_end
            || matches!(
                (state.target_end, state.last_candle_time),
                (Some(end), Some(last)) if last <= end
            );
        let reason = if state.total_collected >= state.total_requested {
            Some(CompletionReason::TargetCountReached)
        } else if end_reached {
            Some(CompletionReason::TargetEndReached)
        } else if outcome.short_response || received == 0 {
            Some(CompletionReason::UpstreamExhausted)
        } else {
            None
        };

        let next_to = match (reason, state.last_candle_time) {
            (None, Some(last)) => last,
            (reason, _) => {
                Self::finish(
                    state,
                    reason.unwrap_or(CompletionReason::UpstreamExhausted),
                    now,
                );
                return true;
            }
        };

        let tf = state.request_info.timeframe();
        let mut count = state.remaining_count().min(chunk_size as u64);
        if let Some(end) = state.target_end {
            let newest = get_time_by_ticks(next_to, tf, -1);
            count = count.min(calculate_expected_count(newest, end, tf));
        }

        let next = ChunkInfo::new(
            state.completed_chunks.len(),
            state.request_info.symbol(),
            tf,
            count as usize,
            Some(next_to),
        );
        state.current_chunk = Some(next);
        state.update_eta(now);

        debug!(
            request_id = %state.request_id,
            remaining_chunks = state.remaining_chunks,
            eta_seconds = state.estimated_remaining_seconds,
            "다음 청크 준비"
        );
        false
    }

    fn finish(state: &mut CollectionState, reason: CompletionReason, now: DateTime<Utc>) {
        state.complete(reason, now);

        if reason == CompletionReason::UpstreamExhausted {
            warn!(
                request_id = %state.request_id,
                collected = state.total_collected,
                requested = state.total_requested,
                oldest = ?state.last_candle_time,
                "업비트 과거 데이터가 요청 범위보다 먼저 끝남"
            );
        }
        info!(
            request_id = %state.request_id,
            reason = ?reason,
            collected = state.total_collected,
            requested = state.total_requested,
            chunks = state.completed_chunks.len(),
            reached_upstream_end = state.reached_upstream_end,
            "수집 종료"
        );
        state
            .stats
            .log_summary(&state.request_id, state.elapsed_seconds(now));
    }

    fn next_request_id(&mut self, symbol: &str, timeframe: Timeframe, now: DateTime<Utc>) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        format!("{}_{}_{}_{}", symbol, timeframe, now.format("%Y%m%d%H%M%S%3f"), seq)
    }

    fn state(&self, request_id: &str) -> Result<&CollectionState> {
        self.active_collections
            .get(request_id)
            .ok_or_else(|| CollectorError::UnknownRequest(request_id.to_string()))
    }

    fn state_mut(&mut self, request_id: &str) -> Result<&mut CollectionState> {
        self.active_collections
            .get_mut(request_id)
            .ok_or_else(|| CollectorError::UnknownRequest(request_id.to_string()))
    }
}
