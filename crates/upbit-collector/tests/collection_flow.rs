//! 수집 파이프라인 통합 테스트.
//!
//! 실제 SQLite(메모리) 저장소와 겹침 분석기를 쓰고, 업비트 API만 스크립트로 대체합니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use upbit_collector::{
    CandleDataProvider, ChunkStatus, CollectionPhase, CollectorError, CompletionReason,
    ProviderConfig, RequestType,
};
use upbit_core::{align_to_candle_boundary, get_time_by_ticks, Candle, Timeframe};
use upbit_data::{CandleRepository, OverlapAnalyzer, SqliteCandleRepository};
use upbit_exchange::{CandleApiClient, ExchangeError, ExchangeResult};

const MARKET: &str = "KRW-BTC";

fn minute(m: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(m)
}

fn candle(time: DateTime<Utc>, price: i64) -> Candle {
    Candle {
        market: MARKET.to_string(),
        candle_date_time_utc: time,
        candle_date_time_kst: (time + Duration::hours(9)).naive_utc(),
        opening_price: Decimal::from(price),
        high_price: Decimal::from(price + 1),
        low_price: Decimal::from(price - 1),
        trade_price: Decimal::from(price),
        timestamp: time.timestamp_millis(),
        candle_acc_trade_price: Decimal::from(price * 10),
        candle_acc_trade_volume: Decimal::ONE,
        unit: Some(1),
        prev_closing_price: None,
        change_price: None,
        change_rate: None,
        first_day_of_period: None,
    }
}

/// `oldest_available` 이후의 분봉을 업비트 규칙(`to` exclusive, 최신순)대로 돌려주는 API.
struct ScriptedApi {
    oldest_available: DateTime<Utc>,
    missing: Vec<DateTime<Utc>>,
    failing: AtomicBool,
    calls: Mutex<Vec<(usize, Option<DateTime<Utc>>)>>,
}

impl ScriptedApi {
    fn new(oldest_available: DateTime<Utc>) -> Self {
        Self {
            oldest_available,
            missing: Vec::new(),
            failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_missing(mut self, missing: Vec<DateTime<Utc>>) -> Self {
        self.missing = missing;
        self
    }

    fn calls(&self) -> Vec<(usize, Option<DateTime<Utc>>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandleApiClient for ScriptedApi {
    async fn fetch_candles(
        &self,
        _market: &str,
        timeframe: Timeframe,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.calls.lock().unwrap().push((count, to));
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExchangeError::NetworkError("connection reset".to_string()));
        }

        let mut time = match to {
            Some(t) => {
                let aligned = align_to_candle_boundary(t, timeframe);
                if aligned == t {
                    get_time_by_ticks(t, timeframe, -1)
                } else {
                    aligned
                }
            }
            None => align_to_candle_boundary(Utc::now(), timeframe),
        };

        let mut candles = Vec::new();
        while candles.len() < count && time >= self.oldest_available {
            if !self.missing.contains(&time) {
                candles.push(candle(time, 100));
            }
            time = get_time_by_ticks(time, timeframe, -1);
        }
        Ok(candles)
    }
}

struct Harness {
    provider: CandleDataProvider,
    api: Arc<ScriptedApi>,
    repo: Arc<SqliteCandleRepository>,
}

async fn harness(api: ScriptedApi) -> Harness {
    let repo = Arc::new(SqliteCandleRepository::in_memory().await.unwrap());
    let api = Arc::new(api);
    let overlap = Arc::new(OverlapAnalyzer::new(repo.clone()));
    let provider =
        CandleDataProvider::new(repo.clone(), api.clone(), overlap, ProviderConfig::default())
            .unwrap();
    Harness {
        provider,
        api,
        repo,
    }
}

async fn seed(repo: &SqliteCandleRepository, minutes: &[i64]) {
    let candles: Vec<Candle> = minutes.iter().map(|&m| candle(minute(m), 1)).collect();
    repo.save_candle_chunk(MARKET, Timeframe::M1, &candles)
        .await
        .unwrap();
}

/// 단계별 API로 끝까지 수집하고 처리한 청크 수를 반환합니다.
async fn drive(provider: &mut CandleDataProvider, request_id: &str) -> usize {
    let mut chunks = 0;
    while provider.get_next_chunk(request_id).unwrap().is_some() {
        chunks += 1;
        if provider.mark_chunk_completed(request_id).await.unwrap() {
            break;
        }
    }
    chunks
}

fn times(candles: &[Candle]) -> Vec<DateTime<Utc>> {
    candles.iter().map(|c| c.candle_date_time_utc).collect()
}

fn minutes_desc(newest: i64, oldest: i64) -> Vec<DateTime<Utc>> {
    (oldest..=newest).rev().map(minute).collect()
}

// ============================================================================
// 종료 조건
// ============================================================================

#[tokio::test]
async fn test_205_candles_take_two_chunks() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(205), Some(minute(1000)), None)
        .unwrap();

    assert_eq!(drive(&mut h.provider, &id).await, 2);

    let state = h.provider.collection_state(&id).unwrap();
    assert!(state.is_completed);
    assert_eq!(state.total_collected, 205);
    assert_eq!(state.completion_reason, Some(CompletionReason::TargetCountReached));
    assert!(!state.reached_upstream_end);

    // 두 번째 청크는 첫 청크의 가장 오래된 캔들에서 이어짐
    assert_eq!(state.completed_chunks[0].to, Some(minute(1001)));
    assert_eq!(state.completed_chunks[1].to, Some(minute(801)));
    assert_eq!(state.completed_chunks[1].count, 5);
    assert!(state
        .completed_chunks
        .iter()
        .all(|c| c.status == ChunkStatus::Completed));

    assert_eq!(
        h.api.calls(),
        vec![(200, Some(minute(1001))), (5, Some(minute(801)))]
    );
}

#[tokio::test]
async fn test_get_candles_returns_contiguous_newest_first() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let candles = h
        .provider
        .get_candles(MARKET, Timeframe::M1, Some(205), Some(minute(1000)), None)
        .await
        .unwrap();

    assert_eq!(times(&candles), minutes_desc(1000, 796));
    assert_eq!(h.provider.active_count(), 0);
}

#[tokio::test]
async fn test_short_response_ends_collection_as_exhausted() {
    let mut h = harness(ScriptedApi::new(minute(706))).await;
    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(300), Some(minute(1000)), None)
        .unwrap();

    h.provider.get_next_chunk(&id).unwrap();
    assert!(!h.provider.mark_chunk_completed(&id).await.unwrap());
    h.provider.get_next_chunk(&id).unwrap();
    // 100개 요청에 95개 응답
    assert!(h.provider.mark_chunk_completed(&id).await.unwrap());

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.total_collected, 295);
    assert!(state.total_collected < state.total_requested);
    assert!(state.reached_upstream_end);
    assert_eq!(state.completion_reason, Some(CompletionReason::UpstreamExhausted));
    assert!(state.error_message.is_none());
    assert_eq!(state.last_candle_time, Some(minute(706)));
}

#[tokio::test]
async fn test_end_bound_trims_and_stops_at_end() {
    // 업비트는 거래가 없던 분의 캔들을 건너뜀
    let api = ScriptedApi::new(minute(0)).with_missing(vec![minute(250)]);
    let mut h = harness(api).await;
    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, None, Some(minute(500)), Some(minute(101)))
        .unwrap();

    assert_eq!(drive(&mut h.provider, &id).await, 2);

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.total_requested, 400);
    assert_eq!(state.total_collected, 399);
    assert_eq!(state.completion_reason, Some(CompletionReason::TargetEndReached));
    assert_eq!(state.last_candle_time, Some(minute(101)));

    // 종료 시각 이전 캔들은 저장되지 않음
    let older = h
        .repo
        .get_candles_by_range(MARKET, Timeframe::M1, minute(0), minute(100))
        .await
        .unwrap();
    assert!(older.is_empty());
}

#[tokio::test]
async fn test_missing_end_candle_still_ends_at_target_end() {
    let api = ScriptedApi::new(minute(0)).with_missing(vec![minute(101)]);
    let mut h = harness(api).await;
    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, None, Some(minute(500)), Some(minute(101)))
        .unwrap();

    assert_eq!(drive(&mut h.provider, &id).await, 2);
    assert_eq!(
        h.api.calls(),
        vec![(200, Some(minute(501))), (200, Some(minute(301)))]
    );

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.total_collected, 399);
    assert_eq!(state.completion_reason, Some(CompletionReason::TargetEndReached));
    assert_eq!(state.last_candle_time, Some(minute(102)));
    assert!(!state.reached_upstream_end);
}

// ============================================================================
// 겹침 분기
// ============================================================================

/// 대상 구간 0:19 ~ 0:10 (10개)을 수집합니다.
async fn collect_ten(seeded: &[i64]) -> (Harness, Vec<Candle>, String) {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    seed(&h.repo, seeded).await;

    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(10), Some(minute(19)), None)
        .unwrap();
    assert_eq!(drive(&mut h.provider, &id).await, 1);

    let candles = h
        .repo
        .get_candles_by_range(MARKET, Timeframe::M1, minute(10), minute(19))
        .await
        .unwrap();
    (h, candles, id)
}

#[tokio::test]
async fn test_no_overlap_fetches_full_chunk() {
    let (h, candles, id) = collect_ten(&[]).await;
    assert_eq!(h.api.calls(), vec![(10, Some(minute(20)))]);
    assert_eq!(times(&candles), minutes_desc(19, 10));

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.stats.saved_candles, 10);
    assert_eq!(state.stats.storage_reads, 0);
}

#[tokio::test]
async fn test_complete_overlap_makes_no_api_calls() {
    let all: Vec<i64> = (10..=19).collect();
    let (h, candles, id) = collect_ten(&all).await;

    assert!(h.api.calls().is_empty());
    assert_eq!(times(&candles), minutes_desc(19, 10));

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.total_collected, 10);
    assert_eq!(state.stats.storage_reads, 1);
    assert_eq!(state.stats.storage_candles, 10);
    assert_eq!(state.stats.saved_candles, 0);
}

#[tokio::test]
async fn test_partial_start_fetches_only_older_part() {
    let (h, candles, id) = collect_ten(&[19, 18, 17, 16]).await;

    assert_eq!(h.api.calls(), vec![(6, Some(minute(16)))]);
    assert_eq!(times(&candles), minutes_desc(19, 10));

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.total_collected, 10);
    assert_eq!(state.stats.merges, 1);
    assert_eq!(state.stats.saved_candles, 6);
    // 저장소에 있던 캔들은 덮어쓰지 않음
    assert_eq!(candles[0].opening_price, Decimal::from(1));
}

#[tokio::test]
async fn test_partial_middle_continuous_fetches_only_newer_part() {
    let (h, candles, id) = collect_ten(&[10, 11, 12]).await;

    assert_eq!(h.api.calls(), vec![(7, Some(minute(20)))]);
    assert_eq!(times(&candles), minutes_desc(19, 10));

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.total_collected, 10);
    assert_eq!(state.stats.merges, 1);
    assert_eq!(state.completion_reason, Some(CompletionReason::TargetCountReached));
}

#[tokio::test]
async fn test_fragmented_overlap_falls_back_to_full_fetch() {
    let (h, candles, id) = collect_ten(&[19, 18, 15]).await;

    assert_eq!(h.api.calls(), vec![(10, Some(minute(20)))]);
    assert_eq!(times(&candles), minutes_desc(19, 10));

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.stats.fallbacks, 1);
    assert_eq!(state.total_collected, 10);
}

// ============================================================================
// 요청 형태
// ============================================================================

#[tokio::test]
async fn test_count_only_first_chunk_has_no_anchor() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let candles = h
        .provider
        .get_candles(MARKET, Timeframe::M1, Some(5), None, None)
        .await
        .unwrap();

    assert_eq!(candles.len(), 5);
    assert_eq!(h.api.calls(), vec![(5, None)]);
}

#[tokio::test]
async fn test_count_only_later_chunks_consult_storage() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    // 두 번째 청크 구간은 첫 조회 중 분이 바뀌어도 저장 구간 안에 있음
    let now = align_to_candle_boundary(Utc::now(), Timeframe::M1);
    let stored: Vec<Candle> = (195..=215)
        .map(|m| candle(now - Duration::minutes(m), 1))
        .collect();
    h.repo
        .save_candle_chunk(MARKET, Timeframe::M1, &stored)
        .await
        .unwrap();

    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(205), None, None)
        .unwrap();
    assert_eq!(drive(&mut h.provider, &id).await, 2);

    assert_eq!(h.api.calls(), vec![(200, None)]);

    let state = h.provider.collection_state(&id).unwrap();
    assert_eq!(state.completion_reason, Some(CompletionReason::TargetCountReached));
    assert_eq!(state.total_collected, 205);
    assert_eq!(state.stats.api_calls, 1);
    assert_eq!(state.stats.storage_reads, 1);
    assert_eq!(state.stats.storage_candles, 5);
}

#[tokio::test]
async fn test_end_only_plan_and_collection() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let end = Utc::now() - Duration::hours(6);

    let plan = h
        .provider
        .plan_collection(MARKET, Timeframe::M1, None, None, Some(end))
        .unwrap();
    assert_eq!(plan.request_type, RequestType::EndOnly);
    assert!(plan.first_chunk_params.to.is_none());
    // 361개 (경계를 넘는 순간이면 362개)
    assert!((361..=362).contains(&plan.total_count));
    assert_eq!(plan.estimated_chunks, 2);

    let candles = h
        .provider
        .get_candles(MARKET, Timeframe::M1, None, None, Some(end))
        .await
        .unwrap();

    let aligned_end = align_to_candle_boundary(end, Timeframe::M1);
    assert_eq!(h.api.calls()[0].1, None);
    // 요청 생성과 첫 조회 사이에 분이 바뀌면 개수 조건이 한 캔들 먼저 충족됨
    let oldest = candles.last().map(|c| c.candle_date_time_utc).unwrap();
    assert!(oldest == aligned_end || oldest == aligned_end + Duration::minutes(1));
    assert!(candles.iter().all(|c| c.candle_date_time_utc >= aligned_end));
    assert!(candles
        .windows(2)
        .all(|w| w[0].candle_date_time_utc > w[1].candle_date_time_utc));
}

#[tokio::test]
async fn test_count_with_to_plan() {
    let h = harness(ScriptedApi::new(minute(0))).await;
    let plan = h
        .provider
        .plan_collection(MARKET, Timeframe::M1, Some(450), Some(minute(1000)), None)
        .unwrap();

    assert_eq!(plan.total_count, 450);
    assert_eq!(plan.estimated_chunks, 3);
    assert!((plan.estimated_duration_seconds - 0.3).abs() < 1e-9);
    assert_eq!(plan.first_chunk_params.count, 200);
    assert_eq!(plan.first_chunk_params.to, Some(minute(1001)));
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let future = Utc::now() + Duration::hours(1);

    let err = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(100), None, Some(minute(10)))
        .unwrap_err();
    assert!(matches!(err, CollectorError::Request(_)));

    let err = h
        .provider
        .plan_collection(MARKET, Timeframe::M1, None, Some(minute(10)), Some(minute(10)))
        .unwrap_err();
    assert!(matches!(err, CollectorError::Request(_)));

    let err = h
        .provider
        .plan_collection(MARKET, Timeframe::M1, Some(0), None, None)
        .unwrap_err();
    assert!(err.is_validation());

    let err = h
        .provider
        .plan_collection(MARKET, Timeframe::M1, Some(10), Some(future), None)
        .unwrap_err();
    assert!(matches!(err, CollectorError::Range(_)));

    let err = h
        .provider
        .plan_collection(MARKET, Timeframe::M1, None, None, Some(future))
        .unwrap_err();
    assert!(matches!(err, CollectorError::Range(_)));

    assert_eq!(h.provider.active_count(), 0);
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn test_provider_rejects_invalid_config() {
    let repo = Arc::new(SqliteCandleRepository::in_memory().await.unwrap());
    let overlap = Arc::new(OverlapAnalyzer::new(repo.clone()));
    let api = Arc::new(ScriptedApi::new(minute(0)));
    let config = ProviderConfig {
        chunk_size: 0,
        requests_per_second: 10.0,
    };

    let result = CandleDataProvider::new(repo, api, overlap, config);
    assert!(matches!(result, Err(CollectorError::Config(_))));
}

// ============================================================================
// 상태 조회
// ============================================================================

#[tokio::test]
async fn test_status_before_and_after_completion() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(205), Some(minute(1000)), None)
        .unwrap();
    assert!(id.starts_with("KRW-BTC_1m_"));

    let status = h.provider.get_collection_status(&id).unwrap();
    assert_eq!(status.phase, CollectionPhase::Collecting);
    assert_eq!(status.total_requested, 205);
    assert_eq!(status.total_collected, 0);
    assert_eq!(status.completed_chunks, 0);
    assert_eq!(status.current_chunk_id.as_deref(), Some("KRW-BTC_1m_chunk_000"));
    assert_eq!(status.estimated_remaining_seconds, 0.0);

    let remaining = h.provider.get_realtime_remaining_time(&id).unwrap();
    assert_eq!(remaining.remaining_chunks, 2);
    assert_eq!(remaining.progress_percentage, 0.0);
    assert!(!remaining.is_completed);

    drive(&mut h.provider, &id).await;

    let first = h.provider.get_collection_status(&id).unwrap();
    let second = h.provider.get_collection_status(&id).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.phase, CollectionPhase::Completed);
    assert_eq!(first.progress_percentage, 100.0);
    assert_eq!(first.completed_chunks, 2);
    assert!(first.current_chunk_id.is_none());

    let remaining = h.provider.get_realtime_remaining_time(&id).unwrap();
    assert!(remaining.is_completed);
    assert_eq!(remaining.remaining_chunks, 0);
    assert_eq!(remaining.remaining_seconds, 0.0);

    // 완료 후 추가 호출은 상태를 바꾸지 않음
    assert!(h.provider.get_next_chunk(&id).unwrap().is_none());
    assert!(h.provider.mark_chunk_completed(&id).await.unwrap());
    assert!(h.provider.resume_collection(&id).unwrap().is_none());
    assert_eq!(h.provider.get_collection_status(&id).unwrap(), first);
}

#[tokio::test]
async fn test_unknown_request_id() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;

    assert!(matches!(
        h.provider.get_collection_status("nope"),
        Err(CollectorError::UnknownRequest(_))
    ));
    assert!(matches!(
        h.provider.get_realtime_remaining_time("nope"),
        Err(CollectorError::UnknownRequest(_))
    ));
    assert!(matches!(
        h.provider.get_next_chunk("nope"),
        Err(CollectorError::UnknownRequest(_))
    ));
    assert!(matches!(
        h.provider.mark_chunk_completed("nope").await,
        Err(CollectorError::UnknownRequest(_))
    ));
    assert!(matches!(
        h.provider.resume_collection("nope"),
        Err(CollectorError::UnknownRequest(_))
    ));
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let a = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(1), Some(minute(10)), None)
        .unwrap();
    let b = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(1), Some(minute(10)), None)
        .unwrap();
    assert_ne!(a, b);
    assert_eq!(h.provider.active_count(), 2);
}

// ============================================================================
// 실패와 재개
// ============================================================================

#[tokio::test]
async fn test_failure_marks_chunk_failed_and_resume_recovers() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    h.api.failing.store(true, Ordering::SeqCst);

    let id = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(10), Some(minute(19)), None)
        .unwrap();
    h.provider.get_next_chunk(&id).unwrap();

    let err = h.provider.mark_chunk_completed(&id).await.unwrap_err();
    assert!(matches!(err, CollectorError::Exchange(ExchangeError::NetworkError(_))));

    let state = h.provider.collection_state(&id).unwrap();
    assert!(!state.is_completed);
    assert_eq!(
        state.current_chunk.as_ref().map(|c| c.status),
        Some(ChunkStatus::Failed)
    );
    assert!(state
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("connection reset")));
    assert_eq!(
        h.provider.get_collection_status(&id).unwrap().phase,
        CollectionPhase::Failed
    );

    let chunk = h.provider.resume_collection(&id).unwrap().unwrap();
    assert_eq!(chunk.status, ChunkStatus::Pending);
    assert_eq!(chunk.chunk_index, 0);
    assert!(h.provider.collection_state(&id).unwrap().error_message.is_none());

    h.api.failing.store(false, Ordering::SeqCst);
    drive(&mut h.provider, &id).await;

    let state = h.provider.collection_state(&id).unwrap();
    assert!(state.is_completed);
    assert_eq!(state.total_collected, 10);
}

#[tokio::test]
async fn test_get_candles_propagates_failure_and_forgets_request() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    h.api.failing.store(true, Ordering::SeqCst);

    let err = h
        .provider
        .get_candles(MARKET, Timeframe::M1, Some(10), Some(minute(19)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CollectorError::Exchange(_)));
    assert_eq!(h.provider.active_count(), 0);
}

#[tokio::test]
async fn test_cleanup_completed_collections() {
    let mut h = harness(ScriptedApi::new(minute(0))).await;
    let done = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(3), Some(minute(10)), None)
        .unwrap();
    drive(&mut h.provider, &done).await;
    let running = h
        .provider
        .start_collection(MARKET, Timeframe::M1, Some(3), Some(minute(20)), None)
        .unwrap();

    assert_eq!(h.provider.cleanup_completed_collections(Duration::hours(1)), 0);
    assert_eq!(h.provider.cleanup_completed_collections(Duration::zero()), 1);
    assert!(h.provider.get_collection_status(&done).is_err());
    assert!(h.provider.get_collection_status(&running).is_ok());
}
