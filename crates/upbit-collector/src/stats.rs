//! 수집 통계 구조체.

use serde::Serialize;

/// 수집 1건의 데이터 출처별 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// API 호출 횟수
    pub api_calls: usize,
    /// API에서 받은 캔들 수
    pub api_candles: usize,
    /// 저장소 조회 횟수
    pub storage_reads: usize,
    /// 저장소에서 읽은 캔들 수
    pub storage_candles: usize,
    /// 저장소 + API 병합 횟수
    pub merges: usize,
    /// 조각난 겹침으로 전체를 API에서 다시 받은 횟수
    pub fallbacks: usize,
    /// 저장된 캔들 수
    pub saved_candles: usize,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장소 적중률 계산 (%)
    pub fn storage_hit_rate(&self) -> f64 {
        let total = self.api_candles + self.storage_candles;
        if total == 0 {
            0.0
        } else {
            (self.storage_candles as f64 / total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, request_id: &str, elapsed_secs: f64) {
        tracing::info!(
            request_id = request_id,
            api_calls = self.api_calls,
            api_candles = self.api_candles,
            storage_reads = self.storage_reads,
            storage_candles = self.storage_candles,
            merges = self.merges,
            fallbacks = self.fallbacks,
            saved = self.saved_candles,
            storage_hit_rate = format!("{:.1}%", self.storage_hit_rate()),
            elapsed = format!("{:.1}s", elapsed_secs),
            "수집 완료"
        );
    }
}
