//! 캔들 저장 및 겹침 분석.
//!
//! 이 crate는 다음을 제공합니다:
//! - `CandleRepository` trait과 SQLite 구현 (upsert 저장, 구간/최신 조회)
//! - 수집 대상 구간과 저장된 데이터의 겹침 분석 (`OverlapAnalyzer`)

pub mod error;
pub mod overlap;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DataError, Result};
pub use overlap::{
    OverlapAnalysis, OverlapAnalyzer, OverlapRequest, OverlapResult, OverlapStatus, TimeRange,
};
pub use storage::{CandleRecord, CandleRepository, SqliteCandleRepository};
