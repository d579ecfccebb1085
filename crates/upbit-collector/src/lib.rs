//! 업비트 캔들 수집기.
//!
//! 이 crate는 다음을 제공합니다:
//! - 요청 검증 및 분류 (`RequestInfo`)
//! - 청크 분할, 겹침 분석 기반 수집, 진행률/ETA 추적 (`CandleDataProvider`)
//! - 환경변수 설정과 수집 CLI

pub mod config;
pub mod error;
pub mod models;
pub mod modules;
pub mod provider;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use models::*;
pub use provider::{CandleDataProvider, ProviderConfig};
pub use stats::CollectionStats;
