//! # Upbit Core
//!
//! 업비트 캔들 수집기의 핵심 도메인 타입을 제공합니다.
//!
//! - 캔들(`Candle`) 및 타임프레임(`Timeframe`) 정의
//! - 캔들 경계 시간 계산 (`time_utils`)
//! - 공통 에러 타입
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod time_utils;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use time_utils::*;
pub use types::*;
