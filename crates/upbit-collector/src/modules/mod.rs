//! 수집 실행 모듈.

pub mod candle_collect;

pub use candle_collect::{collect_with_progress, latest_candles, CandleTarget};
