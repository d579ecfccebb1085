//! 캔들 수집을 위한 도메인 모델.

mod candle;

pub use candle::*;
