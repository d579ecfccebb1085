//! 거래소 커넥터 구현.

pub mod upbit;

pub use upbit::{UpbitClient, UpbitConfig};
