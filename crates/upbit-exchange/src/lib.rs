//! 업비트 시세 데이터 조회.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - `CandleApiClient` trait: 수집 파이프라인이 사용하는 캔들 조회 인터페이스
//! - 업비트 REST 커넥터 (초/분/일/주/월/년봉)
//! - 요청 간격 제한 및 재시도 가능한 에러 처리

pub mod connector;
pub mod error;
pub mod traits;

pub use connector::{UpbitClient, UpbitConfig};
pub use error::*;
pub use traits::*;
