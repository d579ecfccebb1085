//! 에러 타입 정의.

use std::fmt;

use upbit_core::CoreError;
use upbit_data::DataError;
use upbit_exchange::ExchangeError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 요청 검증 에러 (파라미터 조합, 타임프레임 등)
    Request(CoreError),
    /// 미래 시각을 가리키는 요청
    Range(String),
    /// 등록되지 않은 요청 ID
    UnknownRequest(String),
    /// 수집 상태 불일치
    InvalidState(String),
    /// 업비트 API 에러
    Exchange(ExchangeError),
    /// 저장소 에러
    Data(DataError),
    /// 설정 에러
    Config(String),
}

impl CollectorError {
    /// 호출자 입력이 잘못되어 발생한 에러인지 확인합니다.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Range(_))
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "Invalid request: {}", e),
            Self::Range(msg) => write!(f, "Range error: {}", msg),
            Self::UnknownRequest(id) => write!(f, "Unknown request id: {}", id),
            Self::InvalidState(msg) => write!(f, "Invalid collection state: {}", msg),
            Self::Exchange(e) => write!(f, "Exchange error: {}", e),
            Self::Data(e) => write!(f, "Storage error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            Self::Exchange(e) => Some(e),
            Self::Data(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for CollectorError {
    fn from(err: CoreError) -> Self {
        Self::Request(err)
    }
}

impl From<ExchangeError> for CollectorError {
    fn from(err: ExchangeError) -> Self {
        Self::Exchange(err)
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
