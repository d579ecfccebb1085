//! 거래소 에러 타입.

use thiserror::Error;

/// 업비트 REST 호출 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 요청 한도 초과 (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 업비트 API 에러 응답
    #[error("API error {status} {name}: {message}")]
    ApiError {
        status: u16,
        name: String,
        message: String,
    },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 요청 파라미터 오류 (count 범위, 미지원 단위 등)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 알 수 없는 에러
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::NetworkError(_)
            | ExchangeError::RateLimited
            | ExchangeError::Timeout(_) => true,
            ExchangeError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// 권장 재시도 대기 시간(밀리초) 반환.
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            // 업비트 시세 API는 초 단위 한도
            ExchangeError::RateLimited => Some(1000),
            ExchangeError::NetworkError(_) => Some(1000),
            ExchangeError::Timeout(_) => Some(500),
            ExchangeError::ApiError { status, .. } if *status >= 500 => Some(2000),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() {
            ExchangeError::NetworkError(err.to_string())
        } else if err.is_decode() {
            ExchangeError::ParseError(err.to_string())
        } else {
            ExchangeError::Unknown(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::ParseError(err.to_string())
    }
}
