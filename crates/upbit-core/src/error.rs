//! 캔들 수집 시스템의 공통 에러 타입.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// 요청 파라미터 조합 오류
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String),

    /// 지원하지 않는 타임프레임
    #[error("지원하지 않는 타임프레임: {0}")]
    UnsupportedTimeframe(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// 입력 검증 단계에서 발생한 에러인지 확인합니다.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidRequest(_) | CoreError::UnsupportedTimeframe(_)
        )
    }
}
