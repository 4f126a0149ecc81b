//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
///
/// 복구 정책은 변형마다 다릅니다:
/// - `MalformedRecord`: 해당 레코드만 건너뛰고 계속 진행
/// - `RateLimited`: 백오프 후 제한 횟수까지 재시도, 소진되면
///   `UpstreamError`로 강등
/// - `UpstreamError`: 이번 실행에서 해당 심볼/요청만 건너뜀
/// - `StoreUnavailable`: 실행 전체 중단 (이미 쓰인 행은 유지)
#[derive(Debug, Error)]
pub enum DataError {
    /// 필수 필드가 없거나 해석할 수 없는 원시 레코드
    #[error("Malformed record for {symbol}: {reason}")]
    MalformedRecord { symbol: String, reason: String },

    /// 제공자 요청 한도 초과 (HTTP 429)
    #[error("Rate limited by {provider}")]
    RateLimited { provider: &'static str },

    /// 재시도 대상이 아닌 제공자 오류
    #[error("Upstream error from {provider}: {reason}")]
    UpstreamError { provider: &'static str, reason: String },

    /// 저장소 연결 불가
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl DataError {
    /// 백오프 후 재시도할 수 있는 오류인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::RateLimited { .. })
    }

    /// 실행 전체를 중단해야 하는 오류인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DataError::StoreUnavailable(_))
    }
}

impl From<mongodb::error::Error> for DataError {
    fn from(err: mongodb::error::Error) -> Self {
        DataError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
