//! # Fin Core
//!
//! FIN 마켓 데이터 파이프라인의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 수집기 전반에서 사용되는 기본 타입을 제공합니다:
//! - 일봉 레코드 및 소스 태그
//! - 수집 범위 (심볼 스코프, 날짜 윈도우)
//! - 로깅 인프라

pub mod logging;
pub mod types;

pub use logging::*;
pub use types::*;
