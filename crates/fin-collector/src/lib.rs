//! Standalone market data collector for the FIN database.
//!
//! 이 crate는 정적 리포트 사이트와 독립적으로 시세 데이터를 수집하는
//! 바이너리를 제공합니다:
//! - 전종목 일괄 수집 (미국 주식 일봉)
//! - 감시 종목 보충 (종목별 시가/종가, 장전/장후 포함)
//! - 벤치마크 수집 (지수/섹터 일봉)

pub mod config;
pub mod error;
pub mod modules;
pub mod outcome;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use outcome::{FailureKind, IngestionOutcome, RunReport, SymbolFailure};
