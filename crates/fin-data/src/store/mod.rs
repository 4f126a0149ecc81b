//! 일봉 저장소.
//!
//! (ticker, date) 유일키 업서트 의미론을 제공합니다. 같은 키에 대한
//! 재수집은 행을 제자리에서 교체하며, 수집 워크플로우는 행을
//! 삭제하지 않습니다 (보존 정책은 외부 소관).

pub mod memory;
pub mod mongo;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use fin_core::{BarSource, DailyBar, UpsertOutcome};

/// 일봉 저장소 trait.
///
/// 구현체는 서로 다른 키에 대한 동시 업서트를 허용해야 하고, 같은
/// 키에 대한 동시 업서트는 마지막 쓰기가 이기면 됩니다 (수집은
/// 멱등이므로 최신 조회가 권위).
#[async_trait]
pub trait BarStore: Send + Sync {
    /// 키 조회 후 삽입 또는 전체 필드 교체.
    async fn upsert(&self, bar: &DailyBar) -> Result<UpsertOutcome>;

    /// 해당 심볼/소스의 가장 최근 저장 날짜.
    async fn latest_date(&self, symbol: &str, source: BarSource) -> Result<Option<NaiveDate>>;

    /// 해당 소스 전체에서 가장 최근 저장 날짜.
    ///
    /// 일괄 집계 패스는 심볼별 커서가 없어 (요청 하나가 전 종목을
    /// 덮으므로) 저장소 전체의 최근 날짜를 재개 지점으로 씁니다.
    async fn global_latest_date(&self, source: BarSource) -> Result<Option<NaiveDate>>;
}
