//! 수집 결과 보고 구조체.
//!
//! 한 번의 실행이 가져오고, 정규화하고, 저장하고, 건너뛴 수와 실패
//! 항목을 집계합니다. 조용한 유실은 허용되지 않습니다: 모든 건너뜀과
//! 실패는 결과에 나타나야 합니다.

use chrono::NaiveDate;
use fin_data::DataError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 실패 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 필수 필드가 없는 원시 레코드 (해당 레코드만 제외)
    Malformed,
    /// 재시도가 소진되지 않은 한도 초과
    RateLimited,
    /// 제공자 오류 (해당 요청만 건너뜀)
    Upstream,
    /// 저장소 단절 (실행 중단)
    Store,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::RateLimited => "rate_limited",
            Self::Upstream => "upstream",
            Self::Store => "store",
        }
    }
}

impl From<&DataError> for FailureKind {
    fn from(err: &DataError) -> Self {
        match err {
            DataError::MalformedRecord { .. } => Self::Malformed,
            DataError::RateLimited { .. } => Self::RateLimited,
            DataError::UpstreamError { .. } => Self::Upstream,
            DataError::StoreUnavailable(_) => Self::Store,
        }
    }
}

/// 실패 항목 하나.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFailure {
    /// 심볼 (전체 종목 요청 실패는 "*")
    pub symbol: String,
    /// 실패한 날짜 (요청 단위가 날짜일 때)
    pub date: Option<NaiveDate>,
    /// 분류
    pub kind: FailureKind,
    /// 원인
    pub reason: String,
}

/// 수집 실행 결과.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionOutcome {
    /// 가져온 원시 레코드 수
    pub fetched: usize,
    /// 정규화에 성공한 레코드 수
    pub normalized: usize,
    /// 신규 삽입된 행 수
    pub inserted: usize,
    /// 교체된 행 수
    pub updated: usize,
    /// 이미 최신이라 건너뛴 심볼/패스 수
    pub skipped: usize,
    /// 실패 항목
    pub failures: Vec<SymbolFailure>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl IngestionOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 총 행 수 (삽입 + 교체).
    pub fn upserted(&self) -> usize {
        self.inserted + self.updated
    }

    /// 실패 항목이 없는지 확인.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 실패 항목을 기록합니다.
    pub fn record_failure(
        &mut self,
        symbol: impl Into<String>,
        date: Option<NaiveDate>,
        err: &DataError,
    ) {
        self.failures.push(SymbolFailure {
            symbol: symbol.into(),
            date,
            kind: FailureKind::from(err),
            reason: err.to_string(),
        });
    }

    /// 다른 패스의 결과를 합칩니다.
    pub fn merge(&mut self, other: IngestionOutcome) {
        self.fetched += other.fetched;
        self.normalized += other.normalized;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    /// 결과 요약과 실패 목록을 로그로 남깁니다.
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            fetched = self.fetched,
            normalized = self.normalized,
            inserted = self.inserted,
            updated = self.updated,
            skipped = self.skipped,
            failures = self.failures.len(),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );

        for failure in &self.failures {
            tracing::warn!(
                symbol = %failure.symbol,
                date = ?failure.date,
                kind = failure.kind.as_str(),
                reason = %failure.reason,
                "수집 실패 항목"
            );
        }
    }
}

/// 실행 전체의 결과.
///
/// 저장소 단절로 중단된 실행도 중단 전까지의 집계를 보존합니다.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: IngestionOutcome,
    /// 실행을 중단시킨 치명 오류
    pub aborted: Option<DataError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates() {
        let mut a = IngestionOutcome { fetched: 10, normalized: 9, inserted: 7, updated: 2, ..Default::default() };
        let mut b = IngestionOutcome { fetched: 5, skipped: 1, ..Default::default() };
        b.record_failure(
            "AAPL",
            None,
            &DataError::MalformedRecord { symbol: "AAPL".to_string(), reason: "종가 없음".to_string() },
        );

        a.merge(b);
        assert_eq!(a.fetched, 15);
        assert_eq!(a.upserted(), 9);
        assert_eq!(a.skipped, 1);
        assert_eq!(a.failures.len(), 1);
        assert!(!a.is_clean());
    }

    #[test]
    fn test_failure_kind_classification() {
        assert_eq!(
            FailureKind::from(&DataError::RateLimited { provider: "polygon" }),
            FailureKind::RateLimited
        );
        assert_eq!(
            FailureKind::from(&DataError::StoreUnavailable("down".to_string())),
            FailureKind::Store
        );
    }
}
