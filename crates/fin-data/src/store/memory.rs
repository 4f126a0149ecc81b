//! 인메모리 일봉 저장소.
//!
//! 오케스트레이터 테스트와 시뮬레이션에서 MongoDB 대신 사용합니다.
//! 실제 저장소와 같은 업서트 의미론을 가지며, 지정한 횟수 이후의
//! 업서트를 연결 단절로 실패시키는 장치를 제공해 실행 중단/재개
//! 시나리오를 재현할 수 있습니다.

use crate::error::{DataError, Result};
use crate::store::BarStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use fin_core::{BarSource, DailyBar, UpsertOutcome};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Rows = HashMap<(String, BarSource), BTreeMap<NaiveDate, DailyBar>>;

/// 인메모리 일봉 저장소.
#[derive(Default)]
pub struct MemoryBarStore {
    rows: Mutex<Rows>,
    upserts: AtomicUsize,
    /// 이 횟수만큼 업서트가 성공한 뒤부터 연결 단절로 실패
    fail_after: Mutex<Option<usize>>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `n`번의 업서트 성공 후 저장소가 단절된 것처럼 동작합니다.
    pub fn fail_after_upserts(self, n: usize) -> Self {
        *self.fail_after.lock().expect("락 오염") = Some(n);
        self
    }

    /// 단절 상태를 해제합니다 (재연결 재현용).
    pub fn heal(&self) {
        *self.fail_after.lock().expect("락 오염") = None;
    }

    /// 저장된 행 조회 (검증용).
    pub fn get(&self, symbol: &str, source: BarSource, date: NaiveDate) -> Option<DailyBar> {
        self.rows
            .lock()
            .expect("락 오염")
            .get(&(symbol.to_string(), source))
            .and_then(|series| series.get(&date))
            .cloned()
    }

    /// 전체 행 수 (검증용).
    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .expect("락 오염")
            .values()
            .map(|series| series.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    async fn upsert(&self, bar: &DailyBar) -> Result<UpsertOutcome> {
        let limit = *self.fail_after.lock().expect("락 오염");
        if let Some(limit) = limit {
            if self.upserts.load(Ordering::SeqCst) >= limit {
                return Err(DataError::StoreUnavailable(
                    "시뮬레이션된 연결 단절".to_string(),
                ));
            }
        }

        let mut rows = self.rows.lock().expect("락 오염");
        let series = rows
            .entry((bar.symbol.clone(), bar.source))
            .or_default();
        let outcome = if series.insert(bar.date, bar.clone()).is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };

        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn latest_date(&self, symbol: &str, source: BarSource) -> Result<Option<NaiveDate>> {
        Ok(self
            .rows
            .lock()
            .expect("락 오염")
            .get(&(symbol.to_string(), source))
            .and_then(|series| series.keys().next_back().copied()))
    }

    async fn global_latest_date(&self, source: BarSource) -> Result<Option<NaiveDate>> {
        Ok(self
            .rows
            .lock()
            .expect("락 오염")
            .iter()
            .filter(|((_, s), _)| *s == source)
            .filter_map(|(_, series)| series.keys().next_back())
            .max()
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(symbol: &str, date: NaiveDate, close: f64) -> DailyBar {
        DailyBar {
            symbol: symbol.to_string(),
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: Some(5.0e7),
            pre_market: None,
            after_hours: None,
            transactions: None,
            vwap: None,
            source: BarSource::Bulk,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_same_key_leaves_one_row_with_latest_values() {
        let store = MemoryBarStore::new();

        let first = store.upsert(&bar("AAPL", d(2), 185.5)).await.unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);

        let second = store.upsert(&bar("AAPL", d(2), 186.0)).await.unwrap();
        assert_eq!(second, UpsertOutcome::Updated);

        assert_eq!(store.len(), 1);
        let row = store.get("AAPL", BarSource::Bulk, d(2)).unwrap();
        assert_eq!(row.close, 186.0);
    }

    #[tokio::test]
    async fn test_latest_date_tracks_max_per_symbol() {
        let store = MemoryBarStore::new();
        for day in [2, 3, 4, 5, 8] {
            store.upsert(&bar("AAPL", d(day), 185.0)).await.unwrap();
        }
        store.upsert(&bar("MSFT", d(3), 375.0)).await.unwrap();

        assert_eq!(
            store.latest_date("AAPL", BarSource::Bulk).await.unwrap(),
            Some(d(8))
        );
        assert_eq!(
            store.latest_date("MSFT", BarSource::Bulk).await.unwrap(),
            Some(d(3))
        );
        assert_eq!(
            store.latest_date("GOOG", BarSource::Bulk).await.unwrap(),
            None
        );
        assert_eq!(
            store.global_latest_date(BarSource::Bulk).await.unwrap(),
            Some(d(8))
        );
        assert_eq!(
            store.global_latest_date(BarSource::Benchmark).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_scripted_connection_loss() {
        let store = MemoryBarStore::new().fail_after_upserts(2);

        store.upsert(&bar("AAPL", d(2), 185.5)).await.unwrap();
        store.upsert(&bar("MSFT", d(2), 375.0)).await.unwrap();

        let err = store.upsert(&bar("GOOG", d(2), 140.0)).await.unwrap_err();
        assert!(err.is_fatal());

        // 이미 쓰인 행은 유지
        assert_eq!(store.len(), 2);
    }
}
