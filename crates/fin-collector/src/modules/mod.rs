//! 데이터 수집 모듈.

pub mod index_collect;
pub mod stock_collect;
pub mod watchlist_backfill;

pub use index_collect::collect_benchmarks;
pub use stock_collect::collect_stocks;
pub use watchlist_backfill::backfill_watchlist;

use crate::outcome::{IngestionOutcome, RunReport};
use crate::CollectorConfig;
use chrono::NaiveDate;
use fin_core::UpsertOutcome;
use fin_data::{normalize, BarStore, RawRecord, SourceAdapter};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// 원시 레코드 묶음을 정규화해 저장합니다.
///
/// 정규화 실패는 해당 레코드만 실패 항목으로 남기고 계속 진행하며,
/// 저장소 오류만 에러로 전파됩니다 (실행 중단). 한 심볼의 시계열이
/// 날짜 역순으로 와도 저장은 오름차순으로 이루어져, 도중에 중단돼도
/// 저장소가 심볼별 "어느 날짜까지"의 일관 상태를 유지합니다.
pub async fn ingest_records(
    store: &dyn BarStore,
    fallback_symbol: &str,
    records: Vec<RawRecord>,
    outcome: &mut IngestionOutcome,
) -> fin_data::Result<()> {
    outcome.fetched += records.len();

    let mut bars = Vec::with_capacity(records.len());
    for raw in &records {
        match normalize(raw, fallback_symbol) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                let symbol = raw.ticker().unwrap_or(fallback_symbol).to_string();
                tracing::warn!(symbol = %symbol, error = %e, "레코드 정규화 실패, 건너뜀");
                outcome.record_failure(symbol, None, &e);
            }
        }
    }
    outcome.normalized += bars.len();

    bars.sort_by(|a, b| a.date.cmp(&b.date));
    for bar in &bars {
        match store.upsert(bar).await? {
            UpsertOutcome::Inserted => outcome.inserted += 1,
            UpsertOutcome::Updated => outcome.updated += 1,
        }
    }

    Ok(())
}

/// 수집 패스 한 번을 끝까지 실행합니다.
///
/// 일괄 집계(이어서 감시 종목 보충)와 벤치마크 수집은 서로 독립이라
/// 동시에 진행합니다. 한쪽에서 저장소가 단절되면 토큰을 취소해
/// 다른 쪽도 신규 요청을 멈추고, 진행 중인 저장은 끝까지 마칩니다.
/// 중단된 실행도 중단 전까지의 집계를 보고합니다.
pub async fn run_once(
    store: Arc<dyn BarStore>,
    bulk: Arc<dyn SourceAdapter>,
    benchmark: Arc<dyn SourceAdapter>,
    config: &CollectorConfig,
    cancel: &CancellationToken,
    today: NaiveDate,
) -> RunReport {
    let start = Instant::now();
    let mut stock_outcome = IngestionOutcome::new();
    let mut bench_outcome = IngestionOutcome::new();

    let stock_pass = {
        let store = Arc::clone(&store);
        let bulk = Arc::clone(&bulk);
        let cancel = cancel.clone();
        let outcome = &mut stock_outcome;
        async move {
            let result = async {
                collect_stocks(store.as_ref(), bulk.as_ref(), config, &cancel, today, outcome)
                    .await?;
                backfill_watchlist(store.as_ref(), bulk.as_ref(), config, &cancel, outcome).await
            }
            .await;
            if result.is_err() {
                cancel.cancel();
            }
            result
        }
    };

    let bench_pass = {
        let store = Arc::clone(&store);
        let benchmark = Arc::clone(&benchmark);
        let cancel = cancel.clone();
        let outcome = &mut bench_outcome;
        async move {
            let result =
                collect_benchmarks(&store, &benchmark, config, &cancel, today, outcome).await;
            if result.is_err() {
                cancel.cancel();
            }
            result
        }
    };

    let (stock_result, bench_result) = tokio::join!(stock_pass, bench_pass);

    let mut outcome = stock_outcome;
    outcome.merge(bench_outcome);
    outcome.elapsed = start.elapsed();

    RunReport {
        outcome,
        aborted: stock_result.err().or(bench_result.err()),
    }
}
