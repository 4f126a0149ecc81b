//! 벤치마크 수집 모듈.
//!
//! 벤치마크 심볼마다 저장소의 마지막 날짜에서 이어지는 윈도우를
//! 계산해 시계열 요청 한 번을 보냅니다. 심볼 간에는 공유 상태가
//! 없어 제한된 개수의 워커로 동시에 진행합니다.

use crate::modules::ingest_records;
use crate::outcome::IngestionOutcome;
use crate::CollectorConfig;
use chrono::NaiveDate;
use fin_core::{BarSource, DateWindow, SymbolScope};
use fin_data::{BarStore, DataError, SourceAdapter};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 벤치마크 수집.
pub async fn collect_benchmarks(
    store: &Arc<dyn BarStore>,
    adapter: &Arc<dyn SourceAdapter>,
    config: &CollectorConfig,
    cancel: &CancellationToken,
    today: NaiveDate,
    outcome: &mut IngestionOutcome,
) -> fin_data::Result<()> {
    if config.benchmark_symbols.is_empty() {
        return Ok(());
    }

    tracing::info!(tickers = config.benchmark_symbols.len(), "벤치마크 수집 시작");

    let tasks = config.benchmark_symbols.iter().cloned().map(|symbol| {
        let store = Arc::clone(store);
        let adapter = Arc::clone(adapter);
        let cancel = cancel.clone();
        let floor_date = config.floor_date;
        let dry_run = config.dry_run;
        let delay = config.request_delay();
        async move {
            collect_one(store, adapter, symbol, floor_date, today, dry_run, delay, cancel).await
        }
    });

    let mut stream =
        futures::stream::iter(tasks).buffer_unordered(config.benchmark_concurrency.max(1));

    let mut fatal: Option<DataError> = None;
    while let Some(result) = stream.next().await {
        match result {
            Ok(one) => outcome.merge(one),
            Err(e) => {
                // 치명 오류: 남은 심볼의 신규 요청을 막고 첫 오류를 보존
                cancel.cancel();
                if fatal.is_none() {
                    fatal = Some(e);
                }
            }
        }
    }

    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// 심볼 하나의 수집.
///
/// 어댑터 오류는 실패 항목으로 집계하고 정상 반환하며, 저장소
/// 오류만 에러로 전파합니다.
#[allow(clippy::too_many_arguments)]
async fn collect_one(
    store: Arc<dyn BarStore>,
    adapter: Arc<dyn SourceAdapter>,
    symbol: String,
    floor_date: NaiveDate,
    today: NaiveDate,
    dry_run: bool,
    delay: std::time::Duration,
    cancel: CancellationToken,
) -> fin_data::Result<IngestionOutcome> {
    let mut outcome = IngestionOutcome::new();

    if cancel.is_cancelled() {
        tracing::debug!(symbol = %symbol, "취소 요청으로 수집 생략");
        return Ok(outcome);
    }

    let latest = store.latest_date(&symbol, BarSource::Benchmark).await?;
    let Some(window) = DateWindow::resume(latest, floor_date, today) else {
        tracing::debug!(symbol = %symbol, latest = ?latest, "이미 최신, 건너뜀");
        outcome.skipped += 1;
        return Ok(outcome);
    };

    if dry_run {
        tracing::info!(symbol = %symbol, start = %window.start, end = %window.end, "[dry-run] 시계열 요청 예정");
        return Ok(outcome);
    }

    match adapter.fetch(&SymbolScope::Ticker(symbol.clone()), &window).await {
        Ok(records) if records.is_empty() => {
            tracing::debug!(symbol = %symbol, "새 데이터 없음");
        }
        Ok(records) => {
            ingest_records(store.as_ref(), &symbol, records, &mut outcome).await?;
            tracing::info!(symbol = %symbol, upserted = outcome.upserted(), "벤치마크 저장 완료");
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::warn!(symbol = %symbol, error = %e, "벤치마크 수집 실패, 건너뜀");
            outcome.record_failure(symbol, None, &e);
        }
    }

    tokio::time::sleep(delay).await;
    Ok(outcome)
}
