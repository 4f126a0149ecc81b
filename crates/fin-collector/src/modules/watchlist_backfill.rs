//! 감시 종목 보충 모듈.
//!
//! 일괄 수집 뒤, 설정된 감시 종목이 저장소 전체의 최근 날짜까지
//! 채워져 있는지 확인하고 빈 거래일을 종목별 시가/종가 API로
//! 보충합니다. 이 경로만 장전/장후 가격을 내려줍니다.

use crate::modules::ingest_records;
use crate::outcome::IngestionOutcome;
use crate::CollectorConfig;
use fin_core::{BarSource, DateWindow, SymbolScope};
use fin_data::{BarStore, SourceAdapter};
use tokio_util::sync::CancellationToken;

/// 감시 종목 보충.
pub async fn backfill_watchlist(
    store: &dyn BarStore,
    adapter: &dyn SourceAdapter,
    config: &CollectorConfig,
    cancel: &CancellationToken,
    outcome: &mut IngestionOutcome,
) -> fin_data::Result<()> {
    if config.watchlist_symbols.is_empty() {
        return Ok(());
    }

    // 보충 목표는 전역 최근 날짜: 일괄 수집이 아직 없으면 할 일 없음
    let Some(global_last) = store.global_latest_date(BarSource::Bulk).await? else {
        tracing::info!("전역 데이터가 아직 없어 감시 종목 보충 건너뜀");
        return Ok(());
    };

    tracing::info!(
        tickers = config.watchlist_symbols.len(),
        global_last = %global_last,
        "감시 종목 보충 시작"
    );

    for ticker in &config.watchlist_symbols {
        if cancel.is_cancelled() {
            tracing::info!(ticker = %ticker, "취소 요청으로 보충 중단");
            break;
        }

        let latest = store.latest_date(ticker, BarSource::Bulk).await?;
        let Some(window) = DateWindow::resume(latest, config.floor_date, global_last) else {
            outcome.skipped += 1;
            continue;
        };

        if config.dry_run {
            tracing::info!(ticker = %ticker, start = %window.start, end = %window.end, "[dry-run] 보충 예정");
            continue;
        }

        let mut filled = 0usize;
        // 하루 단위로 요청해 실패를 날짜 단위로 격리
        for day in window.trading_days() {
            if cancel.is_cancelled() {
                break;
            }

            match adapter.fetch(&SymbolScope::Ticker(ticker.clone()), &DateWindow::single(day)).await {
                Ok(records) if records.is_empty() => {
                    tracing::debug!(ticker = %ticker, date = %day, "데이터 없음");
                }
                Ok(records) => {
                    let before = outcome.upserted();
                    ingest_records(store, ticker, records, outcome).await?;
                    filled += outcome.upserted() - before;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(ticker = %ticker, date = %day, error = %e, "보충 실패, 건너뜀");
                    outcome.record_failure(ticker.clone(), Some(day), &e);
                }
            }

            tokio::time::sleep(config.request_delay()).await;
        }

        if filled > 0 {
            tracing::info!(ticker = %ticker, days = filled, "보충 완료");
        }
    }

    Ok(())
}
