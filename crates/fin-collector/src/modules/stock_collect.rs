//! 전종목 일괄 수집 모듈.
//!
//! 저장소 전체의 최근 날짜에서 이어지는 윈도우를 계산해 거래일마다
//! 전종목 집계 요청 한 번을 보냅니다. 하루치 요청이 재시도 끝에
//! 실패하면 그 날짜만 건너뛰고 실패 항목으로 남깁니다.

use crate::modules::ingest_records;
use crate::outcome::IngestionOutcome;
use crate::CollectorConfig;
use chrono::NaiveDate;
use fin_core::{BarSource, DateWindow, SymbolScope};
use fin_data::{BarStore, SourceAdapter};
use tokio_util::sync::CancellationToken;

/// 전종목 일괄 수집.
pub async fn collect_stocks(
    store: &dyn BarStore,
    adapter: &dyn SourceAdapter,
    config: &CollectorConfig,
    cancel: &CancellationToken,
    today: NaiveDate,
    outcome: &mut IngestionOutcome,
) -> fin_data::Result<()> {
    tracing::info!("전종목 일괄 수집 시작");

    let latest = store.global_latest_date(BarSource::Bulk).await?;
    let Some(mut window) = DateWindow::resume(latest, config.floor_date, today) else {
        tracing::info!(latest = ?latest, "전종목 데이터가 이미 최신, 건너뜀");
        outcome.skipped += 1;
        return Ok(());
    };

    // 빈 저장소에서 시작하면 과도한 과거 구간을 제한
    if latest.is_none() {
        let trimmed = window.truncate_to_recent(config.max_initial_days);
        if trimmed != window {
            tracing::info!(
                from = %window.start,
                to = %trimmed.start,
                max_days = config.max_initial_days,
                "최초 수집 구간 제한"
            );
            window = trimmed;
        }
    }

    tracing::info!(start = %window.start, end = %window.end, "수집 윈도우 결정");

    for day in window.trading_days() {
        if cancel.is_cancelled() {
            tracing::info!(date = %day, "취소 요청으로 신규 일괄 요청 중단");
            break;
        }
        if config.dry_run {
            tracing::info!(date = %day, "[dry-run] 전종목 집계 요청 예정");
            continue;
        }

        match adapter.fetch(&SymbolScope::AllEquities, &DateWindow::single(day)).await {
            Ok(records) if records.is_empty() => {
                tracing::debug!(date = %day, "결과 없음 (휴장일 추정)");
            }
            Ok(records) => {
                let before = outcome.upserted();
                ingest_records(store, "*", records, outcome).await?;
                tracing::info!(date = %day, upserted = outcome.upserted() - before, "하루치 저장 완료");
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(date = %day, error = %e, "하루치 요청 실패, 건너뜀");
                outcome.record_failure("*", Some(day), &e);
            }
        }

        tokio::time::sleep(config.request_delay()).await;
    }

    Ok(())
}
