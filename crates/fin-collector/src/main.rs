//! Market data collector CLI.

use clap::Parser;
use fin_collector::{modules, CollectorConfig, CollectorError};
use fin_core::logging::{init_logging, LogConfig};
use fin_data::{
    BarStore, BenchmarkAdapter, BulkAdapter, MongoBarStore, PolygonClient, SourceAdapter,
    YahooChartClient,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "fin-collector")]
#[command(about = "FIN Market Data Collector", long_about = None)]
#[command(version)]
struct Cli {
    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 제공자 호출과 저장 없이 수집 범위만 출력
    #[arg(long)]
    dry_run: bool,

    /// 실패한 항목이 있으면 비정상 종료 코드 반환
    #[arg(long)]
    fail_hard: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(&LogConfig::new(format!(
        "fin_collector={0},fin_data={0}",
        cli.log_level
    )))?;

    tracing::info!("FIN Data Collector 시작");

    // 설정 로드
    let mut config = CollectorConfig::from_env()?;
    if cli.dry_run {
        config.dry_run = true;
    }
    if cli.fail_hard {
        config.fail_hard = true;
    }
    tracing::debug!(mongo_uri = %config.mongo_uri, db = %config.db_name, "설정 로드 완료");

    // 저장소 연결 (인덱스 보장이 연결 확인을 겸함)
    let store = MongoBarStore::connect(&config.mongo_uri, &config.db_name).await?;
    store.ensure_indexes().await?;
    tracing::info!("저장소 연결 성공");

    let store: Arc<dyn BarStore> = Arc::new(store);
    let bulk: Arc<dyn SourceAdapter> = Arc::new(BulkAdapter::new(
        PolygonClient::new(config.api_key.clone()),
        config.retry_policy(),
    ));
    let benchmark: Arc<dyn SourceAdapter> = Arc::new(BenchmarkAdapter::new(
        YahooChartClient::new()?,
        config.retry_policy(),
    ));

    let cancel = CancellationToken::new();

    // 실행 시간 한도: 도달하면 신규 요청만 멈추고 진행 중인 저장은 완료
    if let Some(timeout) = config.run_timeout() {
        let c = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(timeout_secs = timeout.as_secs(), "실행 시간 한도 도달, 신규 요청 중단");
            c.cancel();
        });
    }

    let today = chrono::Utc::now().date_naive();
    let run = modules::run_once(
        Arc::clone(&store),
        Arc::clone(&bulk),
        Arc::clone(&benchmark),
        &config,
        &cancel,
        today,
    );
    tokio::pin!(run);

    let report = tokio::select! {
        report = &mut run => report,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("종료 신호 수신, 진행 중인 저장을 마치고 중단");
            cancel.cancel();
            run.await
        }
    };

    report.outcome.log_summary("마켓 데이터 수집");

    if let Some(e) = report.aborted {
        tracing::error!(error = %e, "저장소 단절로 실행 중단");
        return Err(CollectorError::Data(e).into());
    }
    if config.fail_hard && !report.outcome.is_clean() {
        return Err(CollectorError::FailedSymbols(report.outcome.failures.len()).into());
    }

    tracing::info!("FIN Data Collector 종료");
    Ok(())
}
