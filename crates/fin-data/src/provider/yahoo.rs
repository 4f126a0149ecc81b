//! Yahoo Finance 벤치마크 시계열 클라이언트.
//!
//! 지수/섹터 벤치마크 티커("^GSPC" 등)의 일봉 시계열을 심볼당 요청
//! 한 번으로 수집합니다. 인증키가 필요 없습니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use fin_data::provider::yahoo::YahooChartClient;
//!
//! let client = YahooChartClient::new()?;
//! let rows = client.daily_history("^GSPC", &window).await?;
//! ```

use crate::error::{DataError, Result};
use crate::normalize::RawRecord;
use crate::provider::SourceAdapter;
use crate::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate};
use fin_core::{BarSource, DateWindow, SymbolScope};
use time::OffsetDateTime;

const PROVIDER: &str = "yahoo";

/// Yahoo Finance 차트 클라이언트.
pub struct YahooChartClient {
    connector: yahoo_finance_api::YahooConnector,
}

/// 벤치마크 시계열의 하루치 원시 레코드.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRow {
    /// 봉 시작 시각 (unix 초)
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// 거래량. 현물 지수는 0으로 내려오는 경우가 많습니다.
    pub volume: u64,
}

impl YahooChartClient {
    /// 새로운 차트 클라이언트 생성.
    pub fn new() -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| {
            DataError::UpstreamError {
                provider: PROVIDER,
                reason: format!("연결 실패: {}", e),
            }
        })?;
        Ok(Self { connector })
    }

    /// 날짜 구간의 일봉 시계열 조회 (오름차순).
    pub async fn daily_history(
        &self,
        symbol: &str,
        window: &DateWindow,
    ) -> Result<Vec<BenchmarkRow>> {
        let start = naive_date_to_offset_datetime(window.start);
        // 차트 API의 종료 시각은 배타적이라 하루를 더해 요청
        let end = naive_date_to_offset_datetime(window.end + Duration::days(1));

        tracing::debug!(symbol = symbol, start = %window.start, end = %window.end, "벤치마크 시계열 요청");

        let response = self
            .connector
            .get_quote_history_interval(symbol, start, end, "1d")
            .await
            .map_err(|e| classify_yahoo_error(symbol, &e.to_string()))?;

        let quotes = response.quotes().map_err(|e| DataError::UpstreamError {
            provider: PROVIDER,
            reason: format!("quote 파싱 오류 ({}): {}", symbol, e),
        })?;

        let rows = quotes
            .iter()
            .map(|q| BenchmarkRow {
                timestamp: q.timestamp as i64,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect();

        Ok(rows_in_window(rows, window))
    }
}

/// 레코드를 윈도우로 거르고 날짜 오름차순을 보장합니다.
///
/// 차트 API는 구간 경계 바깥의 봉을 덧붙이는 경우가 있어 요청
/// 윈도우로 한 번 더 거릅니다.
fn rows_in_window(rows: Vec<BenchmarkRow>, window: &DateWindow) -> Vec<BenchmarkRow> {
    let mut rows: Vec<BenchmarkRow> = rows
        .into_iter()
        .filter(|r| {
            DateTime::from_timestamp(r.timestamp, 0)
                .map(|dt| {
                    let day = dt.date_naive();
                    window.start <= day && day <= window.end
                })
                .unwrap_or(false)
        })
        .collect();
    rows.sort_by_key(|r| r.timestamp);
    rows
}

/// Yahoo 오류를 분류합니다.
///
/// 라이브러리가 한도 초과를 구분해 주지 않아 메시지의 429 표식으로
/// 판별합니다.
fn classify_yahoo_error(symbol: &str, msg: &str) -> DataError {
    if msg.contains("429") || msg.to_lowercase().contains("too many requests") {
        DataError::RateLimited { provider: PROVIDER }
    } else {
        DataError::UpstreamError {
            provider: PROVIDER,
            reason: format!("{}: {}", symbol, msg),
        }
    }
}

/// NaiveDate를 OffsetDateTime으로 변환.
fn naive_date_to_offset_datetime(date: NaiveDate) -> OffsetDateTime {
    let (year, month, day) = (date.year(), date.month() as u8, date.day() as u8);
    time::Date::from_calendar_date(year, time::Month::try_from(month).unwrap(), day)
        .unwrap()
        .midnight()
        .assume_utc()
}

/// 벤치마크 소스 어댑터.
///
/// 단일 티커 스코프만 지원합니다. 전체 종목 요청 개념이 없는
/// 제공자이므로 그런 요청은 상류 오류로 돌려줍니다.
pub struct BenchmarkAdapter {
    client: YahooChartClient,
    retry: RetryPolicy,
}

impl BenchmarkAdapter {
    pub fn new(client: YahooChartClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl SourceAdapter for BenchmarkAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn source(&self) -> BarSource {
        BarSource::Benchmark
    }

    async fn fetch(&self, scope: &SymbolScope, window: &DateWindow) -> Result<Vec<RawRecord>> {
        let ticker = match scope {
            SymbolScope::Ticker(t) => t,
            SymbolScope::AllEquities => {
                return Err(DataError::UpstreamError {
                    provider: PROVIDER,
                    reason: "벤치마크 소스는 전체 종목 요청을 지원하지 않음".to_string(),
                })
            }
        };

        let rows = with_retry(&self.retry, PROVIDER, || {
            self.client.daily_history(ticker, window)
        })
        .await?;

        Ok(rows.into_iter().map(RawRecord::Benchmark).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(timestamp: i64, close: f64) -> BenchmarkRow {
        BenchmarkRow {
            timestamp,
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 0,
        }
    }

    #[test]
    fn test_rows_sorted_ascending() {
        let window = DateWindow { start: d(2024, 1, 1), end: d(2024, 1, 5) };
        // 1704326400 = 2024-01-04, 1704240000 = 2024-01-03
        let rows = rows_in_window(vec![row(1704326400, 4770.0), row(1704240000, 4750.0)], &window);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].timestamp < rows[1].timestamp);
        assert_eq!(rows[0].close, 4750.0);
    }

    #[test]
    fn test_rows_outside_window_dropped() {
        let window = DateWindow { start: d(2024, 1, 4), end: d(2024, 1, 4) };
        let rows = rows_in_window(vec![row(1704240000, 4750.0), row(1704326400, 4770.0)], &window);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].close, 4770.0);
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(matches!(
            classify_yahoo_error("^GSPC", "fetching the data from yahoo! finance failed: HTTP 429"),
            DataError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_yahoo_error("^GSPC", "Too Many Requests"),
            DataError::RateLimited { .. }
        ));
        assert!(matches!(
            classify_yahoo_error("^GSPC", "HTTP 500 internal error"),
            DataError::UpstreamError { .. }
        ));
    }

    #[test]
    fn test_offset_datetime_conversion() {
        let odt = naive_date_to_offset_datetime(d(2024, 1, 2));
        assert_eq!(odt.unix_timestamp(), 1704153600);
    }
}
