//! 원시 레코드 정규화.
//!
//! 제공자마다 다른 응답 모양을 단일 일봉 레코드로 맞춥니다. 원시
//! 모양은 어댑터별 태그 변형으로만 다루며, 사용처에서 구조를
//! 추측하지 않고 소스별 매핑 함수 하나를 거칩니다.
//!
//! 정규화는 순수 함수입니다. 필수 필드(`date`, `close`)가 없거나
//! 해석할 수 없으면 `MalformedRecord`로 실패하고, 나머지 선택
//! 필드의 부재는 0.0이 아닌 "없음"으로 보존됩니다.

use crate::error::{DataError, Result};
use crate::provider::polygon::{BulkAggregate, BulkOpenClose};
use crate::provider::yahoo::BenchmarkRow;
use chrono::{DateTime, NaiveDate};
use fin_core::{BarSource, DailyBar};

/// 어댑터가 생산하는 원시 레코드.
#[derive(Debug, Clone)]
pub enum RawRecord {
    /// 전종목 일별 집계의 종목별 레코드
    Bulk(BulkAggregate),
    /// 종목별 시가/종가 레코드 (장전/장후 포함)
    BulkOpenClose(BulkOpenClose),
    /// 벤치마크 시계열의 하루치 레코드
    Benchmark(BenchmarkRow),
}

impl RawRecord {
    /// 레코드를 생산한 소스 태그.
    pub fn source(&self) -> BarSource {
        match self {
            RawRecord::Bulk(_) | RawRecord::BulkOpenClose(_) => BarSource::Bulk,
            RawRecord::Benchmark(_) => BarSource::Benchmark,
        }
    }

    /// 레코드에 내장된 티커 (벤치마크 레코드는 없음).
    pub fn ticker(&self) -> Option<&str> {
        match self {
            RawRecord::Bulk(agg) => agg.ticker.as_deref(),
            RawRecord::BulkOpenClose(oc) => Some(&oc.ticker),
            RawRecord::Benchmark(_) => None,
        }
    }
}

/// 원시 레코드 하나를 일봉으로 정규화합니다.
///
/// `fallback_symbol`은 레코드에 티커가 내장되지 않은 소스(벤치마크
/// 시계열)에서 사용됩니다. OHLC 관계 위반은 경고만 남기고
/// 통과시킵니다.
pub fn normalize(raw: &RawRecord, fallback_symbol: &str) -> Result<DailyBar> {
    // 티커가 내장된 소스는 레코드의 티커만 신뢰하고, 벤치마크
    // 시계열만 요청 심볼을 넘겨받습니다
    let symbol = match raw {
        RawRecord::Bulk(_) | RawRecord::BulkOpenClose(_) => raw.ticker().unwrap_or(""),
        RawRecord::Benchmark(_) => fallback_symbol,
    };
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(DataError::MalformedRecord {
            symbol: "<unknown>".to_string(),
            reason: "티커 없음".to_string(),
        });
    }

    let bar = match raw {
        RawRecord::Bulk(agg) => {
            let date = agg
                .timestamp_ms
                .and_then(date_from_unix_ms)
                .ok_or_else(|| malformed(&symbol, "타임스탬프 없음 또는 범위 밖"))?;
            let close = agg.close.ok_or_else(|| malformed(&symbol, "종가 없음"))?;
            DailyBar {
                symbol,
                date,
                open: agg.open,
                high: agg.high,
                low: agg.low,
                close,
                volume: agg.volume,
                pre_market: None,
                after_hours: None,
                transactions: agg.transactions,
                vwap: agg.vwap,
                source: BarSource::Bulk,
            }
        }

        RawRecord::BulkOpenClose(oc) => {
            let date = oc
                .date
                .as_deref()
                .and_then(parse_calendar_date)
                .ok_or_else(|| malformed(&symbol, "거래일 없음 또는 해석 불가"))?;
            let close = oc.close.ok_or_else(|| malformed(&symbol, "종가 없음"))?;
            DailyBar {
                symbol,
                date,
                open: oc.open,
                high: oc.high,
                low: oc.low,
                close,
                volume: oc.volume,
                pre_market: oc.pre_market,
                after_hours: oc.after_hours,
                transactions: None,
                vwap: None,
                source: BarSource::Bulk,
            }
        }

        RawRecord::Benchmark(row) => {
            let date = DateTime::from_timestamp(row.timestamp, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| malformed(&symbol, "타임스탬프 범위 밖"))?;
            if !row.close.is_finite() {
                return Err(malformed(&symbol, "종가가 수가 아님"));
            }
            DailyBar {
                symbol,
                date,
                open: row.open.is_finite().then_some(row.open),
                high: row.high.is_finite().then_some(row.high),
                low: row.low.is_finite().then_some(row.low),
                close: row.close,
                // 현물 지수의 0 거래량은 "의미 없음"으로 취급
                volume: (row.volume > 0).then_some(row.volume as f64),
                pre_market: None,
                after_hours: None,
                transactions: None,
                vwap: None,
                source: BarSource::Benchmark,
            }
        }
    };

    bar.warn_if_insane();
    Ok(bar)
}

fn malformed(symbol: &str, reason: &str) -> DataError {
    DataError::MalformedRecord {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    }
}

/// unix ms 타임스탬프를 달력 날짜로 내림.
fn date_from_unix_ms(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

/// 날짜 문자열을 달력 날짜로 해석합니다.
///
/// "YYYY-MM-DD"와 ISO 타임스탬프(시간대 포함/미포함)를 모두 받아
/// 시각과 시간대를 버리고 날짜만 남깁니다. 일봉은 관례상 시간대가
/// 없습니다.
pub(crate) fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn agg(close: Option<f64>, ts: Option<i64>) -> BulkAggregate {
        BulkAggregate {
            ticker: Some("aapl".to_string()),
            timestamp_ms: ts,
            open: Some(184.2),
            high: Some(186.1),
            low: Some(183.9),
            close,
            volume: Some(5.0e7),
            transactions: Some(412345),
            vwap: Some(185.1),
        }
    }

    #[test]
    fn test_bulk_normalizes_and_uppercases() {
        // 1704229200000 = 2024-01-02 21:00 UTC
        let bar = normalize(&RawRecord::Bulk(agg(Some(185.5), Some(1704229200000))), "").unwrap();
        assert_eq!(bar.symbol, "AAPL");
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bar.close, 185.5);
        assert_eq!(bar.source, BarSource::Bulk);
        assert_eq!(bar.pre_market, None);
    }

    #[test]
    fn test_missing_close_is_malformed() {
        let err = normalize(&RawRecord::Bulk(agg(None, Some(1704229200000))), "").unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { .. }));
    }

    #[test]
    fn test_missing_timestamp_is_malformed() {
        let err = normalize(&RawRecord::Bulk(agg(Some(185.5), None)), "").unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { .. }));
    }

    #[test]
    fn test_missing_ticker_never_uses_fallback() {
        let mut raw = agg(Some(185.5), Some(1704229200000));
        raw.ticker = None;
        // 일괄 집계 레코드는 내장 티커만 신뢰
        let err = normalize(&RawRecord::Bulk(raw), "*").unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { .. }));
    }

    #[test]
    fn test_open_close_keeps_extended_hours_distinct_from_zero() {
        let oc = BulkOpenClose {
            ticker: "AAPL".to_string(),
            date: Some("2024-01-02".to_string()),
            open: Some(184.2),
            high: Some(186.1),
            low: Some(183.9),
            close: Some(185.5),
            volume: Some(5.0e7),
            pre_market: Some(0.0),
            after_hours: None,
        };
        let bar = normalize(&RawRecord::BulkOpenClose(oc), "").unwrap();
        // 0.0과 "없음"은 다른 값
        assert_eq!(bar.pre_market, Some(0.0));
        assert_eq!(bar.after_hours, None);
    }

    #[test]
    fn test_date_parsing_accepts_iso_timestamp() {
        assert_eq!(
            parse_calendar_date("2024-01-02"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(
            parse_calendar_date("2024-01-02T21:00:00-05:00"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(
            parse_calendar_date("2024-01-02T21:00:00"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(parse_calendar_date("01/02/2024"), None);
    }

    #[test]
    fn test_benchmark_zero_volume_is_absent() {
        let row = BenchmarkRow {
            timestamp: 1704240000, // 2024-01-03
            open: 4758.0,
            high: 4772.0,
            low: 4736.0,
            close: 4750.0,
            volume: 0,
        };
        let bar = normalize(&RawRecord::Benchmark(row), "^GSPC").unwrap();
        assert_eq!(bar.symbol, "^GSPC");
        assert_eq!(bar.volume, None);
        assert_eq!(bar.source, BarSource::Benchmark);
    }

    #[test]
    fn test_benchmark_nan_close_is_malformed() {
        let row = BenchmarkRow {
            timestamp: 1704240000,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: 0,
        };
        assert!(normalize(&RawRecord::Benchmark(row), "^GSPC").is_err());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let first = normalize(&RawRecord::Bulk(agg(Some(185.5), Some(1704229200000))), "").unwrap();

        // 정규화된 레코드와 동등한 원시 모양을 다시 정규화해도 동일해야 함
        let midnight_ms = first
            .date
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();
        let equivalent = BulkAggregate {
            ticker: Some(first.symbol.clone()),
            timestamp_ms: Some(midnight_ms),
            open: first.open,
            high: first.high,
            low: first.low,
            close: Some(first.close),
            volume: first.volume,
            transactions: first.transactions,
            vwap: first.vwap,
        };
        let second = normalize(&RawRecord::Bulk(equivalent), "").unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn prop_bulk_normalization_is_stable(
            close in 0.01f64..1.0e6,
            volume in proptest::option::of(0.0f64..1.0e12),
            days in 0i64..20000,
        ) {
            let ts = days * 86_400_000;
            let raw = BulkAggregate {
                ticker: Some("TEST".to_string()),
                timestamp_ms: Some(ts),
                open: None,
                high: None,
                low: None,
                close: Some(close),
                volume,
                transactions: None,
                vwap: None,
            };
            let a = normalize(&RawRecord::Bulk(raw.clone()), "").unwrap();
            let b = normalize(&RawRecord::Bulk(raw), "").unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
