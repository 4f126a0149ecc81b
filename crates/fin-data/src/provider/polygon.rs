//! Polygon 일괄 집계 클라이언트.
//!
//! 전종목 일별 집계(grouped daily aggregates) API로 미국 주식 전체의
//! 일봉을 하루 단위로 수집합니다. 감시 종목 보충에는 종목별
//! 시가/종가(daily open/close) API를 사용하며, 이 응답에만 장전/장후
//! 가격이 포함됩니다.
//!
//! # 응답 필드 (단일 문자 키)
//!
//! - `T`: 티커, `t`: 집계 구간 종료 시각 (unix ms)
//! - `o`/`h`/`l`/`c`: 시가/고가/저가/종가, `v`: 거래량
//! - `n`: 체결 건수, `vw`: 거래량 가중 평균가 (선택)
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use fin_data::provider::polygon::PolygonClient;
//!
//! let client = PolygonClient::new(std::env::var("API_KEY")?);
//! let aggs = client.grouped_daily(day).await?;
//! ```

use crate::error::{DataError, Result};
use crate::normalize::RawRecord;
use crate::provider::SourceAdapter;
use crate::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use chrono::NaiveDate;
use fin_core::{BarSource, DateWindow, SymbolScope};
use serde::Deserialize;

const PROVIDER: &str = "polygon";

/// Polygon API 클라이언트.
#[derive(Clone)]
pub struct PolygonClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// 전종목 일별 집계의 종목별 레코드.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkAggregate {
    /// 티커 (간혹 비어서 내려오는 레코드는 정규화에서 걸러짐)
    #[serde(rename = "T", default)]
    pub ticker: Option<String>,
    /// 집계 구간 종료 시각 (unix ms)
    #[serde(rename = "t", default)]
    pub timestamp_ms: Option<i64>,
    /// 시가
    #[serde(rename = "o", default)]
    pub open: Option<f64>,
    /// 고가
    #[serde(rename = "h", default)]
    pub high: Option<f64>,
    /// 저가
    #[serde(rename = "l", default)]
    pub low: Option<f64>,
    /// 종가
    #[serde(rename = "c", default)]
    pub close: Option<f64>,
    /// 거래량
    #[serde(rename = "v", default)]
    pub volume: Option<f64>,
    /// 체결 건수
    #[serde(rename = "n", default)]
    pub transactions: Option<i64>,
    /// 거래량 가중 평균가
    #[serde(rename = "vw", default)]
    pub vwap: Option<f64>,
}

/// 종목별 시가/종가 레코드.
///
/// 장전/장후 가격은 이 응답에서만 내려옵니다. 값이 없는 것과 0.0은
/// 구분되어야 하므로 모두 `Option`으로 받습니다.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkOpenClose {
    /// 티커
    #[serde(rename = "symbol")]
    pub ticker: String,
    /// 거래일 ("YYYY-MM-DD" 또는 ISO 타임스탬프)
    #[serde(rename = "from", default)]
    pub date: Option<String>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    /// 장전 가격
    #[serde(rename = "preMarket", default)]
    pub pre_market: Option<f64>,
    /// 장후 가격
    #[serde(rename = "afterHours", default)]
    pub after_hours: Option<f64>,
}

impl PolygonClient {
    /// 새로운 Polygon 클라이언트 생성.
    ///
    /// # Arguments
    /// * `api_key` - Polygon API 인증키
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("HTTP 클라이언트 생성 실패"),
            api_key: api_key.into(),
            base_url: "https://api.polygon.io".to_string(),
        }
    }

    /// Base URL 교체 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 전종목 일별 집계 조회.
    ///
    /// 해당 날짜의 종목별 레코드 목록을 반환합니다. 휴장일은 빈
    /// 목록으로 내려옵니다.
    pub async fn grouped_daily(&self, day: NaiveDate) -> Result<Vec<BulkAggregate>> {
        #[derive(Deserialize)]
        struct RawResponse {
            #[serde(default)]
            results: Option<Vec<BulkAggregate>>,
        }

        let url = format!(
            "{}/v2/aggs/grouped/locale/us/market/stocks/{}",
            self.base_url,
            day.format("%Y-%m-%d")
        );

        tracing::debug!(date = %day, url = %url, "전종목 집계 요청");

        let response = self
            .client
            .get(&url)
            .query(&[("adjusted", "true"), ("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| DataError::UpstreamError { provider: PROVIDER, reason: e.to_string() })?;

        let data: RawResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DataError::UpstreamError { provider: PROVIDER, reason: e.to_string() })?;

        Ok(data.results.unwrap_or_default())
    }

    /// 종목별 시가/종가 조회.
    ///
    /// 해당 날짜에 데이터가 없으면(휴장, 신규 상장 전) `None`을
    /// 반환합니다.
    pub async fn daily_open_close(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> Result<Option<BulkOpenClose>> {
        let url = format!(
            "{}/v1/open-close/{}/{}",
            self.base_url,
            ticker,
            day.format("%Y-%m-%d")
        );

        tracing::debug!(ticker = ticker, date = %day, "시가/종가 요청");

        let response = self
            .client
            .get(&url)
            .query(&[("adjusted", "true"), ("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| DataError::UpstreamError { provider: PROVIDER, reason: e.to_string() })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let record: BulkOpenClose = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| DataError::UpstreamError { provider: PROVIDER, reason: e.to_string() })?;

        Ok(Some(record))
    }

    /// HTTP 상태 코드를 오류 분류로 변환.
    ///
    /// 429는 재시도 가능한 한도 초과, 그 외 실패는 이번 실행에서
    /// 건너뛰는 상류 오류입니다.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited { provider: PROVIDER });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::UpstreamError {
                provider: PROVIDER,
                reason: format!("{}: {}", status, body),
            });
        }
        Ok(response)
    }
}

/// 일괄 집계 소스 어댑터.
///
/// 전체 종목 스코프는 전종목 집계를, 단일 티커 스코프는 종목별
/// 시가/종가를 사용합니다. 호출마다 재시도 정책이 적용됩니다.
pub struct BulkAdapter {
    client: PolygonClient,
    retry: RetryPolicy,
}

impl BulkAdapter {
    pub fn new(client: PolygonClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl SourceAdapter for BulkAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn source(&self) -> BarSource {
        BarSource::Bulk
    }

    async fn fetch(&self, scope: &SymbolScope, window: &DateWindow) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        for day in window.trading_days() {
            match scope {
                SymbolScope::AllEquities => {
                    let aggs =
                        with_retry(&self.retry, PROVIDER, || self.client.grouped_daily(day))
                            .await?;
                    records.extend(aggs.into_iter().map(RawRecord::Bulk));
                }
                SymbolScope::Ticker(ticker) => {
                    let fetched = with_retry(&self.retry, PROVIDER, || {
                        self.client.daily_open_close(ticker, day)
                    })
                    .await?;
                    if let Some(oc) = fetched {
                        records.push(RawRecord::BulkOpenClose(oc));
                    }
                }
            }
        }
        Ok(records)
    }
}
