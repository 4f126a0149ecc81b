//! 일봉 레코드 및 소스 태그 정의.
//!
//! 이 모듈은 저장소에 기록되는 정규화된 일봉 타입을 정의합니다:
//! - `BarSource` - 레코드를 생산한 데이터 소스 태그
//! - `DailyBar` - 소스 중립적인 일봉 레코드
//! - `UpsertOutcome` - 저장 결과 (신규 삽입 / 갱신)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 일봉을 생산한 데이터 소스.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarSource {
    /// 전종목 일괄 집계 제공자 (미국 주식 전체)
    Bulk,
    /// 지수/섹터 벤치마크 제공자 (심볼별 시계열)
    Benchmark,
}

impl BarSource {
    /// 저장용 문자열로 변환.
    pub fn as_str(&self) -> &'static str {
        match self {
            BarSource::Bulk => "bulk",
            BarSource::Benchmark => "benchmark",
        }
    }
}

impl fmt::Display for BarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 소스 중립적인 일봉 레코드.
///
/// (`symbol`, `date`) 쌍이 저장소의 유일키이며, 같은 키에 대한
/// 이후 수집은 기존 행을 제자리에서 교체합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 티커 (대문자, 비어 있지 않음)
    pub symbol: String,
    /// 거래일 (시간대 없는 달력 날짜)
    pub date: NaiveDate,
    /// 시가
    pub open: Option<f64>,
    /// 고가
    pub high: Option<f64>,
    /// 저가
    pub low: Option<f64>,
    /// 종가 (필수)
    pub close: f64,
    /// 거래량 (지수 벤치마크는 의미가 없어 None)
    pub volume: Option<f64>,
    /// 장전 가격 (제공자가 내려줄 때만 존재, 0.0과 구분됨)
    pub pre_market: Option<f64>,
    /// 장후 가격 (제공자가 내려줄 때만 존재)
    pub after_hours: Option<f64>,
    /// 집계 구간의 체결 건수
    pub transactions: Option<i64>,
    /// 거래량 가중 평균가
    pub vwap: Option<f64>,
    /// 레코드를 생산한 소스
    pub source: BarSource,
}

impl DailyBar {
    /// 저장소 유일키.
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.symbol, self.date)
    }

    /// OHLC 관계(`low <= open,close <= high`)가 성립하는지 확인.
    ///
    /// 상류 데이터가 이 관계를 깨는 경우가 있어 위반은 에러가 아니라
    /// 데이터 품질 경고로만 다룹니다. 일부 필드가 없으면 알 수 있는
    /// 범위에서만 검사합니다.
    pub fn ohlc_is_sane(&self) -> bool {
        let within = |price: f64| {
            self.low.map_or(true, |l| l <= price) && self.high.map_or(true, |h| price <= h)
        };
        self.open.map_or(true, within) && within(self.close)
    }

    /// OHLC 관계 위반 시 품질 경고를 남깁니다.
    pub fn warn_if_insane(&self) {
        if !self.ohlc_is_sane() {
            tracing::warn!(
                symbol = %self.symbol,
                date = %self.date,
                open = ?self.open,
                high = ?self.high,
                low = ?self.low,
                close = self.close,
                "OHLC 관계 위반 (데이터 품질 경고)"
            );
        }
    }
}

/// 업서트 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 새 행이 삽입됨
    Inserted,
    /// 기존 행이 교체됨
    Updated,
}
