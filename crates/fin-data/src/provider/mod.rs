//! 데이터 제공자 모듈.
//!
//! 외부 제공자에서 원시 레코드를 가져오는 어댑터들을 정의합니다.
//!
//! ## 일괄 집계 (Polygon)
//! - `PolygonClient`: 전종목 일별 집계 + 종목별 시가/종가 API (인증키 필요)
//! - 하루 요청 한 번으로 미국 주식 전 종목의 일봉 수집
//!
//! ## 벤치마크 (Yahoo Finance)
//! - `YahooChartClient`: 지수/섹터 티커의 일봉 시계열 (인증키 불필요)
//! - 심볼당 요청 한 번으로 날짜 구간 전체 수집

pub mod polygon;
pub mod yahoo;

use crate::error::Result;
use crate::normalize::RawRecord;
use async_trait::async_trait;
use fin_core::{BarSource, DateWindow, SymbolScope};

/// 데이터 소스 어댑터 trait.
///
/// 요청 범위에 해당하는 유한한 원시 레코드 묶음을 날짜 오름차순으로
/// 돌려줍니다. 어댑터는 저장소를 알지 못하며, 무엇을 요청할지는
/// 오케스트레이터가 저장소의 마지막 날짜를 보고 결정합니다.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// 어댑터 이름 (로그/보고용).
    fn name(&self) -> &'static str;

    /// 이 어댑터가 생산하는 레코드의 소스 태그.
    fn source(&self) -> BarSource;

    /// 요청 범위의 원시 레코드 조회.
    async fn fetch(&self, scope: &SymbolScope, window: &DateWindow) -> Result<Vec<RawRecord>>;
}
