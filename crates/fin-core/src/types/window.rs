//! 수집 범위 타입.
//!
//! 한 번의 수집 패스가 요청하는 대상(`SymbolScope`)과 날짜 구간
//! (`DateWindow`)을 정의합니다. 윈도우는 저장소의 마지막 날짜에서
//! 이어서 수집하도록 계산되며, 영속되지 않는 일회성 값입니다.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// 어댑터 요청 대상.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolScope {
    /// 제공자가 지원하는 전체 종목 (일괄 집계 요청)
    AllEquities,
    /// 단일 티커
    Ticker(String),
}

impl SymbolScope {
    /// 결과 보고용 심볼 표기. 전체 종목 요청은 `*`로 표기합니다.
    pub fn label(&self) -> &str {
        match self {
            SymbolScope::AllEquities => "*",
            SymbolScope::Ticker(t) => t,
        }
    }
}

/// 시작/끝을 포함하는 날짜 구간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// 하루짜리 윈도우.
    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// 마지막 저장 날짜에서 이어지는 수집 윈도우를 계산합니다.
    ///
    /// 시작일은 `max(latest + 1일, floor)`, 종료일은 `today`입니다.
    /// 시작일이 종료일을 지나면 이미 최신 상태이므로 `None`을
    /// 반환합니다 (호출자는 skipped로 집계).
    pub fn resume(latest: Option<NaiveDate>, floor: NaiveDate, today: NaiveDate) -> Option<Self> {
        let start = match latest {
            Some(d) => (d + Duration::days(1)).max(floor),
            None => floor,
        };
        (start <= today).then_some(Self { start, end: today })
    }

    /// 최초 수집 구간을 최근 `max_days`일로 제한합니다.
    ///
    /// 빈 저장소에서 시작할 때 과도한 과거 구간을 요청해 제공자
    /// 한도에 걸리는 것을 막기 위한 장치입니다. `max_days`가 0이면
    /// 제한하지 않습니다.
    pub fn truncate_to_recent(self, max_days: i64) -> Self {
        if max_days <= 0 {
            return self;
        }
        let earliest = self.end - Duration::days(max_days);
        if self.start < earliest {
            Self { start: earliest, end: self.end }
        } else {
            self
        }
    }

    /// 구간 내 모든 날짜 (오름차순).
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |d| {
            let next = *d + Duration::days(1);
            (next <= end).then_some(next)
        })
    }

    /// 구간 내 거래일만 (주말 제외, 오름차순).
    pub fn trading_days(&self) -> impl Iterator<Item = NaiveDate> {
        self.days().filter(|d| is_trading_day(*d))
    }
}

/// 기본 거래일 판정 (월-금).
///
/// 거래소 휴일 달력은 반영하지 않습니다. 휴일은 제공자가 빈 응답을
/// 돌려주는 것으로 자연히 걸러집니다.
pub fn is_trading_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_resume_continues_after_latest() {
        let w = DateWindow::resume(Some(d(2024, 1, 5)), d(2024, 1, 1), d(2024, 1, 10)).unwrap();
        assert_eq!(w.start, d(2024, 1, 6));
        assert_eq!(w.end, d(2024, 1, 10));
    }

    #[test]
    fn test_resume_empty_store_starts_at_floor() {
        let w = DateWindow::resume(None, d(2024, 1, 1), d(2024, 1, 10)).unwrap();
        assert_eq!(w.start, d(2024, 1, 1));
    }

    #[test]
    fn test_resume_floor_wins_over_stale_latest() {
        // 저장된 마지막 날짜가 하한선보다 한참 과거인 경우
        let w = DateWindow::resume(Some(d(2023, 6, 1)), d(2024, 1, 1), d(2024, 1, 10)).unwrap();
        assert_eq!(w.start, d(2024, 1, 1));
    }

    #[test]
    fn test_resume_up_to_date_is_none() {
        assert!(DateWindow::resume(Some(d(2024, 1, 10)), d(2024, 1, 1), d(2024, 1, 10)).is_none());
        assert!(DateWindow::resume(None, d(2024, 2, 1), d(2024, 1, 10)).is_none());
    }

    #[test]
    fn test_truncate_to_recent() {
        let w = DateWindow { start: d(2023, 1, 1), end: d(2024, 1, 10) };
        let t = w.truncate_to_recent(90);
        assert_eq!(t.end, d(2024, 1, 10));
        assert_eq!(t.start, d(2023, 10, 12));

        // 이미 짧은 구간은 그대로
        let short = DateWindow { start: d(2024, 1, 8), end: d(2024, 1, 10) };
        assert_eq!(short.truncate_to_recent(90), short);

        // 0은 무제한
        assert_eq!(w.truncate_to_recent(0), w);
    }

    #[test]
    fn test_trading_days_skips_weekend() {
        // 2024-01-05는 금요일, 2024-01-08은 월요일
        let w = DateWindow { start: d(2024, 1, 5), end: d(2024, 1, 9) };
        let days: Vec<_> = w.trading_days().collect();
        assert_eq!(days, vec![d(2024, 1, 5), d(2024, 1, 8), d(2024, 1, 9)]);
    }
}
