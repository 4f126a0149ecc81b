//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use chrono::NaiveDate;
use fin_data::RetryPolicy;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 일괄 집계 제공자 API 키
    pub api_key: String,
    /// 저장소 연결 문자열
    pub mongo_uri: String,
    /// 데이터베이스 이름
    pub db_name: String,
    /// 백필 하한 날짜 (이보다 과거는 수집하지 않음)
    pub floor_date: NaiveDate,
    /// 벤치마크 티커 목록
    pub benchmark_symbols: Vec<String>,
    /// 감시 종목 목록 (종목별 시가/종가로 보충)
    pub watchlist_symbols: Vec<String>,
    /// 최초 수집 구간 제한 (일 단위, 0 = 무제한)
    pub max_initial_days: i64,
    /// API 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 한도 초과 최대 시도 횟수
    pub max_retries: u32,
    /// 첫 재시도 전 대기 시간 (밀리초)
    pub retry_base_delay_ms: u64,
    /// 벤치마크 동시 수집 수
    pub benchmark_concurrency: usize,
    /// 실행 시간 한도 (초, 없으면 무제한)
    pub run_timeout_secs: Option<u64>,
    /// 실패 항목이 있으면 비정상 종료
    pub fail_hard: bool,
    /// 제공자 호출과 저장 없이 수집 범위만 출력
    pub dry_run: bool,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("API_KEY").map_err(|_| {
            CollectorError::Config("API_KEY 환경변수가 설정되지 않았습니다".to_string())
        })?;

        let floor_date = std::env::var("FLOOR_DATE")
            .unwrap_or_else(|_| "2025-01-01".to_string())
            .parse::<NaiveDate>()
            .map_err(|e| CollectorError::Config(format!("FLOOR_DATE 해석 실패: {}", e)))?;

        Ok(Self {
            api_key,
            mongo_uri: std::env::var("MONGO_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            db_name: std::env::var("DB_NAME").unwrap_or_else(|_| "FIN".to_string()),
            floor_date,
            benchmark_symbols: env_var_list("BENCHMARK_SYMBOLS", "^GSPC,^DJI,^IXIC"),
            watchlist_symbols: env_var_list("WATCHLIST_SYMBOLS", ""),
            max_initial_days: env_var_parse("MAX_INITIAL_DAYS", 90),
            request_delay_ms: env_var_parse("REQUEST_DELAY_MS", 500),
            max_retries: env_var_parse("MAX_RETRIES", 5),
            retry_base_delay_ms: env_var_parse("RETRY_BASE_DELAY_MS", 500),
            benchmark_concurrency: env_var_parse("BENCHMARK_CONCURRENCY", 4),
            run_timeout_secs: std::env::var("RUN_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()),
            fail_hard: env_var_bool("FAIL_HARD", false),
            dry_run: env_var_bool("DRY_RUN", false),
        })
    }

    /// API 요청 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// 실행 시간 한도를 Duration으로 반환
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// 어댑터 호출에 적용할 재시도 정책
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

/// 환경변수에서 쉼표 구분 목록 파싱
fn env_var_list(key: &str, default: &str) -> Vec<String> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_list(&raw)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
