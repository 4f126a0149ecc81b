//! 한도 초과 대응 재시도 정책.
//!
//! 제공자 호출마다 명시적인 정책 객체를 적용합니다. 재시도 대상은
//! 한도 초과(`RateLimited`)뿐이며, 허용 횟수를 소진하면
//! `UpstreamError`로 강등되어 호출자가 해당 요청을 건너뜁니다.
//! 백오프는 어댑터 호출 단위로 적용되므로 한 제공자의 스로틀링이
//! 다른 소스의 수집을 막지 않습니다.

use crate::error::{DataError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// 재시도 정책.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 첫 재시도 전 대기 시간
    pub base_delay: Duration,
    /// 대기 시간에 더해지는 지터 비율 (0.0 ~ 1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// `attempt`번째 실패 후 대기 시간 (지수 백오프 + 지터).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis() as f64 * 2f64.powi(attempt.saturating_sub(1) as i32);
        let jitter = 1.0 + rand::thread_rng().gen_range(0.0..=self.jitter);
        Duration::from_millis((exp * jitter) as u64)
    }
}

/// 정책에 따라 연산을 재시도합니다.
///
/// 한도 초과가 아닌 오류는 그대로 전파하고, 한도 초과가 허용 횟수를
/// 넘기면 `UpstreamError`로 바꿔 반환합니다.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &'static str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    provider = provider,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "한도 초과, 백오프 후 재시도"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    provider = provider,
                    attempts = policy.max_attempts,
                    "한도 초과가 해소되지 않아 이번 실행에서 건너뜀"
                );
                return Err(DataError::UpstreamError {
                    provider,
                    reason: format!("rate limit persisted after {} attempts", policy.max_attempts),
                });
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("max_attempts는 1 이상")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            jitter: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_rate_limit() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&policy(), "polygon", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DataError::RateLimited { provider: "polygon" })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_becomes_upstream_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&policy(), "polygon", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DataError::RateLimited { provider: "polygon" }) }
        })
        .await;

        assert!(matches!(result, Err(DataError::UpstreamError { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&policy(), "yahoo", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(DataError::UpstreamError {
                    provider: "yahoo",
                    reason: "404".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(DataError::UpstreamError { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_millis(10));
        assert_eq!(p.delay_for(2), Duration::from_millis(20));
        assert_eq!(p.delay_for(3), Duration::from_millis(40));
    }
}
