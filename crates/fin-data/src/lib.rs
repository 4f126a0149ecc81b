//! 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 외부 제공자 클라이언트 (전종목 일괄 집계, 벤치마크 시계열)
//! - 제공자별 원시 레코드를 일봉으로 바꾸는 정규화기
//! - (ticker, date) 유일키 업서트 저장소
//! - 한도 초과 대응 재시도 정책

pub mod error;
pub mod normalize;
pub mod provider;
pub mod retry;
pub mod store;

pub use error::{DataError, Result};
pub use normalize::{normalize, RawRecord};
pub use retry::{with_retry, RetryPolicy};

// 제공자 재내보내기
pub use provider::polygon::{BulkAdapter, BulkAggregate, BulkOpenClose, PolygonClient};
pub use provider::yahoo::{BenchmarkAdapter, BenchmarkRow, YahooChartClient};
pub use provider::SourceAdapter;

// 저장소 재내보내기
pub use store::memory::MemoryBarStore;
pub use store::mongo::MongoBarStore;
pub use store::BarStore;
