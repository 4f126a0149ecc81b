//! MongoDB 일봉 저장소.
//!
//! 소스별 컬렉션에 일봉을 업서트합니다:
//! - `stock_daily`: 일괄 집계 소스 (개별 주식)
//! - `index_daily`: 벤치마크 소스 (지수/섹터)
//!
//! 두 컬렉션 모두 (ticker, date) 고유 복합 인덱스를 가지며, 날짜는
//! 자정 UTC의 BSON datetime으로 저장합니다. 선택 필드는 명시적
//! null로 기록해 업서트가 이전 행의 잔재를 남기지 않게 합니다.

use crate::error::{DataError, Result};
use crate::store::BarStore;
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use chrono::{NaiveDate, NaiveTime};
use fin_core::{BarSource, DailyBar, UpsertOutcome};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

/// MongoDB 기반 일봉 저장소.
#[derive(Clone)]
pub struct MongoBarStore {
    stocks: Collection<Document>,
    indexes: Collection<Document>,
}

impl MongoBarStore {
    /// 연결 문자열과 데이터베이스 이름으로 저장소를 생성합니다.
    ///
    /// 드라이버는 지연 연결이므로 실제 연결 확인은 첫 연산
    /// (`ensure_indexes`)에서 일어납니다.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        Ok(Self {
            stocks: db.collection("stock_daily"),
            indexes: db.collection("index_daily"),
        })
    }

    /// (ticker, date) 고유 복합 인덱스를 보장합니다.
    ///
    /// 시작 시 한 번 호출하며, 연결 확인을 겸합니다.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let model = IndexModel::builder()
            .keys(doc! { "ticker": 1, "date": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.stocks.create_index(model.clone()).await?;
        self.indexes.create_index(model).await?;

        tracing::debug!("(ticker, date) 고유 인덱스 확인 완료");
        Ok(())
    }

    fn collection(&self, source: BarSource) -> &Collection<Document> {
        match source {
            BarSource::Bulk => &self.stocks,
            BarSource::Benchmark => &self.indexes,
        }
    }
}

#[async_trait]
impl BarStore for MongoBarStore {
    async fn upsert(&self, bar: &DailyBar) -> Result<UpsertOutcome> {
        let filter = doc! { "ticker": &bar.symbol, "date": bson_date(bar.date) };
        let update = doc! { "$set": bar_document(bar) };

        let result = self
            .collection(bar.source)
            .update_one(filter, update)
            .upsert(true)
            .await?;

        if result.upserted_id.is_some() {
            Ok(UpsertOutcome::Inserted)
        } else {
            Ok(UpsertOutcome::Updated)
        }
    }

    async fn latest_date(&self, symbol: &str, source: BarSource) -> Result<Option<NaiveDate>> {
        let found = self
            .collection(source)
            .find_one(doc! { "ticker": symbol })
            .sort(doc! { "date": -1 })
            .await?;

        found.map(|doc| read_date(&doc)).transpose()
    }

    async fn global_latest_date(&self, source: BarSource) -> Result<Option<NaiveDate>> {
        let found = self
            .collection(source)
            .find_one(doc! {})
            .sort(doc! { "date": -1 })
            .await?;

        found.map(|doc| read_date(&doc)).transpose()
    }
}

/// 일봉을 저장 문서로 변환합니다.
///
/// 없는 값도 명시적 null로 넣어 `$set`이 모든 필드를 교체하게 합니다.
fn bar_document(bar: &DailyBar) -> Document {
    doc! {
        "ticker": &bar.symbol,
        "date": bson_date(bar.date),
        "open": opt_f64(bar.open),
        "high": opt_f64(bar.high),
        "low": opt_f64(bar.low),
        "close": bar.close,
        "volume": opt_f64(bar.volume),
        "pre_market": opt_f64(bar.pre_market),
        "after_hours": opt_f64(bar.after_hours),
        "transactions": bar.transactions.map(Bson::Int64).unwrap_or(Bson::Null),
        "vwap": opt_f64(bar.vwap),
        "source": bar.source.as_str(),
        "ingested_at": bson::DateTime::now(),
    }
}

fn opt_f64(value: Option<f64>) -> Bson {
    value.map(Bson::Double).unwrap_or(Bson::Null)
}

/// 달력 날짜를 자정 UTC의 BSON datetime으로 변환.
fn bson_date(date: NaiveDate) -> bson::DateTime {
    bson::DateTime::from_chrono(date.and_time(NaiveTime::MIN).and_utc())
}

fn read_date(doc: &Document) -> Result<NaiveDate> {
    let dt = doc
        .get_datetime("date")
        .map_err(|e| DataError::StoreUnavailable(format!("date 필드 해석 실패: {}", e)))?;
    Ok(dt.to_chrono().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fin_core::DailyBar;

    fn bar() -> DailyBar {
        DailyBar {
            symbol: "AAPL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: Some(184.2),
            high: Some(186.1),
            low: Some(183.9),
            close: 185.5,
            volume: Some(5.0e7),
            pre_market: None,
            after_hours: Some(185.9),
            transactions: Some(412345),
            vwap: None,
            source: BarSource::Bulk,
        }
    }

    #[test]
    fn test_document_replaces_every_field() {
        let doc = bar_document(&bar());
        // 없는 값도 null로 들어가야 이전 행의 잔재가 남지 않음
        assert_eq!(doc.get("pre_market"), Some(&Bson::Null));
        assert_eq!(doc.get("vwap"), Some(&Bson::Null));
        assert_eq!(doc.get("after_hours"), Some(&Bson::Double(185.9)));
        assert_eq!(doc.get("source"), Some(&Bson::String("bulk".to_string())));
        assert!(doc.contains_key("ingested_at"));
    }

    #[test]
    fn test_bson_date_is_midnight_utc() {
        let dt = bson_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(dt.timestamp_millis(), 1704153600000);
    }
}
