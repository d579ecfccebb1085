//! SQLite 기반 캔들 저장소.
//!
//! 모든 마켓/타임프레임의 캔들을 하나의 `candles` 테이블에 저장합니다.
//! 키는 `(symbol, timeframe, candle_time)`이며 `candle_time`은 epoch 초입니다.
//! 가격/거래량은 정밀도 손실 없이 보관하기 위해 TEXT로 저장합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use upbit_data::SqliteCandleRepository;
//!
//! let repo = SqliteCandleRepository::connect("sqlite://data/market_data.sqlite3").await?;
//! repo.init_schema().await?;
//! let latest = repo.get_latest_candles("KRW-BTC", Timeframe::M1, 100).await?;
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, instrument};
use upbit_core::{Candle, Timeframe};

use super::CandleRepository;
use crate::error::{DataError, Result};

const KST_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const SELECT_COLUMNS: &str = r#"
    symbol, timeframe, candle_time, candle_date_time_kst,
    opening_price, high_price, low_price, trade_price, timestamp,
    candle_acc_trade_price, candle_acc_trade_volume,
    unit, prev_closing_price, change_price, change_rate, first_day_of_period
"#;

/// 캔들 데이터베이스 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct CandleRecord {
    pub symbol: String,
    pub timeframe: String,
    pub candle_time: i64,
    pub candle_date_time_kst: String,
    pub opening_price: String,
    pub high_price: String,
    pub low_price: String,
    pub trade_price: String,
    pub timestamp: i64,
    pub candle_acc_trade_price: String,
    pub candle_acc_trade_volume: String,
    pub unit: Option<i64>,
    pub prev_closing_price: Option<String>,
    pub change_price: Option<String>,
    pub change_rate: Option<String>,
    pub first_day_of_period: Option<String>,
}

impl CandleRecord {
    /// Candle 도메인 객체로 변환.
    pub fn to_candle(&self) -> Result<Candle> {
        let utc = Utc
            .timestamp_opt(self.candle_time, 0)
            .single()
            .ok_or_else(|| {
                DataError::InvalidData(format!("잘못된 candle_time: {}", self.candle_time))
            })?;
        let kst = NaiveDateTime::parse_from_str(&self.candle_date_time_kst, KST_FORMAT)
            .map_err(|e| DataError::InvalidData(format!("KST 시각 복원 실패: {}", e)))?;

        Ok(Candle {
            market: self.symbol.clone(),
            candle_date_time_utc: utc,
            candle_date_time_kst: kst,
            opening_price: parse_decimal(&self.opening_price)?,
            high_price: parse_decimal(&self.high_price)?,
            low_price: parse_decimal(&self.low_price)?,
            trade_price: parse_decimal(&self.trade_price)?,
            timestamp: self.timestamp,
            candle_acc_trade_price: parse_decimal(&self.candle_acc_trade_price)?,
            candle_acc_trade_volume: parse_decimal(&self.candle_acc_trade_volume)?,
            unit: self.unit.map(|u| u as u32),
            prev_closing_price: parse_optional_decimal(&self.prev_closing_price)?,
            change_price: parse_optional_decimal(&self.change_price)?,
            change_rate: parse_optional_decimal(&self.change_rate)?,
            first_day_of_period: self.first_day_of_period.clone(),
        })
    }
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| DataError::InvalidData(format!("숫자 복원 실패 '{}': {}", value, e)))
}

fn parse_optional_decimal(value: &Option<String>) -> Result<Option<Decimal>> {
    value.as_deref().map(parse_decimal).transpose()
}

/// SQLite 캔들 저장소.
#[derive(Clone)]
pub struct SqliteCandleRepository {
    pool: SqlitePool,
}

impl SqliteCandleRepository {
    /// 기존 연결 풀로 생성.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 데이터베이스 URL로 연결 (파일이 없으면 생성).
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DataError::ConnectionError(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!(database_url = database_url, "캔들 저장소 연결");
        Ok(Self { pool })
    }

    /// 메모리 DB로 생성하고 스키마를 초기화합니다 (테스트/임시 수집용).
    ///
    /// 메모리 DB는 연결마다 별도이므로 연결 하나만 유지합니다.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    /// 연결 풀 조회.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 테이블과 인덱스 생성.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candles (
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                candle_time INTEGER NOT NULL,
                candle_date_time_kst TEXT NOT NULL,
                opening_price TEXT NOT NULL,
                high_price TEXT NOT NULL,
                low_price TEXT NOT NULL,
                trade_price TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                candle_acc_trade_price TEXT NOT NULL,
                candle_acc_trade_volume TEXT NOT NULL,
                unit INTEGER,
                prev_closing_price TEXT,
                change_price TEXT,
                change_rate TEXT,
                first_day_of_period TEXT,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (symbol, timeframe, candle_time)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_candles_time ON candles (symbol, timeframe, candle_time DESC)",
        )
        .execute(&self.pool)
        .await?;

        debug!("candles 스키마 준비 완료");
        Ok(())
    }

    /// 저장된 캔들 수 조회.
    pub async fn count_candles(&self, symbol: &str, timeframe: Timeframe) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM candles WHERE symbol = ?1 AND timeframe = ?2")
                .bind(symbol)
                .bind(timeframe.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    fn records_to_candles(records: Vec<CandleRecord>) -> Result<Vec<Candle>> {
        records.iter().map(CandleRecord::to_candle).collect()
    }
}

#[async_trait]
impl CandleRepository for SqliteCandleRepository {
    #[instrument(skip(self, candles), fields(count = candles.len()))]
    async fn save_candle_chunk(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<usize> {
        if candles.is_empty() {
            return Ok(0);
        }

        let tf_str = timeframe.as_str();
        let mut tx = self.pool.begin().await?;
        let mut saved = 0usize;

        for candle in candles {
            let result = sqlx::query(
                r#"
                INSERT INTO candles (
                    symbol, timeframe, candle_time, candle_date_time_kst,
                    opening_price, high_price, low_price, trade_price, timestamp,
                    candle_acc_trade_price, candle_acc_trade_volume,
                    unit, prev_closing_price, change_price, change_rate, first_day_of_period
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                ON CONFLICT (symbol, timeframe, candle_time) DO UPDATE SET
                    candle_date_time_kst = excluded.candle_date_time_kst,
                    opening_price = excluded.opening_price,
                    high_price = excluded.high_price,
                    low_price = excluded.low_price,
                    trade_price = excluded.trade_price,
                    timestamp = excluded.timestamp,
                    candle_acc_trade_price = excluded.candle_acc_trade_price,
                    candle_acc_trade_volume = excluded.candle_acc_trade_volume,
                    unit = excluded.unit,
                    prev_closing_price = excluded.prev_closing_price,
                    change_price = excluded.change_price,
                    change_rate = excluded.change_rate,
                    first_day_of_period = excluded.first_day_of_period,
                    updated_at = datetime('now')
                "#,
            )
            .bind(symbol)
            .bind(tf_str)
            .bind(candle.candle_date_time_utc.timestamp())
            .bind(candle.candle_date_time_kst.format(KST_FORMAT).to_string())
            .bind(candle.opening_price.to_string())
            .bind(candle.high_price.to_string())
            .bind(candle.low_price.to_string())
            .bind(candle.trade_price.to_string())
            .bind(candle.timestamp)
            .bind(candle.candle_acc_trade_price.to_string())
            .bind(candle.candle_acc_trade_volume.to_string())
            .bind(candle.unit.map(i64::from))
            .bind(candle.prev_closing_price.map(|d| d.to_string()))
            .bind(candle.change_price.map(|d| d.to_string()))
            .bind(candle.change_rate.map(|d| d.to_string()))
            .bind(candle.first_day_of_period.clone())
            .execute(&mut *tx)
            .await
            .map_err(|e| DataError::InsertError(e.to_string()))?;

            saved += result.rows_affected() as usize;
        }

        tx.commit().await?;

        debug!(
            symbol = symbol,
            timeframe = %tf_str,
            saved = saved,
            "캔들 저장"
        );

        Ok(saved)
    }

    async fn get_candles_by_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        oldest: DateTime<Utc>,
        newest: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let sql = format!(
            "SELECT {} FROM candles
             WHERE symbol = ?1 AND timeframe = ?2 AND candle_time BETWEEN ?3 AND ?4
             ORDER BY candle_time DESC",
            SELECT_COLUMNS
        );

        let records: Vec<CandleRecord> = sqlx::query_as(&sql)
            .bind(symbol)
            .bind(timeframe.as_str())
            .bind(oldest.timestamp())
            .bind(newest.timestamp())
            .fetch_all(&self.pool)
            .await?;

        Self::records_to_candles(records)
    }

    async fn get_latest_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let sql = format!(
            "SELECT {} FROM candles
             WHERE symbol = ?1 AND timeframe = ?2
             ORDER BY candle_time DESC
             LIMIT ?3",
            SELECT_COLUMNS
        );

        let records: Vec<CandleRecord> = sqlx::query_as(&sql)
            .bind(symbol)
            .bind(timeframe.as_str())
            .bind(count as i64)
            .fetch_all(&self.pool)
            .await?;

        Self::records_to_candles(records)
    }

    async fn get_candle_times_in_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        oldest: DateTime<Utc>,
        newest: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT candle_time FROM candles
             WHERE symbol = ?1 AND timeframe = ?2 AND candle_time BETWEEN ?3 AND ?4
             ORDER BY candle_time DESC",
        )
        .bind(symbol)
        .bind(timeframe.as_str())
        .bind(oldest.timestamp())
        .bind(newest.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(secs,)| {
                Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
                    DataError::InvalidData(format!("잘못된 candle_time: {}", secs))
                })
            })
            .collect()
    }
}
