//! 업비트 거래소 커넥터.
//!
//! 시세 캔들 조회용 공개 REST API만 구현합니다. 인증이 필요 없는 API이므로
//! 키 관리는 하지 않습니다.
//!
//! 업비트 캔들 API 규칙:
//! - 1회 최대 200개, 최신 캔들부터(newest-first) 반환
//! - `to` 파라미터는 exclusive: `to` 시각보다 이전 캔들만 반환
//! - 시세 조회 한도는 초당 10회

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use upbit_core::{Candle, Timeframe};

use crate::traits::{CandleApiClient, ExchangeResult, MAX_CANDLES_PER_REQUEST};
use crate::ExchangeError;

/// 업비트 분봉 API가 허용하는 단위.
const MINUTE_UNITS: [u32; 8] = [1, 3, 5, 10, 15, 30, 60, 240];

// ============================================================================
// 설정
// ============================================================================

/// 업비트 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct UpbitConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 재시도 가능한 에러의 최대 재시도 횟수
    pub max_retries: u32,
    /// 재시도 대기 시간 상한 (밀리초)
    pub retry_delay_cap_ms: u64,
    /// 요청 간 최소 간격 (밀리초)
    pub min_request_interval_ms: u64,
}

impl Default for UpbitConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.upbit.com".to_string(),
            timeout_secs: 10,
            max_retries: 3,
            retry_delay_cap_ms: 5_000,
            min_request_interval_ms: 100,
        }
    }
}

impl UpbitConfig {
    /// 기본 URL을 지정하여 생성.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// 환경 변수에서 생성 (없는 값은 기본값 사용).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("UPBIT_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: env_parse("UPBIT_TIMEOUT_SECS", defaults.timeout_secs),
            max_retries: env_parse("UPBIT_MAX_RETRIES", defaults.max_retries),
            retry_delay_cap_ms: env_parse("UPBIT_RETRY_DELAY_CAP_MS", defaults.retry_delay_cap_ms),
            min_request_interval_ms: env_parse(
                "UPBIT_MIN_REQUEST_INTERVAL_MS",
                defaults.min_request_interval_ms,
            ),
        }
    }

    /// 요청 간 최소 간격.
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpbitCandleResponse {
    market: String,
    candle_date_time_utc: String,
    candle_date_time_kst: String,
    opening_price: Decimal,
    high_price: Decimal,
    low_price: Decimal,
    trade_price: Decimal,
    timestamp: i64,
    candle_acc_trade_price: Decimal,
    candle_acc_trade_volume: Decimal,
    #[serde(default)]
    unit: Option<u32>,
    #[serde(default)]
    prev_closing_price: Option<Decimal>,
    #[serde(default)]
    change_price: Option<Decimal>,
    #[serde(default)]
    change_rate: Option<Decimal>,
    #[serde(default)]
    first_day_of_period: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpbitErrorBody {
    error: UpbitErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UpbitErrorDetail {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

impl UpbitCandleResponse {
    fn into_candle(self) -> ExchangeResult<Candle> {
        let utc = parse_upbit_datetime(&self.candle_date_time_utc)?;
        let kst = parse_upbit_datetime(&self.candle_date_time_kst)?;

        Ok(Candle {
            market: self.market,
            candle_date_time_utc: utc.and_utc(),
            candle_date_time_kst: kst,
            opening_price: self.opening_price,
            high_price: self.high_price,
            low_price: self.low_price,
            trade_price: self.trade_price,
            timestamp: self.timestamp,
            candle_acc_trade_price: self.candle_acc_trade_price,
            candle_acc_trade_volume: self.candle_acc_trade_volume,
            unit: self.unit,
            prev_closing_price: self.prev_closing_price,
            change_price: self.change_price,
            change_rate: self.change_rate,
            first_day_of_period: self.first_day_of_period,
        })
    }
}

/// 업비트 시각 문자열("2024-01-01T00:00:00") 파싱.
fn parse_upbit_datetime(s: &str) -> ExchangeResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| ExchangeError::ParseError(format!("캔들 시각 파싱 실패 '{}': {}", s, e)))
}

// ============================================================================
// 업비트 클라이언트
// ============================================================================

/// 업비트 시세 REST 클라이언트.
///
/// 요청 간격 제한과 재시도는 이 계층에서 처리합니다.
pub struct UpbitClient {
    config: UpbitConfig,
    client: Client,
    last_request: Mutex<Option<Instant>>,
}

impl UpbitClient {
    /// 새 업비트 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: UpbitConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        Ok(Self {
            config,
            client,
            last_request: Mutex::new(None),
        })
    }

    /// 설정 조회.
    pub fn config(&self) -> &UpbitConfig {
        &self.config
    }

    /// 초봉 조회.
    pub async fn get_candles_seconds(
        &self,
        market: &str,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.get_candles("/v1/candles/seconds", market, count, to).await
    }

    /// 분봉 조회 (`unit`: 1, 3, 5, 10, 15, 30, 60, 240).
    pub async fn get_candles_minutes(
        &self,
        unit: u32,
        market: &str,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        if !MINUTE_UNITS.contains(&unit) {
            return Err(ExchangeError::InvalidRequest(format!(
                "지원하지 않는 분봉 단위: {}",
                unit
            )));
        }
        let endpoint = format!("/v1/candles/minutes/{}", unit);
        self.get_candles(&endpoint, market, count, to).await
    }

    /// 일봉 조회.
    pub async fn get_candles_days(
        &self,
        market: &str,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.get_candles("/v1/candles/days", market, count, to).await
    }

    /// 주봉 조회.
    pub async fn get_candles_weeks(
        &self,
        market: &str,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.get_candles("/v1/candles/weeks", market, count, to).await
    }

    /// 월봉 조회.
    pub async fn get_candles_months(
        &self,
        market: &str,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.get_candles("/v1/candles/months", market, count, to).await
    }

    /// 연봉 조회.
    pub async fn get_candles_years(
        &self,
        market: &str,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        self.get_candles("/v1/candles/years", market, count, to).await
    }

    async fn get_candles(
        &self,
        endpoint: &str,
        market: &str,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        if count == 0 || count > MAX_CANDLES_PER_REQUEST {
            return Err(ExchangeError::InvalidRequest(format!(
                "count는 1~{} 범위여야 합니다: {}",
                MAX_CANDLES_PER_REQUEST, count
            )));
        }

        let mut params = vec![("market", market.to_string()), ("count", count.to_string())];
        if let Some(to) = to {
            params.push(("to", to.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }

        let raw: Vec<UpbitCandleResponse> = self.public_get(endpoint, &params).await?;
        let candles = raw
            .into_iter()
            .map(UpbitCandleResponse::into_candle)
            .collect::<ExchangeResult<Vec<_>>>()?;

        debug!(
            endpoint = endpoint,
            market = market,
            requested = count,
            received = candles.len(),
            "캔들 조회 완료"
        );

        Ok(candles)
    }

    /// 공개 API 요청 (재시도 포함).
    async fn public_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let mut attempt = 0;
        loop {
            match self.send_get(endpoint, params).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = e
                        .retry_delay_ms()
                        .unwrap_or(1000)
                        .min(self.config.retry_delay_cap_ms);
                    warn!(
                        endpoint = endpoint,
                        attempt = attempt,
                        delay_ms = delay,
                        error = %e,
                        "업비트 요청 실패, 재시도"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.throttle().await;

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// 요청 간 최소 간격 유지.
    async fn throttle(&self) {
        let interval = self.config.min_request_interval();
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExchangeError::RateLimited);
        }

        if !status.is_success() {
            let (name, message) = match serde_json::from_str::<UpbitErrorBody>(&body) {
                Ok(err) => (err.error.name, err.error.message),
                Err(_) => ("unknown".to_string(), body),
            };
            return Err(ExchangeError::ApiError {
                status: status.as_u16(),
                name,
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CandleApiClient for UpbitClient {
    async fn fetch_candles(
        &self,
        market: &str,
        timeframe: Timeframe,
        count: usize,
        to: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<Candle>> {
        if let Some(unit) = timeframe.minute_unit() {
            return self.get_candles_minutes(unit, market, count, to).await;
        }

        match timeframe {
            Timeframe::S1 => self.get_candles_seconds(market, count, to).await,
            Timeframe::D1 => self.get_candles_days(market, count, to).await,
            Timeframe::W1 => self.get_candles_weeks(market, count, to).await,
            Timeframe::MN1 => self.get_candles_months(market, count, to).await,
            Timeframe::Y1 => self.get_candles_years(market, count, to).await,
            other => Err(ExchangeError::InvalidRequest(format!(
                "지원하지 않는 타임프레임: {}",
                other
            ))),
        }
    }
}
