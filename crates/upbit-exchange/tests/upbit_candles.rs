//! Integration tests for the Upbit candle client against a mock HTTP server.

use chrono::{TimeZone, Utc};
use mockito::Matcher;
use rust_decimal_macros::dec;
use upbit_core::Timeframe;
use upbit_exchange::{CandleApiClient, ExchangeError, UpbitClient, UpbitConfig};

const MINUTE_BODY: &str = r#"[
  {
    "market": "KRW-BTC",
    "candle_date_time_utc": "2024-01-01T00:09:00",
    "candle_date_time_kst": "2024-01-01T09:09:00",
    "opening_price": 58000000.0,
    "high_price": 58100000.0,
    "low_price": 57950000.0,
    "trade_price": 58050000.0,
    "timestamp": 1704067799000,
    "candle_acc_trade_price": 123456789.5,
    "candle_acc_trade_volume": 2.125,
    "unit": 1
  },
  {
    "market": "KRW-BTC",
    "candle_date_time_utc": "2024-01-01T00:08:00",
    "candle_date_time_kst": "2024-01-01T09:08:00",
    "opening_price": 57900000.0,
    "high_price": 58000000.0,
    "low_price": 57900000.0,
    "trade_price": 58000000.0,
    "timestamp": 1704067739000,
    "candle_acc_trade_price": 98765432.0,
    "candle_acc_trade_volume": 1.7,
    "unit": 1
  }
]"#;

fn test_config(url: String) -> UpbitConfig {
    UpbitConfig {
        base_url: url,
        timeout_secs: 5,
        max_retries: 1,
        retry_delay_cap_ms: 0,
        min_request_interval_ms: 0,
    }
}

#[tokio::test]
async fn test_fetch_minute_candles_with_to() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/candles/minutes/1")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("market".into(), "KRW-BTC".into()),
            Matcher::UrlEncoded("count".into(), "2".into()),
            Matcher::UrlEncoded("to".into(), "2024-01-01T00:10:00Z".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(MINUTE_BODY)
        .create_async()
        .await;

    let client = UpbitClient::new(test_config(server.url())).unwrap();
    let to = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
    let candles = client
        .fetch_candles("KRW-BTC", Timeframe::M1, 2, Some(to))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(candles.len(), 2);
    assert_eq!(
        candles[0].candle_date_time_utc,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 9, 0).unwrap()
    );
    assert!(candles[0].candle_date_time_utc > candles[1].candle_date_time_utc);
    assert_eq!(candles[0].trade_price, dec!(58050000));
    assert_eq!(candles[0].candle_acc_trade_volume, dec!(2.125));
    assert_eq!(candles[1].unit, Some(1));
}

#[tokio::test]
async fn test_fetch_dispatches_by_timeframe() {
    let mut server = mockito::Server::new_async().await;
    let days = server
        .mock("GET", "/v1/candles/days")
        .match_query(Matcher::UrlEncoded("count".into(), "1".into()))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let hours = server
        .mock("GET", "/v1/candles/minutes/240")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let client = UpbitClient::new(test_config(server.url())).unwrap();
    let empty = client
        .fetch_candles("KRW-ETH", Timeframe::D1, 1, None)
        .await
        .unwrap();
    assert!(empty.is_empty());
    client
        .fetch_candles("KRW-ETH", Timeframe::H4, 5, None)
        .await
        .unwrap();

    days.assert_async().await;
    hours.assert_async().await;
}

#[tokio::test]
async fn test_api_error_body_is_parsed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/candles/days")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"name":"Code not found","message":"market not found"}}"#)
        .create_async()
        .await;

    let client = UpbitClient::new(test_config(server.url())).unwrap();
    let err = client
        .get_candles_days("KRW-NOPE", 10, None)
        .await
        .unwrap_err();

    match err {
        ExchangeError::ApiError { status, name, message } => {
            assert_eq!(status, 404);
            assert_eq!(name, "Code not found");
            assert_eq!(message, "market not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retried_then_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/candles/weeks")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("Too many API requests.")
        .expect(2)
        .create_async()
        .await;

    let client = UpbitClient::new(test_config(server.url())).unwrap();
    let err = client
        .get_candles_weeks("KRW-BTC", 3, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExchangeError::RateLimited));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_payload_is_parse_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/candles/seconds")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"market":"KRW-BTC"}]"#)
        .create_async()
        .await;

    let client = UpbitClient::new(test_config(server.url())).unwrap();
    let err = client
        .fetch_candles("KRW-BTC", Timeframe::S1, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::ParseError(_)));
}
