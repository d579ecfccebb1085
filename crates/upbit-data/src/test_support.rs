use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use upbit_core::Candle;

/// 테스트용 KRW-BTC 캔들.
pub fn candle_at(time: DateTime<Utc>, price: i64) -> Candle {
    Candle {
        market: "KRW-BTC".to_string(),
        candle_date_time_utc: time,
        candle_date_time_kst: (time + Duration::hours(9)).naive_utc(),
        opening_price: Decimal::from(price),
        high_price: Decimal::from(price + 10),
        low_price: Decimal::from(price - 10),
        trade_price: Decimal::new(price * 10 + 5, 1),
        timestamp: time.timestamp_millis(),
        candle_acc_trade_price: Decimal::from(price * 3),
        candle_acc_trade_volume: Decimal::new(12345, 4),
        unit: Some(1),
        prev_closing_price: None,
        change_price: None,
        change_rate: None,
        first_day_of_period: None,
    }
}
