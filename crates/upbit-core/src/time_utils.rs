//! 캔들 경계 시간 계산 유틸리티.
//!
//! 모든 계산은 UTC 기준이며 업비트의 `candle_date_time_utc`와 같은 격자를 사용합니다.
//!
//! - 초/분/시간/일봉: epoch 기준으로 단위 배수에 내림
//! - 주봉: 월요일 00:00 UTC
//! - 월봉: 매월 1일 00:00 UTC
//! - 연봉: 1월 1일 00:00 UTC

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::Timeframe;

/// 타임스탬프를 타임프레임의 캔들 시작 시각으로 내림합니다.
///
/// 이미 정렬된 값에 다시 적용해도 결과가 같습니다.
pub fn align_to_candle_boundary(timestamp: DateTime<Utc>, timeframe: Timeframe) -> DateTime<Utc> {
    match timeframe {
        Timeframe::W1 => {
            let date = timestamp.date_naive();
            let back = date.weekday().num_days_from_monday() as u64;
            let monday = date
                .checked_sub_days(chrono::Days::new(back))
                .unwrap_or(date);
            midnight_utc(monday)
        }
        Timeframe::MN1 => first_of_month(timestamp.year(), timestamp.month()),
        Timeframe::Y1 => first_of_month(timestamp.year(), 1),
        _ => {
            let secs = timeframe.fixed_secs().unwrap_or(1);
            let floored = timestamp.timestamp().div_euclid(secs) * secs;
            Utc.timestamp_opt(floored, 0).single().unwrap_or(timestamp)
        }
    }
}

/// `base`에서 `tick_count`개 캔들만큼 떨어진 시각을 반환합니다.
///
/// 음수는 과거, 양수는 미래 방향입니다. 표현 범위를 벗어나면 경계값으로 포화됩니다.
pub fn get_time_by_ticks(base: DateTime<Utc>, timeframe: Timeframe, tick_count: i64) -> DateTime<Utc> {
    if tick_count == 0 {
        return base;
    }

    let saturated = if tick_count > 0 {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    };

    if let Some(step_months) = timeframe.calendar_months() {
        let total = tick_count.unsigned_abs().checked_mul(step_months as u64);
        let months = match total.and_then(|m| u32::try_from(m).ok()) {
            Some(m) => Months::new(m),
            None => return saturated,
        };
        let shifted = if tick_count > 0 {
            base.checked_add_months(months)
        } else {
            base.checked_sub_months(months)
        };
        return shifted.unwrap_or(saturated);
    }

    let secs = timeframe.fixed_secs().unwrap_or(1);
    tick_count
        .checked_mul(secs)
        .and_then(Duration::try_seconds)
        .and_then(|delta| base.checked_add_signed(delta))
        .unwrap_or(saturated)
}

/// `[end, start]` 구간(양끝 포함)에 들어가는 캔들 개수.
///
/// 두 시각은 먼저 캔들 경계로 정렬됩니다. `start < end`이면 0을 반환합니다.
pub fn calculate_expected_count(start: DateTime<Utc>, end: DateTime<Utc>, timeframe: Timeframe) -> u64 {
    let start = align_to_candle_boundary(start, timeframe);
    let end = align_to_candle_boundary(end, timeframe);

    if start < end {
        return 0;
    }

    if let Some(step_months) = timeframe.calendar_months() {
        let start_index = start.year() as i64 * 12 + start.month0() as i64;
        let end_index = end.year() as i64 * 12 + end.month0() as i64;
        return ((start_index - end_index) / step_months as i64) as u64 + 1;
    }

    let secs = timeframe.fixed_secs().unwrap_or(1);
    ((start - end).num_seconds() / secs) as u64 + 1
}

/// 타임프레임 문자열을 기간으로 변환합니다.
///
/// 월봉/연봉은 30일/365일 근사값을 돌려줍니다.
pub fn get_timeframe_delta(timeframe: &str) -> CoreResult<Duration> {
    let tf: Timeframe = timeframe.parse()?;
    timeframe_delta(tf)
}

/// [`Timeframe`]의 기간.
pub fn timeframe_delta(timeframe: Timeframe) -> CoreResult<Duration> {
    let secs = timeframe.as_secs() as i64;
    Duration::try_seconds(secs)
        .ok_or_else(|| CoreError::UnsupportedTimeframe(timeframe.to_string()))
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(midnight_utc)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
