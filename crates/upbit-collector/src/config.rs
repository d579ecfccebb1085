//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;

use upbit_core::LogConfig;
use upbit_exchange::UpbitConfig;

use crate::error::CollectorError;
use crate::provider::ProviderConfig;
use crate::Result;

/// 기본 데이터베이스 URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/market_data.sqlite3";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 업비트 API 설정
    pub upbit: UpbitConfig,
    /// 청크 분할 설정
    pub provider: ProviderConfig,
    /// 완료된 수집 보관 시간 (분)
    pub retention_minutes: i64,
    /// 로깅 설정
    pub log: LogConfig,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = ProviderConfig::default();
        let provider = ProviderConfig {
            chunk_size: env_var_parse("CANDLE_CHUNK_SIZE", defaults.chunk_size),
            requests_per_second: env_var_parse(
                "CANDLE_REQUESTS_PER_SECOND",
                defaults.requests_per_second,
            ),
        };
        provider.validate()?;

        let retention_minutes = env_var_parse("COLLECTION_RETENTION_MINUTES", 60);
        if retention_minutes < 0 {
            return Err(CollectorError::Config(format!(
                "COLLECTION_RETENTION_MINUTES는 0 이상이어야 합니다: {}",
                retention_minutes
            )));
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            upbit: UpbitConfig::from_env(),
            provider,
            retention_minutes,
            log: LogConfig::from_env(),
        })
    }

    /// 완료된 수집 보관 시간
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.retention_minutes)
    }

    /// SQLite 파일 경로 (메모리 DB면 `None`)
    pub fn database_path(&self) -> Option<PathBuf> {
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.starts_with(":memory:") {
            None
        } else {
            Some(PathBuf::from(path))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_url(url: &str) -> CollectorConfig {
        CollectorConfig {
            database_url: url.to_string(),
            upbit: UpbitConfig::default(),
            provider: ProviderConfig::default(),
            retention_minutes: 60,
            log: LogConfig::default(),
        }
    }

    #[test]
    fn test_database_path() {
        assert_eq!(
            config_with_url(DEFAULT_DATABASE_URL).database_path(),
            Some(PathBuf::from("data/market_data.sqlite3"))
        );
        assert_eq!(
            config_with_url("sqlite:candles.db?mode=rwc").database_path(),
            Some(PathBuf::from("candles.db"))
        );
        assert_eq!(config_with_url("sqlite::memory:").database_path(), None);
    }

    #[test]
    fn test_env_var_parse_falls_back_on_garbage() {
        std::env::set_var("UPBIT_COLLECTOR_TEST_PARSE", "not-a-number");
        assert_eq!(env_var_parse("UPBIT_COLLECTOR_TEST_PARSE", 42usize), 42);
        std::env::remove_var("UPBIT_COLLECTOR_TEST_PARSE");
        assert_eq!(env_var_parse("UPBIT_COLLECTOR_TEST_PARSE_MISSING", 7i64), 7);
    }

    #[test]
    fn test_retention() {
        assert_eq!(config_with_url(DEFAULT_DATABASE_URL).retention(), chrono::Duration::minutes(60));
    }
}
