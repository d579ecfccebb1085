//! 업비트 캔들 수집 CLI.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use upbit_collector::modules::{self, CandleTarget};
use upbit_collector::{CandleDataProvider, CollectionPhase, CollectorConfig};
use upbit_core::{init_logging, LogFormat, Timeframe};
use upbit_data::{CandleRepository, OverlapAnalyzer, SqliteCandleRepository};
use upbit_exchange::UpbitClient;

#[derive(Parser)]
#[command(name = "upbit-collector")]
#[command(about = "Upbit candle collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 필터 (예: info, upbit_collector=debug)
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// 마켓 코드 (쉼표로 구분, 예: "KRW-BTC,KRW-ETH")
    #[arg(long)]
    markets: String,

    /// 타임프레임 (1s, 1m, 3m, 5m, 10m, 15m, 30m, 1h, 4h, 1d, 1w, 1M, 1y)
    #[arg(long, short = 't', default_value = "1m")]
    timeframe: Timeframe,

    /// 수집할 캔들 수
    #[arg(long)]
    count: Option<usize>,

    /// 기준 시각 (RFC 3339, 이 시각의 캔들부터 과거로)
    #[arg(long)]
    to: Option<DateTime<Utc>>,

    /// 종료 시각 (RFC 3339, 이 시각의 캔들까지)
    #[arg(long)]
    end: Option<DateTime<Utc>>,
}

impl RequestArgs {
    fn targets(&self) -> Vec<CandleTarget> {
        self.markets
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|market| CandleTarget {
                market: market.to_string(),
                timeframe: self.timeframe,
                count: self.count,
                to: self.to,
                end: self.end,
            })
            .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// 수집 계획 출력 (API 호출 없음)
    Plan(RequestArgs),

    /// 캔들 수집
    Collect(RequestArgs),

    /// 저장된 최신 캔들 출력
    Latest {
        #[arg(long)]
        market: String,

        #[arg(long, short = 't', default_value = "1m")]
        timeframe: Timeframe,

        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 설정 로드
    let config = CollectorConfig::from_env()?;

    // 로깅 초기화
    let mut log_config = config.log.clone();
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Upbit Candle Collector 시작");
    tracing::debug!(database_url = %config.database_url, "설정 로드 완료");

    // DB 연결
    if let Some(parent) = config.database_path().as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("데이터 디렉터리 생성 실패: {}", parent.display()))?;
        }
    }
    let repository = SqliteCandleRepository::connect(&config.database_url).await?;
    repository.init_schema().await?;
    let repository: Arc<dyn CandleRepository> = Arc::new(repository);

    let api = Arc::new(UpbitClient::new(config.upbit.clone())?);
    let overlap = Arc::new(OverlapAnalyzer::new(Arc::clone(&repository)));
    let mut provider = CandleDataProvider::new(repository, api, overlap, config.provider.clone())?;

    // 명령 실행
    match cli.command {
        Commands::Plan(args) => {
            for target in args.targets() {
                let plan = provider.plan_collection(
                    &target.market,
                    target.timeframe,
                    target.count,
                    target.to,
                    target.end,
                )?;
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
        }
        Commands::Collect(args) => {
            let targets = args.targets();
            let mut failed = 0usize;

            for (idx, target) in targets.iter().enumerate() {
                tracing::info!(
                    market = %target.market,
                    progress = format!("{}/{}", idx + 1, targets.len()),
                    "마켓 수집 시작"
                );

                match modules::collect_with_progress(&mut provider, target).await {
                    Ok(status) => {
                        if status.phase != CollectionPhase::Completed {
                            failed += 1;
                        }
                        println!("{}", serde_json::to_string_pretty(&status)?);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!(market = %target.market, error = %e, "수집 실패");
                    }
                }

                provider.cleanup_completed_collections(config.retention());
            }

            if failed > 0 {
                anyhow::bail!("{}개 마켓 수집 실패", failed);
            }
        }
        Commands::Latest {
            market,
            timeframe,
            count,
        } => {
            let candles = modules::latest_candles(&provider, &market, timeframe, count).await?;
            for candle in &candles {
                println!(
                    "{}  O {}  H {}  L {}  C {}  V {}",
                    candle.candle_date_time_utc.format("%Y-%m-%d %H:%M:%S"),
                    candle.opening_price,
                    candle.high_price,
                    candle.low_price,
                    candle.trade_price,
                    candle.candle_acc_trade_volume,
                );
            }
            println!("\n{} {}: {}개 캔들", market, timeframe, candles.len());
        }
    }

    tracing::info!("Upbit Candle Collector 종료");
    Ok(())
}
