use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use mirrorvault::api::router::create_router;
use mirrorvault::chain::onchain::{OnchainExecutor, OnchainOptions};
use mirrorvault::chain::relay::RelayExecutor;
use mirrorvault::chain::ExecutionProvider;
use mirrorvault::config::{AppConfig, ExecutionBackend};
use mirrorvault::db::{self, PgRuleStore};
use mirrorvault::engine::{CopyTradeEngine, EngineConfig, ExecutionSettings, SellSizing, WorkerAuth};
use mirrorvault::indexer::{IndexerClient, Pagination};
use mirrorvault::models::parse_address;
use mirrorvault::services::scheduler::run_scheduler;
use mirrorvault::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = mirrorvault::metrics::init_metrics();

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    // --- Collaborators ---
    let store = Arc::new(PgRuleStore::new(pool));
    let source = Arc::new(IndexerClient::new(
        http.clone(),
        config.indexer_api_url.clone(),
        config.indexer_api_key.clone(),
    ));
    let provider = build_provider(&config, http).await?;

    let engine_config = EngineConfig {
        pagination: Pagination {
            max_pages: config.indexer_max_pages,
            page_size: config.indexer_page_size,
        },
        cycle_timeout: Duration::from_secs(config.cycle_timeout_secs),
        rule_concurrency: config.rule_concurrency,
        settlement_token: optional_address("SETTLEMENT_TOKEN", config.settlement_token.as_deref())?,
        execution: ExecutionSettings {
            slippage_tolerance_pct: config.slippage_tolerance_pct,
            fee_tier: config.swap_fee_tier,
            sizing: SellSizing::from_percent(config.sell_percent),
        },
    };

    tracing::info!(
        backend = ?config.execution_backend,
        dry_run = config.dry_run,
        sizing = %engine_config.execution.sizing,
        concurrency = engine_config.rule_concurrency,
        "Copy-trade engine configured"
    );

    let engine = Arc::new(CopyTradeEngine::new(
        store,
        source,
        provider,
        WorkerAuth::new(&config.worker_secret),
        engine_config,
    ));

    // --- Optional in-process scheduler ---
    if config.scheduler_enabled {
        if config.scheduler_identities.is_empty() {
            tracing::warn!("SCHEDULER_ENABLED=true but SCHEDULER_IDENTITIES is empty; scheduler not started");
        } else {
            tokio::spawn(run_scheduler(
                Arc::clone(&engine),
                config.worker_secret.clone(),
                config.scheduler_identities.clone(),
                config.scheduler_interval_secs,
            ));
        }
    } else {
        tracing::info!("Scheduler disabled (SCHEDULER_ENABLED=false)");
    }

    let state = AppState {
        engine,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

async fn build_provider(
    config: &AppConfig,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn ExecutionProvider>> {
    match config.execution_backend {
        ExecutionBackend::Onchain => {
            let executor = OnchainExecutor::connect(OnchainOptions {
                rpc_url: config.rpc_url.clone(),
                private_key: config.agent_private_key.clone(),
                agent_address: config.agent_address.clone(),
                dry_run: config.dry_run,
                swap_router: optional_address("SWAP_ROUTER_ADDRESS", config.swap_router_address.as_deref())?,
                quoter: optional_address("QUOTER_ADDRESS", config.quoter_address.as_deref())?,
            })
            .await
            .context("failed to connect on-chain executor")?;
            Ok(Arc::new(executor))
        }
        ExecutionBackend::Relay => {
            let url = config
                .relay_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("RELAY_URL must be set when EXECUTION_BACKEND=relay"))?;
            tracing::info!(relay = %url, "Using relay executor");
            Ok(Arc::new(RelayExecutor::new(http, url, config.relay_api_key.clone())))
        }
    }
}

fn optional_address(name: &str, raw: Option<&str>) -> anyhow::Result<Option<alloy::primitives::Address>> {
    raw.map(|s| parse_address(s).ok_or_else(|| anyhow::anyhow!("{name} is not a valid address: {s}")))
        .transpose()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| !v.eq_ignore_ascii_case("text"))
        .unwrap_or(true);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
