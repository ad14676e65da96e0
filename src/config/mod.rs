use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Which wallet/swap backend executes mirrored sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionBackend {
    Onchain,
    Relay,
}

impl ExecutionBackend {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "relay" => ExecutionBackend::Relay,
            _ => ExecutionBackend::Onchain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub worker_secret: String,

    // Indexer
    pub indexer_api_url: Option<String>,
    pub indexer_api_key: Option<String>,
    pub indexer_max_pages: u32,
    pub indexer_page_size: u32,

    // Execution provider
    pub execution_backend: ExecutionBackend,
    pub rpc_url: String,
    pub agent_private_key: Option<String>,
    pub agent_address: Option<String>,
    pub relay_url: Option<String>,
    pub relay_api_key: Option<String>,
    pub dry_run: bool,
    pub settlement_token: Option<String>,
    pub swap_router_address: Option<String>,
    pub quoter_address: Option<String>,

    // Engine
    pub slippage_tolerance_pct: Decimal,
    pub swap_fee_tier: u32,
    pub sell_percent: u8,
    pub cycle_timeout_secs: u64,
    pub rule_concurrency: usize,

    // In-process scheduler
    pub scheduler_enabled: bool,
    pub scheduler_interval_secs: u64,
    pub scheduler_identities: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            worker_secret: env::var("WORKER_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| anyhow::anyhow!("WORKER_SECRET must be set"))?,

            indexer_api_url: optional("INDEXER_API_URL"),
            indexer_api_key: optional("INDEXER_API_KEY"),
            indexer_max_pages: parse_or("INDEXER_MAX_PAGES", 5),
            indexer_page_size: parse_or("INDEXER_PAGE_SIZE", 100),

            execution_backend: ExecutionBackend::from_str(
                &env::var("EXECUTION_BACKEND").unwrap_or_else(|_| "onchain".into()),
            ),
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| "https://mainnet.base.org".into()),
            agent_private_key: optional("AGENT_PRIVATE_KEY"),
            agent_address: optional("AGENT_ADDRESS"),
            relay_url: optional("RELAY_URL"),
            relay_api_key: optional("RELAY_API_KEY"),
            dry_run: parse_or("DRY_RUN", true),
            settlement_token: optional("SETTLEMENT_TOKEN"),
            swap_router_address: optional("SWAP_ROUTER_ADDRESS"),
            quoter_address: optional("QUOTER_ADDRESS"),

            slippage_tolerance_pct: parse_or("SLIPPAGE_TOLERANCE_PCT", Decimal::ONE),
            swap_fee_tier: parse_or("SWAP_FEE_TIER", 3_000),
            sell_percent: parse_or("SELL_PERCENT", 100),
            cycle_timeout_secs: parse_or("CYCLE_TIMEOUT_SECS", 240),
            rule_concurrency: parse_or("RULE_CONCURRENCY", 1),

            scheduler_enabled: parse_or("SCHEDULER_ENABLED", false),
            scheduler_interval_secs: parse_or("SCHEDULER_INTERVAL_SECS", 300),
            scheduler_identities: split_list(&env::var("SCHEDULER_IDENTITIES").unwrap_or_default()),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Read and parse `key`, falling back to `default` when unset or malformed.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
