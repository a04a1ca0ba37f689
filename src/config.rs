//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Markets that are never evaluated (thin books, degenerate outcome sets).
pub const DEFAULT_EXCLUDED_MARKETS: &[&str] = &[
    "Half Time Winning Margin",
    "To Score 2 Or More Goals",
    "To Score A Hat-Trick.",
    "Last Goalscorer",
    "To Score 3+ Goals",
    "To Score 4+ Goals",
    "Score After 6 Games",
    "To Win Set 1 And Win",
    "Not To Win A Set",
    "Set 1 Score Groups",
    "Score After 2 Games",
];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Site ===
    /// Odds comparison home page; relative links are resolved against it.
    #[serde(default = "default_home_url")]
    pub home_url: String,

    /// User agent sent with every page request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Pause before each page fetch, in milliseconds.
    #[serde(default)]
    pub request_delay_ms: u64,

    /// Market pages of one league fetched at once (1 = sequential).
    #[serde(default = "default_market_concurrency")]
    pub market_concurrency: usize,

    // === Arbitrage Policy ===
    /// Total stake split across the outcomes of one opportunity.
    #[serde(default = "default_bet_amount")]
    pub bet_amount: Decimal,

    /// Whether leagues with games in play are crawled.
    #[serde(default)]
    pub include_in_play: bool,

    /// Exclusive lower bound on the implied payout multiple (below is noise).
    #[serde(default = "default_min_implied")]
    pub min_implied: Decimal,

    /// Exclusive upper bound on the implied payout multiple (above is bad data).
    #[serde(default = "default_max_implied")]
    pub max_implied: Decimal,

    /// Market names that are never evaluated (comma separated in the env).
    #[serde(
        default = "default_excluded_markets",
        deserialize_with = "deserialize_market_list"
    )]
    pub excluded_markets: Vec<String>,

    // === Output ===
    /// HTML report, rewritten after every discovery.
    #[serde(default = "default_report_path")]
    pub report_path: String,

    /// JSON copy of the report, used by the `verify` command.
    #[serde(default = "default_report_json_path")]
    pub report_json_path: String,

    /// Ring the terminal bell when an opportunity is found.
    #[serde(default = "default_true")]
    pub audible_alert: bool,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_home_url() -> String {
    "https://www.odds.com.au/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string()
}

fn default_http_timeout_ms() -> u64 {
    15_000
}

fn default_market_concurrency() -> usize {
    1
}

fn default_bet_amount() -> Decimal {
    Decimal::new(100, 0) // $100
}

fn default_min_implied() -> Decimal {
    Decimal::new(103, 2) // 1.03
}

fn default_max_implied() -> Decimal {
    Decimal::new(12, 1) // 1.2
}

fn default_excluded_markets() -> Vec<String> {
    DEFAULT_EXCLUDED_MARKETS.iter().map(|m| m.to_string()).collect()
}

fn default_report_path() -> String {
    "results.html".to_string()
}

fn default_report_json_path() -> String {
    "results.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn deserialize_market_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_market_list(&raw))
}

/// Split a comma separated market list, dropping blanks.
pub fn parse_market_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            user_agent: default_user_agent(),
            http_timeout_ms: default_http_timeout_ms(),
            request_delay_ms: 0,
            market_concurrency: default_market_concurrency(),
            bet_amount: default_bet_amount(),
            include_in_play: false,
            min_implied: default_min_implied(),
            max_implied: default_max_implied(),
            excluded_markets: default_excluded_markets(),
            report_path: default_report_path(),
            report_json_path: default_report_json_path(),
            audible_alert: default_true(),
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if let Err(e) = Url::parse(&self.home_url) {
            return Err(format!("HOME_URL is not a valid URL: {}", e));
        }

        if self.bet_amount <= Decimal::ZERO {
            return Err("BET_AMOUNT must be positive".to_string());
        }

        if self.min_implied <= Decimal::ONE {
            return Err("MIN_IMPLIED must be greater than 1.0".to_string());
        }

        if self.max_implied <= self.min_implied {
            return Err("MAX_IMPLIED must be greater than MIN_IMPLIED".to_string());
        }

        if self.market_concurrency == 0 {
            return Err("MARKET_CONCURRENCY must be at least 1".to_string());
        }

        Ok(())
    }

    /// Whether a market with this display name is skipped.
    pub fn is_excluded_market(&self, name: &str) -> bool {
        let name = name.trim();
        self.excluded_markets.iter().any(|m| m == name)
    }
}
