//! Run configuration, read from the environment (and `.env`).

use abi::TokenConfig;
use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::extractor::ExtractionStrategy;
use crate::filter::ThresholdMode;
use crate::helius::DEFAULT_RPC_URL;
use crate::utils::is_valid_solana_address;

/// Tokens analysed when `TOKENS` is not set.
pub const DEFAULT_TOKENS: &[(&str, &str)] = &[
    ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC"),
    ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT"),
    ("So11111111111111111111111111111111111111112", "SOL"),
    ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK"),
    ("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL"),
];

/// Startup failures. Nothing has been fetched when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("HELIUS_API_KEY is required. Please set it in your .env file.")]
    MissingApiKey,
    #[error("{name} must be a valid {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("TOKENS does not contain any token mint")]
    NoTokens,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub rpc_url: String,
    pub tokens: Vec<TokenConfig>,
    pub max_transaction_count: u64,
    pub threshold_mode: ThresholdMode,
    pub extraction_strategy: ExtractionStrategy,
    pub export_separate_files: bool,
    /// Pause between tokens and between balance-lookup batches.
    pub request_delay: Duration,
    pub batch_size: usize,
    pub max_transactions_per_token: usize,
    pub refresh_balances: bool,
    pub fetch_holder_counts: bool,
    pub output_dir: PathBuf,
    pub output_file_name: String,
    pub summary_file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            tokens: default_tokens(),
            max_transaction_count: 15,
            threshold_mode: ThresholdMode::default(),
            extraction_strategy: ExtractionStrategy::default(),
            export_separate_files: false,
            request_delay: Duration::from_millis(1000),
            batch_size: 5,
            max_transactions_per_token: 20,
            refresh_balances: false,
            fetch_holder_counts: false,
            output_dir: PathBuf::from("."),
            output_file_name: "token_wallets.csv".to_string(),
            summary_file_name: "summary_report.csv".to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let api_key = get("HELIUS_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let tokens = match get("TOKENS") {
            Some(list) => parse_tokens(&list)?,
            None => defaults.tokens,
        };

        let request_delay_ms: u64 = parse_or(
            "REQUEST_DELAY_MS",
            get("REQUEST_DELAY_MS"),
            defaults.request_delay.as_millis() as u64,
            "integer",
        )?;

        Ok(Self {
            api_key,
            rpc_url: get("HELIUS_RPC_URL").unwrap_or(defaults.rpc_url),
            tokens,
            max_transaction_count: parse_or(
                "MAX_TRANSACTION_COUNT",
                get("MAX_TRANSACTION_COUNT"),
                defaults.max_transaction_count,
                "integer",
            )?,
            threshold_mode: parse_or(
                "THRESHOLD_MODE",
                get("THRESHOLD_MODE"),
                defaults.threshold_mode,
                "threshold mode (below | at_most)",
            )?,
            extraction_strategy: parse_or(
                "EXTRACTION_STRATEGY",
                get("EXTRACTION_STRATEGY"),
                defaults.extraction_strategy,
                "strategy (mint_participants | account_keys)",
            )?,
            export_separate_files: parse_flag(
                "EXPORT_SEPARATE_FILES",
                get("EXPORT_SEPARATE_FILES"),
                defaults.export_separate_files,
            )?,
            request_delay: Duration::from_millis(request_delay_ms),
            batch_size: parse_or("BATCH_SIZE", get("BATCH_SIZE"), defaults.batch_size, "integer")?.max(1),
            max_transactions_per_token: parse_or(
                "MAX_TRANSACTIONS_PER_TOKEN",
                get("MAX_TRANSACTIONS_PER_TOKEN"),
                defaults.max_transactions_per_token,
                "integer",
            )?,
            refresh_balances: parse_flag(
                "REFRESH_BALANCES",
                get("REFRESH_BALANCES"),
                defaults.refresh_balances,
            )?,
            fetch_holder_counts: parse_flag(
                "FETCH_HOLDER_COUNTS",
                get("FETCH_HOLDER_COUNTS"),
                defaults.fetch_holder_counts,
            )?,
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            output_file_name: get("OUTPUT_FILE_NAME").unwrap_or(defaults.output_file_name),
            summary_file_name: get("SUMMARY_FILE_NAME").unwrap_or(defaults.summary_file_name),
        })
    }
}

pub fn default_tokens() -> Vec<TokenConfig> {
    DEFAULT_TOKENS
        .iter()
        .map(|&(mint, name)| TokenConfig::new(mint, Some(name)))
        .collect()
}

/// Parses `mint[:name]` items separated by commas.
pub fn parse_tokens(list: &str) -> Result<Vec<TokenConfig>, ConfigError> {
    let tokens: Vec<TokenConfig> = list
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (mint, name) = match item.split_once(':') {
                Some((mint, name)) => (mint.trim(), Some(name.trim()).filter(|n| !n.is_empty())),
                None => (item, None),
            };
            if !is_valid_solana_address(mint) {
                warn!("Token mint {} does not look like a Solana address", mint);
            }
            TokenConfig::new(mint, name)
        })
        .collect();

    if tokens.is_empty() {
        return Err(ConfigError::NoTokens);
    }
    Ok(tokens)
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            expected,
            value: v,
        }),
    }
}

fn parse_flag(name: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            expected: "boolean",
            value: raw,
        }),
    }
}
