pub mod amount;
pub mod analyzer;
pub mod balances;
pub mod config;
pub mod export;
pub mod extractor;
pub mod filter;
pub mod helius;
pub mod source;
pub mod utils;

pub use analyzer::{CrossTokenTotals, RunOutput, TokenWalletAnalyzer};
pub use config::{Config, ConfigError};
pub use extractor::ExtractionStrategy;
pub use filter::ThresholdMode;
pub use helius::HeliusClient;
pub use source::TokenDataSource;
