use abi::TransactionRecord;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Remote provider of on-chain token data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenDataSource: Send + Sync {
    /// Recent transactions touching `mint`. An empty result is not an error.
    async fn fetch_transactions(&self, mint: &str, limit: usize) -> Result<Vec<TransactionRecord>>;

    /// Current balance of `mint` held by `wallet`; 0 on any failure.
    async fn fetch_wallet_balance(&self, wallet: &str, mint: &str) -> Decimal;

    /// Number of token accounts of `mint` with a positive balance; 0 on failure.
    async fn fetch_holder_count(&self, mint: &str) -> u64;
}
