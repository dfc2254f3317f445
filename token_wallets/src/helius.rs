//! Helius JSON-RPC implementation of [`TokenDataSource`].

use abi::TransactionRecord;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_client::rpc_response::RpcKeyedAccount;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::time::Duration;

use crate::amount::{decimal_from_json, DecimalSum};
use crate::config::Config;
use crate::extractor::balance_of;
use crate::source::TokenDataSource;
use crate::utils::short_id;

pub const DEFAULT_RPC_URL: &str = "https://mainnet.helius-rpc.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after every single `getTransaction` call in the fallback path.
const SIGNATURE_REQUEST_DELAY: Duration = Duration::from_millis(50);
/// Pause between batches of `getTransaction` calls.
const SIGNATURE_BATCH_DELAY: Duration = Duration::from_millis(200);
/// Size of an SPL token account without extensions.
const TOKEN_ACCOUNT_SIZE: u64 = 165;

pub struct HeliusClient {
    http: Client,
    rpc: RpcClient,
    rpc_url: String,
    signature_batch_size: usize,
}

impl HeliusClient {
    pub fn new(base_url: &str, api_key: &str, signature_batch_size: usize) -> Result<Self> {
        let rpc_url = format!("{}/?api-key={}", base_url.trim_end_matches('/'), api_key);
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        let rpc = RpcClient::new_with_commitment(rpc_url.clone(), CommitmentConfig::confirmed());

        Ok(Self {
            http,
            rpc,
            rpc_url,
            signature_batch_size: signature_batch_size.max(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.rpc_url, &config.api_key, config.batch_size)
    }

    async fn lookup_balance(&self, wallet: &str, mint: &str) -> Result<Decimal> {
        let owner = Pubkey::from_str(wallet).with_context(|| format!("invalid wallet {}", wallet))?;
        let mint = Pubkey::from_str(mint).with_context(|| format!("invalid mint {}", mint))?;

        let accounts = self
            .rpc
            .get_token_accounts_by_owner(&owner, TokenAccountsFilter::Mint(mint))
            .await?;
        token_accounts_balance(&accounts)
    }
}

/// Transport for raw JSON-RPC calls; returns the `result` member.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
trait JsonRpc: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value>;
}

#[async_trait]
impl JsonRpc for HeliusClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("{} returned invalid JSON", method))?;

        rpc_result(method, response)
    }
}

/// Unwraps a JSON-RPC response envelope.
fn rpc_result(method: &str, mut response: Value) -> Result<Value> {
    if let Some(err) = response.get("error") {
        bail!("{} error: {}", method, err);
    }
    response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| anyhow!("{} response has no result", method))
}

/// `searchTransactions` result: an array, or `null` for no transactions.
fn search_result(result: Value) -> Result<Vec<Value>> {
    match result {
        Value::Array(transactions) => Ok(transactions),
        Value::Null => Ok(Vec::new()),
        other => bail!("searchTransactions returned unexpected shape: {}", other),
    }
}

/// Signature strings from a `getSignaturesForAddress` result.
fn signatures_in(result: &Value) -> Vec<String> {
    result
        .as_array()
        .map(|sigs| {
            sigs.iter()
                .filter_map(|s| s.get("signature").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Token accounts from `getProgramAccounts` holding a positive amount.
fn positive_holders(accounts: &[Value]) -> u64 {
    accounts
        .iter()
        .filter_map(|acc| acc.pointer("/account/data/parsed/info/tokenAmount/uiAmount"))
        .filter_map(decimal_from_json)
        .filter(|amount| *amount > Decimal::ZERO)
        .count() as u64
}

/// Sum over every parsed token account; a wallet may hold a mint in several.
fn token_accounts_balance(accounts: &[RpcKeyedAccount]) -> Result<Decimal> {
    let mut total = DecimalSum::new();
    for keyed in accounts {
        let data = serde_json::to_value(&keyed.account.data)?;
        match data.pointer("/parsed/info") {
            Some(info) => total.add(balance_of(info)),
            None => debug!("Token account {} is not jsonParsed", keyed.pubkey),
        }
    }
    Ok(total.total())
}

async fn search_transactions<R: JsonRpc + ?Sized>(rpc: &R, mint: &str, limit: usize) -> Result<Vec<Value>> {
    let result = rpc
        .call(
            "searchTransactions",
            json!({
                "query": { "accounts": [mint] },
                "limit": limit,
                "encoding": UiTransactionEncoding::JsonParsed,
            }),
        )
        .await?;
    search_result(result)
}

/// `getSignaturesForAddress` followed by one `getTransaction` per signature.
async fn fetch_by_signatures<R: JsonRpc + ?Sized>(
    rpc: &R,
    mint: &str,
    limit: usize,
    batch_size: usize,
) -> Result<Vec<Value>> {
    let result = rpc
        .call("getSignaturesForAddress", json!([mint, { "limit": limit }]))
        .await?;
    let signatures = signatures_in(&result);

    if signatures.is_empty() {
        info!("No signatures found for token {}", mint);
        return Ok(Vec::new());
    }
    info!("Found {} signatures for token {}", signatures.len(), mint);

    let mut transactions = Vec::with_capacity(signatures.len());
    let batches: Vec<&[String]> = signatures.chunks(batch_size.max(1)).collect();

    for (i, batch) in batches.iter().enumerate() {
        for signature in batch.iter() {
            let params = json!([
                signature,
                {
                    "encoding": UiTransactionEncoding::JsonParsed,
                    "maxSupportedTransactionVersion": 0,
                }
            ]);
            match rpc.call("getTransaction", params).await {
                Ok(Value::Null) => debug!("Transaction {} not available", short_id(signature)),
                Ok(tx) => transactions.push(tx),
                Err(e) => warn!("Failed to get transaction {}...: {:#}", short_id(signature), e),
            }
            tokio::time::sleep(SIGNATURE_REQUEST_DELAY).await;
        }

        if i + 1 < batches.len() {
            tokio::time::sleep(SIGNATURE_BATCH_DELAY).await;
        }
    }

    info!("Retrieved {} transactions for token {}", transactions.len(), mint);
    Ok(transactions)
}

/// Search first; any search failure falls back to the signature walk.
async fn fetch_raw_transactions<R: JsonRpc + ?Sized>(
    rpc: &R,
    mint: &str,
    limit: usize,
    batch_size: usize,
) -> Result<Vec<Value>> {
    match search_transactions(rpc, mint, limit).await {
        Ok(transactions) => {
            info!("Found {} transactions for token {}", transactions.len(), mint);
            Ok(transactions)
        }
        Err(e) => {
            warn!("searchTransactions failed for {} ({:#}), trying signatures", mint, e);
            fetch_by_signatures(rpc, mint, limit, batch_size).await
        }
    }
}

async fn count_holders<R: JsonRpc + ?Sized>(rpc: &R, mint: &str) -> Result<u64> {
    let params = json!([
        spl_token::id().to_string(),
        {
            "encoding": "jsonParsed",
            "filters": [
                { "dataSize": TOKEN_ACCOUNT_SIZE },
                { "memcmp": { "offset": 0, "bytes": mint } }
            ]
        }
    ]);
    let result = rpc.call("getProgramAccounts", params).await?;
    Ok(positive_holders(result.as_array().map(Vec::as_slice).unwrap_or_default()))
}

#[async_trait]
impl TokenDataSource for HeliusClient {
    async fn fetch_transactions(&self, mint: &str, limit: usize) -> Result<Vec<TransactionRecord>> {
        info!("Fetching transactions for token: {}", mint);

        let raw = fetch_raw_transactions(self, mint, limit, self.signature_batch_size).await?;

        let records: Vec<TransactionRecord> = raw.iter().filter_map(TransactionRecord::from_json).collect();
        if records.len() < raw.len() {
            debug!("Dropped {} malformed transactions for {}", raw.len() - records.len(), mint);
        }
        Ok(records)
    }

    async fn fetch_wallet_balance(&self, wallet: &str, mint: &str) -> Decimal {
        match self.lookup_balance(wallet, mint).await {
            Ok(balance) => balance,
            Err(e) => {
                error!("Error fetching balance for {}: {:#}", wallet, e);
                Decimal::ZERO
            }
        }
    }

    async fn fetch_holder_count(&self, mint: &str) -> u64 {
        match count_holders(self, mint).await {
            Ok(holders) => holders,
            Err(e) => {
                error!("Error fetching holders for mint {}: {:#}", mint, e);
                0
            }
        }
    }
}
