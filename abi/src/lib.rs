use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One token-account snapshot from a transaction's `pre/postTokenBalances`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalanceEntry {
    pub mint: String,
    pub owner: Option<String>,
    /// Raw `uiTokenAmount` object; its shape varies between RPC versions.
    pub ui_token_amount: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    pub succeeded: bool,
    /// Entries are kept as received; only string entries are addresses.
    pub account_keys: Vec<Value>,
    pub pre_token_balances: Vec<TokenBalanceEntry>,
    pub post_token_balances: Vec<TokenBalanceEntry>,
}

impl TransactionRecord {
    /// Builds a record from a `getTransaction`/`searchTransactions` result object.
    ///
    /// Missing fields degrade to empty values. Returns `None` only when `value`
    /// is not a JSON object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let transaction = obj.get("transaction");
        let meta = obj.get("meta");

        let signature = transaction
            .and_then(|t| t.get("signatures"))
            .and_then(|s| s.get(0))
            .or_else(|| obj.get("signature"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let succeeded = meta
            .and_then(|m| m.get("err"))
            .map_or(true, Value::is_null);

        let account_keys = transaction
            .and_then(|t| t.get("message"))
            .and_then(|m| m.get("accountKeys"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Some(Self {
            signature,
            succeeded,
            account_keys,
            pre_token_balances: parse_balances(meta.and_then(|m| m.get("preTokenBalances"))),
            post_token_balances: parse_balances(meta.and_then(|m| m.get("postTokenBalances"))),
        })
    }
}

fn parse_balances(value: Option<&Value>) -> Vec<TokenBalanceEntry> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let mint = entry.get("mint")?.as_str()?.to_string();
            Some(TokenBalanceEntry {
                mint,
                owner: entry.get("owner").and_then(Value::as_str).map(str::to_string),
                ui_token_amount: entry.get("uiTokenAmount").cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}

/// Per-wallet accumulation for a single mint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAggregate {
    pub transaction_count: u64,
    pub balance: Decimal,
}

/// Wallet address -> aggregate, iterated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletMap {
    index: HashMap<String, usize>,
    entries: Vec<(String, WalletAggregate)>,
}

impl WalletMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregate for `address`, inserting a zeroed one on first sight.
    pub fn entry_mut(&mut self, address: &str) -> &mut WalletAggregate {
        let slot = match self.index.get(address) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(address.to_string(), slot);
                self.entries.push((address.to_string(), WalletAggregate::default()));
                slot
            }
        };
        &mut self.entries[slot].1
    }

    pub fn insert(&mut self, address: &str, aggregate: WalletAggregate) {
        *self.entry_mut(address) = aggregate;
    }

    pub fn get(&self, address: &str) -> Option<&WalletAggregate> {
        self.index.get(address).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.index.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WalletAggregate)> {
        self.entries.iter().map(|(address, agg)| (address.as_str(), agg))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(address, _)| address.as_str())
    }
}

impl FromIterator<(String, WalletAggregate)> for WalletMap {
    fn from_iter<I: IntoIterator<Item = (String, WalletAggregate)>>(iter: I) -> Self {
        let mut map = WalletMap::new();
        for (address, aggregate) in iter {
            map.insert(&address, aggregate);
        }
        map
    }
}

/// Output row: one qualifying wallet of one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub address: String,
    pub token_mint: String,
    pub token_name: Option<String>,
    pub transaction_count: u64,
    pub token_balance: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub token_mint: String,
    pub total_wallets: usize,
    pub total_holders: u64,
    pub total_balance: Decimal,
    pub avg_transaction_count: Decimal,
    pub avg_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub mint: String,
    pub name: Option<String>,
}

impl TokenConfig {
    pub fn new(mint: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            mint: mint.into(),
            name: name.map(str::to_string),
        }
    }

    /// Display label: the name when configured, otherwise the mint.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.mint)
    }
}

/// Rows and optional on-chain holder count produced for one configured token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenReport {
    pub token: TokenConfig,
    pub records: Vec<WalletRecord>,
    pub holder_count: Option<u64>,
}

impl TokenReport {
    pub fn empty(token: TokenConfig) -> Self {
        Self {
            token,
            records: Vec::new(),
            holder_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wallet_map_keeps_first_seen_order() {
        let mut map = WalletMap::new();
        map.entry_mut("walletBBBBBBBBBB").transaction_count += 1;
        map.entry_mut("walletAAAAAAAAAA").transaction_count += 1;
        map.entry_mut("walletBBBBBBBBBB").transaction_count += 1;

        let order: Vec<&str> = map.addresses().collect();
        assert_eq!(order, vec!["walletBBBBBBBBBB", "walletAAAAAAAAAA"]);
        assert_eq!(map.get("walletBBBBBBBBBB").unwrap().transaction_count, 2);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_from_json_reads_meta_and_message() {
        let raw = json!({
            "transaction": {
                "signatures": ["sig1"],
                "message": { "accountKeys": ["key1", 7] }
            },
            "meta": {
                "err": null,
                "preTokenBalances": [],
                "postTokenBalances": [
                    { "mint": "mintX", "owner": "owner1", "uiTokenAmount": { "uiAmount": 2.5 } },
                    { "mint": 42, "owner": "owner2" }
                ]
            }
        });

        let record = TransactionRecord::from_json(&raw).unwrap();
        assert_eq!(record.signature, "sig1");
        assert!(record.succeeded);
        assert_eq!(record.account_keys.len(), 2);
        assert_eq!(record.post_token_balances.len(), 1);
        assert_eq!(record.post_token_balances[0].owner.as_deref(), Some("owner1"));
    }

    #[test]
    fn test_from_json_failed_transaction() {
        let raw = json!({ "signature": "sig2", "meta": { "err": { "InstructionError": [0, "Custom"] } } });
        let record = TransactionRecord::from_json(&raw).unwrap();
        assert_eq!(record.signature, "sig2");
        assert!(!record.succeeded);
        assert!(record.post_token_balances.is_empty());
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(TransactionRecord::from_json(&json!("nope")).is_none());
    }
}
