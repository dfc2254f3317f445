//! Turns raw transactions of one mint into a wallet -> {count, balance} map.

use abi::{TokenBalanceEntry, TransactionRecord, WalletMap};
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::amount::{decimal_from_json, raw_to_ui_amount};

/// Owners this short are placeholders, not addresses.
pub const MIN_ADDRESS_LEN: usize = 11;

/// How participation in a transaction is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Count each owner that holds the mint in the pre or post balances, once per transaction.
    #[default]
    MintParticipants,
    /// Legacy counting: every account key plus every post-balance owner of any mint.
    /// A wallet can be counted twice for the same transaction.
    AccountKeys,
}

impl ExtractionStrategy {
    pub fn extract(self, transactions: &[TransactionRecord], token_mint: &str) -> WalletMap {
        match self {
            ExtractionStrategy::MintParticipants => extract_mint_participants(transactions, token_mint),
            ExtractionStrategy::AccountKeys => extract_account_keys(transactions, token_mint),
        }
    }
}

impl FromStr for ExtractionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mint_participants" | "mint" => Ok(ExtractionStrategy::MintParticipants),
            "account_keys" | "accounts" | "legacy" => Ok(ExtractionStrategy::AccountKeys),
            other => Err(format!("unknown extraction strategy '{}'", other)),
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStrategy::MintParticipants => write!(f, "mint_participants"),
            ExtractionStrategy::AccountKeys => write!(f, "account_keys"),
        }
    }
}

pub fn extract_mint_participants(transactions: &[TransactionRecord], token_mint: &str) -> WalletMap {
    let mut wallets = WalletMap::new();

    for tx in transactions {
        if !tx.succeeded {
            continue;
        }

        let mut owners_this_tx: Vec<&str> = Vec::new();

        for entry in &tx.pre_token_balances {
            if let Some(owner) = mint_owner(entry, token_mint) {
                if !owners_this_tx.contains(&owner) {
                    owners_this_tx.push(owner);
                }
            }
        }

        for entry in &tx.post_token_balances {
            if let Some(owner) = mint_owner(entry, token_mint) {
                if !owners_this_tx.contains(&owner) {
                    owners_this_tx.push(owner);
                }
                // Several accounts of one owner: the last entry wins.
                wallets.entry_mut(owner).balance = balance_of(&entry.ui_token_amount);
            }
        }

        for owner in owners_this_tx {
            wallets.entry_mut(owner).transaction_count += 1;
        }
    }

    wallets
}

pub fn extract_account_keys(transactions: &[TransactionRecord], token_mint: &str) -> WalletMap {
    let mut wallets = WalletMap::new();

    for tx in transactions {
        if !tx.succeeded {
            continue;
        }

        for key in &tx.account_keys {
            // Only plain string keys are addresses.
            if let Value::String(address) = key {
                wallets.entry_mut(address).transaction_count += 1;
            }
        }

        for entry in &tx.post_token_balances {
            let Some(owner) = valid_owner(entry) else {
                continue;
            };
            let wallet = wallets.entry_mut(owner);
            wallet.transaction_count += 1;
            if entry.mint == token_mint {
                wallet.balance = balance_of(&entry.ui_token_amount);
            }
        }
    }

    wallets
}

fn valid_owner(entry: &TokenBalanceEntry) -> Option<&str> {
    entry
        .owner
        .as_deref()
        .filter(|owner| owner.len() >= MIN_ADDRESS_LEN)
}

fn mint_owner<'a>(entry: &'a TokenBalanceEntry, token_mint: &str) -> Option<&'a str> {
    if entry.mint != token_mint {
        return None;
    }
    valid_owner(entry)
}

/// Reads the UI amount out of a `uiTokenAmount` object.
///
/// The nested `tokenAmount` form is preferred over the flat form; 0 when
/// neither yields a number.
pub fn balance_of(ui_token_amount: &Value) -> Decimal {
    let nested = ui_token_amount.get("tokenAmount").and_then(amount_in);
    nested
        .or_else(|| amount_in(ui_token_amount))
        .unwrap_or(Decimal::ZERO)
}

fn amount_in(shape: &Value) -> Option<Decimal> {
    if !shape.is_object() {
        return None;
    }
    if let Some(amount) = shape.get("uiAmount").and_then(decimal_from_json) {
        return Some(amount);
    }
    if let Some(amount) = shape.get("uiAmountString").and_then(decimal_from_json) {
        return Some(amount);
    }
    let raw = shape.get("amount")?.as_str()?;
    let decimals = shape.get("decimals")?.as_u64()?;
    raw_to_ui_amount(raw, u32::try_from(decimals).ok()?)
}
