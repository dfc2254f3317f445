//! Threshold filtering, ordering and per-token statistics.

use abi::{TokenSummary, WalletMap, WalletRecord};
use log::info;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::amount::DecimalSum;
use crate::extractor::MIN_ADDRESS_LEN;

/// Comparison applied between a wallet's transaction count and the maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThresholdMode {
    /// `count < max`
    #[default]
    Below,
    /// `count <= max`
    AtMost,
}

impl ThresholdMode {
    pub fn admits(self, count: u64, max: u64) -> bool {
        match self {
            ThresholdMode::Below => count < max,
            ThresholdMode::AtMost => count <= max,
        }
    }
}

impl FromStr for ThresholdMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "below" | "lt" | "<" => Ok(ThresholdMode::Below),
            "at_most" | "le" | "<=" => Ok(ThresholdMode::AtMost),
            other => Err(format!("unknown threshold mode '{}'", other)),
        }
    }
}

impl fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdMode::Below => write!(f, "<"),
            ThresholdMode::AtMost => write!(f, "<="),
        }
    }
}

pub fn filter_by_transaction_count(wallets: &WalletMap, max_count: u64, mode: ThresholdMode) -> WalletMap {
    let filtered: WalletMap = wallets
        .iter()
        .filter(|(_, agg)| mode.admits(agg.transaction_count, max_count))
        .map(|(address, agg)| (address.to_string(), *agg))
        .collect();

    info!(
        "Filtered wallets: {} -> {} (transactions {} {})",
        wallets.len(),
        filtered.len(),
        mode,
        max_count
    );
    filtered
}

pub fn to_records(wallets: &WalletMap, token_mint: &str, token_name: Option<&str>) -> Vec<WalletRecord> {
    wallets
        .iter()
        .filter(|(address, _)| address.len() >= MIN_ADDRESS_LEN)
        .map(|(address, agg)| WalletRecord {
            address: address.to_string(),
            token_mint: token_mint.to_string(),
            token_name: token_name.map(str::to_string),
            transaction_count: agg.transaction_count,
            token_balance: agg.balance,
        })
        .collect()
}

/// Ascending by transaction count; equal counts keep their order.
pub fn sort_by_transaction_count(mut records: Vec<WalletRecord>) -> Vec<WalletRecord> {
    records.sort_by_key(|r| r.transaction_count);
    records
}

/// Descending by balance; equal balances keep their order.
pub fn sort_by_token_balance(mut records: Vec<WalletRecord>) -> Vec<WalletRecord> {
    records.sort_by(|a, b| b.token_balance.cmp(&a.token_balance));
    records
}

/// Aggregate statistics for one token's rows.
///
/// `holder_count` is the authoritative on-chain holder count when known;
/// otherwise holders are the rows with a positive balance.
pub fn summarize(token_mint: &str, records: &[WalletRecord], holder_count: Option<u64>) -> TokenSummary {
    let balances: DecimalSum = records.iter().map(|r| r.token_balance).collect();
    let mut counts = DecimalSum::new();
    for record in records {
        counts.add_count(record.transaction_count);
    }

    let derived_holders = records
        .iter()
        .filter(|r| r.token_balance > Decimal::ZERO)
        .count() as u64;

    TokenSummary {
        token_mint: token_mint.to_string(),
        total_wallets: records.len(),
        total_holders: holder_count.unwrap_or(derived_holders),
        total_balance: balances.total(),
        avg_transaction_count: counts.mean(),
        avg_balance: balances.mean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::WalletAggregate;

    fn wallet(n: usize) -> String {
        format!("Wallet{:0>38}", n)
    }

    fn map_of(counts: &[u64]) -> WalletMap {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                (
                    wallet(i),
                    WalletAggregate {
                        transaction_count: count,
                        balance: Decimal::from(i as u64),
                    },
                )
            })
            .collect()
    }

    fn record(address: &str, count: u64, balance: i64) -> WalletRecord {
        WalletRecord {
            address: address.to_string(),
            token_mint: "mint".to_string(),
            token_name: None,
            transaction_count: count,
            token_balance: Decimal::from(balance),
        }
    }

    #[test]
    fn test_threshold_boundary_depends_on_mode() {
        let wallets = map_of(&[15]);
        assert!(filter_by_transaction_count(&wallets, 15, ThresholdMode::Below).is_empty());
        assert_eq!(filter_by_transaction_count(&wallets, 15, ThresholdMode::AtMost).len(), 1);
    }

    #[test]
    fn test_filter_partitions_keys() {
        let wallets = map_of(&[0, 3, 14, 15, 16, 40, 1]);
        for mode in [ThresholdMode::Below, ThresholdMode::AtMost] {
            let kept = filter_by_transaction_count(&wallets, 15, mode);
            for (address, agg) in wallets.iter() {
                assert_eq!(kept.contains(address), mode.admits(agg.transaction_count, 15));
            }
            for (address, agg) in kept.iter() {
                assert_eq!(wallets.get(address), Some(agg));
            }
        }
    }

    #[test]
    fn test_filter_keeps_insertion_order() {
        let wallets = map_of(&[5, 30, 2, 9]);
        let kept = filter_by_transaction_count(&wallets, 15, ThresholdMode::Below);
        let order: Vec<&str> = kept.addresses().collect();
        assert_eq!(order, vec![wallet(0), wallet(2), wallet(3)]);
    }

    #[test]
    fn test_to_records_skips_short_addresses() {
        let mut wallets = map_of(&[1, 2]);
        wallets.entry_mut("0123456789").transaction_count = 1;
        wallets.entry_mut("01234567890").transaction_count = 1;

        let records = to_records(&wallets, "mintAAAA", Some("AAA"));
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.address != "0123456789"));
        assert_eq!(records[0].token_name.as_deref(), Some("AAA"));
        assert_eq!(records[0].token_mint, "mintAAAA");
    }

    #[test]
    fn test_sort_by_transaction_count_is_stable() {
        let records = vec![
            record("walletC0000", 3, 0),
            record("walletA0000", 1, 0),
            record("walletB0000", 3, 0),
            record("walletD0000", 1, 0),
            record("walletE0000", 2, 0),
        ];

        let sorted = sort_by_transaction_count(records);
        let order: Vec<&str> = sorted.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(order, vec!["walletA0000", "walletD0000", "walletE0000", "walletC0000", "walletB0000"]);
        assert!(sorted.windows(2).all(|w| w[0].transaction_count <= w[1].transaction_count));
    }

    #[test]
    fn test_sort_by_token_balance_descending_and_stable() {
        let records = vec![
            record("walletA0000", 0, 5),
            record("walletB0000", 0, 9),
            record("walletC0000", 0, 5),
        ];

        let sorted = sort_by_token_balance(records);
        let order: Vec<&str> = sorted.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(order, vec!["walletB0000", "walletA0000", "walletC0000"]);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize("mint", &[], None);
        assert_eq!(summary.total_wallets, 0);
        assert_eq!(summary.total_holders, 0);
        assert_eq!(summary.total_balance, Decimal::ZERO);
        assert_eq!(summary.avg_transaction_count, Decimal::ZERO);
        assert_eq!(summary.avg_balance, Decimal::ZERO);
    }

    #[test]
    fn test_summarize_totals_and_holders() {
        let records = vec![
            record("walletA0000", 1, 0),
            record("walletB0000", 2, 4),
            record("walletC0000", 6, 2),
        ];

        let summary = summarize("mint", &records, None);
        assert_eq!(summary.total_wallets, 3);
        assert_eq!(summary.total_holders, 2);
        assert_eq!(summary.total_balance, Decimal::from(6));
        assert_eq!(summary.avg_transaction_count, Decimal::from(3));
        assert_eq!(summary.avg_balance, Decimal::from(2));

        let authoritative = summarize("mint", &records, Some(1_250));
        assert_eq!(authoritative.total_holders, 1_250);
    }
}
