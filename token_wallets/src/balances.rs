//! Paced, batched live balance lookups.

use futures::future::join_all;
use log::debug;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::source::TokenDataSource;

/// Fetches the balance of `mint` for every wallet, `batch_size` requests at a time.
///
/// Requests inside a batch run concurrently; batches run one after another
/// with `delay` in between. Output follows the order of `wallets`.
pub async fn fetch_balances_batched<S>(
    source: &S,
    mint: &str,
    wallets: &[String],
    batch_size: usize,
    delay: Duration,
) -> Vec<(String, Decimal)>
where
    S: TokenDataSource + ?Sized,
{
    let batch_size = batch_size.max(1);
    let batch_count = wallets.len().div_ceil(batch_size);
    let mut balances = Vec::with_capacity(wallets.len());

    for (i, batch) in wallets.chunks(batch_size).enumerate() {
        debug!("Balance batch {}/{} ({} wallets)", i + 1, batch_count, batch.len());

        let lookups = batch.iter().map(|wallet| source.fetch_wallet_balance(wallet, mint));
        let results = join_all(lookups).await;
        balances.extend(batch.iter().cloned().zip(results));

        if i + 1 < batch_count && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockTokenDataSource;
    use std::time::Instant;

    #[tokio::test]
    async fn test_balances_follow_input_order() {
        let mut source = MockTokenDataSource::new();
        source
            .expect_fetch_wallet_balance()
            .times(5)
            .returning(|wallet, _| Decimal::from(wallet.len() as u64));

        let wallets: Vec<String> = ["a", "bbb", "cc", "dddd", "eeeee"].iter().map(|s| s.to_string()).collect();
        let balances = fetch_balances_batched(&source, "mint", &wallets, 2, Duration::ZERO).await;

        let got: Vec<(&str, Decimal)> = balances.iter().map(|(w, b)| (w.as_str(), *b)).collect();
        assert_eq!(
            got,
            vec![
                ("a", Decimal::from(1)),
                ("bbb", Decimal::from(3)),
                ("cc", Decimal::from(2)),
                ("dddd", Decimal::from(4)),
                ("eeeee", Decimal::from(5)),
            ]
        );
    }

    #[tokio::test]
    async fn test_delay_only_between_batches() {
        let mut source = MockTokenDataSource::new();
        source.expect_fetch_wallet_balance().returning(|_, _| Decimal::ZERO);

        let wallets: Vec<String> = (0..3).map(|i| format!("wallet{}", i)).collect();
        let start = Instant::now();
        fetch_balances_batched(&source, "mint", &wallets, 1, Duration::from_millis(20)).await;
        // Three batches, two pauses.
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_no_wallets_no_requests() {
        let mut source = MockTokenDataSource::new();
        source.expect_fetch_wallet_balance().never();

        let balances = fetch_balances_batched(&source, "mint", &[], 5, Duration::from_secs(10)).await;
        assert!(balances.is_empty());
    }
}
