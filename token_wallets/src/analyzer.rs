//! Runs the wallet pipeline for every configured token and writes the reports.

use abi::{TokenConfig, TokenReport, TokenSummary, WalletRecord};
use anyhow::Result;
use log::{error, info};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Instant;

use crate::amount::{format_balance, format_rate, ratio, DecimalSum};
use crate::balances::fetch_balances_batched;
use crate::config::Config;
use crate::export::{export_combined, export_per_token, export_summary};
use crate::filter::{filter_by_transaction_count, sort_by_transaction_count, summarize, to_records};
use crate::source::TokenDataSource;

/// Totals across all tokens of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossTokenTotals {
    pub total_wallets: usize,
    pub total_balance: Decimal,
    /// `sum(avg_i * wallets_i) / sum(wallets_i)`, 0 without wallets.
    pub avg_transaction_count: Decimal,
}

impl CrossTokenTotals {
    pub fn from_summaries(summaries: &[TokenSummary]) -> Self {
        let mut balance = DecimalSum::new();
        let mut weighted_count = DecimalSum::new();
        let mut total_wallets = 0usize;

        for summary in summaries {
            total_wallets += summary.total_wallets;
            balance.add(summary.total_balance);
            weighted_count.add(summary.avg_transaction_count * Decimal::from(summary.total_wallets as u64));
        }

        Self {
            total_wallets,
            total_balance: balance.total(),
            avg_transaction_count: ratio(weighted_count.total(), Decimal::from(total_wallets as u64)),
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub reports: Vec<TokenReport>,
    pub summaries: Vec<TokenSummary>,
    pub totals: CrossTokenTotals,
    pub wallet_files: Vec<PathBuf>,
    pub summary_file: PathBuf,
}

pub struct TokenWalletAnalyzer<S> {
    source: S,
    config: Config,
}

impl<S: TokenDataSource> TokenWalletAnalyzer<S> {
    pub fn new(source: S, config: Config) -> Self {
        Self { source, config }
    }

    /// Analyzes one token. Failures are logged and give an empty report.
    pub async fn analyze_token(&self, token: &TokenConfig) -> TokenReport {
        info!("=== Analyzing token: {} ===", token.mint);
        match self.try_analyze_token(token).await {
            Ok(report) => report,
            Err(e) => {
                error!("Error analyzing token {}: {:#}", token.mint, e);
                TokenReport::empty(token.clone())
            }
        }
    }

    async fn try_analyze_token(&self, token: &TokenConfig) -> Result<TokenReport> {
        let transactions = self
            .source
            .fetch_transactions(&token.mint, self.config.max_transactions_per_token)
            .await?;

        let mut records = if transactions.is_empty() {
            info!("No transactions found for token {}", token.mint);
            Vec::new()
        } else {
            let wallets = self.config.extraction_strategy.extract(&transactions, &token.mint);
            info!(
                "Found {} unique wallets ({} extraction)",
                wallets.len(),
                self.config.extraction_strategy
            );
            let filtered = filter_by_transaction_count(
                &wallets,
                self.config.max_transaction_count,
                self.config.threshold_mode,
            );
            to_records(&filtered, &token.mint, token.name.as_deref())
        };

        if self.config.refresh_balances && !records.is_empty() {
            self.refresh_balances(&token.mint, &mut records).await;
        }
        let records = sort_by_transaction_count(records);

        let holder_count = if self.config.fetch_holder_counts {
            self.pause().await;
            Some(self.source.fetch_holder_count(&token.mint).await)
        } else {
            None
        };

        let stats = summarize(&token.mint, &records, holder_count);
        info!("Summary for {}:", token.label());
        info!("  - Total wallets: {}", stats.total_wallets);
        info!("  - Total holders: {}", stats.total_holders);
        info!("  - Total balance: {}", format_balance(stats.total_balance));
        info!("  - Average transaction count: {}", format_rate(stats.avg_transaction_count));

        Ok(TokenReport {
            token: token.clone(),
            records,
            holder_count,
        })
    }

    /// Replaces transaction-derived balances with live ones.
    async fn refresh_balances(&self, mint: &str, records: &mut [WalletRecord]) {
        let wallets: Vec<String> = records.iter().map(|r| r.address.clone()).collect();
        let balances = fetch_balances_batched(
            &self.source,
            mint,
            &wallets,
            self.config.batch_size,
            self.config.request_delay,
        )
        .await;

        for (record, (_, balance)) in records.iter_mut().zip(balances) {
            record.token_balance = balance;
        }
    }

    /// Tokens are processed one at a time, in configured order, with a pause in between.
    pub async fn analyze_all(&self) -> Vec<TokenReport> {
        let tokens = &self.config.tokens;
        info!("=== Starting analysis of {} tokens ===", tokens.len());

        let mut reports: Vec<TokenReport> = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            info!("Processing token {}/{}: {}", i + 1, tokens.len(), token.mint);
            let report = self.analyze_token(token).await;

            match reports.iter_mut().find(|r| r.token.mint == token.mint) {
                Some(existing) => *existing = report,
                None => reports.push(report),
            }

            if i + 1 < tokens.len() {
                self.pause().await;
            }
        }
        reports
    }

    /// Full batch: analyze every token, export wallet rows and the summary report.
    pub async fn run(&self) -> Result<RunOutput> {
        let start = Instant::now();
        let reports = self.analyze_all().await;
        info!("=== Analysis completed in {:.2} seconds ===", start.elapsed().as_secs_f64());

        let output_dir = &self.config.output_dir;
        let wallet_files = if self.config.export_separate_files {
            let files = export_per_token(output_dir, &reports)?;
            info!("Exported {} separate files", files.len());
            files
        } else {
            let file = export_combined(&output_dir.join(&self.config.output_file_name), &reports)?;
            info!("Exported combined data to: {}", file.display());
            vec![file]
        };

        let summaries: Vec<TokenSummary> = reports
            .iter()
            .map(|r| summarize(&r.token.mint, &r.records, r.holder_count))
            .collect();
        let summary_file = export_summary(&output_dir.join(&self.config.summary_file_name), &summaries)?;

        let totals = CrossTokenTotals::from_summaries(&summaries);
        log_final_summary(&summaries, &totals);

        Ok(RunOutput {
            reports,
            summaries,
            totals,
            wallet_files,
            summary_file,
        })
    }

    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }
}

fn log_final_summary(summaries: &[TokenSummary], totals: &CrossTokenTotals) {
    info!("=== FINAL SUMMARY ===");
    for summary in summaries {
        info!(
            "{}: {} wallets, {} balance",
            summary.token_mint,
            summary.total_wallets,
            format_balance(summary.total_balance)
        );
    }
    info!("TOTAL ACROSS ALL TOKENS:");
    info!("- Total wallets: {}", totals.total_wallets);
    info!("- Total balance: {}", format_balance(totals.total_balance));
    info!("- Average transaction count: {}", format_rate(totals.avg_transaction_count));
}
