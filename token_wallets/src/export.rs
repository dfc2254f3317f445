//! CSV reports: wallet rows (per token or combined) and the per-token summary.

use abi::{TokenReport, TokenSummary, WalletRecord};
use anyhow::{Context, Result};
use csv::Writer;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::amount::{format_balance, format_rate};
use crate::utils::short_id;

pub const PER_TOKEN_FILE_PREFIX: &str = "token_wallets";

fn create_writer(path: &Path) -> Result<Writer<fs::File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))
}

/// Writes wallet rows; `with_token_columns` adds mint and name for combined files.
pub fn write_wallets(path: &Path, records: &[WalletRecord], with_token_columns: bool) -> Result<()> {
    let mut wtr = create_writer(path)?;

    let mut header = vec!["Solana Address", "Transaction Quantity", "Quantity of Coins Held"];
    if with_token_columns {
        header.extend(["Token Mint", "Token Name"]);
    }
    wtr.write_record(&header)?;

    for record in records {
        let count = record.transaction_count.to_string();
        let balance = format_balance(record.token_balance);
        let mut row = vec![record.address.as_str(), count.as_str(), balance.as_str()];
        if with_token_columns {
            row.push(record.token_mint.as_str());
            row.push(record.token_name.as_deref().unwrap_or(""));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    info!("Exported {} wallet records to {}", records.len(), path.display());
    Ok(())
}

/// One file per token, named after the first eight characters of the mint.
pub fn export_per_token(output_dir: &Path, reports: &[TokenReport]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::with_capacity(reports.len());
    for report in reports {
        let path = output_dir.join(format!(
            "{}_{}.csv",
            PER_TOKEN_FILE_PREFIX,
            short_id(&report.token.mint)
        ));
        write_wallets(&path, &report.records, false)?;
        files.push(path);
    }
    Ok(files)
}

/// All tokens' rows in one file, tokens in report order.
pub fn export_combined(path: &Path, reports: &[TokenReport]) -> Result<PathBuf> {
    let all: Vec<WalletRecord> = reports.iter().flat_map(|r| r.records.iter().cloned()).collect();
    write_wallets(path, &all, true)?;
    Ok(path.to_path_buf())
}

pub fn export_summary(path: &Path, summaries: &[TokenSummary]) -> Result<PathBuf> {
    let mut wtr = create_writer(path)?;
    wtr.write_record([
        "Token Mint",
        "Total Wallets",
        "Total Holders",
        "Total Balance",
        "Average Transaction Count",
    ])?;

    for summary in summaries {
        wtr.write_record([
            summary.token_mint.clone(),
            summary.total_wallets.to_string(),
            summary.total_holders.to_string(),
            format_balance(summary.total_balance),
            format_rate(summary.avg_transaction_count),
        ])?;
    }

    wtr.flush()?;
    info!("Summary report exported to {}", path.display());
    Ok(path.to_path_buf())
}
