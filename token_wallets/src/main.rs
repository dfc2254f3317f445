use anyhow::Result;
use env_logger::Env;
use log::{error, info};
use token_wallets::{Config, HeliusClient, TokenWalletAnalyzer};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Analyzing {} tokens (max transactions {} {}, {} extraction)",
        config.tokens.len(),
        config.threshold_mode,
        config.max_transaction_count,
        config.extraction_strategy
    );

    let client = HeliusClient::from_config(&config)?;
    let analyzer = TokenWalletAnalyzer::new(client, config);

    match analyzer.run().await {
        Ok(output) => {
            info!("Wallet files: {:?}", output.wallet_files);
            info!("Summary report: {}", output.summary_file.display());
            info!("Analysis completed successfully!");
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
