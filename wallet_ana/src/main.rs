use anyhow::{bail, Result};
use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use log::info;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;
use token_wallets::amount::format_balance;
use token_wallets::balances::fetch_balances_batched;
use token_wallets::utils::is_valid_solana_address;
use token_wallets::{Config, HeliusClient, TokenDataSource};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = Command::new("Wallet Analyzer")
        .version("1.0")
        .about("Looks up live token balances for a list of wallets")
        .arg(Arg::new("mint")
            .short('m')
            .long("mint")
            .value_name("TOKEN_MINT")
            .required(true))
        .arg(Arg::new("address")
            .short('a')
            .long("address")
            .value_name("WALLET_ADDRESS")
            .action(ArgAction::Append)
            .required(true))
        .arg(Arg::new("batch-size")
            .long("batch-size")
            .value_name("N")
            .value_parser(clap::value_parser!(usize))
            .default_value("5"))
        .arg(Arg::new("delay-ms")
            .long("delay-ms")
            .value_name("MS")
            .value_parser(clap::value_parser!(u64))
            .default_value("200"))
        .arg(Arg::new("holders")
            .long("holders")
            .help("Also print the number of holders of the mint")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .value_name("FILE")
            .help("Append `address,balance` lines to FILE"))
        .get_matches();

    let mint = matches.get_one::<String>("mint").map(String::as_str).unwrap_or_default();
    let wallets: Vec<String> = matches
        .get_many::<String>("address")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let batch_size = matches.get_one::<usize>("batch-size").copied().unwrap_or(5);
    let delay = Duration::from_millis(matches.get_one::<u64>("delay-ms").copied().unwrap_or(200));

    for address in std::iter::once(mint).chain(wallets.iter().map(String::as_str)) {
        if !is_valid_solana_address(address) {
            bail!("not a Solana address: {}", address);
        }
    }

    let config = Config::from_env()?;
    let client = HeliusClient::from_config(&config)?;

    info!("Looking up {} wallets for mint {}", wallets.len(), mint);
    let balances = fetch_balances_batched(&client, mint, &wallets, batch_size, delay).await;

    let mut file = match matches.get_one::<String>("output") {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    for (wallet, balance) in &balances {
        let balance = format_balance(*balance);
        println!("{}  {}", wallet, balance);
        if let Some(file) = file.as_mut() {
            writeln!(file, "{},{}", wallet, balance)?;
        }
    }

    if matches.get_flag("holders") {
        let holders = client.fetch_holder_count(mint).await;
        println!("holders of {}: {}", mint, holders);
    }

    Ok(())
}
