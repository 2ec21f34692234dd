//! celo-txflow command line.
//!
//! ```text
//! celo-txflow --config wallet.toml status
//! celo-txflow --config wallet.toml balances --address 0x...
//! CELO_TXFLOW_PRIVATE_KEY=... celo-txflow --config wallet.toml \
//!     send --to 0x... --amount 1.5 --token cUSD [--fee-token CELO]
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use celo_txflow::collaborators::{BalanceSource, ChainBalances, InMemoryHistory};
use celo_txflow::config::{load_config, WalletConfig};
use celo_txflow::fees::FeeToken;
use celo_txflow::observability::{logging, metrics};
use celo_txflow::tx::{LocalSigner, TransactionIntent, TransactionSigner};
use celo_txflow::{ConnectionManager, FeeEstimationEngine, PlanExecutor, WalletError};

#[derive(Parser)]
#[command(name = "celo-txflow")]
#[command(about = "Multi-token fee estimation and transaction execution", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "celo-txflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the node and report its sync state
    Status,
    /// Show fee token balances of an account
    Balances {
        #[arg(long)]
        address: Address,
    },
    /// Transfer a token, paying fees in the best affordable fee token
    Send {
        #[arg(long)]
        to: Address,
        /// Decimal amount in whole token units
        #[arg(long)]
        amount: String,
        /// Symbol of the token to send
        #[arg(long)]
        token: String,
        /// Symbol of the preferred fee token
        #[arg(long)]
        fee_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(config = %cli.config.display(), "celo-txflow v0.1.0 starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let result = match cli.command {
        Commands::Status => status(&config).await,
        Commands::Balances { address } => balances(&config, address).await,
        Commands::Send {
            to,
            amount,
            token,
            fee_token,
        } => send(&config, to, &amount, &token, fee_token.as_deref()).await,
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn status(config: &WalletConfig) -> Result<(), WalletError> {
    let connections = ConnectionManager::new(config.node.clone());
    let conn = connections.connect_from_config().await?;
    println!("endpoint:   {}", conn.url());
    println!("chain id:   {}", conn.chain_id());
    println!("block:      {}", conn.synced_block());
    println!("timestamp:  {}", conn.synced_block_timestamp());
    Ok(())
}

async fn balances(config: &WalletConfig, address: Address) -> Result<(), WalletError> {
    let connections = Arc::new(ConnectionManager::new(config.node.clone()));
    connections.connect_from_config().await?;

    let tokens: Vec<FeeToken> = config.tokens.iter().map(FeeToken::from).collect();
    let source = ChainBalances::new(
        address,
        tokens.iter().map(|t| t.address).collect(),
        connections,
        Duration::from_secs(config.fees.balance_ttl_secs),
    );
    let snapshot = source.refresh().await?;
    for token in &tokens {
        let amount = format_units(snapshot.balance_of(token.address), token.decimals)
            .map_err(|e| WalletError::Validation(e.to_string()))?;
        println!("{:<8} {}", token.symbol, amount);
    }
    Ok(())
}

async fn send(
    config: &WalletConfig,
    to: Address,
    amount: &str,
    token_symbol: &str,
    fee_symbol: Option<&str>,
) -> Result<(), WalletError> {
    let find = |symbol: &str| {
        config
            .tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .map(FeeToken::from)
            .ok_or_else(|| WalletError::Validation(format!("Unknown token {}", symbol)))
    };
    let token = find(token_symbol)?;
    let preferred = fee_symbol.map(find).transpose()?;
    let value = parse_units(amount, token.decimals)
        .map_err(|e| WalletError::Validation(format!("Invalid amount '{}': {}", amount, e)))?
        .get_absolute();

    let signer = LocalSigner::from_env()?;
    let connections = Arc::new(ConnectionManager::new(config.node.clone()));
    connections.connect_from_config().await?;

    let balances = Arc::new(ChainBalances::new(
        signer.address(),
        config.tokens.iter().map(|t| t.address).collect(),
        connections.clone(),
        Duration::from_secs(config.fees.balance_ttl_secs),
    ));
    let engine = FeeEstimationEngine::from_config(config, connections.clone(), balances);

    let intent = if token.is_native {
        TransactionIntent::native_transfer(to, value)
    } else {
        TransactionIntent::token_transfer(token.address, to, value)
    }
    .with_label(format!("Send {} {}", amount, token.symbol));
    let intents = vec![intent];

    let estimate = engine
        .estimate_fee(
            &intents,
            true,
            preferred.map(|t| t.address),
            Some(token.address),
        )
        .await?;
    let fee = format_units(estimate.total_fee, estimate.fee_token.decimals)
        .map_err(|e| WalletError::Validation(e.to_string()))?;
    if !estimate.authoritative {
        return Err(WalletError::Validation(format!(
            "Insufficient balance: the cheapest option needs {} {} in fees",
            fee, estimate.fee_token.symbol
        )));
    }
    println!("fee: {} {}", fee, estimate.fee_token.symbol);

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Unprintable event"),
            }
        }
    });

    let history = InMemoryHistory::new();
    let executor = PlanExecutor::new(connections, config.executor.clone());
    let outcome = executor
        .execute(intents, estimate.estimates, &signer, &history, &events_tx, "send")
        .await;
    drop(events_tx);
    if printer.await.is_err() {
        tracing::warn!("Event printer stopped early");
    }

    let report = outcome?;
    for record in report.records {
        println!("{} confirmed in block {}", record.hash, record.block_number);
    }
    Ok(())
}
