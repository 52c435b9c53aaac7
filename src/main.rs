//! Demonstration CLI for the ledger engine.
//!
//! This binary is not part of the spec'd core (`ledger-core` /
//! `ledger-shared`): it is a thin driver that exercises the engine end to
//! end, the way the teacher's own `main.rs` demos its blockchain and crypto
//! primitives before any networking is involved.

use clap::{Parser, Subcommand};
use ledger_core::{Chain, Result, Transaction, TransactionOutput};
use ledger_shared::KeyPair;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "UTXO blockchain engine: transactions, blocks, fork-aware chain state")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a short demonstration: fund an address, mine a block spending
    /// the genesis coinbase, and print the resulting chain state.
    Demo,
    /// Mine a single empty-ledger block on top of the production genesis
    /// block and print its hash and nonce.
    Mine,
    /// Print build and engine constants.
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command.unwrap_or(Commands::Demo) {
        Commands::Demo => run_demo(),
        Commands::Mine => run_mine(),
        Commands::Version => {
            show_version();
            Ok(())
        }
    }
}

fn run_demo() -> Result<()> {
    info!("generating a keypair to receive the genesis coinbase");
    let owner = KeyPair::generate()?;
    let owner_address = owner.address()?;

    let mut chain = Chain::with_genesis_address(owner_address);
    let genesis_tx_hash = chain.head().transactions[0].hash;
    println!("genesis block hash: {}", chain.head().hash);
    println!("genesis coinbase:   {}", genesis_tx_hash);

    let recipient = KeyPair::generate()?;
    let recipient_address = recipient.address()?;

    let spend = Transaction::new_signed(
        &[(genesis_tx_hash, 0, &owner)],
        vec![TransactionOutput {
            amount: 1000,
            address: recipient_address,
        }],
        2.0,
    )?;

    info!("mining a block spending the genesis coinbase");
    let block = ledger_core::generate_next_block(chain.head(), vec![spend.clone()]);
    chain.add_block(block)?;

    println!("new head index: {}", chain.head().index);
    println!("new head hash:  {}", chain.head().hash);
    println!(
        "spend transaction {} has {} unspent output(s) in the UTXO set",
        spend.hash,
        chain.utxo().entry(&spend.hash).map_or(0, |(_, unspent)| unspent.len())
    );
    let encoded = chain
        .head()
        .to_json()
        .map_err(|e| ledger_core::ChainError::Block(e.to_string()))?;
    println!("wire encoding of the new head:\n{}", encoded);

    Ok(())
}

fn run_mine() -> Result<()> {
    let chain = Chain::new();
    let coinbase = Transaction::coinbase(
        ledger_core::production_genesis_address().to_string(),
        10,
        2.0,
    );
    let block = ledger_core::generate_next_block(chain.head(), vec![coinbase]);
    println!("mined block index {}", block.index);
    println!("hash:  {}", block.hash);
    println!("nonce: {}", block.nonce);
    Ok(())
}

fn show_version() {
    println!("ledger {}", env!("CARGO_PKG_VERSION"));
    println!("difficulty (leading hex zeros): {}", ledger_core::DIFFICULTY);
    println!("min transaction amount: {}", ledger_core::MIN_TRANSACTION_AMOUNT);
    println!("coinbase reward: {}", ledger_core::COINBASE_REWARD);
    println!(
        "max transactions per block: {}",
        ledger_core::MAX_TRANSACTIONS_PER_BLOCK
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_without_error() {
        run_demo().unwrap();
    }

    #[test]
    fn mine_runs_without_error() {
        run_mine().unwrap();
    }
}
