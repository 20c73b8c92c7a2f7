use std::path::PathBuf;

use alloy_primitives::{Address, B256, U256};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use glide::{initialize_logging, open_rollup, SqliteRollup};
use glide_primitives::{BatchId, ChallengeId, FraudClaim, Transaction};
use glide_rollup::{from_toml_path, GlideConfig};
use serde::Serialize;
use tracing::debug;

/// Optimistic rollup node operating on a local SQLite database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path to the node config.
    #[arg(long, default_value = "bin/glide/config.toml")]
    config: PathBuf,

    /// Logging verbosity
    #[arg(long, short = 'v', action = clap::ArgAction::Count, default_value = "2")]
    verbose: u8,
    /// Logging verbosity
    #[arg(long, short = 'q', action)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a transfer for the next batch.
    Submit {
        #[arg(long)]
        sender: Address,
        #[arg(long)]
        recipient: Address,
        #[arg(long)]
        amount: U256,
    },
    /// Cut queued transfers into a committed batch.
    Cut {
        /// Operator to cut as. Defaults to the configured operator.
        #[arg(long)]
        submitter: Option<Address>,
    },
    /// Verify a committed batch and open its challenge window.
    Verify {
        id: u64,
        #[arg(long)]
        caller: Address,
    },
    /// Finalize a verified batch whose challenge window has closed.
    Finalize { id: u64 },
    /// Dispute a verified batch.
    Challenge {
        id: u64,
        #[arg(long)]
        challenger: Address,
        #[arg(long)]
        sender: Address,
        #[arg(long)]
        recipient: Address,
        #[arg(long)]
        amount: U256,
        /// Merkle proof siblings, leaf to root.
        #[arg(long = "proof", value_delimiter = ',')]
        proof: Vec<B256>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Resolve a pending challenge with an explicit verdict.
    Resolve {
        id: u64,
        #[arg(long)]
        valid: bool,
        #[arg(long)]
        resolver: Address,
    },
    /// Assess a pending challenge and resolve it with the result.
    Adjudicate {
        id: u64,
        #[arg(long)]
        resolver: Address,
    },
    /// Show one batch.
    Batch { id: u64 },
    /// List batches, optionally only those touching an address.
    Batches {
        #[arg(long)]
        address: Option<Address>,
    },
    /// Inclusion proof for one leaf of a batch.
    Proof { id: u64, index: usize },
    /// Balance of an address in the configured domain.
    Balance { address: Address },
    /// Record a deposit observed on the settlement chain.
    Deposit {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        address: Address,
        #[arg(long)]
        amount: U256,
    },
    /// Record a withdrawal released on the settlement chain.
    Withdraw {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        address: Address,
        #[arg(long)]
        amount: U256,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let mut args = Args::parse();

    if args.quiet {
        args.verbose = 0;
    }
    let logging_level = match args.verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        4 => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };
    initialize_logging(logging_level)?;

    let config: GlideConfig =
        from_toml_path(&args.config).context("Failed to read node configuration")?;
    debug!(?config, "Loaded configuration");
    let rollup = open_rollup(config)?;

    run(&rollup, args.command)
}

fn run(rollup: &SqliteRollup, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Submit {
            sender,
            recipient,
            amount,
        } => {
            let tx = Transaction::new(sender, recipient, amount);
            rollup.submit_transaction(tx)?;
            print_json(&serde_json::json!({
                "digest": B256::from(tx.digest()),
                "pending": rollup.pending_transaction_count()?,
            }))
        }
        Command::Cut { submitter } => {
            let batch = match submitter {
                Some(submitter) => rollup.cut_batch_as(submitter)?,
                None => rollup.cut_batch()?,
            };
            print_json(&batch)
        }
        Command::Verify { id, caller } => print_json(&rollup.verify_batch(BatchId(id), caller)?),
        Command::Finalize { id } => print_json(&rollup.finalize_batch(BatchId(id))?),
        Command::Challenge {
            id,
            challenger,
            sender,
            recipient,
            amount,
            proof,
            reason,
        } => {
            let claim = FraudClaim {
                asserted_transaction: Transaction::new(sender, recipient, amount),
                merkle_proof: proof.into_iter().map(|sibling| sibling.0).collect(),
                reason,
            };
            print_json(&rollup.submit_challenge(BatchId(id), challenger, claim)?)
        }
        Command::Resolve {
            id,
            valid,
            resolver,
        } => print_json(&rollup.resolve_challenge(ChallengeId(id), valid, resolver)?),
        Command::Adjudicate { id, resolver } => {
            let assessment = rollup.assess_claim(ChallengeId(id))?;
            let challenge = rollup.adjudicate_challenge(ChallengeId(id), resolver)?;
            print_json(&serde_json::json!({
                "assessment": assessment,
                "challenge": challenge,
            }))
        }
        Command::Batch { id } => {
            let id = BatchId(id);
            print_json(&serde_json::json!({
                "batch": rollup.get_batch(id)?,
                "challenges": rollup.challenges_for_batch(id),
            }))
        }
        Command::Batches { address } => match address {
            Some(address) => print_json(&rollup.batches_for_address(&address)),
            None => print_json(&rollup.list_batches()),
        },
        Command::Proof { id, index } => {
            let batch = rollup.get_batch(BatchId(id))?;
            let proof: Vec<B256> = rollup
                .get_proof(batch.id, index)?
                .into_iter()
                .map(B256::from)
                .collect();
            print_json(&serde_json::json!({
                "leaf": B256::from(batch.leaves[index].digest()),
                "root": B256::from(batch.root),
                "proof": proof,
            }))
        }
        Command::Balance { address } => {
            let domain = rollup.domain();
            print_json(&serde_json::json!({
                "address": address,
                "domain": domain,
                "balance": rollup.get_balance(&address, &domain),
            }))
        }
        Command::Deposit {
            caller,
            address,
            amount,
        } => print_json(&serde_json::json!({
            "address": address,
            "balance": rollup.record_deposit(caller, address, amount)?,
        })),
        Command::Withdraw {
            caller,
            address,
            amount,
        } => print_json(&serde_json::json!({
            "address": address,
            "balance": rollup.record_withdrawal(caller, address, amount)?,
        })),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}
