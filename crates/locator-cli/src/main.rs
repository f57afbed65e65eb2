mod cli;

use crate::cli::{
    Cli,
    Commands,
    GlobalArgs,
};
use anyhow::{
    Result,
    anyhow,
};
use chain_locator::{
    BlockSummary,
    LocateError,
    Locator,
    TransactionSearchResult,
    normalize,
};
use chain_locator_client::{
    IndexerClient,
    RpcChainClient,
};
use clap::Parser;
use serde::Serialize;
use serde_json::{
    Value,
    json,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const NOT_FOUND: &str = "no match in searched range";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.args.log_level);

    if let Err(err) = run(&cli).await {
        if cli.args.json {
            eprintln!(
                "{}",
                json!({
                    "status": "error",
                    "error": {
                        "message": err.to_string(),
                    }
                })
            );
            std::process::exit(1);
        }
        return Err(err);
    }
    Ok(())
}

/// Logs go to stderr so results on stdout stay machine-readable.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_locator(args: &GlobalArgs) -> Result<Locator<RpcChainClient>> {
    let rpc = RpcChainClient::new(&args.client_config(&args.rpc_url)?)?;
    let mut locator = Locator::new(Arc::new(rpc), args.locator_config())?;
    if let Some(url) = &args.indexer_url {
        let indexer = IndexerClient::new(&args.client_config(url)?)?;
        locator = locator.with_index(Arc::new(indexer));
    }
    Ok(locator)
}

/// Validation errors keep their own message; upstream failures are reported
/// as a failed search.
fn report(error: LocateError) -> anyhow::Error {
    match error {
        LocateError::Bootstrap(cause) => anyhow!("search failed: {cause}"),
        other => anyhow!(other),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let locator = build_locator(&cli.args)?;
    let json = cli.args.json;

    match &cli.command {
        Commands::Tx { key, window } => {
            let warnings = key_warnings(key);
            let found = locator
                .find_transaction(key, (*window).into())
                .await
                .map_err(report)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&tx_output(found.as_ref(), &warnings))?
                );
                return Ok(());
            }
            for warning in &warnings {
                eprintln!("warning: {warning}");
            }
            match found {
                Some(tx) => emit(false, &tx, describe_transaction),
                None => emit_not_found(false),
            }
        }
        Commands::Account { marker, window } => {
            let found = locator
                .scan_account(marker, (*window).into())
                .await
                .map_err(report)?;
            if found.is_empty() {
                return emit_not_found(json);
            }
            emit(json, &found, |found| {
                found
                    .iter()
                    .map(describe_transaction)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::Blocks { limit } => {
            let page = locator.latest_blocks(*limit).await.map_err(report)?;
            emit(json, &page, |page| {
                page.iter()
                    .map(describe_block)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::Txs { limit } => {
            let page = locator.latest_transactions(*limit).await.map_err(report)?;
            emit(json, &page, |page| {
                page.iter()
                    .map(describe_transaction)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::Block { hash } => {
            match locator.block_by_hash(hash).await.map_err(report)? {
                Some(block) => {
                    emit(json, &block, |block| {
                        let mut lines = vec![describe_block(&block.summary())];
                        lines.extend(
                            block
                                .transactions
                                .iter()
                                .map(|tx| format!("  #{} {}", tx.index, tx.hash)),
                        );
                        lines.join("\n")
                    })
                }
                None => emit_not_found(json),
            }
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human(value));
    }
    Ok(())
}

fn emit_not_found(json: bool) -> Result<()> {
    if json {
        println!("{}", json!({ "status": "not_found", "message": NOT_FOUND }));
    } else {
        println!("{NOT_FOUND}");
    }
    Ok(())
}

/// Adjustments made to `key` before searching, e.g. truncation or padding.
fn key_warnings(key: &str) -> Vec<String> {
    normalize(key)
        .warnings()
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn tx_output(found: Option<&TransactionSearchResult>, warnings: &[String]) -> Value {
    match found {
        Some(tx) => json!({ "status": "found", "result": tx, "warnings": warnings }),
        None => json!({ "status": "not_found", "message": NOT_FOUND, "warnings": warnings }),
    }
}

fn describe_transaction(tx: &TransactionSearchResult) -> String {
    format!(
        "block {} ({}) extrinsic {} hash {}",
        tx.block_number, tx.block_hash, tx.extrinsic_index, tx.hash
    )
}

fn describe_block(block: &BlockSummary) -> String {
    format!(
        "block {} {} parent {} transactions {}",
        block.number, block.hash, block.parent_hash, block.transaction_count
    )
}
