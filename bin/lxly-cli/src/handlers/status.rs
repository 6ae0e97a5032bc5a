use anyhow::{bail, Context, Result};
use lxly_bridge_tracker::retry::retry_with;
use lxly_status_api::{StatusApiClient, TransactionRecord};
use tracing::info;

use crate::{cli, config::Config};

pub(crate) async fn handle_status(config: Config, args: cli::StatusArgs) -> Result<()> {
    let strategy = config.tracker.retry_strategy(config.tracker.max_retries);
    let client = StatusApiClient::new(config.status_api).context("build status API client")?;

    let records = retry_with(strategy, || client.transactions(args.user))
        .await
        .context("query status API")?;
    info!(user = %args.user, count = records.len(), "received bridge transactions");

    let records: Vec<_> = records
        .into_iter()
        .filter(|record| {
            args.tx
                .map_or(true, |tx_ref| record.bridge_transaction_hash == tx_ref)
        })
        .collect();

    if let (Some(tx_ref), true) = (args.tx, records.is_empty()) {
        bail!("bridge transaction {tx_ref} is not indexed for {}", args.user);
    }

    for record in &records {
        println!("{}", describe(record));
    }

    Ok(())
}

fn describe(record: &TransactionRecord) -> String {
    let state = record
        .state()
        .map(|state| state.to_string())
        .unwrap_or_else(|_| format!("unknown status {:?}", record.status));

    let mut line = format!(
        "{} {state} {} -> {} token={} amount={}",
        record.bridge_transaction_hash,
        record.source_network,
        record.destination_network,
        record.token,
        record.amount,
    );

    if let Some(claim_tx_ref) = record.claim_transaction_hash {
        line.push_str(&format!(" claim={claim_tx_ref}"));
    }

    line
}
