use std::path::PathBuf;

use alloy_primitives::Address;
use clap::{crate_version, Args, Parser, Subcommand};
use lxly_bridge_primitives::types::TxRef;
use lxly_status_api::StatusNetwork;

#[derive(Parser, Debug)]
#[command(
    name = "lxly-cli",
    about = "Query and follow cross-chain bridge transactions",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Commands {
    Status(StatusArgs),

    Track(TrackArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct GlobalArgs {
    #[arg(
        long,
        short = 'c',
        env = "LXLY_CONFIG",
        global = true,
        help = "the TOML file with the status API and tracker configuration"
    )]
    pub(crate) config: Option<PathBuf>,

    #[arg(
        long,
        env = "LXLY_API_KEY",
        global = true,
        hide_env_values = true,
        help = "the status API key, overrides the one in the config file"
    )]
    pub(crate) api_key: Option<String>,

    #[arg(
        long,
        global = true,
        help = "the status API deployment (testnet or mainnet), overrides the config file"
    )]
    pub(crate) network: Option<StatusNetwork>,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "List the bridge transactions of an address", version)]
pub(crate) struct StatusArgs {
    #[arg(long, help = "the address the transactions are indexed under")]
    pub(crate) user: Address,

    #[arg(long, help = "only show the transaction with this source-chain hash")]
    pub(crate) tx: Option<TxRef>,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Follow a bridge transaction until it is claimed", version)]
pub(crate) struct TrackArgs {
    #[arg(long, help = "the source-chain hash of the bridge transaction")]
    pub(crate) tx: TxRef,

    #[arg(long, help = "the address the transaction is indexed under")]
    pub(crate) user: Address,

    #[arg(long, help = "seconds between two polls, overrides the config file")]
    pub(crate) poll_interval_secs: Option<u64>,

    #[arg(long, help = "give up after this many seconds, overrides the config file")]
    pub(crate) timeout_secs: Option<u64>,
}
