//! Command-line configuration for the locator.

use chain_locator::{
    LocatorConfig,
    SearchBounds,
    config::{
        DEFAULT_BATCH_SIZE,
        DEFAULT_MAX_SCAN_BLOCKS,
        DEFAULT_MAX_SEARCH_BLOCKS,
        DEFAULT_MAX_TX_RANGE,
        DEFAULT_SMALL_WINDOW_THRESHOLD,
        DEFAULT_TX_RANGE_MULTIPLIER,
    },
};
use chain_locator_client::ClientConfig;
use clap::{
    Args,
    Parser,
    Subcommand,
};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "locate", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub args: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Every option is also read from a `LOCATOR_*` env var.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// JSON-RPC endpoint of the chain node.
    #[arg(long, env = "LOCATOR_RPC_URL", default_value = "http://127.0.0.1:9933")]
    pub rpc_url: String,

    /// GraphQL endpoint of an indexing service. Enables identifier lookups
    /// and is consulted before scanning blocks for a hash.
    #[arg(long, env = "LOCATOR_INDEXER_URL")]
    pub indexer_url: Option<String>,

    /// Bearer token sent to both endpoints.
    #[arg(long, env = "LOCATOR_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "LOCATOR_REQUEST_TIMEOUT_SECONDS", default_value = "30")]
    pub request_timeout_seconds: u64,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "LOCATOR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Print results as JSON.
    #[arg(long, env = "LOCATOR_JSON")]
    pub json: bool,

    #[arg(long, env = "LOCATOR_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Windows spanning fewer heights than this are scanned linearly.
    #[arg(
        long,
        env = "LOCATOR_SMALL_WINDOW_THRESHOLD",
        default_value_t = DEFAULT_SMALL_WINDOW_THRESHOLD
    )]
    pub small_window_threshold: u64,

    /// Depth of the default transaction search window.
    #[arg(
        long,
        env = "LOCATOR_MAX_SEARCH_BLOCKS",
        default_value_t = DEFAULT_MAX_SEARCH_BLOCKS
    )]
    pub max_search_blocks: u64,

    /// Depth of the default account scan window.
    #[arg(long, env = "LOCATOR_MAX_SCAN_BLOCKS", default_value_t = DEFAULT_MAX_SCAN_BLOCKS)]
    pub max_scan_blocks: u64,

    #[arg(
        long,
        env = "LOCATOR_TX_RANGE_MULTIPLIER",
        default_value_t = DEFAULT_TX_RANGE_MULTIPLIER
    )]
    pub tx_range_multiplier: u64,

    /// Cap on blocks examined for a latest-transactions page.
    #[arg(long, env = "LOCATOR_MAX_TX_RANGE", default_value_t = DEFAULT_MAX_TX_RANGE)]
    pub max_tx_range: u64,
}

impl GlobalArgs {
    pub fn locator_config(&self) -> LocatorConfig {
        LocatorConfig::default()
            .with_batch_size(self.batch_size)
            .with_small_window_threshold(self.small_window_threshold)
            .with_max_search_blocks(self.max_search_blocks)
            .with_max_scan_blocks(self.max_scan_blocks)
            .with_tx_range(self.tx_range_multiplier, self.max_tx_range)
    }

    pub fn client_config(&self, url: &str) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::new(url)?
            .with_request_timeout(Duration::from_secs(self.request_timeout_seconds));
        if let Some(token) = &self.auth_token {
            config = config.with_bearer_token(token);
        }
        Ok(config)
    }
}

/// Optional height bounds. Unset bounds fall back to the finalized head and
/// the configured window depth.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct WindowArgs {
    /// Lowest height to examine.
    #[arg(long)]
    pub from: Option<u64>,

    /// Highest height to examine.
    #[arg(long)]
    pub to: Option<u64>,
}

impl From<WindowArgs> for SearchBounds {
    fn from(window: WindowArgs) -> Self {
        SearchBounds::new(window.from, window.to)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find a transaction by hash or indexer identifier.
    Tx {
        key: String,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// List transactions whose payload mentions an account.
    Account {
        marker: String,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Show the most recent blocks.
    Blocks {
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },
    /// Show the most recent transactions.
    Txs {
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },
    /// Show a block by hash.
    Block { hash: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_locator_config() {
        let cli = Cli::try_parse_from(["locate", "blocks"]).unwrap();
        assert_eq!(cli.args.locator_config(), LocatorConfig::default());
        assert_eq!(cli.args.rpc_url, "http://127.0.0.1:9933");
        assert!(cli.args.indexer_url.is_none());
        assert!(!cli.args.json);
        assert_matches!(cli.command, Commands::Blocks { limit: 10 });
    }

    #[test]
    fn tx_accepts_bounds() {
        let cli = Cli::try_parse_from([
            "locate", "tx", "0xabcd", "--from", "100", "--to", "200",
        ])
        .unwrap();
        assert_matches!(
            cli.command,
            Commands::Tx { ref key, window } if key == "0xabcd"
                && SearchBounds::from(window) == SearchBounds::new(Some(100), Some(200))
        );
    }

    #[test]
    fn global_options_precede_subcommand() {
        let cli = Cli::try_parse_from([
            "locate",
            "--rpc-url",
            "https://rpc.example.org",
            "--batch-size",
            "5",
            "--max-search-blocks",
            "50",
            "--json",
            "txs",
            "-l",
            "3",
        ])
        .unwrap();
        let config = cli.args.locator_config();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_search_blocks, 50);
        assert!(cli.args.json);
        assert_matches!(cli.command, Commands::Txs { limit: 3 });
    }

    #[test]
    fn account_requires_marker() {
        assert!(Cli::try_parse_from(["locate", "account"]).is_err());
        let cli = Cli::try_parse_from(["locate", "account", "d435"]).unwrap();
        assert_matches!(cli.command, Commands::Account { ref marker, .. } if marker == "d435");
    }

    #[test]
    fn client_config_carries_timeout_and_token() {
        let cli = Cli::try_parse_from([
            "locate",
            "--auth-token",
            "secret",
            "--request-timeout-seconds",
            "5",
            "blocks",
        ])
        .unwrap();
        let config = cli.args.client_config(&cli.args.rpc_url).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.bearer_token.as_deref(), Some("secret"));
    }

    #[test]
    fn rejects_bad_url() {
        let cli = Cli::try_parse_from(["locate", "--rpc-url", "ftp://node", "blocks"]).unwrap();
        assert!(cli.args.client_config(&cli.args.rpc_url).is_err());
    }
}
