//! # ticketmesh CLI
//!
//! Runs registry nodes and talks to providers from the shell.
//!
//! ## Usage
//!
//! ```bash
//! # Run a node that is one of three replicas
//! ticketmesh node -b 0.0.0.0:7001 --provider-id node-1 \
//!     -p 10.0.0.1:7001 -p 10.0.0.2:7001 -p 10.0.0.3:7001
//!
//! # Call a provider directly (outputs raw JSON)
//! ticketmesh call 127.0.0.1:7001 cas.getTickets
//! ticketmesh call 127.0.0.1:7001 cas.getTicket -a '{"ticket-id": "ST-1"}'
//! ```
//!
//! Logging follows `RUST_LOG` and defaults to `info`. The `call` command
//! logs nothing so its output can be piped to `jq`.

use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use ticketmesh_broker::{RegistryConfig, TicketRegistry};
use ticketmesh_client::{JsonTicket, RpcClient};
use ticketmesh_heartbeat::HeartbeatConfig;

/// Environment variable consulted when `--provider-id` is not given.
const PROVIDER_ID_ENV: &str = "TICKETMESH_PROVIDER_ID";

/// ticketmesh - replicated ticket registry
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Commands {
    Node(NodeArgs),
    Call(CallArgs),
}

/// Run a registry node until Ctrl-C
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "node")]
struct NodeArgs {
    /// bind address for the local provider (default: 0.0.0.0:7001)
    #[argh(option, short = 'b', default = "\"0.0.0.0:7001\".into()")]
    bind: String,

    /// provider address, this node's included (repeat for each peer)
    #[argh(option, short = 'p', long = "peer")]
    peers: Vec<String>,

    /// identity of the local provider (default: $TICKETMESH_PROVIDER_ID, else a random uuid)
    #[argh(option)]
    provider_id: Option<String>,

    /// request timeout in milliseconds (default: 1500)
    #[argh(option, default = "1500")]
    request_timeout_ms: u64,

    /// heartbeat interval in milliseconds (default: 5000)
    #[argh(option, default = "5000")]
    heartbeat_interval_ms: u64,

    /// heartbeat pong timeout in milliseconds (default: 200)
    #[argh(option, default = "200")]
    heartbeat_timeout_ms: u64,

    /// number of heartbeat watchdog tasks (default: 1)
    #[argh(option, default = "1")]
    watchdog_workers: usize,
}

/// Make a single JSON-RPC call to a provider (outputs raw JSON)
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "call")]
struct CallArgs {
    /// provider address (e.g. 127.0.0.1:7001)
    #[argh(positional)]
    server_address: String,

    /// method name (e.g. cas.getTickets)
    #[argh(positional)]
    method: String,

    /// JSON params object (default: {})
    #[argh(option, short = 'a', long = "args", default = "\"{}\".into()")]
    args: String,

    /// request timeout in milliseconds (default: 1500)
    #[argh(option, default = "1500")]
    timeout_ms: u64,
}

impl NodeArgs {
    /// Builds the node configuration, resolving the provider id from the
    /// flag, then `env_id`, then a fresh uuid.
    fn into_config(self, env_id: Option<String>) -> RegistryConfig {
        let provider_id = self
            .provider_id
            .or(env_id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(RegistryConfig::generate_provider_id);

        RegistryConfig {
            bind_addr: self.bind,
            peers: self.peers,
            provider_id,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            heartbeat: HeartbeatConfig::new(
                Duration::from_millis(self.heartbeat_interval_ms),
                Duration::from_millis(self.heartbeat_timeout_ms),
            ),
            watchdog_workers: self.watchdog_workers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Keep `call` output clean for piping.
    if !matches!(cli.command, Commands::Call(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Node(args) => run_node(args).await,
        Commands::Call(args) => run_call(args).await,
    }
}

/// Executes the `node` subcommand.
async fn run_node(args: NodeArgs) -> Result<()> {
    let config = args.into_config(std::env::var(PROVIDER_ID_ENV).ok());

    tracing::info!("Starting ticketmesh node {}", config.provider_id);
    tracing::info!("Binding to: {}", config.bind_addr);
    tracing::info!("Peers: {:?}", config.peers);

    if config.peers.is_empty() {
        tracing::warn!("No peers specified! Use --peer <addr>, including this node's own address.");
    }

    let registry: TicketRegistry<JsonTicket> = TicketRegistry::start(config).await?;
    tracing::info!(
        "Node listening on {} with {} tickets",
        registry.local_addr(),
        registry.ticket_count()
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    registry.shutdown().await;

    Ok(())
}

/// Executes the `call` subcommand.
///
/// Parses the params, sends one request and prints the raw JSON result to
/// stdout. RPC errors surface as the process error.
async fn run_call(args: CallArgs) -> Result<()> {
    let params: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in args: {}", e))?;

    let client = RpcClient::new(
        args.server_address,
        Duration::from_millis(args.timeout_ms),
        None,
    );
    client.connect();
    let result = client.call(&args.method, params).await;
    client.disconnect().await;

    println!("{}", serde_json::to_string(&result?)?);

    Ok(())
}
