//! # syndic8
//!
//! Search the Syndic8 feed directory from the command line.
//!
//! ```bash
//! # Feeds about cooking, site name and data URL per line
//! syndic8
//!
//! # Any query, more fields, JSON output
//! syndic8 linux kernel --field sitename --field siteurl --json
//!
//! # Against a local mock directory
//! syndic8 cooking --host 127.0.0.1 --port 8080
//! ```
//!
//! The endpoint and result cap also honour `SYNDIC8_HOST`, `SYNDIC8_PATH`,
//! `SYNDIC8_PORT` and `SYNDIC8_MAX_RESULTS`; flags win over the environment.
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

mod output;

use anyhow::Result;
use clap::Parser;
use syndic8_core::{ClientConfig, Credentials, DirectoryClient, UreqTransport};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "syndic8", version, about = "Search the Syndic8 feed directory")]
struct Cli {
    /// Search words, joined with spaces
    #[arg(value_name = "QUERY")]
    query: Vec<String>,

    /// Cap on the number of feeds returned (-1 for no limit)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    max_results: Option<i64>,

    /// Feed field to print; repeat for several
    #[arg(long = "field", value_name = "FIELD")]
    fields: Vec<String>,

    /// Print one JSON object per feed
    #[arg(long)]
    json: bool,

    /// Directory host (default www.syndic8.com)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Directory port (default 80)
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// XML-RPC endpoint path (default /xmlrpc.php)
    #[arg(long, value_name = "PATH")]
    path: Option<String>,
}

impl Cli {
    fn search_text(&self) -> String {
        if self.query.is_empty() {
            "cooking".to_string()
        } else {
            self.query.join(" ")
        }
    }

    fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env()?;
        if let Some(host) = &self.host {
            config.endpoint.host = host.clone();
        }
        if let Some(port) = self.port {
            config.endpoint.port = port;
        }
        if let Some(path) = &self.path {
            config.endpoint.path = path.clone();
        }
        if let Some(max) = self.max_results {
            config.max_results = max;
        }
        if !self.fields.is_empty() {
            config.keys = self.fields.clone();
        } else {
            config.keys = output::default_fields(&config.keys);
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    let fields = config.keys.clone();
    let client = DirectoryClient::with_config(config, Credentials::anonymous(), UreqTransport::new())?;

    let query = cli.search_text();
    tracing::info!(%query, "searching");
    for feed in client.search(&query)? {
        if cli.json {
            println!("{}", output::json_line(&feed, &fields));
        } else {
            println!("{}", output::quoted_line(&feed, &fields));
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        println!("Error: {e}");
        std::process::exit(1);
    }
}
