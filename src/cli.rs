use std::{path::PathBuf, sync::OnceLock};

use clap::Parser;

/// Forwards Docker container, volume and network events to a chat webhook.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the config file.
    #[arg(short, long, default_value = "dockhook.toml")]
    pub config: PathBuf,
    /// Webhook endpoint. Overrides `webhook.endpoint` from the config file.
    #[arg(short, long, env = "DOCKHOOK_ENDPOINT")]
    pub endpoint: Option<String>,
    /// Name shown for this node. Overrides `node_name` from the config file.
    #[arg(short, long, env = "DOCKHOOK_NODE_NAME")]
    pub node_name: Option<String>,
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}
