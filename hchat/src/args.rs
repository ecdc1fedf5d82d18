use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// H-Chat LLM proxy
#[derive(Debug, Parser)]
#[command(name = "hchat", about = "OpenAI-compatible local proxy for Azure, Anthropic and Gemini models")]
pub struct Args {
    /// Path to configuration file; the environment is used when omitted or missing
    #[arg(short, long, env = "HCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, env = "HCHAT_LISTEN")]
    pub listen: Option<SocketAddr>,
}
