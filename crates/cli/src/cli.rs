use std::net::SocketAddr;

use clap::Parser;
use stdiows::{BridgeConfig, DEFAULT_AUTHORITY_URL, DEFAULT_LISTEN_ADDR};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "stdiows")]
#[command(about = "Expose a program's stdin/stdout to authorized WebSocket clients")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Authority that maps a session token to the command to run
	#[arg(long, value_name = "URL", default_value = DEFAULT_AUTHORITY_URL)]
	pub controller_url: Url,

	/// Address to accept upgrade requests on
	#[arg(long, value_name = "ADDR", default_value = DEFAULT_LISTEN_ADDR)]
	pub listen: SocketAddr,
}

impl Cli {
	pub fn into_config(self) -> BridgeConfig {
		BridgeConfig::new(self.controller_url, self.listen)
	}
}
