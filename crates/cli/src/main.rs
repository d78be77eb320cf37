use std::path::PathBuf;
use std::sync::Arc;

use cdp_bridge_cli::{
	cli::Cli,
	logging,
	server::{self, BridgeState},
};
use cdp_bridge_runtime::{ChromiumLauncher, LaunchOptions};
use clap::Parser;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	// CHROME_PATH is read once here; sessions never consult the environment.
	let executable = cli
		.chrome_path
		.clone()
		.or_else(|| std::env::var_os("CHROME_PATH").map(PathBuf::from));

	let launch_options = LaunchOptions {
		executable,
		headless: !cli.headed,
	};

	let state = Arc::new(BridgeState::new(Arc::new(ChromiumLauncher), launch_options));
	server::run(&cli.host, cli.port, state).await
}
