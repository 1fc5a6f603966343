use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use lurkbot_core::Error;
use lurkbot_core::config::load_accounts_from_env;
use lurkbot_core::platforms::manager::PlatformManager;

#[derive(Parser, Debug, Clone)]
#[command(name = "lurkbot")]
#[command(author, version, about = "LurkBot - keeps Discord accounts online on a schedule")]
struct Args {
    /// Path to the env file holding DISCORD_TOKEN_n and friends.
    /// Defaults to a best-effort load of ./.env.
    #[arg(long)]
    env_file: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("lurkbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    // Startup failures (an unreadable explicit env file) are the only
    // non-zero exits; everything past this point retries forever.
    if let Err(e) = run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(Box::new(e) as Box<dyn std::error::Error>);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: Args) -> Result<(), Error> {
    match args.env_file {
        Some(ref path) => {
            dotenv::from_path(path)
                .map_err(|e| Error::Parse(format!("cannot read env file '{path}': {e}")))?;
        }
        None => {
            let _ = dotenv::dotenv();
        }
    }

    let accounts = load_accounts_from_env();
    if accounts.is_empty() {
        info!("No Discord accounts configured. Set DISCORD_TOKEN_1, DISCORD_TOKEN_2, ...");
        return Ok(());
    }

    let manager = PlatformManager::new(accounts);
    info!(
        "Starting presence runtimes for {} account(s)...",
        manager.account_count()
    );
    let handles = manager.start_all_accounts();

    // The runtimes never finish on their own; wait for Ctrl-C and then
    // drop them. In-flight sessions just see an abrupt disconnect.
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C detected; shutting down presence runtimes...");
    for handle in &handles {
        handle.abort();
    }

    Ok(())
}
