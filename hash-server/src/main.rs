use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use hash_server::{cli::Cli, server::HashServer};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = Cli::parse().into_settings();
    let server = match HashServer::bind(settings).await {
        Ok(server) => server,
        Err(err) => {
            error!("could not start server: {err:?}");
            return Err(err.into());
        }
    };
    info!("hash server listening on {}", server.local_addr()?);

    if let Err(err) = server.run_until_ctrl_c().await {
        error!("server exited with error: {err:?}");
        return Err(err.into());
    }

    info!("finished");
    Ok(())
}
