use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wallet_sync::config::Config;
use wallet_sync::oracle_explorer::OracleExplorer;
use wallet_sync::WalletContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!(server_url = %config.server_url, "starting wallet sync");

    let explorer = OracleExplorer::new(&config)?;
    info!(explorer = explorer.explorer().name, "oracle explorer selected");

    let ctx = WalletContext::from_config(&config)?;

    tokio::select! {
        result = ctx.wait_for_server_and_initialize_all() => match result {
            Ok(state) => {
                info!(
                    version = state.version.as_deref().unwrap_or_default(),
                    short_version = state.short_version.as_deref().unwrap_or_default(),
                    dlc_host_address = state.dlc_host_address.as_deref().unwrap_or_default(),
                    fee_estimate = state.fee_estimate.unwrap_or_default(),
                    "wallet state loaded"
                );
                info!(
                    funded_addresses = ctx.addresses().funded_addresses().len(),
                    contacts = ctx.contacts().contacts().len(),
                    dlcs = ctx.dlcs().dlcs().len(),
                    contract_infos = ctx.dlcs().contract_infos().len(),
                    offers = ctx.offers().book().offers.len(),
                    "wallet services loaded"
                );
            }
            Err(e) => error!(error = %e, "wallet initialization failed"),
        },
        _ = shutdown_signal() => {
            ctx.uninitialize_all();
            return Ok(());
        }
    }

    shutdown_signal().await;
    ctx.uninitialize_all();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
