use std::sync::Arc;

use anyhow::Context;
use inference::{AppState, ServiceConfig, router};
use log::info;
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ServiceConfig::from_env()?;
    let state = AppState::load(&config).with_context(|| {
        format!(
            "failed to load {} and {}",
            config.checkpoint_dir.display(),
            config.names_path.display()
        )
    })?;

    let listener = TcpListener::bind(config.addr).await?;
    info!("listening at {}", config.addr);

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                info!("received SIGTERM");
            }
        })
        .await?;

    Ok(())
}
