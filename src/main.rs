/* hwbenchd entrypoint: sets up tracing, loads the device catalog, builds the
 * backend registry and pool, and feeds enumerator events (JSON lines on
 * stdin, one DeviceEvent per line) into the pool until shutdown. */
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hwbenchd::coordinator::Coordinator;
use hwbenchd::device::DeviceEvent;
use hwbenchd::pool::DevicePool;
use hwbenchd::{catalog, driver};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting hwbenchd version {}", env!("CARGO_PKG_VERSION"));

    /* Load the .device catalog from the data directory */
    let data_dir = PathBuf::from(
        std::env::var("HWBENCHD_DATA_DIR").unwrap_or_else(|_| "/usr/share/hwbench".to_string()),
    );
    let catalog = catalog::load_catalog(&data_dir);

    let registry = driver::builtin_registry();
    let pool = Arc::new(DevicePool::new(registry, catalog));
    let coordinator = Coordinator::new(Arc::clone(&pool));

    let (event_tx, mut event_rx) = mpsc::channel::<DeviceEvent>(32);

    /* The enumerator is an external collaborator; its add/remove events
     * arrive as JSON lines on stdin. */
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<DeviceEvent>(&line) {
                    Ok(event) => {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("Bad enumerator event: {err}"),
                },
                Ok(None) => break,
                Err(err) => {
                    warn!("Enumerator feed error: {err}");
                    break;
                }
            }
        }
        info!("Enumerator feed closed");
    });

    let event_pool = Arc::clone(&pool);
    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            event_pool.apply_event(event).await;
        }
    });

    /* Run until interrupted. */
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    coordinator.disarm().await;
    for id in pool.device_ids().await {
        if let Err(err) = pool.close(&id).await {
            warn!("Close of {id}: {err}");
        }
    }
    events.abort();

    Ok(())
}
