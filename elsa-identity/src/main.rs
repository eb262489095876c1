mod signal;

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use elsa_identity_core::{
    bootstrap::{init_identity_store, load_config, AdminBootstrap, StartupSequencer},
    config::StartupMode,
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load and validate configuration
    let config = load_config()?;

    // 2. Initialize logging; the guard flushes the file writer on drop
    let _log_guard = logging::init_logging(&config.logging)?;
    info!("ElsaPro identity host starting...");

    // 3. Initialize the identity store
    let collaborators = init_identity_store(&config).await?;

    // 4. Register run-once startup tasks
    let mut sequencer = StartupSequencer::from_config(&config.startup);
    sequencer.register(Arc::new(AdminBootstrap::new(&config.admin, collaborators)));

    let shutdown = CancellationToken::new();

    // 5. Run them before serving, or alongside
    let mut background = match config.startup.mode {
        StartupMode::Blocking => {
            let run = sequencer.run(&shutdown);
            tokio::pin!(run);
            let result = tokio::select! {
                result = &mut run => result,
                () = signal::shutdown_signal() => {
                    warn!("Shutdown requested during startup, cancelling startup tasks");
                    shutdown.cancel();
                    match run.await {
                        Ok(summary) => info!(
                            completed = summary.completed.len(),
                            failed = summary.failed.len(),
                            "Startup tasks stopped"
                        ),
                        Err(e) => warn!("Startup tasks stopped: {e:#}"),
                    }
                    return Ok(());
                }
            };
            let summary = result?;
            info!(
                completed = summary.completed.len(),
                failed = summary.failed.len(),
                "Startup tasks finished"
            );
            None
        }
        StartupMode::Background => {
            info!("Running startup tasks in the background");
            Some(sequencer.spawn(shutdown.clone()))
        }
    };

    // 6. Report readiness, then wait for shutdown
    let mut signalled = false;
    match background.as_mut() {
        Some(handle) => {
            tokio::select! {
                ready = handle.wait_ready() => {
                    if ready {
                        info!("ElsaPro identity host ready");
                    } else {
                        warn!("Background startup tasks aborted, host is not ready");
                    }
                }
                () = signal::shutdown_signal() => signalled = true,
            }
        }
        None => info!("ElsaPro identity host ready"),
    }

    if !signalled {
        signal::shutdown_signal().await;
    }
    info!("Shutdown signal received, stopping...");
    shutdown.cancel();

    if let Some(handle) = background {
        match handle.join().await {
            Ok(summary) => info!(
                completed = summary.completed.len(),
                failed = summary.failed.len(),
                "Background startup tasks finished"
            ),
            Err(e) => error!("Background startup tasks failed: {e:#}"),
        }
    }

    info!("ElsaPro identity host stopped");
    Ok(())
}
