//! SIGINT/SIGTERM handling.
//!
//! A dedicated thread waits for the signal on a small current-thread runtime
//! and raises the flag the tick driver checks between ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;

/// Set `flag` when the process is asked to stop
pub fn install(flag: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;

    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            if runtime.block_on(wait_for_signal()) {
                log::info!("Shutdown requested, finishing current tick");
                flag.store(true, Ordering::Relaxed);
            }
        })
        .context("failed to spawn signal thread")?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("SIGTERM handler unavailable: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        received = ctrl_c() => received,
        _ = terminate.recv() => true,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    ctrl_c().await
}

async fn ctrl_c() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Ctrl-C handler unavailable: {}", e);
            false
        }
    }
}
