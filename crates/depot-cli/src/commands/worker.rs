use crate::support;
use depot_notify::NotificationController;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub fn run(config: Option<&Path>, poll_interval_ms: Option<u64>) {
    let runtime = support::open_or_exit(config);
    let interval = Duration::from_millis(
        poll_interval_ms
            .unwrap_or(runtime.config.worker.poll_interval_ms)
            .max(1),
    );
    let controller = Arc::new(runtime.controller);

    eprintln!("depot worker");
    eprintln!("  poll interval: {}ms", interval.as_millis());
    eprintln!("  max attempts: {}", runtime.config.controller.max_attempts);

    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| support::exit_with(format!("failed to create tokio runtime: {e}")));

    tokio_runtime.block_on(async move {
        if let Err(e) = run_loop(controller, interval).await {
            eprintln!("error: worker failed: {e}");
            process::exit(1);
        }
    });
}

async fn run_loop(controller: Arc<NotificationController>, interval: Duration) -> Result<(), String> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(interval_ms = interval.as_millis() as u64, "worker started");
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("worker stopping");
                return Ok(());
            }
            _ = ticker.tick() => {
                let controller = controller.clone();
                let handled = tokio::task::spawn_blocking(move || controller.handle_all())
                    .await
                    .map_err(|e| format!("drain task panicked: {e}"))?
                    .map_err(|e| e.to_string())?;
                if handled > 0 {
                    tracing::info!(handled, "queue drained");
                }
            }
        }
    }
}
