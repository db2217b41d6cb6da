use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use digest_worker::{
    app::ComponentRegistry, config::Config, observability, store::snapshot::load_snapshot,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                message,
                "panic occurred"
            );
        } else {
            error!(thread = thread_name, message, "panic occurred without location information");
        }
    }));

    observability::init_tracing().context("failed to initialise tracing")?;
    let config = Config::from_env().context("failed to load configuration")?;
    let store = load_snapshot(config.pool_path(), config.history_path(), config.profile_path())
        .await
        .context("failed to load update snapshot")?;
    let mut registry = ComponentRegistry::build(config.clone(), Arc::new(store))
        .context("failed to build component registry")?;

    if !config.schedule_enabled() {
        let payload = registry
            .compose_now()
            .await
            .context("digest composition failed")?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut digests = registry.start_schedule()?;
    loop {
        tokio::select! {
            received = digests.recv() => {
                let Some(payload) = received else {
                    warn!("digest schedule stopped");
                    break;
                };
                println!("{}", serde_json::to_string(&payload)?);
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for shutdown signal");
                }
                info!("shutdown requested");
                break;
            }
        }
    }
    registry.stop_schedule();
    Ok(())
}
