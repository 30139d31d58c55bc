use coi_serve::{config, logger, server};
use std::sync::Arc;
use std::time::Duration;

/// How long in-flight blocking file reads may finish after the accept loop stops
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(&cfg.logging);

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    let result = runtime.block_on(async_main(cfg));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(config::AppState::from_current_dir(cfg)?);

    // Bind failure is fatal: the error propagates to a nonzero exit
    let listener =
        server::create_listener(addr).inspect_err(|e| logger::log_bind_failed(&addr, e))?;
    let shutdown = server::shutdown_signal();
    logger::print_banner(&listener.local_addr()?);

    server::run(listener, state, shutdown).await?;
    Ok(())
}
