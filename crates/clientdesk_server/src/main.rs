use clientdesk_core::{init_logging, AppConfig, DeskService};
use clientdesk_server::routes;
use log::{error, info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!("event=server_exit module=server status=error error={}", err);
        eprintln!("clientdesk_server: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|err| err.to_string())?;
    init_logging(&config.log_level, config.log_dir.as_deref())?;

    if config.uses_default_secret() {
        warn!(
            "event=config_check module=server status=warn reason=default_admin_secret hint=set_CLIENTDESK_ADMIN_SECRET"
        );
    }

    let bind_addr = config.bind_addr;
    let backend = config.backend.label();
    // The blocking HTTP client cannot be built on a reactor thread.
    let desk = tokio::task::spawn_blocking(move || DeskService::open(&config))
        .await
        .map_err(|err| format!("startup task failed: {err}"))?
        .map_err(|err| format!("failed to open {backend} store: {err}"))?;
    info!(
        "event=store_open module=server status=ok backend={}",
        desk.backend_name()
    );

    let (addr, server) = warp::serve(routes(Arc::new(desk)))
        .try_bind_with_graceful_shutdown(bind_addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .map_err(|err| format!("failed to bind {bind_addr}: {err}"))?;
    info!(
        "event=server_start module=server status=ok addr={} backend={}",
        addr, backend
    );

    server.await;
    info!("event=server_stop module=server status=ok");
    Ok(())
}
