/**
 * Syncspace Server Entry Point
 *
 * Loads configuration from the environment, builds the application and
 * serves it until interrupted. Shutdown cancels the server token, drains
 * subscribers and background tasks for up to ten seconds, and runs one
 * final flush pass so no pending change is lost. Startup failures
 * (missing secret, bind error, migration error) exit nonzero.
 */

use std::time::Duration;

use syncspace::backend::server::config::Config;
use syncspace::backend::server::init::create_app;
use syncspace::backend::sync::flusher;

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;
    let (app, state) = create_app(&config).await?;

    let flush_task = tokio::spawn(flusher::run_flush_loop(
        state.cache.clone(),
        config.flush_interval,
        config.min_changes_threshold,
        state.shutdown.clone(),
    ));
    let purge_task = tokio::spawn(flusher::run_purge_loop(
        state.pool.clone(),
        state.cache.clone(),
        config.operation_max_age,
        config.cache_max_age,
        state.shutdown.clone(),
    ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, shutting down");
                }
                _ = shutdown.cancelled() => {}
            }
        })
        .await?;

    // wind down: subscribers get a close frame, the flusher runs its final
    // pass, and both loops are drained with a deadline
    state.sync.hub().close_all("server shutting down").await;
    state.shutdown.cancel();

    let drain = async {
        let _ = flush_task.await;
        let _ = purge_task.await;
    };
    if tokio::time::timeout(SHUTDOWN_DRAIN, drain).await.is_err() {
        tracing::warn!("shutdown drain exceeded {SHUTDOWN_DRAIN:?}");
    }

    tracing::info!("server stopped");
    Ok(())
}
