use imagerank::{create_router, init, AppState, Config, ModelEvent, Result, ResultExt};

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the application
    init()?;

    // Request traces from tower-http go through tracing; everything else uses log
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tower_http=info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Request tracing disabled: {}", e);
    }

    let config = Config::from_env()?;
    let state = AppState::with_config(config);

    // Serve even without a model; /api/model/reload can pick one up later
    if let Err(e) = state.registry.load() {
        log::warn!("No model available: {}", e);
    }

    let mut events = state.registry.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ModelEvent::Reloaded(info)) => {
                    log::info!("Now serving '{}' version {}", info.asset_name, info.version)
                }
                Err(RecvError::Lagged(missed)) => log::debug!("Missed {} model events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = create_router(&state.config).with_state(state.clone());

    let addr = state.config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    log::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
