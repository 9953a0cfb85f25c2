mod ask_event;
mod ask_request;
mod page;
mod routes;
mod state;

use docqa::Settings;
use state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()?;
    if settings.api_key.is_none() {
        log::info!("GEMINI_API_KEY not set, users must supply their own key");
    }

    let bind_addr = settings.bind_addr.clone();
    let app = routes::app(Arc::new(AppState::new(settings)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
