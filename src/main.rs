// Mintbook play-money prediction market - main entry point

use std::sync::Arc;

use mintbook_prediction_market::{handlers, AppState, Config};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let addr = config.addr;

    let state = Arc::new(AppState::new(config).expect("failed to open ledger store"));
    let shutdown_state = state.clone();

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!("listening on http://{}", addr);

    println!("Endpoints:");
    println!("   POST /users                - Register (returns your API key once)");
    println!("   GET  /me                   - Authenticated user info");
    println!("   GET  /leaderboard          - Top balances");
    println!("   GET  /markets              - List markets");
    println!("   POST /markets              - Create market (Bearer key)");
    println!("   GET  /markets/:id          - Market detail with price history");
    println!("   POST /markets/:id/bet      - Place a wager (Bearer key)");
    println!("   POST /markets/:id/resolve  - Resolve market (creator only)");

    // Flush the store before going down
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
        tracing::info!("shutdown signal received, flushing ledger store");
        if let Err(e) = shutdown_state.store.flush() {
            tracing::error!("flush failed: {}", e);
        }
        std::process::exit(0);
    });

    axum::serve(listener, app).await.unwrap();
}
