//src/main.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Todas exigem o cabeçalho X-Agency-ID (extrator AgencyContext)
    let ledger_routes = Router::new()
        .route("/movements"
               ,post(handlers::ledger::create_movement)
               .get(handlers::ledger::list_movements)
        )
        .route("/movements/{id}"
               ,put(handlers::ledger::update_movement)
               .delete(handlers::ledger::delete_movement)
        )
        .route("/invoices/next", get(handlers::ledger::next_invoice_number))
        .route("/repair", post(handlers::ledger::repair_ledger));

    let agent_routes = Router::new()
        .route("/"
               ,post(handlers::agents::create_agent)
               .get(handlers::agents::list_agents)
        )
        .route("/{id}", get(handlers::agents::get_agent));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/settings"
               ,get(handlers::settings::get_settings)
               .put(handlers::settings::update_settings)
        )
        .nest("/api/ledger", ledger_routes)
        .nest("/api/agents", agent_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state.clone());

    let listener = TcpListener::bind(&app_state.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
