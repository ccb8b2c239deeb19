// src/config.rs

use crate::{
    db::{AgentRepository, MovementRepository, SettingsRepository},
    services::{
        invoice_service::InvoiceService, ledger_service::LedgerService,
        repair_service::RepairService,
    },
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub bind_addr: String,

    pub movement_repo: MovementRepository,
    pub settings_repo: SettingsRepository,
    pub agent_repo: AgentRepository,

    pub ledger_service: LedgerService,
    pub repair_service: RepairService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let bind_addr = env::var("APP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {raw}"))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        let db_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let ledger_service = LedgerService::new(InvoiceService::new());
        let repair_service = RepairService::new(ledger_service.clone());

        Ok(Self {
            movement_repo: MovementRepository::new(),
            settings_repo: SettingsRepository::new(),
            agent_repo: AgentRepository::new(),
            db_pool,
            bind_addr,
            ledger_service,
            repair_service,
        })
    }
}
