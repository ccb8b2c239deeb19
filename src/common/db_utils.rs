use sqlx::{Postgres, Transaction};

use crate::common::error::AppError;
use crate::config::AppState;
use crate::db::PgLedgerStore;
use crate::middleware::tenancy::AgencyContext;

// ---
// Helper RLS: abre a transação da requisição já com a agência definida
// ---
pub(crate) async fn begin_agency_tx(
    app_state: &AppState,
    agency: &AgencyContext,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = app_state.db_pool.begin().await?;

    // `true` = vale só para esta transação
    sqlx::query("SELECT set_config('app.agency_id', $1, true)")
        .bind(agency.0.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Store transacional do livro-caixa para uma requisição.
pub(crate) async fn ledger_store(
    app_state: &AppState,
    agency: &AgencyContext,
) -> Result<PgLedgerStore, AppError> {
    let tx = begin_agency_tx(app_state, agency).await?;
    Ok(PgLedgerStore::new(
        tx,
        app_state.movement_repo.clone(),
        app_state.settings_repo.clone(),
        app_state.agent_repo.clone(),
    ))
}
