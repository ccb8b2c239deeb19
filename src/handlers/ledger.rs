// src/handlers/ledger.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::ledger_store,
        error::{ApiError, AppError, WriteStage},
    },
    config::AppState,
    middleware::{i18n::Locale, tenancy::AgencyContext},
    models::ledger::{
        InvoicePreview, InvoicePreviewQuery, Movement, MovementFilter, RepairReport,
        SaveMovementInput, SavedMovement,
    },
};

// =============================================================================
//  1. MOVIMENTOS
// =============================================================================

// GET /api/ledger/movements
#[utoipa::path(
    get,
    path = "/api/ledger/movements",
    tag = "Ledger",
    params(
        MovementFilter,
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    ),
    responses(
        (status = 200, description = "Movimentos da agência", body = Vec<Movement>)
    )
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let store = ledger_store(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let movements = app_state.ledger_service
        .list_movements(&store, agency.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(movements)))
}

// POST /api/ledger/movements
#[utoipa::path(
    post,
    path = "/api/ledger/movements",
    tag = "Ledger",
    request_body = SaveMovementInput,
    responses(
        (status = 201, description = "Movimento criado (com a comissão derivada, se houver)", body = SavedMovement),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Fatura duplicada ou vínculo inconsistente")
    ),
    params(
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn create_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Json(mut payload): Json<SaveMovementInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload.id = None;
    let saved = save(&app_state, &agency, payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(saved)))
}

// PUT /api/ledger/movements/{id}
#[utoipa::path(
    put,
    path = "/api/ledger/movements/{id}",
    tag = "Ledger",
    request_body = SaveMovementInput,
    responses(
        (status = 200, description = "Movimento atualizado", body = SavedMovement),
        (status = 404, description = "Movimento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Movimento"),
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn update_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<SaveMovementInput>,
) -> Result<impl IntoResponse, ApiError> {
    payload.id = Some(id);
    let saved = save(&app_state, &agency, payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(saved)))
}

// Principal + derivada na mesma transação; o commit só acontece se ambos passaram.
async fn save(
    app_state: &AppState,
    agency: &AgencyContext,
    payload: SaveMovementInput,
) -> Result<SavedMovement, AppError> {
    let store = ledger_store(app_state, agency).await?;
    let saved = app_state.ledger_service
        .save_movement(&store, agency.0, payload)
        .await?;
    store.commit().await.map_err(AppError::at_stage(WriteStage::Primary))?;
    Ok(saved)
}

// DELETE /api/ledger/movements/{id}
#[utoipa::path(
    delete,
    path = "/api/ledger/movements/{id}",
    tag = "Ledger",
    responses(
        (status = 204, description = "Movimento e vinculados excluídos"),
        (status = 404, description = "Movimento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Movimento"),
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn delete_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = ledger_store(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    app_state.ledger_service
        .delete_movement(&store, agency.0, id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    store.commit()
        .await
        .map_err(|e| AppError::at_stage(WriteStage::Primary)(e).to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  2. FATURAS
// =============================================================================

// GET /api/ledger/invoices/next?date=YYYY-MM-DD
#[utoipa::path(
    get,
    path = "/api/ledger/invoices/next",
    tag = "Ledger",
    params(
        InvoicePreviewQuery,
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    ),
    responses(
        (status = 200, description = "Próximo número sugerido (não reservado)", body = InvoicePreview)
    )
)]
pub async fn next_invoice_number(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Query(query): Query<InvoicePreviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = ledger_store(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let invoice_number = app_state.ledger_service
        .preview_invoice_number(&store, agency.0, query.date)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(InvoicePreview { invoice_number })))
}

// =============================================================================
//  3. REPARO (BACKFILL)
// =============================================================================

// POST /api/ledger/repair
#[utoipa::path(
    post,
    path = "/api/ledger/repair",
    tag = "Ledger",
    responses(
        (status = 200, description = "Resumo do reparo", body = RepairReport)
    ),
    params(
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn repair_ledger(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
) -> Result<impl IntoResponse, ApiError> {
    let store = ledger_store(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let report = app_state.repair_service
        .repair_agency(&store, agency.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    store.commit()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(report)))
}
