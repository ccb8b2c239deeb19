// src/handlers/agents.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_agency_tx,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{i18n::Locale, tenancy::AgencyContext},
    models::agents::{Agent, CreateAgentPayload},
};

// POST /api/agents
#[utoipa::path(
    post,
    path = "/api/agents",
    tag = "Agents",
    request_body = CreateAgentPayload,
    responses(
        (status = 201, description = "Agente cadastrado", body = Agent),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn create_agent(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Json(payload): Json<CreateAgentPayload>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    if payload.base_percentage < Decimal::ZERO || payload.base_percentage > Decimal::ONE_HUNDRED {
        return Err(AppError::invalid("basePercentage", "deve estar entre 0 e 100").to_api_error(&locale));
    }

    let mut tx = begin_agency_tx(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let agent = app_state.agent_repo
        .create_agent(&mut *tx, agency.0, payload.name.trim(), payload.base_percentage, payload.tax_regime)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(agent)))
}

// GET /api/agents
#[utoipa::path(
    get,
    path = "/api/agents",
    tag = "Agents",
    responses(
        (status = 200, description = "Agentes da agência", body = Vec<Agent>)
    ),
    params(
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn list_agents(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
) -> Result<impl IntoResponse, ApiError> {

    let mut tx = begin_agency_tx(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let agents = app_state.agent_repo
        .list_agents(&mut *tx, agency.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(agents)))
}

// GET /api/agents/{id}
#[utoipa::path(
    get,
    path = "/api/agents/{id}",
    tag = "Agents",
    responses(
        (status = 200, description = "Agente", body = Agent),
        (status = 404, description = "Agente não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Agente"),
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn get_agent(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let mut tx = begin_agency_tx(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let agent = app_state.agent_repo
        .find_agent(&mut *tx, agency.0, id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?
        .ok_or_else(|| AppError::AgentNotFound(id).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(agent)))
}
