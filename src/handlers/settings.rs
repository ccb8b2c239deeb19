// src/handlers/settings.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_agency_tx,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        tenancy::AgencyContext,
    },
    models::settings::{AgencySettings, UpdateSettingsRequest},
};

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Configurações fiscais da agência", body = AgencySettings)
    ),
    params(
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
) -> Result<impl IntoResponse, ApiError> {

    let mut tx = begin_agency_tx(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let settings = app_state.settings_repo
        .get_settings(&mut *tx, agency.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/settings
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Configurações atualizadas", body = AgencySettings),
        (status = 400, description = "Alíquota inválida")
    ),
    params(
        ("x-agency-id" = Uuid, Header, description = "ID da Agência")
    )
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    agency: AgencyContext,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {

    if payload.default_vat_rate < Decimal::ZERO || payload.default_vat_rate > Decimal::ONE_HUNDRED {
        return Err(AppError::invalid("defaultVatRate", "deve estar entre 0 e 100")
            .to_api_error(&locale));
    }

    let mut tx = begin_agency_tx(&app_state, &agency)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let updated = app_state.settings_repo
        .update_settings(&mut *tx, agency.0, payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}
