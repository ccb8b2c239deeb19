// src/models/agents.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::settings::TaxRegime;

/// Agente colaborador que recebe repasse de comissão.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,

    #[schema(ignore)]
    pub agency_id: Uuid,

    #[schema(example = "Marco Bianchi")]
    pub name: String,

    #[schema(example = "10.00")]
    pub base_percentage: Decimal,

    pub tax_regime: TaxRegime,

    pub is_active: bool,

    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Marco Bianchi")]
    pub name: String,

    #[schema(example = "10")]
    pub base_percentage: Decimal,

    #[serde(default)]
    pub tax_regime: TaxRegime,
}
