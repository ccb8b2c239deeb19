// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tax_regime", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    /// Regime forfetário: sem IVA e sem retenção.
    #[default]
    Forfettario,
    /// Regime ordinário: sujeito a IVA e retenção na fonte.
    Ordinario,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgencySettings {
    #[schema(ignore)] // O contexto (Header) já define a agência
    pub agency_id: Uuid,

    pub tax_regime: TaxRegime,

    #[schema(example = "22")]
    pub default_vat_rate: Decimal,

    pub updated_at: Option<DateTime<Utc>>,
}

impl AgencySettings {
    /// Valores usados quando a agência ainda não salvou configurações.
    pub fn defaults_for(agency_id: Uuid) -> Self {
        Self {
            agency_id,
            tax_regime: TaxRegime::Forfettario,
            default_vat_rate: Decimal::from(22),
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub tax_regime: TaxRegime,

    #[schema(example = "22")]
    pub default_vat_rate: Decimal,
}
