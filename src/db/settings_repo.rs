use sqlx::{Executor, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::settings::{AgencySettings, UpdateSettingsRequest},
};

#[derive(Clone, Default)]
pub struct SettingsRepository;

impl SettingsRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_settings<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
    ) -> Result<AgencySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Agência sem linha de configuração: tratamos o "Not Found" como padrão.
        let settings = sqlx::query_as::<_, AgencySettings>(
            "SELECT agency_id, tax_regime, default_vat_rate, updated_at FROM agency_settings WHERE agency_id = $1",
        )
            .bind(agency_id)
            .fetch_optional(executor)
            .await?;

        Ok(settings.unwrap_or_else(|| AgencySettings::defaults_for(agency_id)))
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        input: UpdateSettingsRequest,
    ) -> Result<AgencySettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let settings = sqlx::query_as::<_, AgencySettings>(
            r#"
            INSERT INTO agency_settings (agency_id, tax_regime, default_vat_rate)
            VALUES ($1, $2, $3)
            ON CONFLICT (agency_id)
            DO UPDATE SET
                tax_regime = EXCLUDED.tax_regime,
                default_vat_rate = EXCLUDED.default_vat_rate,
                updated_at = NOW()
            RETURNING agency_id, tax_regime, default_vat_rate, updated_at
            "#,
        )
            .bind(agency_id)
            .bind(input.tax_regime)
            .bind(input.default_vat_rate)
            .fetch_one(executor)
            .await?;

        Ok(settings)
    }
}
