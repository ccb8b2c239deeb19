// src/db/agent_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{agents::Agent, settings::TaxRegime},
};

#[derive(Clone, Default)]
pub struct AgentRepository;

impl AgentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_agent<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        name: &str,
        base_percentage: Decimal,
        tax_regime: TaxRegime,
    ) -> Result<Agent, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agent = sqlx::query_as::<_, Agent>(
            r#"
            INSERT INTO agents (agency_id, name, base_percentage, tax_regime)
            VALUES ($1, $2, $3, $4)
            RETURNING id, agency_id, name, base_percentage, tax_regime, is_active, created_at
            "#,
        )
            .bind(agency_id)
            .bind(name)
            .bind(base_percentage)
            .bind(tax_regime)
            .fetch_one(executor)
            .await?;

        Ok(agent)
    }

    pub async fn list_agents<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
    ) -> Result<Vec<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agents = sqlx::query_as::<_, Agent>(
            r#"
            SELECT id, agency_id, name, base_percentage, tax_regime, is_active, created_at
            FROM agents
            WHERE agency_id = $1
            ORDER BY name ASC
            "#,
        )
            .bind(agency_id)
            .fetch_all(executor)
            .await?;

        Ok(agents)
    }

    pub async fn find_agent<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        agent_id: Uuid,
    ) -> Result<Option<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agent = sqlx::query_as::<_, Agent>(
            r#"
            SELECT id, agency_id, name, base_percentage, tax_regime, is_active, created_at
            FROM agents
            WHERE agency_id = $1 AND id = $2
            "#,
        )
            .bind(agency_id)
            .bind(agent_id)
            .fetch_optional(executor)
            .await?;

        Ok(agent)
    }
}
