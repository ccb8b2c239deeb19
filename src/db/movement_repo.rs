// src/db/movement_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ledger::{Movement, MovementChanges, MovementFilter},
};

const MOVEMENT_COLUMNS: &str = r#"
    id, agency_id, kind, amount, movement_date, category, description, status,
    vat_amount, withholding_tax, invoice_number,
    agent_id, agent_split_percentage, agent_commission_accrued, agent_commission_status,
    related_movement_id, created_at, updated_at
"#;

#[derive(Clone, Default)]
pub struct MovementRepository;

impl MovementRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_agency<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(MOVEMENT_COLUMNS);
        query.push(" FROM movements WHERE agency_id = ");
        query.push_bind(agency_id);

        if let Some(id) = filter.id {
            query.push(" AND id = ").push_bind(id);
        }
        if let Some(kind) = filter.kind {
            query.push(" AND kind = ").push_bind(kind);
        }
        if let Some(related) = filter.related_movement_id {
            query.push(" AND related_movement_id = ").push_bind(related);
        }
        if let Some(agent_id) = filter.agent_id {
            query.push(" AND agent_id = ").push_bind(agent_id);
        }
        if let Some(year) = filter.invoice_year {
            // Sufixo "-YYYY" do número da fatura
            query.push(" AND invoice_number LIKE ").push_bind(format!("%-{year}"));
        }
        if let Some(from) = filter.date_from {
            query.push(" AND movement_date >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            query.push(" AND movement_date <= ").push_bind(to);
        }
        query.push(" ORDER BY movement_date ASC, created_at ASC");

        let movements = query
            .build_query_as::<Movement>()
            .fetch_all(executor)
            .await?;

        Ok(movements)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        movement: &Movement,
    ) -> Result<Movement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO movements (
                id, agency_id, kind, amount, movement_date, category, description, status,
                vat_amount, withholding_tax, invoice_number,
                agent_id, agent_split_percentage, agent_commission_accrued, agent_commission_status,
                related_movement_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Movement>(&sql)
            .bind(movement.id)
            .bind(movement.agency_id)
            .bind(movement.kind)
            .bind(movement.amount)
            .bind(movement.date)
            .bind(&movement.category)
            .bind(&movement.description)
            .bind(movement.status)
            .bind(movement.vat_amount)
            .bind(movement.withholding_tax)
            .bind(&movement.invoice_number)
            .bind(movement.agent_id)
            .bind(movement.agent_split_percentage)
            .bind(movement.agent_commission_accrued)
            .bind(movement.agent_commission_status)
            .bind(movement.related_movement_id)
            .bind(movement.created_at)
            .fetch_one(executor)
            .await
            .map_err(map_invoice_conflict(movement.invoice_number.as_deref()))?;

        Ok(inserted)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        id: Uuid,
        changes: &MovementChanges,
    ) -> Result<Movement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE movements
            SET kind = $3, amount = $4, movement_date = $5, category = $6, description = $7,
                status = $8, vat_amount = $9, withholding_tax = $10, invoice_number = $11,
                agent_id = $12, agent_split_percentage = $13, agent_commission_accrued = $14,
                agent_commission_status = $15, related_movement_id = $16, updated_at = NOW()
            WHERE agency_id = $1 AND id = $2
            RETURNING {MOVEMENT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Movement>(&sql)
            .bind(agency_id)
            .bind(id)
            .bind(changes.kind)
            .bind(changes.amount)
            .bind(changes.date)
            .bind(&changes.category)
            .bind(&changes.description)
            .bind(changes.status)
            .bind(changes.vat_amount)
            .bind(changes.withholding_tax)
            .bind(&changes.invoice_number)
            .bind(changes.agent_id)
            .bind(changes.agent_split_percentage)
            .bind(changes.agent_commission_accrued)
            .bind(changes.agent_commission_status)
            .bind(changes.related_movement_id)
            .fetch_optional(executor)
            .await
            .map_err(map_invoice_conflict(changes.invoice_number.as_deref()))?;

        updated.ok_or(AppError::MovementNotFound(id))
    }

    pub async fn delete<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM movements WHERE agency_id = $1 AND id = $2")
            .bind(agency_id)
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::MovementNotFound(id));
        }
        Ok(())
    }

    pub async fn delete_by_related_id<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        related_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM movements WHERE agency_id = $1 AND related_movement_id = $2")
            .bind(agency_id)
            .bind(related_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // Incremento atômico no próprio Postgres: duas reservas concorrentes nunca
    // recebem o mesmo valor (a linha fica bloqueada até o commit).
    pub async fn reserve_invoice_sequence<'e, E>(
        &self,
        executor: E,
        agency_id: Uuid,
        year: i32,
        floor: u32,
    ) -> Result<u32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let floor = i32::try_from(floor)
            .map_err(|_| AppError::invalid("invoiceNumber", "sequência fora do intervalo"))?;

        let next = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO invoice_sequences (agency_id, year, last_value)
            VALUES ($1, $2, $3 + 1)
            ON CONFLICT (agency_id, year)
            DO UPDATE SET last_value = GREATEST(invoice_sequences.last_value, $3) + 1
            RETURNING last_value
            "#,
        )
            .bind(agency_id)
            .bind(year)
            .bind(floor)
            .fetch_one(executor)
            .await?;

        u32::try_from(next).map_err(|_| AppError::invalid("invoiceNumber", "sequência negativa"))
    }
}

// Violação do índice único (agency_id, invoice_number) vira erro de negócio.
fn map_invoice_conflict(invoice_number: Option<&str>) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::InvoiceNumberTaken(invoice_number.unwrap_or_default().to_string());
            }
        }
        AppError::DatabaseError(e)
    }
}
