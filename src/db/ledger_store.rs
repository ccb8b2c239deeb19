// src/db/ledger_store.rs

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        store::{AgencyConfig, MovementStore},
        AgentRepository, MovementRepository, SettingsRepository,
    },
    models::{
        agents::Agent,
        ledger::{Movement, MovementChanges, MovementFilter},
        settings::AgencySettings,
    },
};

/// Implementação Postgres dos colaboradores de persistência, presa a UMA
/// transação. O movimento principal e o derivado só aparecem no banco juntos,
/// quando o handler chama `commit`.
pub struct PgLedgerStore {
    tx: Mutex<Transaction<'static, Postgres>>,
    movements: MovementRepository,
    settings: SettingsRepository,
    agents: AgentRepository,
}

impl PgLedgerStore {
    pub fn new(
        tx: Transaction<'static, Postgres>,
        movements: MovementRepository,
        settings: SettingsRepository,
        agents: AgentRepository,
    ) -> Self {
        Self { tx: Mutex::new(tx), movements, settings, agents }
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MovementStore for PgLedgerStore {
    async fn find_movements_by_agency(
        &self,
        agency_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, AppError> {
        let mut tx = self.tx.lock().await;
        self.movements.find_by_agency(&mut **tx, agency_id, filter).await
    }

    async fn insert_movement(&self, movement: &Movement) -> Result<Movement, AppError> {
        let mut tx = self.tx.lock().await;
        self.movements.insert(&mut **tx, movement).await
    }

    async fn update_movement(
        &self,
        agency_id: Uuid,
        id: Uuid,
        changes: &MovementChanges,
    ) -> Result<Movement, AppError> {
        let mut tx = self.tx.lock().await;
        self.movements.update(&mut **tx, agency_id, id, changes).await
    }

    async fn delete_movement(&self, agency_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.tx.lock().await;
        self.movements.delete(&mut **tx, agency_id, id).await
    }

    async fn delete_movements_by_related_id(&self, agency_id: Uuid, id: Uuid) -> Result<u64, AppError> {
        let mut tx = self.tx.lock().await;
        self.movements.delete_by_related_id(&mut **tx, agency_id, id).await
    }

    async fn reserve_invoice_sequence(&self, agency_id: Uuid, year: i32, floor: u32) -> Result<u32, AppError> {
        let mut tx = self.tx.lock().await;
        self.movements.reserve_invoice_sequence(&mut **tx, agency_id, year, floor).await
    }
}

#[async_trait]
impl AgencyConfig for PgLedgerStore {
    async fn agency_settings(&self, agency_id: Uuid) -> Result<AgencySettings, AppError> {
        let mut tx = self.tx.lock().await;
        self.settings.get_settings(&mut **tx, agency_id).await
    }

    async fn find_agent(&self, agency_id: Uuid, agent_id: Uuid) -> Result<Option<Agent>, AppError> {
        let mut tx = self.tx.lock().await;
        self.agents.find_agent(&mut **tx, agency_id, agent_id).await
    }
}
