// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        agents::Agent,
        ledger::{Movement, MovementChanges, MovementFilter},
        settings::AgencySettings,
    },
};

/// As únicas operações de persistência que o núcleo do livro-caixa emite.
///
/// Todas as leituras e escritas são escopadas pela agência ativa.
#[async_trait]
pub trait MovementStore: Send + Sync {
    async fn find_movements_by_agency(
        &self,
        agency_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, AppError>;

    async fn insert_movement(&self, movement: &Movement) -> Result<Movement, AppError>;

    async fn update_movement(
        &self,
        agency_id: Uuid,
        id: Uuid,
        changes: &MovementChanges,
    ) -> Result<Movement, AppError>;

    async fn delete_movement(&self, agency_id: Uuid, id: Uuid) -> Result<(), AppError>;

    /// Remove todo movimento cujo `related_movement_id` é `id`. Retorna quantos.
    async fn delete_movements_by_related_id(&self, agency_id: Uuid, id: Uuid) -> Result<u64, AppError>;

    /// Incrementa atomicamente o contador (agência, ano), nunca abaixo de `floor`.
    /// Retorna o novo valor.
    async fn reserve_invoice_sequence(&self, agency_id: Uuid, year: i32, floor: u32) -> Result<u32, AppError>;
}

/// Configurações da agência e cadastro de agentes.
#[async_trait]
pub trait AgencyConfig: Send + Sync {
    async fn agency_settings(&self, agency_id: Uuid) -> Result<AgencySettings, AppError>;

    async fn find_agent(&self, agency_id: Uuid, agent_id: Uuid) -> Result<Option<Agent>, AppError>;
}
