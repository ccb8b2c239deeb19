// src/db/memory_repo.rs
//
// Store em memória para os testes do núcleo: mesmas regras de filtro e de
// contador do Postgres, mais injeção de falhas por operação.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{AgencyConfig, MovementStore},
    models::{
        agents::Agent,
        ledger::{Movement, MovementChanges, MovementFilter},
        settings::{AgencySettings, TaxRegime},
    },
};

/// Operações que podem ser forçadas a falhar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    Insert,
    InsertDerived,
    Update,
    UpdateDerived,
    DeleteByRelated,
    /// Outra transação gravou o mesmo número de fatura entre a checagem e o insert.
    InvoiceConflict,
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    movements: Mutex<Vec<Movement>>,
    settings: Mutex<HashMap<Uuid, AgencySettings>>,
    agents: Mutex<HashMap<Uuid, Agent>>,
    sequences: Mutex<HashMap<(Uuid, i32), u32>>,
    failures: Mutex<Vec<FailOn>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(self, agency_id: Uuid, tax_regime: TaxRegime, default_vat_rate: Decimal) -> Self {
        self.settings.lock().unwrap().insert(
            agency_id,
            AgencySettings { agency_id, tax_regime, default_vat_rate, updated_at: None },
        );
        self
    }

    pub fn add_agent(&self, agency_id: Uuid, name: &str, base_percentage: Decimal, tax_regime: TaxRegime) -> Agent {
        let agent = Agent {
            id: Uuid::new_v4(),
            agency_id,
            name: name.to_string(),
            base_percentage,
            tax_regime,
            is_active: true,
            created_at: Some(Utc::now()),
        };
        self.agents.lock().unwrap().insert(agent.id, agent.clone());
        agent
    }

    /// Grava um movimento "cru", sem passar pelas regras (dados legados).
    pub fn seed(&self, movement: Movement) {
        self.movements.lock().unwrap().push(movement);
    }

    pub fn fail_on(&self, op: FailOn) {
        self.failures.lock().unwrap().push(op);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn all(&self) -> Vec<Movement> {
        self.movements.lock().unwrap().clone()
    }

    pub fn derived_of(&self, income_id: Uuid) -> Vec<Movement> {
        self.all()
            .into_iter()
            .filter(|m| m.related_movement_id == Some(income_id))
            .collect()
    }

    fn check(&self, op: FailOn) -> Result<(), AppError> {
        if self.failures.lock().unwrap().contains(&op) {
            return Err(AppError::InternalServerError(anyhow!("falha injetada: {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MovementStore for MemoryLedgerStore {
    async fn find_movements_by_agency(
        &self,
        agency_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, AppError> {
        let mut found: Vec<Movement> = self
            .movements
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.agency_id == agency_id && filter.matches(m))
            .cloned()
            .collect();
        found.sort_by_key(|m| (m.date, m.created_at));
        Ok(found)
    }

    async fn insert_movement(&self, movement: &Movement) -> Result<Movement, AppError> {
        if movement.is_derived() {
            self.check(FailOn::InsertDerived)?;
        } else {
            self.check(FailOn::Insert)?;
        }

        let mut movements = self.movements.lock().unwrap();
        if let Some(number) = &movement.invoice_number {
            if self.failures.lock().unwrap().contains(&FailOn::InvoiceConflict) {
                return Err(AppError::InvoiceNumberTaken(number.clone()));
            }
            let taken = movements
                .iter()
                .any(|m| m.agency_id == movement.agency_id && m.invoice_number.as_ref() == Some(number));
            if taken {
                return Err(AppError::InvoiceNumberTaken(number.clone()));
            }
        }
        movements.push(movement.clone());
        Ok(movement.clone())
    }

    async fn update_movement(
        &self,
        agency_id: Uuid,
        id: Uuid,
        changes: &MovementChanges,
    ) -> Result<Movement, AppError> {
        if changes.related_movement_id.is_some() {
            self.check(FailOn::UpdateDerived)?;
        } else {
            self.check(FailOn::Update)?;
        }

        let mut movements = self.movements.lock().unwrap();
        if let Some(number) = &changes.invoice_number {
            let taken = movements
                .iter()
                .any(|m| m.agency_id == agency_id && m.id != id && m.invoice_number.as_ref() == Some(number));
            if taken {
                return Err(AppError::InvoiceNumberTaken(number.clone()));
            }
        }
        let movement = movements
            .iter_mut()
            .find(|m| m.agency_id == agency_id && m.id == id)
            .ok_or(AppError::MovementNotFound(id))?;
        changes.clone().apply_to(movement);
        movement.updated_at = Some(Utc::now());
        Ok(movement.clone())
    }

    async fn delete_movement(&self, agency_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut movements = self.movements.lock().unwrap();
        let before = movements.len();
        movements.retain(|m| !(m.agency_id == agency_id && m.id == id));
        if movements.len() == before {
            return Err(AppError::MovementNotFound(id));
        }
        Ok(())
    }

    async fn delete_movements_by_related_id(&self, agency_id: Uuid, id: Uuid) -> Result<u64, AppError> {
        self.check(FailOn::DeleteByRelated)?;
        let mut movements = self.movements.lock().unwrap();
        let before = movements.len();
        movements.retain(|m| !(m.agency_id == agency_id && m.related_movement_id == Some(id)));
        Ok((before - movements.len()) as u64)
    }

    async fn reserve_invoice_sequence(&self, agency_id: Uuid, year: i32, floor: u32) -> Result<u32, AppError> {
        let mut sequences = self.sequences.lock().unwrap();
        let last = sequences.entry((agency_id, year)).or_insert(0);
        *last = (*last).max(floor) + 1;
        Ok(*last)
    }
}

#[async_trait]
impl AgencyConfig for MemoryLedgerStore {
    async fn agency_settings(&self, agency_id: Uuid) -> Result<AgencySettings, AppError> {
        Ok(self
            .settings
            .lock()
            .unwrap()
            .get(&agency_id)
            .cloned()
            .unwrap_or_else(|| AgencySettings::defaults_for(agency_id)))
    }

    async fn find_agent(&self, agency_id: Uuid, agent_id: Uuid) -> Result<Option<Agent>, AppError> {
        Ok(self
            .agents
            .lock()
            .unwrap()
            .get(&agent_id)
            .filter(|a| a.agency_id == agency_id)
            .cloned())
    }
}
