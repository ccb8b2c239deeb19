// src/models/ledger.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Income,  // Entrada
    Expense, // Saída
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    #[default]
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "commission_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    #[default]
    Accrued, // Maturada, ainda não paga ao agente
    Paid,
}

// --- Structs ---

/// Um lançamento de entrada ou saída de uma agência.
///
/// Saídas guardam `amount` negativo. `related_movement_id` só é preenchido na
/// despesa de comissão derivada, apontando para a entrada que a gerou.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: Uuid,

    #[schema(ignore)]
    pub agency_id: Uuid,

    pub kind: MovementKind,

    #[schema(example = "1500.00")]
    pub amount: Decimal,

    #[sqlx(rename = "movement_date")]
    #[schema(value_type = String, format = Date, example = "2024-03-15")]
    pub date: NaiveDate,

    #[schema(example = "Consulenze")]
    pub category: String,

    pub description: Option<String>,

    pub status: MovementStatus,

    #[schema(example = "330.00")]
    pub vat_amount: Option<Decimal>,

    #[schema(example = "172.50")]
    pub withholding_tax: Option<Decimal>,

    #[schema(example = "03-2024")]
    pub invoice_number: Option<String>,

    // Vínculo com o agente colaborador
    pub agent_id: Option<Uuid>,
    #[schema(example = "10.00")]
    pub agent_split_percentage: Option<Decimal>,
    pub agent_commission_accrued: Option<Decimal>,
    pub agent_commission_status: Option<CommissionStatus>,

    pub related_movement_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Movement {
    /// Verdadeiro para a despesa de comissão gerada automaticamente.
    pub fn is_derived(&self) -> bool {
        self.related_movement_id.is_some()
    }

    /// Campos graváveis, usados pelo `update_movement` do repositório.
    pub fn changes(&self) -> MovementChanges {
        MovementChanges {
            kind: self.kind,
            amount: self.amount,
            date: self.date,
            category: self.category.clone(),
            description: self.description.clone(),
            status: self.status,
            vat_amount: self.vat_amount,
            withholding_tax: self.withholding_tax,
            invoice_number: self.invoice_number.clone(),
            agent_id: self.agent_id,
            agent_split_percentage: self.agent_split_percentage,
            agent_commission_accrued: self.agent_commission_accrued,
            agent_commission_status: self.agent_commission_status,
            related_movement_id: self.related_movement_id,
        }
    }
}

/// Conjunto de colunas que um update substitui (id, agência e criação são imutáveis).
#[derive(Debug, Clone, PartialEq)]
pub struct MovementChanges {
    pub kind: MovementKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: String,
    pub description: Option<String>,
    pub status: MovementStatus,
    pub vat_amount: Option<Decimal>,
    pub withholding_tax: Option<Decimal>,
    pub invoice_number: Option<String>,
    pub agent_id: Option<Uuid>,
    pub agent_split_percentage: Option<Decimal>,
    pub agent_commission_accrued: Option<Decimal>,
    pub agent_commission_status: Option<CommissionStatus>,
    pub related_movement_id: Option<Uuid>,
}

impl MovementChanges {
    #[cfg(test)]
    pub fn apply_to(self, movement: &mut Movement) {
        movement.kind = self.kind;
        movement.amount = self.amount;
        movement.date = self.date;
        movement.category = self.category;
        movement.description = self.description;
        movement.status = self.status;
        movement.vat_amount = self.vat_amount;
        movement.withholding_tax = self.withholding_tax;
        movement.invoice_number = self.invoice_number;
        movement.agent_id = self.agent_id;
        movement.agent_split_percentage = self.agent_split_percentage;
        movement.agent_commission_accrued = self.agent_commission_accrued;
        movement.agent_commission_status = self.agent_commission_status;
        movement.related_movement_id = self.related_movement_id;
    }
}

/// Filtros aceitos por `find_movements_by_agency`. Campos `None` não filtram.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementFilter {
    pub id: Option<Uuid>,
    pub kind: Option<MovementKind>,
    pub related_movement_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    /// Ano do sufixo do número da fatura (`NN-YYYY`).
    pub invoice_year: Option<i32>,
    #[param(value_type = Option<String>, format = Date)]
    pub date_from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub date_to: Option<NaiveDate>,
}

impl MovementFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self { id: Some(id), ..Default::default() }
    }

    pub fn related_to(id: Uuid) -> Self {
        Self { related_movement_id: Some(id), ..Default::default() }
    }

    pub fn invoiced_in(year: i32) -> Self {
        Self { invoice_year: Some(year), ..Default::default() }
    }

    /// Mesmo critério usado pelo SQL, para o store em memória dos testes.
    #[cfg(test)]
    pub fn matches(&self, movement: &Movement) -> bool {
        self.id.is_none_or(|id| movement.id == id)
            && self.kind.is_none_or(|k| movement.kind == k)
            && self
                .related_movement_id
                .is_none_or(|r| movement.related_movement_id == Some(r))
            && self.agent_id.is_none_or(|a| movement.agent_id == Some(a))
            && self.invoice_year.is_none_or(|year| {
                movement
                    .invoice_number
                    .as_deref()
                    .is_some_and(|n| n.ends_with(&format!("-{year}")))
            })
            && self.date_from.is_none_or(|d| movement.date >= d)
            && self.date_to.is_none_or(|d| movement.date <= d)
    }
}

// --- Payloads ---

/// Entrada bruta do formulário de lançamento (criação ou edição).
///
/// Todos os "toggles" do formulário chegam explicitamente aqui.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveMovementInput {
    /// Preenchido apenas na edição (vem da rota).
    #[serde(skip)]
    pub id: Option<Uuid>,

    pub kind: MovementKind,

    /// Valor em módulo; o sinal é normalizado pela polaridade.
    #[validate(required(message = "required"))]
    #[schema(example = "1500.00")]
    pub amount: Option<Decimal>,

    #[validate(required(message = "required"))]
    #[schema(value_type = String, format = Date, example = "2024-03-15")]
    pub date: Option<NaiveDate>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Consulenze")]
    pub category: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: MovementStatus,

    #[serde(default)]
    pub has_invoice: bool,

    /// Sobrescreve a alíquota padrão da agência.
    #[schema(example = "22")]
    pub vat_rate: Option<Decimal>,

    #[serde(default)]
    pub apply_withholding: bool,

    /// Número informado manualmente; se ausente é reservado automaticamente.
    #[schema(example = "03-2024")]
    pub invoice_number: Option<String>,

    pub agent_id: Option<Uuid>,

    /// Percentual do repasse; se ausente usa o percentual base do agente.
    #[schema(example = "10")]
    pub split_percentage: Option<Decimal>,

    #[serde(default)]
    pub commission_status: CommissionStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedMovement {
    pub movement: Movement,
    /// Despesa de comissão vinculada, quando há repasse.
    pub derived: Option<Movement>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoicePreviewQuery {
    #[param(value_type = String, format = Date, example = "2024-03-15")]
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePreview {
    #[schema(example = "03-2024")]
    pub invoice_number: String,
}

/// Resultado da rotina de reparo/backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub scanned: usize,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub orphans_removed: usize,
    /// Entradas cujo percentual/comissão gravados foram recalculados.
    pub accruals_updated: usize,
    /// Entradas com mais de uma despesa derivada (não reparadas).
    pub inconsistent: Vec<Uuid>,
}
