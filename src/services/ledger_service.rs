// src/services/ledger_service.rs

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{AppError, WriteStage},
    db::{AgencyConfig, MovementStore},
    models::ledger::{
        Movement, MovementFilter, MovementKind, SaveMovementInput, SavedMovement,
    },
    services::{
        commission_service::{accrued_commission, build_commission_movement, round_percentage, SplitTerms},
        invoice_service::{InvoiceNumber, InvoiceService},
        tax_service::{compute_primary_tax, fits_money_column, round_money},
    },
};

/// Orquestra o movimento principal e a despesa de comissão derivada.
///
/// Por entrada existem dois estados: sem repasse (nenhuma despesa vinculada)
/// e com repasse (exatamente uma). Todo salvamento e toda exclusão restauram
/// essa relação antes de retornar.
#[derive(Clone, Default)]
pub struct LedgerService {
    invoices: InvoiceService,
}

impl LedgerService {
    pub fn new(invoices: InvoiceService) -> Self {
        Self { invoices }
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn list_movements<S>(
        &self,
        store: &S,
        agency_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, AppError>
    where
        S: MovementStore + ?Sized,
    {
        store.find_movements_by_agency(agency_id, filter).await
    }

    pub async fn find_movement<S>(&self, store: &S, agency_id: Uuid, id: Uuid) -> Result<Movement, AppError>
    where
        S: MovementStore + ?Sized,
    {
        store
            .find_movements_by_agency(agency_id, &MovementFilter::by_id(id))
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::MovementNotFound(id))
    }

    pub async fn preview_invoice_number<S>(
        &self,
        store: &S,
        agency_id: Uuid,
        reference_date: NaiveDate,
    ) -> Result<String, AppError>
    where
        S: MovementStore + ?Sized,
    {
        self.invoices.next_invoice_number(store, agency_id, reference_date).await
    }

    // =========================================================================
    //  SALVAR (CRIAÇÃO / EDIÇÃO)
    // =========================================================================

    pub async fn save_movement<S>(
        &self,
        store: &S,
        agency_id: Uuid,
        input: SaveMovementInput,
    ) -> Result<SavedMovement, AppError>
    where
        S: MovementStore + AgencyConfig + ?Sized,
    {
        // 1. Validação: nada é gravado se faltar algo
        input.validate()?;
        let raw_amount = input.amount.ok_or_else(|| AppError::invalid("amount", "required"))?;
        if !fits_money_column(raw_amount) {
            return Err(AppError::invalid("amount", "excede o limite de 999999999999.99"));
        }
        let date = input.date.ok_or_else(|| AppError::invalid("date", "required"))?;
        let category = input.category.trim();
        if category.is_empty() {
            return Err(AppError::invalid("category", "required"));
        }

        let existing = match input.id {
            Some(id) => Some(self.find_movement(store, agency_id, id).await?),
            None => None,
        };
        if let Some(current) = &existing {
            if current.is_derived() {
                return Err(AppError::ManagedMovement(current.id));
            }
        }

        let amount = match input.kind {
            MovementKind::Income => raw_amount.abs(),
            MovementKind::Expense => -raw_amount.abs(),
        };

        let terms = self.resolve_split(store, agency_id, &input).await?;

        // 2. Impostos do movimento principal (só toggles da agência)
        let settings = store.agency_settings(agency_id).await?;
        let vat_rate = input.vat_rate.unwrap_or(settings.default_vat_rate);
        if vat_rate < Decimal::ZERO || vat_rate > Decimal::ONE_HUNDRED {
            return Err(AppError::invalid("vatRate", "deve estar entre 0 e 100"));
        }
        let tax = compute_primary_tax(
            amount,
            input.has_invoice,
            vat_rate,
            settings.tax_regime,
            input.apply_withholding,
        );

        // 3. Verifica I1 ANTES de qualquer escrita
        let mut derived_rows = match &existing {
            Some(current) => {
                store
                    .find_movements_by_agency(agency_id, &MovementFilter::related_to(current.id))
                    .await?
            }
            None => Vec::new(),
        };
        if derived_rows.len() > 1 {
            let movement_id = existing.as_ref().map(|m| m.id).unwrap_or_default();
            tracing::warn!(%agency_id, %movement_id, found = derived_rows.len(), "Despesas derivadas duplicadas");
            return Err(AppError::DerivationInconsistency { movement_id, found: derived_rows.len() });
        }

        // 4. Número da fatura (pode reservar no contador, então vem depois da verificação)
        let invoice_number = self
            .resolve_invoice_number(store, agency_id, &input, date, existing.as_ref())
            .await?;

        let commission = terms.as_ref().map(|t| accrued_commission(amount, t));

        let movement = Movement {
            id: existing.as_ref().map(|m| m.id).unwrap_or_else(Uuid::new_v4),
            agency_id,
            kind: input.kind,
            amount: round_money(amount),
            date,
            category: category.to_string(),
            description: input.description.clone().filter(|d| !d.trim().is_empty()),
            status: input.status,
            vat_amount: non_zero(tax.vat),
            withholding_tax: non_zero(tax.withholding),
            invoice_number,
            agent_id: terms.as_ref().map(|t| t.agent.id),
            agent_split_percentage: terms.as_ref().map(|t| t.percentage),
            agent_commission_accrued: commission,
            agent_commission_status: terms.as_ref().map(|t| t.commission_status),
            related_movement_id: None,
            created_at: existing.as_ref().map(|m| m.created_at).unwrap_or_else(Utc::now),
            updated_at: existing.as_ref().map(|_| Utc::now()),
        };

        // 5. Escrita principal
        let saved = match &existing {
            Some(current) => store.update_movement(agency_id, current.id, &movement.changes()).await,
            None => store.insert_movement(&movement).await,
        }
        .map_err(AppError::at_stage(WriteStage::Primary))?;

        tracing::info!(%agency_id, movement_id = %saved.id, kind = ?saved.kind, "Movimento salvo");

        // 6. Restaura o vínculo com a despesa derivada
        let derived = self
            .sync_derived(store, &saved, terms.as_ref(), derived_rows.pop())
            .await
            .map_err(AppError::at_stage(WriteStage::Derived))?;

        Ok(SavedMovement { movement: saved, derived })
    }

    /// Transições da despesa derivada de `income`:
    /// sem repasse -> com repasse (insere), com -> com (atualiza no lugar),
    /// com -> sem (remove). `current` é a linha encontrada por lookup.
    pub async fn sync_derived<S>(
        &self,
        store: &S,
        income: &Movement,
        terms: Option<&SplitTerms>,
        current: Option<Movement>,
    ) -> Result<Option<Movement>, AppError>
    where
        S: MovementStore + ?Sized,
    {
        let agency_id = income.agency_id;

        match (terms.filter(|_| income.kind == MovementKind::Income), current) {
            (Some(terms), None) => {
                let derived = build_commission_movement(income, terms, None);
                let inserted = store.insert_movement(&derived).await?;
                tracing::info!(%agency_id, movement_id = %income.id, derived_id = %inserted.id, "Comissão derivada criada");
                Ok(Some(inserted))
            }
            (Some(terms), Some(row)) => {
                let derived = build_commission_movement(income, terms, Some(&row));
                let updated = store.update_movement(agency_id, row.id, &derived.changes()).await?;
                tracing::info!(%agency_id, movement_id = %income.id, derived_id = %updated.id, "Comissão derivada atualizada");
                Ok(Some(updated))
            }
            (None, Some(_)) => {
                let removed = store.delete_movements_by_related_id(agency_id, income.id).await?;
                tracing::info!(%agency_id, movement_id = %income.id, removed, "Comissão derivada removida");
                Ok(None)
            }
            (None, None) => Ok(None),
        }
    }

    // =========================================================================
    //  EXCLUIR
    // =========================================================================

    /// Exclui o movimento e, em cascata, tudo que aponta para ele.
    /// Retorna quantos movimentos vinculados foram removidos.
    pub async fn delete_movement<S>(&self, store: &S, agency_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        S: MovementStore + ?Sized,
    {
        let movement = self.find_movement(store, agency_id, id).await?;
        if movement.is_derived() {
            return Err(AppError::ManagedMovement(id));
        }

        // Sempre em cascata, mesmo se o agent_id gravado estiver desatualizado
        let removed = store
            .delete_movements_by_related_id(agency_id, id)
            .await
            .map_err(AppError::at_stage(WriteStage::Cascade))?;

        store
            .delete_movement(agency_id, id)
            .await
            .map_err(AppError::at_stage(WriteStage::Primary))?;

        tracing::info!(%agency_id, movement_id = %id, removed, "Movimento excluído");
        Ok(removed)
    }

    // =========================================================================
    //  AUXILIARES
    // =========================================================================

    async fn resolve_split<S>(
        &self,
        store: &S,
        agency_id: Uuid,
        input: &SaveMovementInput,
    ) -> Result<Option<SplitTerms>, AppError>
    where
        S: AgencyConfig + ?Sized,
    {
        let Some(agent_id) = input.agent_id else {
            if input.split_percentage.is_some() {
                return Err(AppError::invalid("agentId", "obrigatório quando há repasse"));
            }
            return Ok(None);
        };

        if input.kind != MovementKind::Income {
            return Err(AppError::invalid("agentId", "repasse só é permitido em entradas"));
        }

        let agent = store
            .find_agent(agency_id, agent_id)
            .await?
            .ok_or(AppError::AgentNotFound(agent_id))?;

        // Mesma precisão da coluna, para que o reparo recalcule o mesmo valor
        let percentage = round_percentage(input.split_percentage.unwrap_or(agent.base_percentage));
        if percentage <= Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
            return Err(AppError::invalid("splitPercentage", "deve estar entre 0 (exclusivo) e 100"));
        }

        Ok(Some(SplitTerms { agent, percentage, commission_status: input.commission_status }))
    }

    async fn resolve_invoice_number<S>(
        &self,
        store: &S,
        agency_id: Uuid,
        input: &SaveMovementInput,
        date: NaiveDate,
        existing: Option<&Movement>,
    ) -> Result<Option<String>, AppError>
    where
        S: MovementStore + ?Sized,
    {
        if input.kind != MovementKind::Income || !input.has_invoice {
            return Ok(None);
        }

        let year = date.year();
        let stored = existing.and_then(|m| m.invoice_number.as_deref());
        let stored_parsed = stored.and_then(InvoiceNumber::parse);
        // "5-2024" e "05-2024" são o mesmo número
        let requested = input
            .invoice_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && Some(*n) != stored)
            .filter(|n| stored_parsed.is_none() || InvoiceNumber::parse(n) != stored_parsed);

        // Número digitado pelo usuário (diferente do já gravado)
        if let Some(raw) = requested {
            let parsed = InvoiceNumber::parse(raw)
                .ok_or_else(|| AppError::invalid("invoiceNumber", "formato esperado NN-AAAA"))?;
            if parsed.year != year {
                return Err(AppError::invalid("invoiceNumber", "o ano não corresponde à data do movimento"));
            }

            let number = parsed.format();
            let taken = store
                .find_movements_by_agency(agency_id, &MovementFilter::invoiced_in(year))
                .await?
                .iter()
                .filter(|m| Some(m.id) != existing.map(|e| e.id))
                .any(|m| m.invoice_number.as_deref().and_then(InvoiceNumber::parse) == Some(parsed));
            if taken {
                return Err(AppError::InvoiceNumberTaken(number));
            }
            return Ok(Some(number));
        }

        // Mantém o número gravado só se continuar no mesmo ano da data
        if let Some(current) = stored {
            if InvoiceNumber::parse(current).is_some_and(|n| n.year == year) {
                return Ok(Some(current.to_string()));
            }
            tracing::info!(%agency_id, stale = current, year, "Data mudou de ano; renumerando fatura");
        }

        self.invoices.allocate_invoice_number(store, agency_id, date).await.map(Some)
    }
}

fn non_zero(value: Decimal) -> Option<Decimal> {
    (!value.is_zero()).then(|| round_money(value))
}
