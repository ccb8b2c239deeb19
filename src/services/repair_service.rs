// src/services/repair_service.rs

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AgencyConfig, MovementStore},
    models::ledger::{Movement, MovementFilter, MovementKind, RepairReport},
    services::{
        commission_service::{accrued_commission, round_percentage, SplitTerms},
        ledger_service::LedgerService,
    },
};

/// Rotina administrativa de backfill/reparo sobre dados históricos.
///
/// Usa exatamente o `sync_derived` do fluxo interativo.
#[derive(Clone, Default)]
pub struct RepairService {
    ledger: LedgerService,
}

impl RepairService {
    pub fn new(ledger: LedgerService) -> Self {
        Self { ledger }
    }

    pub async fn repair_agency<S>(&self, store: &S, agency_id: Uuid) -> Result<RepairReport, AppError>
    where
        S: MovementStore + AgencyConfig + ?Sized,
    {
        let all = store
            .find_movements_by_agency(agency_id, &MovementFilter::default())
            .await?;

        let mut derived_by_source: HashMap<Uuid, Vec<Movement>> = HashMap::new();
        for movement in all.iter().filter(|m| m.is_derived()) {
            if let Some(source) = movement.related_movement_id {
                derived_by_source.entry(source).or_default().push(movement.clone());
            }
        }

        let mut report = RepairReport::default();
        let mut handled: HashSet<Uuid> = HashSet::new();

        for income in all.iter().filter(|m| m.kind == MovementKind::Income && !m.is_derived()) {
            report.scanned += 1;
            handled.insert(income.id);

            let mut rows = derived_by_source.remove(&income.id).unwrap_or_default();
            if rows.len() > 1 {
                tracing::warn!(%agency_id, movement_id = %income.id, found = rows.len(), "Reparo ignorado: despesas derivadas duplicadas");
                report.inconsistent.push(income.id);
                continue;
            }

            let terms = match income.agent_id {
                Some(agent_id) => match store.find_agent(agency_id, agent_id).await? {
                    Some(agent) => Some(SplitTerms {
                        percentage: round_percentage(income.agent_split_percentage.unwrap_or(agent.base_percentage)),
                        commission_status: income.agent_commission_status.unwrap_or_default(),
                        agent,
                    }),
                    None => {
                        tracing::warn!(%agency_id, movement_id = %income.id, %agent_id, "Reparo ignorado: agente inexistente");
                        report.inconsistent.push(income.id);
                        continue;
                    }
                },
                None => None,
            };

            // Campos de repasse da própria entrada, calculados como no salvamento
            let expected = (
                terms.as_ref().map(|t| t.percentage),
                terms.as_ref().map(|t| accrued_commission(income.amount, t)),
                terms.as_ref().map(|t| t.commission_status),
            );
            let stored = (
                income.agent_split_percentage,
                income.agent_commission_accrued,
                income.agent_commission_status,
            );
            let source = if stored != expected {
                let mut changes = income.changes();
                (changes.agent_split_percentage, changes.agent_commission_accrued, changes.agent_commission_status) =
                    expected;
                report.accruals_updated += 1;
                store.update_movement(agency_id, income.id, &changes).await?
            } else {
                income.clone()
            };

            let current = rows.pop();
            let had_derived = current.is_some();
            let result = self.ledger.sync_derived(store, &source, terms.as_ref(), current).await?;

            match (had_derived, result.is_some()) {
                (false, true) => report.created += 1,
                (true, true) => report.updated += 1,
                (true, false) => report.removed += 1,
                (false, false) => {}
            }
        }

        // Sobraram derivadas cuja origem não existe (ou não é mais uma entrada)
        for source in derived_by_source.keys().filter(|id| !handled.contains(*id)) {
            let removed = store.delete_movements_by_related_id(agency_id, *source).await?;
            report.orphans_removed += removed as usize;
        }

        tracing::info!(
            %agency_id,
            scanned = report.scanned,
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            accruals = report.accruals_updated,
            orphans = report.orphans_removed,
            inconsistent = report.inconsistent.len(),
            "Reparo do livro-caixa concluído"
        );

        Ok(report)
    }
}
