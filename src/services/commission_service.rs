// src/services/commission_service.rs

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{
        agents::Agent,
        ledger::{CommissionStatus, Movement, MovementKind, MovementStatus},
        settings::TaxRegime,
    },
    services::tax_service::round_money,
};

/// Categoria fixa da despesa de comissão gerada automaticamente.
pub const COMMISSION_CATEGORY: &str = "Provvigioni agenti esterni";

/// IVA que o agente em regime ordinário fatura sobre a comissão (22%).
pub const AGENT_VAT_RATE: Decimal = Decimal::from_parts(22, 0, 0, false, 2);
/// Retenção sobre a comissão do agente em regime ordinário (20%).
pub const AGENT_WITHHOLDING_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionExpense {
    pub base_commission: Decimal,
    /// Despesa lançada: honorário + IVA. A retenção não altera este valor.
    pub total_expense: Decimal,
    pub agent_vat: Decimal,
    pub agent_withholding: Decimal,
}

/// Regra de repasse: o tratamento fiscal segue SÓ o regime do agente.
pub fn derive_commission_expense(
    income_amount: Decimal,
    split_percentage: Decimal,
    agent: &Agent,
) -> CommissionExpense {
    let base_commission = income_amount.abs() * split_percentage / Decimal::ONE_HUNDRED;

    match agent.tax_regime {
        TaxRegime::Ordinario => {
            let agent_vat = base_commission * AGENT_VAT_RATE;
            CommissionExpense {
                base_commission,
                total_expense: base_commission + agent_vat,
                agent_vat,
                agent_withholding: base_commission * AGENT_WITHHOLDING_RATE,
            }
        }
        TaxRegime::Forfettario => CommissionExpense {
            base_commission,
            total_expense: base_commission,
            agent_vat: Decimal::ZERO,
            agent_withholding: Decimal::ZERO,
        },
    }
}

/// Comissão base gravada na entrada (`agent_commission_accrued`), em centavos.
pub fn accrued_commission(income_amount: Decimal, terms: &SplitTerms) -> Decimal {
    round_money(derive_commission_expense(income_amount, terms.percentage, &terms.agent).base_commission)
}

/// Percentual de repasse na precisão da coluna (duas casas).
pub fn round_percentage(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parâmetros do repasse já resolvidos para uma entrada.
#[derive(Debug, Clone)]
pub struct SplitTerms {
    pub agent: Agent,
    pub percentage: Decimal,
    pub commission_status: CommissionStatus,
}

impl SplitTerms {
    pub fn expense_for(&self, income: &Movement) -> CommissionExpense {
        derive_commission_expense(income.amount, self.percentage, &self.agent)
    }
}

/// Monta a despesa derivada de `income`. `existing` preserva id e criação
/// quando a despesa já existe (atualização no lugar).
pub fn build_commission_movement(
    income: &Movement,
    terms: &SplitTerms,
    existing: Option<&Movement>,
) -> Movement {
    let expense = terms.expense_for(income);

    let status = match terms.commission_status {
        CommissionStatus::Paid => MovementStatus::Paid,
        CommissionStatus::Accrued => MovementStatus::Pending,
    };

    let description = match &income.description {
        Some(source) => format!("Provvigione {} - {}", terms.agent.name, source),
        None => format!("Provvigione {}", terms.agent.name),
    };

    Movement {
        id: existing.map(|m| m.id).unwrap_or_else(Uuid::new_v4),
        agency_id: income.agency_id,
        kind: MovementKind::Expense,
        amount: -round_money(expense.total_expense),
        date: income.date,
        category: COMMISSION_CATEGORY.to_string(),
        description: Some(description),
        status,
        vat_amount: Some(round_money(expense.agent_vat)),
        withholding_tax: Some(round_money(expense.agent_withholding)),
        invoice_number: None,
        agent_id: Some(terms.agent.id),
        agent_split_percentage: Some(terms.percentage),
        agent_commission_accrued: None,
        agent_commission_status: Some(terms.commission_status),
        related_movement_id: Some(income.id),
        created_at: existing.map(|m| m.created_at).unwrap_or_else(Utc::now),
        updated_at: existing.map(|_| Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn agent(regime: TaxRegime) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            name: "Giulia Rossi".to_string(),
            base_percentage: Decimal::from(10),
            tax_regime: regime,
            is_active: true,
            created_at: None,
        }
    }

    fn income(amount: Decimal) -> Movement {
        Movement {
            id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            kind: MovementKind::Income,
            amount,
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            category: "Consulenze".to_string(),
            description: Some("Progetto Alfa".to_string()),
            status: MovementStatus::Pending,
            vat_amount: None,
            withholding_tax: None,
            invoice_number: None,
            agent_id: None,
            agent_split_percentage: None,
            agent_commission_accrued: None,
            agent_commission_status: None,
            related_movement_id: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn ordinario_agent_books_fee_plus_vat() {
        // base = 10000 * 10% = 1000
        let expense = derive_commission_expense(Decimal::from(10000), Decimal::from(10), &agent(TaxRegime::Ordinario));
        assert_eq!(expense.base_commission, Decimal::from(1000));
        assert_eq!(expense.agent_vat, Decimal::from(220));
        assert_eq!(expense.agent_withholding, Decimal::from(200));
        assert_eq!(expense.total_expense, Decimal::from(1220));
    }

    #[test]
    fn forfettario_agent_books_fee_only() {
        let expense = derive_commission_expense(Decimal::from(10000), Decimal::from(10), &agent(TaxRegime::Forfettario));
        assert_eq!(expense.total_expense, Decimal::from(1000));
        assert_eq!(expense.agent_vat, Decimal::ZERO);
        assert_eq!(expense.agent_withholding, Decimal::ZERO);
    }

    #[test]
    fn base_uses_absolute_income() {
        let expense = derive_commission_expense(Decimal::from(-500), Decimal::from(20), &agent(TaxRegime::Forfettario));
        assert_eq!(expense.base_commission, Decimal::from(100));
    }

    #[test]
    fn derived_movement_is_negative_and_linked() {
        let source = income(Decimal::from(10000));
        let terms = SplitTerms {
            agent: agent(TaxRegime::Ordinario),
            percentage: Decimal::from(10),
            commission_status: CommissionStatus::Accrued,
        };

        let derived = build_commission_movement(&source, &terms, None);

        assert_eq!(derived.kind, MovementKind::Expense);
        assert_eq!(derived.amount, Decimal::from(-1220));
        assert_eq!(derived.vat_amount, Some(Decimal::from(220)));
        assert_eq!(derived.withholding_tax, Some(Decimal::from(200)));
        assert_eq!(derived.category, COMMISSION_CATEGORY);
        assert_eq!(derived.related_movement_id, Some(source.id));
        assert_eq!(derived.agent_id, Some(terms.agent.id));
        assert_eq!(derived.date, source.date);
        assert_eq!(derived.status, MovementStatus::Pending);
    }

    #[test]
    fn rebuilding_keeps_identity_of_existing_row() {
        let source = income(Decimal::from(2000));
        let terms = SplitTerms {
            agent: agent(TaxRegime::Forfettario),
            percentage: Decimal::from(15),
            commission_status: CommissionStatus::Paid,
        };
        let first = build_commission_movement(&source, &terms, None);
        let again = build_commission_movement(&source, &terms, Some(&first));

        assert_eq!(again.id, first.id);
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(again.amount, Decimal::from(-300));
        assert_eq!(again.status, MovementStatus::Paid);
    }
}
