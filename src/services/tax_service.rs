// src/services/tax_service.rs

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::settings::TaxRegime;

/// Base de cálculo da retenção: 50% do valor bruto.
pub const WITHHOLDING_BASE_FRACTION: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
/// Alíquota da retenção sobre a base (23%).
pub const WITHHOLDING_RATE: Decimal = Decimal::from_parts(23, 0, 0, false, 2);

/// Limite exclusivo de `NUMERIC(14, 2)`: 10^12. Acima disso nem grava nem
/// cabe com folga nas multiplicações dos cálculos.
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrimaryTax {
    pub vat: Decimal,
    pub withholding: Decimal,
}

/// IVA e retenção do movimento principal. Função pura, sem erros.
///
/// O IVA depende só da flag de fatura (não do regime da agência); a retenção
/// só existe em regime ordinário com o toggle ligado.
pub fn compute_primary_tax(
    amount: Decimal,
    has_invoice: bool,
    vat_rate_percent: Decimal,
    agency_regime: TaxRegime,
    apply_withholding: bool,
) -> PrimaryTax {
    let vat = if has_invoice {
        amount * vat_rate_percent / Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let withholding = if agency_regime == TaxRegime::Ordinario && apply_withholding {
        amount * WITHHOLDING_BASE_FRACTION * WITHHOLDING_RATE
    } else {
        Decimal::ZERO
    };

    PrimaryTax { vat, withholding }
}

/// `true` se o valor, já arredondado em centavos, cabe na coluna de valores.
pub fn fits_money_column(value: Decimal) -> bool {
    round_money(value.abs()) < AMOUNT_LIMIT
}

/// Arredondamento monetário usado na gravação (centavos, meio para longe do zero).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn amount_limit_matches_numeric_14_2() {
        assert_eq!(AMOUNT_LIMIT, Decimal::from(1_000_000_000_000_i64));
        assert!(fits_money_column(Decimal::new(999_999_999_999_99, 2)));
        assert!(!fits_money_column(Decimal::new(999_999_999_999_999, 3)));
        assert!(!fits_money_column(-Decimal::MAX));
    }

    #[test]
    fn vat_is_zero_without_invoice() {
        for amount in [d(0), d(1000), Decimal::new(3333, 2), d(-250)] {
            for rate in [d(0), d(4), d(10), d(22)] {
                let tax = compute_primary_tax(amount, false, rate, TaxRegime::Ordinario, true);
                assert_eq!(tax.vat, Decimal::ZERO);
            }
        }
    }

    #[test]
    fn vat_is_amount_times_rate_with_invoice() {
        for amount in [d(0), d(1000), Decimal::new(3333, 2), d(-250)] {
            for rate in [d(4), d(10), d(22)] {
                let tax = compute_primary_tax(amount, true, rate, TaxRegime::Forfettario, false);
                assert_eq!(tax.vat, amount * rate / d(100));
            }
        }
    }

    #[test]
    fn vat_is_not_gated_on_flat_rate_regime() {
        let tax = compute_primary_tax(d(1000), true, d(22), TaxRegime::Forfettario, false);
        assert_eq!(tax.vat, d(220));
    }

    #[test]
    fn withholding_never_applies_to_forfettario() {
        let tax = compute_primary_tax(d(1000), true, d(22), TaxRegime::Forfettario, true);
        assert_eq!(tax.withholding, Decimal::ZERO);
    }

    #[test]
    fn withholding_is_23_percent_of_half_for_ordinario() {
        let tax = compute_primary_tax(d(1000), false, d(22), TaxRegime::Ordinario, true);
        assert_eq!(tax.withholding, d(115));

        let off = compute_primary_tax(d(1000), false, d(22), TaxRegime::Ordinario, false);
        assert_eq!(off.withholding, Decimal::ZERO);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(73326, 4)), Decimal::new(733, 2));
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round_money(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
    }
}
