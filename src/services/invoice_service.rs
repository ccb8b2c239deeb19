// src/services/invoice_service.rs

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::MovementStore,
    models::ledger::MovementFilter,
};

/// Um número de fatura `NN-YYYY` já decomposto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InvoiceNumber {
    pub sequence: u32,
    pub year: i32,
}

impl InvoiceNumber {
    /// Aceita qualquer quantidade de dígitos na sequência (acima de 99 o campo
    /// simplesmente cresce). Entradas malformadas retornam `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (sequence, year) = raw.trim().split_once('-')?;
        if sequence.is_empty() || year.len() != 4 {
            return None;
        }
        if !sequence.bytes().all(|b| b.is_ascii_digit()) || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self { sequence: sequence.parse().ok()?, year: year.parse().ok()? })
    }

    pub fn format(&self) -> String {
        format!("{:02}-{}", self.sequence, self.year)
    }
}

/// Maior sequência já usada no ano, ignorando números de outros anos ou malformados.
pub fn max_sequence_for_year<'a, I>(existing: I, year: i32) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    existing
        .into_iter()
        .filter_map(InvoiceNumber::parse)
        .filter(|n| n.year == year)
        .map(|n| n.sequence)
        .max()
        .unwrap_or(0)
}

/// Próximo número para o ano de `reference_date`, dado o que já existe.
pub fn next_from_existing<'a, I>(existing: I, reference_date: NaiveDate) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let year = reference_date.year();
    InvoiceNumber { sequence: max_sequence_for_year(existing, year) + 1, year }.format()
}

#[derive(Clone, Default)]
pub struct InvoiceService;

impl InvoiceService {
    pub fn new() -> Self {
        Self
    }

    async fn scan_max<S>(&self, store: &S, agency_id: Uuid, year: i32) -> Result<u32, AppError>
    where
        S: MovementStore + ?Sized,
    {
        let invoiced = store
            .find_movements_by_agency(agency_id, &MovementFilter::invoiced_in(year))
            .await?;

        Ok(max_sequence_for_year(
            invoiced.iter().filter_map(|m| m.invoice_number.as_deref()),
            year,
        ))
    }

    /// Prévia do próximo número (leitura do máximo + 1). Não reserva nada.
    pub async fn next_invoice_number<S>(
        &self,
        store: &S,
        agency_id: Uuid,
        reference_date: NaiveDate,
    ) -> Result<String, AppError>
    where
        S: MovementStore + ?Sized,
    {
        let year = reference_date.year();
        let max = self.scan_max(store, agency_id, year).await?;
        Ok(InvoiceNumber { sequence: max + 1, year }.format())
    }

    /// Reserva definitiva pelo contador atômico, nunca abaixo do maior número já gravado.
    pub async fn allocate_invoice_number<S>(
        &self,
        store: &S,
        agency_id: Uuid,
        reference_date: NaiveDate,
    ) -> Result<String, AppError>
    where
        S: MovementStore + ?Sized,
    {
        let year = reference_date.year();
        let floor = self.scan_max(store, agency_id, year).await?;
        let sequence = store.reserve_invoice_sequence(agency_id, year, floor).await?;

        let number = InvoiceNumber { sequence, year }.format();
        tracing::info!(%agency_id, invoice_number = %number, "Número de fatura reservado");
        Ok(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_repo::MemoryLedgerStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_well_formed_numbers_only() {
        assert_eq!(InvoiceNumber::parse("07-2024"), Some(InvoiceNumber { sequence: 7, year: 2024 }));
        assert_eq!(InvoiceNumber::parse("120-2024"), Some(InvoiceNumber { sequence: 120, year: 2024 }));
        assert_eq!(InvoiceNumber::parse("FT-2024"), None);
        assert_eq!(InvoiceNumber::parse("07/2024"), None);
        assert_eq!(InvoiceNumber::parse("-2024"), None);
        assert_eq!(InvoiceNumber::parse("07-24"), None);
    }

    #[test]
    fn continues_sequence_within_year() {
        let existing = ["01-2024", "02-2024"];
        assert_eq!(next_from_existing(existing, date(2024, 6, 1)), "03-2024");
    }

    #[test]
    fn starts_a_new_year_at_one() {
        let existing = ["01-2024", "02-2024"];
        assert_eq!(next_from_existing(existing, date(2025, 1, 2)), "01-2025");
    }

    #[test]
    fn ignores_malformed_and_uses_numeric_max() {
        let existing = ["bozza", "9-2024", "10-2024", "03-2023", "99x-2024"];
        assert_eq!(next_from_existing(existing, date(2024, 12, 31)), "11-2024");
    }

    #[test]
    fn widens_past_ninety_nine() {
        assert_eq!(next_from_existing(["99-2024"], date(2024, 3, 3)), "100-2024");
    }

    #[tokio::test]
    async fn allocation_never_reuses_a_number() {
        let store = MemoryLedgerStore::new();
        let agency = Uuid::new_v4();
        let service = InvoiceService::new();

        let first = service.allocate_invoice_number(&store, agency, date(2024, 2, 1)).await.unwrap();
        // Nada foi gravado em movimentos ainda, mas o contador já avançou
        let second = service.allocate_invoice_number(&store, agency, date(2024, 2, 1)).await.unwrap();

        assert_eq!(first, "01-2024");
        assert_eq!(second, "02-2024");
        assert_eq!(
            service.next_invoice_number(&store, agency, date(2024, 2, 1)).await.unwrap(),
            "01-2024"
        );
    }
}
