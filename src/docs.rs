// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Ledger ---
        handlers::ledger::list_movements,
        handlers::ledger::create_movement,
        handlers::ledger::update_movement,
        handlers::ledger::delete_movement,
        handlers::ledger::next_invoice_number,
        handlers::ledger::repair_ledger,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,

        // --- Agents ---
        handlers::agents::create_agent,
        handlers::agents::list_agents,
        handlers::agents::get_agent,
    ),
    components(
        schemas(
            // --- Ledger ---
            models::ledger::MovementKind,
            models::ledger::MovementStatus,
            models::ledger::CommissionStatus,
            models::ledger::Movement,
            models::ledger::SaveMovementInput,
            models::ledger::SavedMovement,
            models::ledger::InvoicePreview,
            models::ledger::RepairReport,

            // --- Settings ---
            models::settings::TaxRegime,
            models::settings::AgencySettings,
            models::settings::UpdateSettingsRequest,

            // --- Agents ---
            models::agents::Agent,
            models::agents::CreateAgentPayload,
        )
    ),
    tags(
        (name = "Ledger", description = "Movimentos, faturas e comissões de agentes"),
        (name = "Settings", description = "Regime fiscal e IVA padrão da agência"),
        (name = "Agents", description = "Agentes colaboradores"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_ledger_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/ledger/movements"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/ledger/movements/{id}"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/ledger/repair"));
    }
}
