pub mod store;
pub use store::{AgencyConfig, MovementStore};
pub mod movement_repo;
pub use movement_repo::MovementRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod agent_repo;
pub use agent_repo::AgentRepository;
pub mod ledger_store;
pub use ledger_store::PgLedgerStore;

#[cfg(test)]
pub mod memory_repo;
