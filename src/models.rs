pub mod agents;
pub mod ledger;
pub mod settings;
