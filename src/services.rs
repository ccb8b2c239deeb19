pub mod tax_service;
pub mod invoice_service;
pub mod commission_service;
pub mod ledger_service;
pub mod repair_service;
