//! Durable outputs: the audit ledger and the cascade change report

pub mod ledger;
pub mod report;

pub use ledger::JsonlAuditLedger;
pub use report::CsvChangeReport;
