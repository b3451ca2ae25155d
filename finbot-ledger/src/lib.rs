//! finbot-ledger: persistence for classified transactions

pub mod csv_store;
pub mod error;
pub mod memory;
pub mod sheets;
pub mod store;
pub mod types;

pub use csv_store::CsvLedger;
pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sheets::SheetsLedger;
pub use store::{Ledger, LedgerBackend, build_entry};
