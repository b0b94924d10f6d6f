//! In-memory wallet ledger: accounts with a cash balance, held funds and a
//! credit line, an append-only transaction log and daily-sequenced references.

pub mod audit;
pub mod clock;
pub mod config;
pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod processor;
pub mod query;
pub mod reference;
pub mod report;
pub mod store;

pub use config::Config;
pub use domain::{Error, ErrorKind};
pub use engine::LedgerEngine;
pub use query::{Page, PageRequest, QueryFacade};
pub use store::InMemoryStorage;
