pub mod account;
pub mod audit;
pub mod command;
pub mod error;
pub mod money;
pub mod traits;
pub mod transaction;

pub use account::{Account, AccountId, AccountStatus, OwnerId};
pub use audit::{AuditAction, AuditEvent};
pub use command::Command;
pub use error::{Error, ErrorKind};
pub use money::Money;
pub use traits::{
    AccountStore, AuditSink, Clock, CommandStream, DeadLetterQueue, LedgerStorage,
    TransactionLog,
};
pub use transaction::{
    BalanceSnapshot, Effect, MovementRequest, PaymentMethod, Transaction, TransactionCategory,
    TransactionDraft, TransactionId, TransactionStatus, TransactionType,
};
