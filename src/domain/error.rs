use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{AccountId, OwnerId, TransactionId, TransactionStatus};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Account already exists for owner {0}")]
    AlreadyExists(OwnerId),

    #[error("Duplicate transaction reference {0}")]
    DuplicateReference(String),

    #[error("Insufficient funds in account {account_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        account_id: AccountId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Credit limit exceeded for account {account_id}: requested {requested}, available credit {available_credit}")]
    CreditLimitExceeded {
        account_id: AccountId,
        requested: Decimal,
        available_credit: Decimal,
    },

    #[error("Repayment of {requested} exceeds used credit {used_credit} on account {account_id}")]
    ExcessRepayment {
        account_id: AccountId,
        requested: Decimal,
        used_credit: Decimal,
    },

    #[error("Release of {requested} exceeds blocked balance {blocked} on account {account_id}")]
    ExcessRelease {
        account_id: AccountId,
        requested: Decimal,
        blocked: Decimal,
    },

    #[error("Account {0} is frozen")]
    AccountFrozen(AccountId),

    #[error("Account {0} is blocked")]
    AccountBlocked(AccountId),

    #[error("Transaction {0} is already finalized")]
    AlreadyFinalized(TransactionId),

    #[error("Write would break balance invariants of account {0}")]
    InvariantViolation(AccountId),

    #[error("Transaction {0} cannot be finalized as {1:?}")]
    InvalidTransition(TransactionId, TransactionStatus),

    #[error("Invalid credit limit {limit}: used credit is {used_credit}")]
    InvalidLimit { limit: Decimal, used_credit: Decimal },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount overflow in {0}")]
    AmountOverflow(String),

    #[error("Invalid page request: page {page}, limit {limit}")]
    InvalidPage { page: u32, limit: u32 },

    #[error("Reference sequence exhausted for {prefix} on {date}")]
    ReferenceExhausted { prefix: String, date: NaiveDate },

    #[error("Concurrent update on account {0}, retry the operation")]
    Contention(AccountId),
}

/// Coarse classification callers use to pick a response without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InsufficientFunds,
    CreditLimitExceeded,
    AccountFrozen,
    AccountBlocked,
    AlreadyFinalized,
    InvalidLimit,
    Contention,
    Invalid,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AccountNotFound(_) | Error::TransactionNotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) | Error::DuplicateReference(_) => ErrorKind::Conflict,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::CreditLimitExceeded { .. } => ErrorKind::CreditLimitExceeded,
            Error::AccountFrozen(_) => ErrorKind::AccountFrozen,
            Error::AccountBlocked(_) => ErrorKind::AccountBlocked,
            Error::AlreadyFinalized(_) => ErrorKind::AlreadyFinalized,
            Error::InvalidLimit { .. } => ErrorKind::InvalidLimit,
            Error::Contention(_) => ErrorKind::Contention,
            Error::IO(_) | Error::Csv(_) => ErrorKind::Io,
            Error::Ingestion(_)
            | Error::Config(_)
            | Error::ExcessRepayment { .. }
            | Error::ExcessRelease { .. }
            | Error::InvalidAmount(_)
            | Error::AmountOverflow(_)
            | Error::InvalidTransition(..)
            | Error::InvariantViolation(_)
            | Error::InvalidPage { .. }
            | Error::ReferenceExhausted { .. } => ErrorKind::Invalid,
        }
    }

    /// Only lock or version contention is worth retrying; nothing was committed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Contention
    }
}
