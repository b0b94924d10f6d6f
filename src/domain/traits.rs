use chrono::{DateTime, Utc};
use futures::Stream;

use crate::domain::{
    Account, AccountId, AuditEvent, BalanceSnapshot, Command, Error, OwnerId, Transaction,
    TransactionDraft, TransactionId, TransactionStatus,
};

pub trait CommandStream {
    type CmdStream: Stream<Item = Result<Command, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::CmdStream;
}

pub trait DeadLetterQueue {
    fn report(&self, error: &Error);
}

/// Receives every committed change. Writing the audit trail is someone else's job.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait AccountStore: Send + Sync {
    fn create_account(&self, owner_id: &OwnerId, now: DateTime<Utc>) -> Result<Account, Error>;

    fn get_account(&self, account_id: AccountId) -> Result<Account, Error>;

    fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Account, Error>;

    fn list_accounts(&self) -> Vec<Account>;

    /// Compare-and-swap on `Account::version`; a stale copy fails with `Contention`.
    fn update_account(&self, account: &Account) -> Result<Account, Error>;
}

pub trait TransactionLog: Send + Sync {
    fn append(&self, draft: TransactionDraft) -> Result<Transaction, Error>;

    fn finalize(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
        snapshot: BalanceSnapshot,
        at: DateTime<Utc>,
    ) -> Result<Transaction, Error>;

    fn get_transaction(&self, transaction_id: TransactionId) -> Result<Transaction, Error>;

    /// Newest first. Returns the requested slice and the total count.
    fn list(&self, account_id: AccountId, offset: usize, limit: usize)
    -> (Vec<Transaction>, usize);

    fn transactions(&self, account_id: AccountId) -> Vec<Transaction>;

    /// Highest reference beginning with `stem`.
    fn last_reference(&self, stem: &str) -> Option<String>;
}

/// Units of work that touch the account and its journal together.
pub trait LedgerStorage: AccountStore + TransactionLog {
    /// Appends `draft`, writes `account` and completes the entry, or does nothing.
    fn commit_movement(
        &self,
        account: &Account,
        draft: TransactionDraft,
    ) -> Result<Transaction, Error>;

    /// Completes a pending entry together with the account write, or does nothing.
    fn commit_settlement(
        &self,
        account: &Account,
        transaction_id: TransactionId,
        snapshot: BalanceSnapshot,
        at: DateTime<Utc>,
    ) -> Result<Transaction, Error>;
}
