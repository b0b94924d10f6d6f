use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;

use crate::domain::{
    Account, AccountId, AccountStore, BalanceSnapshot, Error, LedgerStorage, OwnerId, Transaction,
    TransactionDraft, TransactionId, TransactionLog, TransactionStatus,
};

/// In-memory stand-in for the relational store.
///
/// Accounts and journals are sharded per account id, so writers on different
/// accounts never wait on each other. Lock order, wherever several are held:
/// `owners`, `journals`, `accounts`, `references`.
#[derive(Default, Debug)]
pub struct InMemoryStorage {
    accounts: DashMap<AccountId, Account>,
    owners: DashMap<OwnerId, AccountId>,
    journals: DashMap<AccountId, Vec<Transaction>>,
    locations: DashMap<TransactionId, AccountId>,
    references: RwLock<BTreeMap<String, TransactionId>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn locate(&self, transaction_id: TransactionId) -> Result<AccountId, Error> {
        self.locations
            .get(&transaction_id)
            .map(|entry| *entry.value())
            .ok_or(Error::TransactionNotFound(transaction_id))
    }

    fn check_write(stored: &Account, account: &Account) -> Result<(), Error> {
        if stored.version() != account.version() {
            return Err(Error::Contention(account.id()));
        }
        if !account.holds_invariants() {
            return Err(Error::InvariantViolation(account.id()));
        }
        Ok(())
    }

    fn reserve_reference(&self, transaction: &Transaction) -> Result<(), Error> {
        let mut references = self.references.write();
        if references.contains_key(&transaction.reference) {
            return Err(Error::DuplicateReference(transaction.reference.clone()));
        }
        references.insert(transaction.reference.clone(), transaction.id);
        Ok(())
    }
}

fn not_found(account_id: AccountId) -> Error {
    Error::AccountNotFound(account_id.to_string())
}

impl AccountStore for InMemoryStorage {
    fn create_account(&self, owner_id: &OwnerId, now: DateTime<Utc>) -> Result<Account, Error> {
        match self.owners.entry(owner_id.clone()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists(owner_id.clone())),
            Entry::Vacant(slot) => {
                let account = Account::new(owner_id.clone(), now);
                self.journals.insert(account.id(), Vec::new());
                self.accounts.insert(account.id(), account.clone());
                // the owner becomes visible only once the account exists
                slot.insert(account.id());
                Ok(account)
            }
        }
    }

    fn get_account(&self, account_id: AccountId) -> Result<Account, Error> {
        self.accounts
            .get(&account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found(account_id))
    }

    fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Account, Error> {
        let account_id = self
            .owners
            .get(owner_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| Error::AccountNotFound(owner_id.to_string()))?;
        self.get_account(account_id)
    }

    fn list_accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn update_account(&self, account: &Account) -> Result<Account, Error> {
        let mut stored = self
            .accounts
            .get_mut(&account.id())
            .ok_or_else(|| not_found(account.id()))?;
        Self::check_write(&stored, account)?;

        let mut next = account.clone();
        next.bump_version();
        *stored = next.clone();
        Ok(next)
    }
}

impl TransactionLog for InMemoryStorage {
    fn append(&self, draft: TransactionDraft) -> Result<Transaction, Error> {
        let mut journal = self
            .journals
            .get_mut(&draft.account_id)
            .ok_or_else(|| not_found(draft.account_id))?;

        let transaction = Transaction::pending(draft);
        self.reserve_reference(&transaction)?;
        self.locations
            .insert(transaction.id, transaction.account_id);
        journal.push(transaction.clone());
        Ok(transaction)
    }

    fn finalize(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
        snapshot: BalanceSnapshot,
        at: DateTime<Utc>,
    ) -> Result<Transaction, Error> {
        let account_id = self.locate(transaction_id)?;
        let mut journal = self
            .journals
            .get_mut(&account_id)
            .ok_or(Error::TransactionNotFound(transaction_id))?;
        let entry = journal
            .iter_mut()
            .rev()
            .find(|t| t.id == transaction_id)
            .ok_or(Error::TransactionNotFound(transaction_id))?;

        entry.finalize(status, snapshot, at)?;
        Ok(entry.clone())
    }

    fn get_transaction(&self, transaction_id: TransactionId) -> Result<Transaction, Error> {
        let account_id = self.locate(transaction_id)?;
        self.journals
            .get(&account_id)
            .and_then(|journal| journal.iter().rev().find(|t| t.id == transaction_id).cloned())
            .ok_or(Error::TransactionNotFound(transaction_id))
    }

    fn list(
        &self,
        account_id: AccountId,
        offset: usize,
        limit: usize,
    ) -> (Vec<Transaction>, usize) {
        let Some(journal) = self.journals.get(&account_id) else {
            return (Vec::new(), 0);
        };

        // stable sort over the reversed journal keeps newer inserts first on equal timestamps
        let mut entries: Vec<&Transaction> = journal.iter().rev().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = entries.len();
        let items = entries
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (items, total)
    }

    fn transactions(&self, account_id: AccountId) -> Vec<Transaction> {
        self.journals
            .get(&account_id)
            .map(|journal| journal.value().clone())
            .unwrap_or_default()
    }

    fn last_reference(&self, stem: &str) -> Option<String> {
        let references = self.references.read();
        references
            .range::<str, _>((Bound::Included(stem), Bound::Unbounded))
            .take_while(|(reference, _)| reference.starts_with(stem))
            .last()
            .map(|(reference, _)| reference.clone())
    }
}

impl LedgerStorage for InMemoryStorage {
    fn commit_movement(
        &self,
        account: &Account,
        draft: TransactionDraft,
    ) -> Result<Transaction, Error> {
        if draft.account_id != account.id() {
            return Err(Error::InvariantViolation(account.id()));
        }

        let mut journal = self
            .journals
            .get_mut(&account.id())
            .ok_or_else(|| not_found(account.id()))?;
        let mut stored = self
            .accounts
            .get_mut(&account.id())
            .ok_or_else(|| not_found(account.id()))?;
        Self::check_write(&stored, account)?;

        let mut transaction = Transaction::pending(draft);
        let snapshot = BalanceSnapshot {
            opening: transaction.opening_balance,
            closing: transaction.closing_balance,
        };
        let at = transaction.created_at;
        transaction.finalize(TransactionStatus::Completed, snapshot, at)?;
        self.reserve_reference(&transaction)?;

        self.locations
            .insert(transaction.id, transaction.account_id);
        journal.push(transaction.clone());
        let mut next = account.clone();
        next.bump_version();
        *stored = next;
        Ok(transaction)
    }

    fn commit_settlement(
        &self,
        account: &Account,
        transaction_id: TransactionId,
        snapshot: BalanceSnapshot,
        at: DateTime<Utc>,
    ) -> Result<Transaction, Error> {
        let account_id = self.locate(transaction_id)?;
        if account_id != account.id() {
            return Err(Error::TransactionNotFound(transaction_id));
        }

        let mut journal = self
            .journals
            .get_mut(&account_id)
            .ok_or(Error::TransactionNotFound(transaction_id))?;
        let mut stored = self
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| not_found(account_id))?;
        Self::check_write(&stored, account)?;

        let position = journal
            .iter()
            .rposition(|t| t.id == transaction_id)
            .ok_or(Error::TransactionNotFound(transaction_id))?;
        let mut transaction = journal[position].clone();
        transaction.finalize(TransactionStatus::Completed, snapshot, at)?;

        journal[position] = transaction.clone();
        let mut next = account.clone();
        next.bump_version();
        *stored = next;
        Ok(transaction)
    }
}
