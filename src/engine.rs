use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::audit::TracingAuditSink;
use crate::clock::SystemClock;
use crate::config::LedgerConfig;
use crate::domain::{
    Account, AccountId, AccountStatus, AuditAction, AuditEvent, AuditSink, BalanceSnapshot, Clock,
    Error, LedgerStorage, Money, MovementRequest, OwnerId, Transaction, TransactionDraft,
    TransactionId, TransactionStatus,
};
use crate::reference::ReferenceGenerator;

/// One mutex per account. Movements on different accounts never share one.
#[derive(Default, Debug)]
struct AccountLocks {
    inner: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    fn get(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        Arc::clone(&self.inner.entry(account_id).or_default())
    }
}

/// Validates and applies balance movements.
///
/// Every write to an account happens under that account's lock, reading the
/// current state after the lock is taken. Storage adds a version check under
/// that, so a writer that bypasses the engine still cannot clobber a
/// committed movement.
pub struct LedgerEngine<S, C = SystemClock>
where
    S: LedgerStorage,
    C: Clock,
{
    storage: Arc<S>,
    clock: C,
    references: ReferenceGenerator,
    locks: AccountLocks,
    audit: Arc<dyn AuditSink>,
    config: LedgerConfig,
}

impl<S> LedgerEngine<S, SystemClock>
where
    S: LedgerStorage,
{
    pub fn new(storage: Arc<S>, config: LedgerConfig) -> Self {
        Self::with_clock(storage, SystemClock, config)
    }
}

impl<S, C> LedgerEngine<S, C>
where
    S: LedgerStorage,
    C: Clock,
{
    pub fn with_clock(storage: Arc<S>, clock: C, config: LedgerConfig) -> Self {
        Self {
            storage,
            clock,
            references: ReferenceGenerator::new(config.sequence_width),
            locks: AccountLocks::default(),
            audit: Arc::new(TracingAuditSink),
            config,
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Creates the zero-balance account of a newly registered owner.
    pub fn open_account(&self, owner_id: &OwnerId) -> Result<Account, Error> {
        let now = self.clock.now();
        let account = self.storage.create_account(owner_id, now)?;

        info!(account_id = %account.id(), owner = %owner_id, "account opened");
        self.record(
            account.id(),
            AuditAction::AccountOpened,
            String::new(),
            describe(&account),
            now,
        );
        Ok(account)
    }

    pub fn account(&self, account_id: AccountId) -> Result<Account, Error> {
        debug!(account_id = %account_id, "loading account");
        self.storage.get_account(account_id)
    }

    pub fn account_by_owner(&self, owner_id: &OwnerId) -> Result<Account, Error> {
        debug!(owner = %owner_id, "loading account by owner");
        self.storage.find_by_owner(owner_id)
    }

    /// Applies one movement and returns its completed transaction.
    ///
    /// On any error neither the account nor the transaction log has changed.
    pub fn apply_movement(&self, request: MovementRequest) -> Result<Transaction, Error> {
        self.serialized(request.account_id, || {
            let current = self.storage.get_account(request.account_id)?;
            current.ensure_movable(request.admin_override)?;

            let now = self.clock.now();
            let mut next = current.clone();
            next.apply(request.effect(), request.amount)?;
            next.touch(now);

            let reference = self.next_reference(&self.config.transaction_prefix, now)?;
            let draft = TransactionDraft {
                account_id: current.id(),
                reference,
                kind: request.kind,
                category: request.category,
                amount: request.amount,
                snapshot: BalanceSnapshot {
                    opening: current.current_balance(),
                    closing: next.current_balance(),
                },
                payment_method: request.payment_method,
                created_at: now,
            };
            let transaction = self.storage.commit_movement(&next, draft)?;

            info!(
                account_id = %current.id(),
                reference = %transaction.reference,
                kind = ?transaction.kind,
                category = ?transaction.category,
                amount = %transaction.amount,
                closing_balance = %transaction.closing_balance,
                "movement committed"
            );
            self.record(
                current.id(),
                AuditAction::Movement,
                describe(&current),
                describe(&next),
                now,
            );
            Ok(transaction)
        })
        .inspect_err(|e| debug!(account_id = %request.account_id, error = %e, "movement rejected"))
    }

    /// Records a movement as `Pending` without touching balances.
    pub fn initiate_movement(&self, request: MovementRequest) -> Result<Transaction, Error> {
        self.serialized(request.account_id, || {
            let current = self.storage.get_account(request.account_id)?;
            current.ensure_movable(request.admin_override)?;

            let now = self.clock.now();
            let reference = self.next_reference(&self.config.transaction_prefix, now)?;
            let balance = current.current_balance();
            let pending = self.storage.append(TransactionDraft {
                account_id: current.id(),
                reference,
                kind: request.kind,
                category: request.category,
                amount: request.amount,
                snapshot: BalanceSnapshot {
                    opening: balance,
                    closing: balance,
                },
                payment_method: request.payment_method,
                created_at: now,
            })?;

            info!(account_id = %current.id(), reference = %pending.reference, "movement initiated");
            self.record(
                current.id(),
                AuditAction::MovementInitiated,
                String::new(),
                pending.reference.clone(),
                now,
            );
            Ok(pending)
        })
    }

    /// Applies a pending movement and completes it. A rejected settlement stays `Pending`.
    pub fn settle_movement(&self, transaction_id: TransactionId) -> Result<Transaction, Error> {
        let account_id = self.storage.get_transaction(transaction_id)?.account_id;

        self.serialized(account_id, || {
            let pending = self.storage.get_transaction(transaction_id)?;
            if pending.status.is_terminal() {
                return Err(Error::AlreadyFinalized(transaction_id));
            }

            let current = self.storage.get_account(account_id)?;
            current.ensure_movable(false)?;

            let now = self.clock.now();
            let mut next = current.clone();
            next.apply(pending.effect(), pending.amount)?;
            next.touch(now);

            let snapshot = BalanceSnapshot {
                opening: current.current_balance(),
                closing: next.current_balance(),
            };
            let settled = self
                .storage
                .commit_settlement(&next, transaction_id, snapshot, now)?;

            info!(account_id = %account_id, reference = %settled.reference, "movement settled");
            self.record(
                account_id,
                AuditAction::Movement,
                describe(&current),
                describe(&next),
                now,
            );
            Ok(settled)
        })
    }

    pub fn fail_movement(&self, transaction_id: TransactionId) -> Result<Transaction, Error> {
        let account_id = self.storage.get_transaction(transaction_id)?.account_id;

        self.serialized(account_id, || {
            let balance = self.storage.get_account(account_id)?.current_balance();
            let now = self.clock.now();
            let failed = self.storage.finalize(
                transaction_id,
                TransactionStatus::Failed,
                BalanceSnapshot {
                    opening: balance,
                    closing: balance,
                },
                now,
            )?;

            info!(account_id = %account_id, reference = %failed.reference, "movement failed");
            self.record(
                account_id,
                AuditAction::MovementFailed,
                format!("{:?}", TransactionStatus::Pending),
                format!("{:?}", failed.status),
                now,
            );
            Ok(failed)
        })
    }

    /// Administrative; creates no transaction.
    pub fn set_credit_limit(&self, account_id: AccountId, limit: Decimal) -> Result<Account, Error> {
        self.administer(account_id, AuditAction::CreditLimitChanged, |account, now| {
            account.set_credit_limit(limit, now)
        })
    }

    pub fn set_status(&self, account_id: AccountId, status: AccountStatus) -> Result<Account, Error> {
        self.administer(account_id, AuditAction::StatusChanged, |account, _| {
            account.set_status(status);
            Ok(())
        })
    }

    pub fn hold_funds(&self, account_id: AccountId, amount: Money) -> Result<Account, Error> {
        self.administer(account_id, AuditAction::FundsHeld, |account, _| {
            account.hold(amount)
        })
    }

    pub fn release_funds(&self, account_id: AccountId, amount: Money) -> Result<Account, Error> {
        self.administer(account_id, AuditAction::FundsReleased, |account, _| {
            account.release(amount)
        })
    }

    pub fn booking_reference(&self) -> Result<String, Error> {
        self.next_reference(&self.config.booking_prefix, self.clock.now())
    }

    fn administer(
        &self,
        account_id: AccountId,
        action: AuditAction,
        change: impl FnOnce(&mut Account, DateTime<Utc>) -> Result<(), Error>,
    ) -> Result<Account, Error> {
        self.serialized(account_id, || {
            let current = self.storage.get_account(account_id)?;
            let now = self.clock.now();
            let mut next = current.clone();
            change(&mut next, now)?;
            next.touch(now);
            let saved = self.storage.update_account(&next)?;

            info!(account_id = %account_id, action = ?action, "account updated");
            self.record(account_id, action, describe(&current), describe(&saved), now);
            Ok(saved)
        })
    }

    fn serialized<T>(
        &self,
        account_id: AccountId,
        op: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let lock = self.locks.get(account_id);
        let _guard = lock
            .try_lock_for(self.config.lock_timeout())
            .ok_or(Error::Contention(account_id))?;
        op()
    }

    fn next_reference(&self, prefix: &str, now: DateTime<Utc>) -> Result<String, Error> {
        self.references
            .next(prefix, now.date_naive(), self.storage.as_ref())
    }

    fn record(
        &self,
        account_id: AccountId,
        action: AuditAction,
        old_value: String,
        new_value: String,
        at: DateTime<Utc>,
    ) {
        self.audit.record(AuditEvent {
            account_id,
            action,
            old_value,
            new_value,
            at,
        });
    }
}

fn describe(account: &Account) -> String {
    format!(
        "status={} current={} blocked={} credit_limit={} used_credit={}",
        account.status(),
        account.current_balance(),
        account.blocked_balance(),
        account.credit_limit(),
        account.used_credit()
    )
}
