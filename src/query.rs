use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::QueryConfig;
use crate::domain::{
    Account, AccountId, AccountStatus, AccountStore, Effect, Error, OwnerId, Transaction,
    TransactionCategory, TransactionLog, TransactionStatus,
};

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, total: usize, request: PageRequest) -> Self {
        let total_pages = total.div_ceil(request.limit as usize) as u32;
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages,
        }
    }
}

/// Per-account dashboard figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub completed: usize,
    pub pending: usize,
    pub failed: usize,
    /// Completed amounts by category.
    pub totals_by_category: BTreeMap<TransactionCategory, Decimal>,
    pub total_credited: Decimal,
    pub total_debited: Decimal,
    /// Sum of completed balance deltas; equals the current balance.
    pub net_balance_delta: Decimal,
}

/// Figures across all accounts, for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerOverview {
    pub total_accounts: usize,
    pub active_accounts: usize,
    pub frozen_accounts: usize,
    pub blocked_accounts: usize,
    pub total_balance: Decimal,
    pub total_blocked: Decimal,
    pub total_credit_limit: Decimal,
    pub total_used_credit: Decimal,
}

/// Read-only access to accounts and journals. Never takes an account lock.
#[derive(Debug)]
pub struct QueryFacade<S> {
    storage: Arc<S>,
    default_limit: u32,
    max_limit: u32,
}

impl<S> QueryFacade<S>
where
    S: AccountStore + TransactionLog,
{
    pub fn new(storage: Arc<S>, config: &QueryConfig) -> Self {
        Self {
            storage,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    /// Page request with the configured default page size.
    pub fn first_page(&self) -> PageRequest {
        PageRequest::new(1, self.default_limit)
    }

    pub fn account(&self, account_id: AccountId) -> Result<Account, Error> {
        self.storage.get_account(account_id)
    }

    pub fn account_by_owner(&self, owner_id: &OwnerId) -> Result<Account, Error> {
        self.storage.find_by_owner(owner_id)
    }

    pub fn list_transactions(
        &self,
        account_id: AccountId,
        request: PageRequest,
    ) -> Result<Page<Transaction>, Error> {
        let request = self.normalize(request)?;
        // unknown accounts are an error, not an empty page
        self.storage.get_account(account_id)?;

        let offset = (request.page as usize - 1) * request.limit as usize;
        let (items, total) = self
            .storage
            .list(account_id, offset, request.limit as usize);
        debug!(account_id = %account_id, page = request.page, total, "listed transactions");
        Ok(Page::new(items, total, request))
    }

    /// Newest accounts first, optionally only those in `status`.
    pub fn list_accounts(
        &self,
        status: Option<AccountStatus>,
        request: PageRequest,
    ) -> Result<Page<Account>, Error> {
        let request = self.normalize(request)?;

        let mut accounts: Vec<Account> = self
            .storage
            .list_accounts()
            .into_iter()
            .filter(|account| status.is_none_or(|s| account.status() == s))
            .collect();
        accounts.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let total = accounts.len();
        let offset = (request.page as usize - 1) * request.limit as usize;
        let items = accounts
            .into_iter()
            .skip(offset)
            .take(request.limit as usize)
            .collect();
        Ok(Page::new(items, total, request))
    }

    pub fn account_summary(&self, account_id: AccountId) -> Result<AccountSummary, Error> {
        self.storage.get_account(account_id)?;

        let mut summary = AccountSummary {
            account_id,
            completed: 0,
            pending: 0,
            failed: 0,
            totals_by_category: BTreeMap::new(),
            total_credited: Decimal::ZERO,
            total_debited: Decimal::ZERO,
            net_balance_delta: Decimal::ZERO,
        };

        for transaction in self.storage.transactions(account_id) {
            match transaction.status {
                TransactionStatus::Pending => summary.pending += 1,
                TransactionStatus::Failed => summary.failed += 1,
                TransactionStatus::Completed => {
                    let amount = transaction.amount.amount();
                    summary.completed += 1;
                    let by_category = summary
                        .totals_by_category
                        .entry(transaction.category)
                        .or_insert(Decimal::ZERO);
                    *by_category = sum(*by_category, amount, "totals_by_category")?;
                    match transaction.effect() {
                        Effect::IncreaseBalance => {
                            summary.total_credited =
                                sum(summary.total_credited, amount, "total_credited")?
                        }
                        Effect::DecreaseBalance => {
                            summary.total_debited =
                                sum(summary.total_debited, amount, "total_debited")?
                        }
                        Effect::DrawCredit | Effect::RepayCredit => {}
                    }
                    summary.net_balance_delta = sum(
                        summary.net_balance_delta,
                        transaction.balance_delta(),
                        "net_balance_delta",
                    )?;
                }
            }
        }

        Ok(summary)
    }

    pub fn overview(&self) -> Result<LedgerOverview, Error> {
        self.storage
            .list_accounts()
            .iter()
            .try_fold(LedgerOverview::default(), |mut overview, account| {
                overview.total_accounts += 1;
                match account.status() {
                    AccountStatus::Active => overview.active_accounts += 1,
                    AccountStatus::Frozen => overview.frozen_accounts += 1,
                    AccountStatus::Blocked => overview.blocked_accounts += 1,
                }
                overview.total_balance =
                    sum(overview.total_balance, account.current_balance(), "total_balance")?;
                overview.total_blocked =
                    sum(overview.total_blocked, account.blocked_balance(), "total_blocked")?;
                overview.total_credit_limit = sum(
                    overview.total_credit_limit,
                    account.credit_limit(),
                    "total_credit_limit",
                )?;
                overview.total_used_credit = sum(
                    overview.total_used_credit,
                    account.used_credit(),
                    "total_used_credit",
                )?;
                Ok(overview)
            })
    }

    /// All accounts ordered by owner, for exports.
    pub fn all_accounts(&self) -> Vec<Account> {
        let mut accounts = self.storage.list_accounts();
        accounts.sort_by(|a, b| a.owner_id().cmp(b.owner_id()));
        accounts
    }

    fn normalize(&self, request: PageRequest) -> Result<PageRequest, Error> {
        if request.page == 0 || request.limit == 0 {
            return Err(Error::InvalidPage {
                page: request.page,
                limit: request.limit,
            });
        }
        Ok(PageRequest {
            page: request.page,
            limit: request.limit.min(self.max_limit),
        })
    }
}

fn sum(total: Decimal, amount: Decimal, field: &str) -> Result<Decimal, Error> {
    total
        .checked_add(amount)
        .ok_or_else(|| Error::AmountOverflow(field.to_string()))
}
