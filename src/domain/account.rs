use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Effect, Error, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The agent an account belongs to. One account per owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Frozen,
    Blocked,
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccountStatus::Active => f.write_str("Active"),
            AccountStatus::Frozen => f.write_str("Frozen"),
            AccountStatus::Blocked => f.write_str("Blocked"),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "frozen" => Ok(AccountStatus::Frozen),
            "blocked" => Ok(AccountStatus::Blocked),
            other => Err(Error::Ingestion(format!("Invalid account status: {}", other))),
        }
    }
}

/// Wallet of one agent.
///
/// Balance fields are private: `available_balance` and `available_credit` are
/// derived and recomputed after every mutation, so they can only change
/// through the methods below.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    id: AccountId,
    owner_id: OwnerId,
    current_balance: Decimal,
    blocked_balance: Decimal,
    available_balance: Decimal,
    credit_limit: Decimal,
    used_credit: Decimal,
    available_credit: Decimal,
    credit_enabled: bool,
    credit_approved_at: Option<DateTime<Utc>>,
    status: AccountStatus,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(owner_id: OwnerId, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            owner_id,
            current_balance: Decimal::ZERO,
            blocked_balance: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            credit_limit: Decimal::ZERO,
            used_credit: Decimal::ZERO,
            available_credit: Decimal::ZERO,
            credit_enabled: false,
            credit_approved_at: None,
            status: AccountStatus::Active,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    pub fn blocked_balance(&self) -> Decimal {
        self.blocked_balance
    }

    pub fn available_balance(&self) -> Decimal {
        self.available_balance
    }

    pub fn credit_limit(&self) -> Decimal {
        self.credit_limit
    }

    pub fn used_credit(&self) -> Decimal {
        self.used_credit
    }

    pub fn available_credit(&self) -> Decimal {
        self.available_credit
    }

    pub fn credit_enabled(&self) -> bool {
        self.credit_enabled
    }

    pub fn credit_approved_at(&self) -> Option<DateTime<Utc>> {
        self.credit_approved_at
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Rejects new movements unless the account is active or the caller overrides.
    pub fn ensure_movable(&self, admin_override: bool) -> Result<(), Error> {
        match self.status {
            _ if admin_override => Ok(()),
            AccountStatus::Active => Ok(()),
            AccountStatus::Frozen => Err(Error::AccountFrozen(self.id)),
            AccountStatus::Blocked => Err(Error::AccountBlocked(self.id)),
        }
    }

    pub fn apply(&mut self, effect: Effect, amount: Money) -> Result<(), Error> {
        let amount = amount.amount();
        match effect {
            Effect::IncreaseBalance => {
                self.current_balance = self.add_checked(self.current_balance, amount)?;
            }
            Effect::DecreaseBalance => {
                if amount > self.available_balance {
                    return Err(Error::InsufficientFunds {
                        account_id: self.id,
                        requested: amount,
                        available: self.available_balance,
                    });
                }
                self.current_balance -= amount;
            }
            Effect::DrawCredit => {
                if amount > self.available_credit {
                    return Err(Error::CreditLimitExceeded {
                        account_id: self.id,
                        requested: amount,
                        available_credit: self.available_credit,
                    });
                }
                self.used_credit = self.add_checked(self.used_credit, amount)?;
            }
            Effect::RepayCredit => {
                if amount > self.used_credit {
                    return Err(Error::ExcessRepayment {
                        account_id: self.id,
                        requested: amount,
                        used_credit: self.used_credit,
                    });
                }
                self.used_credit -= amount;
            }
        }
        self.sync_available();
        Ok(())
    }

    /// Moves available funds into the blocked balance.
    pub fn hold(&mut self, amount: Money) -> Result<(), Error> {
        let amount = amount.amount();
        if amount > self.available_balance {
            return Err(Error::InsufficientFunds {
                account_id: self.id,
                requested: amount,
                available: self.available_balance,
            });
        }
        self.blocked_balance = self.add_checked(self.blocked_balance, amount)?;
        self.sync_available();
        Ok(())
    }

    pub fn release(&mut self, amount: Money) -> Result<(), Error> {
        let amount = amount.amount();
        if amount > self.blocked_balance {
            return Err(Error::ExcessRelease {
                account_id: self.id,
                requested: amount,
                blocked: self.blocked_balance,
            });
        }
        self.blocked_balance -= amount;
        self.sync_available();
        Ok(())
    }

    pub fn set_credit_limit(&mut self, limit: Decimal, now: DateTime<Utc>) -> Result<(), Error> {
        if limit < Decimal::ZERO || limit < self.used_credit {
            return Err(Error::InvalidLimit {
                limit,
                used_credit: self.used_credit,
            });
        }
        self.credit_limit = limit;
        self.credit_enabled = limit > Decimal::ZERO;
        self.credit_approved_at = Some(now);
        self.sync_available();
        Ok(())
    }

    pub fn set_status(&mut self, status: AccountStatus) {
        self.status = status;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Checked by stores before every write.
    pub fn holds_invariants(&self) -> bool {
        self.current_balance >= Decimal::ZERO
            && self.blocked_balance >= Decimal::ZERO
            && self.blocked_balance <= self.current_balance
            && self.used_credit >= Decimal::ZERO
            && self.used_credit <= self.credit_limit
            && self.available_balance == self.current_balance - self.blocked_balance
            && self.available_credit == self.credit_limit - self.used_credit
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    fn add_checked(&self, balance: Decimal, amount: Decimal) -> Result<Decimal, Error> {
        balance
            .checked_add(amount)
            .ok_or_else(|| Error::AmountOverflow(format!("account {}", self.id)))
    }

    fn sync_available(&mut self) {
        self.available_balance = self.current_balance - self.blocked_balance;
        self.available_credit = self.credit_limit - self.used_credit;
    }
}
