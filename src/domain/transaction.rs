use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountId, Error, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Credit,
    Debit,
    CreditAdjustment,
    DebitAdjustment,
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionCategory {
    Recharge,
    Booking,
    Cancellation,
    Refund,
    Commission,
    Adjustment,
    Fee,
    CreditUsed,
    CreditRepayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    BankTransfer,
    CreditCard,
    DebitCard,
    Upi,
    PaymentGateway,
    Cash,
    Cheque,
    Wallet,
}

/// What a movement does to the account, resolved from its type and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    IncreaseBalance,
    DecreaseBalance,
    DrawCredit,
    RepayCredit,
}

impl Effect {
    pub fn resolve(kind: TransactionType, category: TransactionCategory) -> Self {
        match (category, kind) {
            (TransactionCategory::CreditUsed, _) => Effect::DrawCredit,
            (TransactionCategory::CreditRepayment, _) => Effect::RepayCredit,
            (
                _,
                TransactionType::Credit | TransactionType::CreditAdjustment | TransactionType::Refund,
            ) => Effect::IncreaseBalance,
            (_, TransactionType::Debit | TransactionType::DebitAdjustment) => {
                Effect::DecreaseBalance
            }
        }
    }
}

macro_rules! parse_enum {
    ($ty:ident, $what:literal, { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized: String = s
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
                    .collect::<String>()
                    .to_ascii_lowercase();
                match normalized.as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(Error::Ingestion(format!(concat!("Invalid ", $what, ": {}"), s))),
                }
            }
        }
    };
}

parse_enum!(TransactionType, "transaction type", {
    "credit" => Credit,
    "debit" => Debit,
    "creditadjustment" => CreditAdjustment,
    "debitadjustment" => DebitAdjustment,
    "refund" => Refund,
});

parse_enum!(TransactionCategory, "transaction category", {
    "recharge" => Recharge,
    "booking" => Booking,
    "cancellation" => Cancellation,
    "refund" => Refund,
    "commission" => Commission,
    "adjustment" => Adjustment,
    "fee" => Fee,
    "creditused" => CreditUsed,
    "creditrepayment" => CreditRepayment,
});

parse_enum!(PaymentMethod, "payment method", {
    "banktransfer" => BankTransfer,
    "creditcard" => CreditCard,
    "debitcard" => DebitCard,
    "upi" => Upi,
    "paymentgateway" => PaymentGateway,
    "cash" => Cash,
    "cheque" => Cheque,
    "wallet" => Wallet,
});

/// Intent handed to the ledger engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRequest {
    pub account_id: AccountId,
    pub amount: Money,
    pub kind: TransactionType,
    pub category: TransactionCategory,
    pub payment_method: Option<PaymentMethod>,
    /// Lets an administrator move funds on a frozen or blocked account.
    pub admin_override: bool,
}

impl MovementRequest {
    pub fn new(
        account_id: AccountId,
        amount: Money,
        kind: TransactionType,
        category: TransactionCategory,
    ) -> Self {
        Self {
            account_id,
            amount,
            kind,
            category,
            payment_method: None,
            admin_override: false,
        }
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_admin_override(mut self) -> Self {
        self.admin_override = true;
        self
    }

    pub fn effect(&self) -> Effect {
        Effect::resolve(self.kind, self.category)
    }
}

/// Balances around a commit: `current_balance` before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub opening: Decimal,
    pub closing: Decimal,
}

/// A journal entry before storage gives it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub account_id: AccountId,
    pub reference: String,
    pub kind: TransactionType,
    pub category: TransactionCategory,
    pub amount: Money,
    pub snapshot: BalanceSnapshot,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub reference: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: TransactionCategory,
    pub amount: Money,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub status: TransactionStatus,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn pending(draft: TransactionDraft) -> Self {
        Self {
            id: TransactionId::new(),
            account_id: draft.account_id,
            reference: draft.reference,
            kind: draft.kind,
            category: draft.category,
            amount: draft.amount,
            opening_balance: draft.snapshot.opening,
            closing_balance: draft.snapshot.closing,
            status: TransactionStatus::Pending,
            payment_method: draft.payment_method,
            created_at: draft.created_at,
            completed_at: None,
        }
    }

    /// The single transition out of `Pending`.
    pub fn finalize(
        &mut self,
        status: TransactionStatus,
        snapshot: BalanceSnapshot,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if self.status.is_terminal() {
            return Err(Error::AlreadyFinalized(self.id));
        }
        if !status.is_terminal() {
            return Err(Error::InvalidTransition(self.id, status));
        }
        self.status = status;
        self.opening_balance = snapshot.opening;
        self.closing_balance = snapshot.closing;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn effect(&self) -> Effect {
        Effect::resolve(self.kind, self.category)
    }

    pub fn balance_delta(&self) -> Decimal {
        self.closing_balance - self.opening_balance
    }
}

impl core::fmt::Display for Transaction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:?}/{:?},ref={},account={},amount={},status={:?}",
            self.kind, self.category, self.reference, self.account_id, self.amount, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_decides_credit_line_effects() {
        assert_eq!(
            Effect::resolve(TransactionType::Debit, TransactionCategory::CreditUsed),
            Effect::DrawCredit
        );
        assert_eq!(
            Effect::resolve(
                TransactionType::CreditAdjustment,
                TransactionCategory::CreditUsed
            ),
            Effect::DrawCredit
        );
        assert_eq!(
            Effect::resolve(TransactionType::Credit, TransactionCategory::CreditRepayment),
            Effect::RepayCredit
        );
        assert_eq!(
            Effect::resolve(TransactionType::Refund, TransactionCategory::Cancellation),
            Effect::IncreaseBalance
        );
        assert_eq!(
            Effect::resolve(TransactionType::DebitAdjustment, TransactionCategory::Fee),
            Effect::DecreaseBalance
        );
    }

    #[test]
    fn parses_human_spellings() {
        assert_eq!(
            "Bank Transfer".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!(
            "credit_adjustment".parse::<TransactionType>().unwrap(),
            TransactionType::CreditAdjustment
        );
        assert_eq!(
            "CreditUsed".parse::<TransactionCategory>().unwrap(),
            TransactionCategory::CreditUsed
        );
        assert!("bogus".parse::<TransactionCategory>().is_err());
    }

    #[test]
    fn finalize_happens_once() {
        let draft = TransactionDraft {
            account_id: AccountId::new(),
            reference: "TXN202501150001".to_string(),
            kind: TransactionType::Credit,
            category: TransactionCategory::Recharge,
            amount: Money::from_minor(100).unwrap(),
            snapshot: BalanceSnapshot {
                opening: Decimal::ZERO,
                closing: Decimal::ZERO,
            },
            payment_method: None,
            created_at: Utc::now(),
        };
        let mut tx = Transaction::pending(draft);
        let snapshot = BalanceSnapshot {
            opening: Decimal::ZERO,
            closing: Decimal::ONE,
        };

        assert!(tx.finalize(TransactionStatus::Pending, snapshot, Utc::now()).is_err());
        tx.finalize(TransactionStatus::Completed, snapshot, Utc::now())
            .unwrap();
        assert_eq!(tx.balance_delta(), Decimal::ONE);
        assert!(matches!(
            tx.finalize(TransactionStatus::Failed, snapshot, Utc::now()),
            Err(Error::AlreadyFinalized(_))
        ));
    }
}
