use rust_decimal::Decimal;

use crate::domain::{
    AccountStatus, Money, OwnerId, PaymentMethod, TransactionCategory, TransactionType,
};

/// One row of a batch file, addressed by owner rather than account id.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    OpenAccount {
        owner: OwnerId,
    },
    Movement {
        owner: OwnerId,
        amount: Money,
        kind: TransactionType,
        category: TransactionCategory,
        payment_method: Option<PaymentMethod>,
    },
    SetCreditLimit {
        owner: OwnerId,
        limit: Decimal,
    },
    SetStatus {
        owner: OwnerId,
        status: AccountStatus,
    },
    HoldFunds {
        owner: OwnerId,
        amount: Money,
    },
    ReleaseFunds {
        owner: OwnerId,
        amount: Money,
    },
}

impl Command {
    pub fn owner(&self) -> &OwnerId {
        match self {
            Command::OpenAccount { owner }
            | Command::Movement { owner, .. }
            | Command::SetCreditLimit { owner, .. }
            | Command::SetStatus { owner, .. }
            | Command::HoldFunds { owner, .. }
            | Command::ReleaseFunds { owner, .. } => owner,
        }
    }
}
