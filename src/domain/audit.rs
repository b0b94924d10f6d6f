use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditAction {
    AccountOpened,
    Movement,
    MovementInitiated,
    MovementFailed,
    CreditLimitChanged,
    StatusChanged,
    FundsHeld,
    FundsReleased,
}

/// Old and new values of one committed change, as plain strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub account_id: AccountId,
    pub action: AuditAction,
    pub old_value: String,
    pub new_value: String,
    pub at: DateTime<Utc>,
}
