use std::io::Write;

use serde::Serialize;

use crate::domain::{Account, AccountStatus, Error};

#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    owner: &'a str,
    current: String,
    blocked: String,
    available: String,
    credit_limit: String,
    used_credit: String,
    available_credit: String,
    status: AccountStatus,
}

impl<'a> From<&'a Account> for AccountRow<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            owner: account.owner_id().as_str(),
            current: format!("{:.2}", account.current_balance()),
            blocked: format!("{:.2}", account.blocked_balance()),
            available: format!("{:.2}", account.available_balance()),
            credit_limit: format!("{:.2}", account.credit_limit()),
            used_credit: format!("{:.2}", account.used_credit()),
            available_credit: format!("{:.2}", account.available_credit()),
            status: account.status(),
        }
    }
}

/// Writes one CSV line per account, in the order given.
pub fn write_accounts<W: Write>(writer: W, accounts: &[Account]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for account in accounts {
        wtr.serialize(AccountRow::from(account))?;
    }
    wtr.flush()?;
    Ok(())
}
