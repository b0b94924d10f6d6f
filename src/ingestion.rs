use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::traits::CommandStream;
use crate::domain::{
    AccountStatus, Command, Error, Money, OwnerId, PaymentMethod, TransactionCategory,
    TransactionType,
};

pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Self {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Self { reader: Some(rdr) }
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    op: String,
    owner: String,
    amount: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    category: Option<String>,
    method: Option<String>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required_amount(row: &CsvRow) -> Result<Money, Error> {
    let raw = non_empty(&row.amount)
        .ok_or_else(|| Error::Ingestion(format!("{} for {} needs an amount", row.op, row.owner)))?;
    Money::from_decimal_str(raw)
}

impl TryFrom<CsvRow> for Command {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        if row.owner.is_empty() {
            return Err(Error::Ingestion(format!("{} without owner", row.op)));
        }
        let owner = OwnerId::new(row.owner.clone());
        let payment_method = non_empty(&row.method)
            .map(str::parse::<PaymentMethod>)
            .transpose()?;

        let command = match row.op.to_ascii_lowercase().as_str() {
            "open" => Command::OpenAccount { owner },
            "credit" => Command::Movement {
                owner,
                amount: required_amount(&row)?,
                kind: TransactionType::Credit,
                category: parse_or(&row.category, TransactionCategory::Recharge)?,
                payment_method,
            },
            "debit" => Command::Movement {
                owner,
                amount: required_amount(&row)?,
                kind: TransactionType::Debit,
                category: parse_or(&row.category, TransactionCategory::Booking)?,
                payment_method,
            },
            "movement" => {
                let kind = non_empty(&row.kind)
                    .ok_or_else(|| Error::Ingestion("movement without type".to_string()))?
                    .parse::<TransactionType>()?;
                let category = non_empty(&row.category)
                    .ok_or_else(|| Error::Ingestion("movement without category".to_string()))?
                    .parse::<TransactionCategory>()?;
                Command::Movement {
                    owner,
                    amount: required_amount(&row)?,
                    kind,
                    category,
                    payment_method,
                }
            }
            "limit" => {
                let raw = non_empty(&row.amount)
                    .ok_or_else(|| Error::Ingestion("limit without amount".to_string()))?;
                let limit = raw
                    .parse::<Decimal>()
                    .map_err(|_| Error::InvalidAmount(raw.to_string()))?;
                Command::SetCreditLimit { owner, limit }
            }
            "freeze" => Command::SetStatus {
                owner,
                status: AccountStatus::Frozen,
            },
            "block" => Command::SetStatus {
                owner,
                status: AccountStatus::Blocked,
            },
            "activate" => Command::SetStatus {
                owner,
                status: AccountStatus::Active,
            },
            "hold" => Command::HoldFunds {
                owner,
                amount: required_amount(&row)?,
            },
            "release" => Command::ReleaseFunds {
                owner,
                amount: required_amount(&row)?,
            },
            other => {
                return Err(Error::Ingestion(format!("Invalid operation: {}", other)));
            }
        };

        Ok(command)
    }
}

fn parse_or<T>(field: &Option<String>, default: T) -> Result<T, Error>
where
    T: std::str::FromStr<Err = Error>,
{
    non_empty(field).map_or(Ok(default), str::parse)
}

impl<R: Read + Send + 'static> CommandStream for CsvReader<R> {
    type CmdStream = Pin<Box<dyn Stream<Item = Result<Command, Error>> + Send>>;

    fn stream(&mut self) -> Self::CmdStream {
        // Take ownership of the reader so the iterator we build owns all data and is 'static.
        let Some(reader) = self.reader.take() else {
            // Already consumed; return an empty stream.
            return Box::pin(stream::empty::<Result<Command, Error>>());
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => Command::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}
