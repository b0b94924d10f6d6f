use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info};

use crate::domain::{
    AccountId, Clock, Command, CommandStream, DeadLetterQueue, Error, LedgerStorage,
    MovementRequest, OwnerId,
};
use crate::engine::LedgerEngine;

/// Counts of one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub applied: usize,
    pub rejected: usize,
}

/// Drains a command stream into the ledger, sending every failure to the DLQ.
pub struct Processor<I, D, S, C>
where
    I: CommandStream,
    D: DeadLetterQueue,
    S: LedgerStorage,
    C: Clock,
{
    ingestion: I,
    dlq: D,
    engine: Arc<LedgerEngine<S, C>>,
}

impl<I, D, S, C> Processor<I, D, S, C>
where
    I: CommandStream,
    D: DeadLetterQueue,
    S: LedgerStorage,
    C: Clock,
{
    pub fn new(ingestion: I, dlq: D, engine: Arc<LedgerEngine<S, C>>) -> Self {
        Self {
            ingestion,
            dlq,
            engine,
        }
    }

    pub fn dlq(&self) -> &D {
        &self.dlq
    }

    pub async fn process(&mut self) -> Result<BatchStats, Error> {
        let mut stats = BatchStats::default();
        let mut commands = self.ingestion.stream();

        while let Some(command) = commands.next().await {
            match command.and_then(|command| self.execute(command)) {
                Ok(()) => stats.applied += 1,
                Err(e) => {
                    stats.rejected += 1;
                    self.dlq.report(&e);
                }
            }
        }

        info!(applied = stats.applied, rejected = stats.rejected, "batch processed");
        Ok(stats)
    }

    fn execute(&self, command: Command) -> Result<(), Error> {
        debug!(owner = %command.owner(), "executing {:?}", command);

        match command {
            Command::OpenAccount { owner } => self.engine.open_account(&owner).map(drop),
            Command::Movement {
                owner,
                amount,
                kind,
                category,
                payment_method,
            } => {
                let mut request =
                    MovementRequest::new(self.resolve(&owner)?, amount, kind, category);
                if let Some(method) = payment_method {
                    request = request.with_payment_method(method);
                }
                self.engine.apply_movement(request).map(drop)
            }
            Command::SetCreditLimit { owner, limit } => self
                .engine
                .set_credit_limit(self.resolve(&owner)?, limit)
                .map(drop),
            Command::SetStatus { owner, status } => self
                .engine
                .set_status(self.resolve(&owner)?, status)
                .map(drop),
            Command::HoldFunds { owner, amount } => self
                .engine
                .hold_funds(self.resolve(&owner)?, amount)
                .map(drop),
            Command::ReleaseFunds { owner, amount } => self
                .engine
                .release_funds(self.resolve(&owner)?, amount)
                .map(drop),
        }
    }

    fn resolve(&self, owner: &OwnerId) -> Result<AccountId, Error> {
        Ok(self.engine.account_by_owner(owner)?.id())
    }
}
