use chrono::NaiveDate;
use dashmap::DashMap;

use crate::domain::{Error, TransactionLog};

/// Hands out `{prefix}{YYYYMMDD}{sequence}` references.
///
/// Each `prefix+date` stem owns a counter; the map's entry lock serializes
/// callers on the same stem, so two calls can never see the same value. A
/// stem seen for the first time continues from the highest reference already
/// stored for it.
#[derive(Debug)]
pub struct ReferenceGenerator {
    width: usize,
    counters: DashMap<String, u32>,
}

impl ReferenceGenerator {
    pub const DEFAULT_WIDTH: usize = 4;

    pub fn new(width: usize) -> Self {
        Self {
            width,
            counters: DashMap::new(),
        }
    }

    pub fn max_sequence(&self) -> u32 {
        // width is validated to 1..=9 by the config, so this fits in u32
        10u32.saturating_pow(self.width as u32).saturating_sub(1)
    }

    pub fn next<L>(&self, prefix: &str, scope_date: NaiveDate, source: &L) -> Result<String, Error>
    where
        L: TransactionLog + ?Sized,
    {
        let stem = format!("{}{}", prefix, scope_date.format("%Y%m%d"));

        let mut counter = self
            .counters
            .entry(stem.clone())
            .or_insert_with(|| {
                source
                    .last_reference(&stem)
                    .and_then(|reference| parse_sequence(&reference, &stem))
                    .unwrap_or(0)
            });

        let next = *counter + 1;
        if next > self.max_sequence() {
            return Err(Error::ReferenceExhausted {
                prefix: prefix.to_string(),
                date: scope_date,
            });
        }
        *counter = next;

        Ok(format!("{}{:0width$}", stem, next, width = self.width))
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH)
    }
}

fn parse_sequence(reference: &str, stem: &str) -> Option<u32> {
    reference.strip_prefix(stem)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountStore, OwnerId};
    use crate::store::InMemoryStorage;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn sequence_is_padded_and_increasing() {
        let store = InMemoryStorage::new();
        let generator = ReferenceGenerator::default();

        assert_eq!(generator.next("TXN", day(15), &store).unwrap(), "TXN202501150001");
        assert_eq!(generator.next("TXN", day(15), &store).unwrap(), "TXN202501150002");
        // prefixes count independently
        assert_eq!(generator.next("HTB", day(15), &store).unwrap(), "HTB202501150001");
    }

    #[test]
    fn day_boundary_resets_sequence() {
        let store = InMemoryStorage::new();
        let generator = ReferenceGenerator::default();

        generator.next("TXN", day(15), &store).unwrap();
        generator.next("TXN", day(15), &store).unwrap();
        assert_eq!(generator.next("TXN", day(16), &store).unwrap(), "TXN202501160001");
    }

    #[test]
    fn cold_stem_continues_from_storage() {
        let store = InMemoryStorage::new();
        let account = store
            .create_account(&OwnerId::new("agent-1"), Utc::now())
            .unwrap();
        store
            .append(crate::domain::TransactionDraft {
                account_id: account.id(),
                reference: "TXN202501150041".to_string(),
                kind: crate::domain::TransactionType::Credit,
                category: crate::domain::TransactionCategory::Recharge,
                amount: crate::domain::Money::from_minor(100).unwrap(),
                snapshot: crate::domain::BalanceSnapshot {
                    opening: rust_decimal::Decimal::ZERO,
                    closing: rust_decimal::Decimal::ZERO,
                },
                payment_method: None,
                created_at: Utc::now(),
            })
            .unwrap();

        let generator = ReferenceGenerator::default();
        assert_eq!(generator.next("TXN", day(15), &store).unwrap(), "TXN202501150042");
    }

    #[test]
    fn exhausted_sequence_is_an_error() {
        let store = InMemoryStorage::new();
        let generator = ReferenceGenerator::new(1);
        for _ in 0..9 {
            generator.next("TXN", day(15), &store).unwrap();
        }
        assert!(matches!(
            generator.next("TXN", day(15), &store),
            Err(Error::ReferenceExhausted { .. })
        ));
    }

    #[test]
    fn concurrent_calls_never_collide() {
        let store = Arc::new(InMemoryStorage::new());
        let generator = Arc::new(ReferenceGenerator::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| generator.next("TXN", day(15), store.as_ref()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for reference in handle.join().unwrap() {
                assert!(seen.insert(reference));
            }
        }
        assert_eq!(seen.len(), 800);
        assert!(seen.contains("TXN202501150800"));
    }
}
