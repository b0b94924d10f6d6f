use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use wallet_ledger::config::{LedgerConfig, QueryConfig};
use wallet_ledger::domain::{
    AccountStatus, Money, MovementRequest, OwnerId, TransactionCategory, TransactionLog,
    TransactionStatus, TransactionType,
};
use wallet_ledger::{InMemoryStorage, LedgerEngine, PageRequest, QueryFacade};

#[derive(Debug, Clone)]
enum Op {
    Move(TransactionType, TransactionCategory, i64),
    Limit(i64),
    Hold(i64),
    Release(i64),
    Status(AccountStatus),
}

fn kind() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Credit),
        Just(TransactionType::Debit),
        Just(TransactionType::CreditAdjustment),
        Just(TransactionType::DebitAdjustment),
        Just(TransactionType::Refund),
    ]
}

fn category() -> impl Strategy<Value = TransactionCategory> {
    prop_oneof![
        Just(TransactionCategory::Recharge),
        Just(TransactionCategory::Booking),
        Just(TransactionCategory::Cancellation),
        Just(TransactionCategory::CreditUsed),
        Just(TransactionCategory::CreditRepayment),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    // amounts in cents
    prop_oneof![
        6 => (kind(), category(), 1i64..50_000).prop_map(|(k, c, a)| Op::Move(k, c, a)),
        1 => (0i64..100_000).prop_map(Op::Limit),
        1 => (1i64..20_000).prop_map(Op::Hold),
        1 => (1i64..20_000).prop_map(Op::Release),
        1 => prop_oneof![
            4 => Just(AccountStatus::Active),
            1 => Just(AccountStatus::Frozen),
        ]
        .prop_map(Op::Status),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_and_balance_is_the_sum_of_completed_deltas(
        ops in prop::collection::vec(op(), 1..60)
    ) {
        let storage = Arc::new(InMemoryStorage::new());
        let engine = LedgerEngine::new(Arc::clone(&storage), LedgerConfig::default());
        let account_id = engine.open_account(&OwnerId::new("agent-1")).unwrap().id();

        for op in ops {
            let before = engine.account(account_id).unwrap();
            let logged = storage.transactions(account_id).len();

            let result = match op {
                Op::Move(kind, category, cents) => {
                    let request = MovementRequest::new(
                        account_id,
                        Money::from_minor(cents).unwrap(),
                        kind,
                        category,
                    );
                    engine.apply_movement(request).map(drop)
                }
                Op::Limit(cents) => engine
                    .set_credit_limit(account_id, Decimal::new(cents, 2))
                    .map(drop),
                Op::Hold(cents) => engine
                    .hold_funds(account_id, Money::from_minor(cents).unwrap())
                    .map(drop),
                Op::Release(cents) => engine
                    .release_funds(account_id, Money::from_minor(cents).unwrap())
                    .map(drop),
                Op::Status(status) => engine.set_status(account_id, status).map(drop),
            };

            let after = engine.account(account_id).unwrap();
            prop_assert!(after.holds_invariants());
            prop_assert!(after.current_balance() >= Decimal::ZERO);
            prop_assert!(after.blocked_balance() <= after.current_balance());
            prop_assert!(after.used_credit() <= after.credit_limit());

            if result.is_err() {
                // rejected operations change nothing
                prop_assert_eq!(&before, &after);
                prop_assert_eq!(storage.transactions(account_id).len(), logged);
            }
        }

        let account = engine.account(account_id).unwrap();
        let journal = storage.transactions(account_id);
        let completed_delta: Decimal = journal
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
            .map(|t| t.balance_delta())
            .sum();
        prop_assert_eq!(completed_delta, account.current_balance());

        // each entry opens where the previous one closed
        for pair in journal.windows(2) {
            prop_assert_eq!(pair[0].closing_balance, pair[1].opening_balance);
        }

        // references are unique and increasing in commit order
        for pair in journal.windows(2) {
            prop_assert!(pair[0].reference < pair[1].reference);
        }
    }

    #[test]
    fn pages_cover_the_journal_exactly_once(count in 0usize..40, limit in 1u32..12) {
        let storage = Arc::new(InMemoryStorage::new());
        let engine = LedgerEngine::new(Arc::clone(&storage), LedgerConfig::default());
        let account_id = engine.open_account(&OwnerId::new("agent-1")).unwrap().id();
        for _ in 0..count {
            engine
                .apply_movement(MovementRequest::new(
                    account_id,
                    Money::from_minor(100).unwrap(),
                    TransactionType::Credit,
                    TransactionCategory::Recharge,
                ))
                .unwrap();
        }

        let query = QueryFacade::new(storage, &QueryConfig::default());
        let first = query
            .list_transactions(account_id, PageRequest::new(1, limit))
            .unwrap();
        prop_assert_eq!(first.total, count);
        prop_assert_eq!(first.total_pages as usize, count.div_ceil(limit as usize));

        let mut seen = Vec::new();
        for page in 1..=first.total_pages.max(1) {
            let items = query
                .list_transactions(account_id, PageRequest::new(page, limit))
                .unwrap()
                .items;
            prop_assert!(items.len() <= limit as usize);
            seen.extend(items.into_iter().map(|t| t.id));
        }
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), count);
    }
}
