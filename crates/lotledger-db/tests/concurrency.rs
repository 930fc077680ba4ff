//! Concurrent writers on a file-backed database with a real pool.

mod common;

use std::collections::HashSet;

use common::*;
use lotledger_core::CoreError;
use lotledger_db::DbError;
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sales_of_one_batch_never_oversell() {
    let dir = TempDir::new().unwrap();
    let ledger = file_ledger(&dir.path().join("ledger.db")).await;
    let ids = receive(&ledger, vec![lot("X1", date(2024, 1, 1), 10)]).await;

    let (a, b) = tokio::join!(
        ledger.submit_sale(sale(6, 80)),
        ledger.submit_sale(sale(6, 80))
    );

    let outcomes = [a, b];
    let committed = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1);

    let failure = outcomes.into_iter().find_map(Result::err).unwrap();
    assert!(
        matches!(
            failure,
            DbError::Domain(CoreError::InsufficientStock {
                available: 4,
                requested: 6,
                ..
            })
        ),
        "unexpected failure: {failure:?}"
    );

    assert_eq!(quantity(&ledger, &ids[0]).await, 4);
    let report = ledger.reconcile_batch(&ids[0]).await.unwrap();
    assert!(report.is_consistent());
    assert!(ledger
        .query_batch_history(&ids[0])
        .await
        .unwrap()
        .iter()
        .all(|e| e.balance_after >= 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sales_get_unique_increasing_bill_numbers() {
    let dir = TempDir::new().unwrap();
    let ledger = file_ledger(&dir.path().join("ledger.db")).await;
    receive(&ledger, vec![lot("BULK", date(2024, 6, 1), 500)]).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            let mut bills = Vec::new();
            for _ in 0..5 {
                bills.push(ledger.submit_sale(sale(1, 80)).await.unwrap().bill_number);
            }
            bills
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    let unique: HashSet<&String> = all.iter().collect();
    assert_eq!(unique.len(), 40);
    assert_eq!(ledger.current_invoice_number("2023-24").await.unwrap(), 40);

    let numbers: Vec<i64> = ledger
        .database()
        .sales()
        .list_for_fiscal_year("2023-24")
        .await
        .unwrap()
        .iter()
        .map(|s| s.sequence_number)
        .collect();
    assert_eq!(numbers, (1..=40).collect::<Vec<i64>>());

    let remaining = ledger.query_available_batches(PRODUCT).await.unwrap();
    assert_eq!(remaining[0].quantity_available, 460);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_disjoint_batches_all_commit() {
    let dir = TempDir::new().unwrap();
    let ledger = file_ledger(&dir.path().join("ledger.db")).await;
    let ids = receive(
        &ledger,
        vec![
            lot_of("P-A", "A1", date(2024, 6, 1), 50),
            lot_of("P-B", "B1", date(2024, 6, 1), 50),
        ],
    )
    .await;

    let adjust = |batch_id: String| {
        let ledger = ledger.clone();
        async move {
            ledger
                .submit_adjustment(lotledger_core::AdjustmentRequest {
                    batch_id,
                    delta: -1,
                    reason: lotledger_core::AdjustmentReason::Damage,
                    note: None,
                    actor: ACTOR.to_string(),
                })
                .await
        }
    };

    let mut handles = Vec::new();
    for n in 0..20 {
        handles.push(tokio::spawn(adjust(ids[n % 2].clone())));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(quantity(&ledger, &ids[0]).await, 40);
    assert_eq!(quantity(&ledger, &ids[1]).await, 40);
    assert!(ledger
        .reconcile_all()
        .await
        .unwrap()
        .iter()
        .all(|r| r.is_consistent()));
}
