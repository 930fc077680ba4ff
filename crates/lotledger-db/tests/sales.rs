//! Sale flow against an in-memory database.

mod common;

use common::*;
use lotledger_core::{
    Allocation, CoreError, LedgerEntryType, SaleLineRequest, SaleRequest, ValidationError,
};
use lotledger_db::DbError;

#[tokio::test]
async fn test_sale_spans_batches_in_expiry_order() {
    let ledger = memory_ledger().await;
    let (x1, x2) = receive_x1_x2(&ledger).await;

    let receipt = ledger.submit_sale(sale(15, 80)).await.unwrap();

    assert_eq!(
        receipt.allocations(),
        vec![Allocation::new(x1.clone(), 10), Allocation::new(x2.clone(), 5)]
    );
    assert_eq!(quantity(&ledger, &x1).await, 0);
    assert_eq!(quantity(&ledger, &x2).await, 15);

    let x1_sales: Vec<i64> = ledger
        .query_batch_history(&x1)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.entry_type == LedgerEntryType::Sale)
        .map(|e| e.delta)
        .collect();
    let x2_sales: Vec<i64> = ledger
        .query_batch_history(&x2)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.entry_type == LedgerEntryType::Sale)
        .map(|e| e.delta)
        .collect();
    assert_eq!(x1_sales, vec![-10]);
    assert_eq!(x2_sales, vec![-5]);

    // Each sale line references exactly the ledger entry it caused
    for line in &receipt.lines {
        let entries = ledger
            .database()
            .ledger_entries()
            .entries_for_reference(&line.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].delta, -line.quantity);
        assert_eq!(entries[0].batch_id, line.batch_id);
    }
}

#[tokio::test]
async fn test_insufficient_stock_leaves_no_trace() {
    let ledger = memory_ledger().await;
    let (x1, x2) = receive_x1_x2(&ledger).await;
    let entries_before = ledger.database().ledger_entries().count().await.unwrap();

    let err = ledger.submit_sale(sale(35, 80)).await.unwrap_err();

    assert!(matches!(
        err,
        DbError::Domain(CoreError::InsufficientStock {
            available: 30,
            requested: 35,
            ..
        })
    ));
    assert_eq!(quantity(&ledger, &x1).await, 10);
    assert_eq!(quantity(&ledger, &x2).await, 20);
    assert_eq!(
        ledger.database().ledger_entries().count().await.unwrap(),
        entries_before
    );
    assert_eq!(
        ledger.current_invoice_number(&ledger.current_fiscal_year()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_price_above_mrp_is_rejected() {
    let ledger = memory_ledger().await;
    let (x1, _) = receive_x1_x2(&ledger).await;

    let err = ledger.submit_sale(sale(5, 100)).await.unwrap_err();

    match err {
        DbError::Domain(CoreError::PriceExceedsMrp {
            batch_id,
            unit_price_cents,
            mrp_cents,
        }) => {
            assert_eq!(batch_id, x1);
            assert_eq!(unit_price_cents, 100);
            assert_eq!(mrp_cents, MRP);
        }
        other => panic!("expected PriceExceedsMrp, got {other:?}"),
    }
    assert_eq!(quantity(&ledger, &x1).await, 10);
    assert_eq!(ledger.query_batch_history(&x1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failure_on_later_line_rolls_back_earlier_debits() {
    let ledger = memory_ledger().await;
    let (x1, x2) = receive_x1_x2(&ledger).await;
    let ors = receive(&ledger, vec![lot_of("ORS-SACHET", "O1", date(2024, 3, 1), 10)]).await;
    let entries_before = ledger.database().ledger_entries().count().await.unwrap();

    let request = SaleRequest {
        lines: vec![
            SaleLineRequest {
                product_id: PRODUCT.to_string(),
                quantity: 4,
                unit_price_cents: 80,
                tax_rate_bps: 1200,
            },
            SaleLineRequest {
                product_id: "ORS-SACHET".to_string(),
                quantity: 1,
                unit_price_cents: 100,
                tax_rate_bps: 0,
            },
        ],
        customer_ref: None,
        actor: ACTOR.to_string(),
    };

    let err = ledger.submit_sale(request).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::PriceExceedsMrp { ref batch_id, .. }) if *batch_id == ors[0]
    ));

    // The first line's debit was written inside the transaction and undone
    assert_eq!(quantity(&ledger, &x1).await, 10);
    assert_eq!(quantity(&ledger, &x2).await, 20);
    assert_eq!(quantity(&ledger, &ors[0]).await, 10);
    assert_eq!(ledger.query_batch_history(&x1).await.unwrap().len(), 1);
    assert_eq!(
        ledger.database().ledger_entries().count().await.unwrap(),
        entries_before
    );
    assert_eq!(ledger.current_invoice_number("2023-24").await.unwrap(), 0);
    assert!(ledger
        .database()
        .sales()
        .list_for_fiscal_year("2023-24")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_price_equal_to_mrp_is_allowed() {
    let ledger = memory_ledger().await;
    receive_x1_x2(&ledger).await;

    let receipt = ledger.submit_sale(sale(1, MRP)).await.unwrap();
    assert_eq!(receipt.total_cents, MRP);
}

#[tokio::test]
async fn test_expired_batches_are_never_allocated() {
    let ledger = memory_ledger().await;
    let ids = receive(
        &ledger,
        vec![
            lot("OLD", date(2023, 11, 30), 50),
            lot("EDGE", today(), 50),
            lot("GOOD", date(2024, 3, 1), 5),
        ],
    )
    .await;

    let available = ledger.query_available_batches(PRODUCT).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, ids[2]);

    let err = ledger.submit_sale(sale(6, 50)).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InsufficientStock { available: 5, .. })
    ));

    let expired = ledger.list_expired().await.unwrap();
    let expired_ids: Vec<&str> = expired.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(expired_ids, vec![ids[0].as_str(), ids[1].as_str()]);
}

#[tokio::test]
async fn test_invoice_numbers_are_sequential_and_formatted() {
    let ledger = memory_ledger().await;
    receive_x1_x2(&ledger).await;

    let first = ledger.submit_sale(sale(1, 80)).await.unwrap();
    // Rolled back: must not consume a number
    ledger.submit_sale(sale(1_000, 80)).await.unwrap_err();
    let second = ledger.submit_sale(sale(1, 80)).await.unwrap();

    assert_eq!(first.bill_number, "INV-2023-24-000001");
    assert_eq!(second.bill_number, "INV-2023-24-000002");
    assert_eq!(ledger.current_invoice_number("2023-24").await.unwrap(), 2);

    let sales = ledger
        .database()
        .sales()
        .list_for_fiscal_year("2023-24")
        .await
        .unwrap();
    let numbers: Vec<i64> = sales.iter().map(|s| s.sequence_number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn test_multi_line_sale_totals_and_audit() {
    let ledger = memory_ledger().await;
    receive(
        &ledger,
        vec![
            lot("A1", date(2024, 2, 1), 10),
            lot_of("ORS-SACHET", "B1", date(2024, 5, 1), 10),
        ],
    )
    .await;

    let request = SaleRequest {
        lines: vec![
            SaleLineRequest {
                product_id: PRODUCT.to_string(),
                quantity: 2,
                unit_price_cents: 56,
                tax_rate_bps: 1200,
            },
            SaleLineRequest {
                product_id: "ORS-SACHET".to_string(),
                quantity: 1,
                unit_price_cents: 42,
                tax_rate_bps: 0,
            },
        ],
        customer_ref: Some("CUST-9".to_string()),
        actor: ACTOR.to_string(),
    };

    let receipt = ledger.submit_sale(request).await.unwrap();

    // Inclusive pricing: the bill total is what was charged
    assert_eq!(receipt.total_cents, 2 * 56 + 42);
    assert_eq!(receipt.totals.total().cents(), receipt.total_cents);
    assert_eq!(receipt.lines.len(), 2);
    assert_eq!(receipt.lines[1].cgst_cents + receipt.lines[1].sgst_cents, 0);

    let (stored, lines) = ledger.get_sale(&receipt.sale_id).await.unwrap();
    assert_eq!(stored.bill_number, receipt.bill_number);
    assert_eq!(stored.customer_ref.as_deref(), Some("CUST-9"));
    assert_eq!(lines, receipt.lines);

    let audit = ledger.audit_history("sale", &receipt.sale_id).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor, ACTOR);
    assert!(audit[0].after_state.as_deref().unwrap().contains(&receipt.bill_number));
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_any_write() {
    let ledger = memory_ledger().await;
    receive_x1_x2(&ledger).await;

    let mut request = sale(0, 80);
    request.actor = String::new();

    let err = ledger.submit_sale(request.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::Validation(ValidationError::Required { ref field })) if field == "actor"
    ));

    request.actor = ACTOR.to_string();
    let err = ledger.submit_sale(request).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::Validation(ValidationError::MustBePositive { .. }))
    ));
    assert_eq!(ledger.current_invoice_number("2023-24").await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_sale_is_not_found() {
    let ledger = memory_ledger().await;
    let err = ledger.get_sale("missing").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}
