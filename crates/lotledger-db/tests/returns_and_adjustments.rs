//! Returns, adjustments and purchase receipt rules.

mod common;

use common::*;
use lotledger_core::{
    AdjustmentReason, AdjustmentRequest, CoreError, LedgerEntryType, ReturnRequest,
    ValidationError, MAX_PRICE_CENTS,
};
use lotledger_db::DbError;

fn return_of(sale_line_id: &str, quantity: i64) -> ReturnRequest {
    ReturnRequest {
        sale_line_id: sale_line_id.to_string(),
        quantity,
        reason: "customer changed mind".to_string(),
        actor: ACTOR.to_string(),
    }
}

fn adjust(batch_id: &str, delta: i64, reason: AdjustmentReason) -> AdjustmentRequest {
    AdjustmentRequest {
        batch_id: batch_id.to_string(),
        delta,
        reason,
        note: Some("  shelf count  ".to_string()),
        actor: ACTOR.to_string(),
    }
}

// =============================================================================
// Returns
// =============================================================================

#[tokio::test]
async fn test_return_more_than_sold_is_rejected() {
    let ledger = memory_ledger().await;
    let (x1, _) = receive_x1_x2(&ledger).await;
    let receipt = ledger.submit_sale(sale(2, 80)).await.unwrap();
    let line = &receipt.lines[0];

    let err = ledger.submit_return(return_of(&line.id, 3)).await.unwrap_err();

    assert!(matches!(
        err,
        DbError::Domain(CoreError::ReturnExceedsSoldQuantity {
            sold: 2,
            already_returned: 0,
            requested: 3,
            ..
        })
    ));
    assert_eq!(quantity(&ledger, &x1).await, 8);
    assert_eq!(ledger.returned_quantity(&line.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_partial_returns_accumulate_up_to_sold_quantity() {
    let ledger = memory_ledger().await;
    let (x1, _) = receive_x1_x2(&ledger).await;
    let receipt = ledger.submit_sale(sale(5, 80)).await.unwrap();
    let line = &receipt.lines[0];
    assert_eq!(line.batch_id, x1);

    let first = ledger.submit_return(return_of(&line.id, 2)).await.unwrap();
    assert_eq!(first.batch_id, x1);
    assert_eq!(first.refund_cents, 160);
    assert_eq!(quantity(&ledger, &x1).await, 7);

    let second = ledger.submit_return(return_of(&line.id, 3)).await.unwrap();
    assert_eq!(second.refund_cents, 240);
    assert_eq!(ledger.returned_quantity(&line.id).await.unwrap(), 5);
    assert_eq!(quantity(&ledger, &x1).await, 10);

    let err = ledger.submit_return(return_of(&line.id, 1)).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::ReturnExceedsSoldQuantity {
            already_returned: 5,
            ..
        })
    ));

    let credits: Vec<i64> = ledger
        .query_batch_history(&x1)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.entry_type == LedgerEntryType::Return)
        .map(|e| e.delta)
        .collect();
    assert_eq!(credits, vec![2, 3]);

    let stored = ledger.database().returns().get(&first.return_id).await.unwrap().unwrap();
    assert_eq!(stored.sale_id, receipt.sale_id);
}

#[tokio::test]
async fn test_return_goes_to_the_original_batch_even_if_inactive() {
    let ledger = memory_ledger().await;
    let (x1, _) = receive_x1_x2(&ledger).await;
    let receipt = ledger.submit_sale(sale(10, 80)).await.unwrap();
    let line = &receipt.lines[0];
    assert_eq!(line.batch_id, x1);

    // Empty but not expired: stays active, so deactivate by hand
    let mut conn = ledger.database().pool().acquire().await.unwrap();
    sqlx::query("UPDATE batches SET is_active = 0 WHERE id = ?1")
        .bind(&x1)
        .execute(&mut *conn)
        .await
        .unwrap();
    drop(conn);

    let credit = ledger.submit_return(return_of(&line.id, 4)).await.unwrap();

    assert_eq!(credit.batch_id, x1);
    assert_eq!(quantity(&ledger, &x1).await, 4);
    // Inactive stock is not offered for sale
    let available = ledger.query_available_batches(PRODUCT).await.unwrap();
    assert!(available.iter().all(|b| b.id != x1));
}

#[tokio::test]
async fn test_return_for_unknown_line_is_not_found() {
    let ledger = memory_ledger().await;
    let err = ledger.submit_return(return_of("missing", 1)).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::SaleLineNotFound(_))));
}

// =============================================================================
// Adjustments
// =============================================================================

#[tokio::test]
async fn test_adjustment_records_balance_and_audit() {
    let ledger = memory_ledger().await;
    let (x1, _) = receive_x1_x2(&ledger).await;

    let receipt = ledger
        .submit_adjustment(adjust(&x1, -3, AdjustmentReason::Damage))
        .await
        .unwrap();

    assert_eq!(receipt.balance_after, 7);
    assert_eq!(quantity(&ledger, &x1).await, 7);

    let adjustments = ledger.database().adjustments().list_for_batch(&x1).await.unwrap();
    assert_eq!(adjustments.len(), 1);
    assert_eq!(adjustments[0].reason, AdjustmentReason::Damage);
    assert_eq!(adjustments[0].note.as_deref(), Some("shelf count"));
    assert_eq!(adjustments[0].balance_after, 7);

    let history = ledger.query_batch_history(&x1).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.entry_type, LedgerEntryType::Adjustment);
    assert_eq!(last.reference_id, receipt.adjustment_id);

    let audit = ledger.audit_history("batch", &x1).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert!(audit[0].before_state.as_deref().unwrap().contains("10"));
}

#[tokio::test]
async fn test_adjustment_below_zero_is_rejected() {
    let ledger = memory_ledger().await;
    let (x1, _) = receive_x1_x2(&ledger).await;

    let err = ledger
        .submit_adjustment(adjust(&x1, -11, AdjustmentReason::Theft))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Domain(CoreError::NegativeBalance { .. })));
    assert_eq!(quantity(&ledger, &x1).await, 10);
    assert!(ledger
        .database()
        .adjustments()
        .list_for_batch(&x1)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_adjustment_of_unknown_batch_is_not_found() {
    let ledger = memory_ledger().await;
    let err = ledger
        .submit_adjustment(adjust("missing", 1, AdjustmentReason::Correction))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::BatchNotFound(_))));
}

#[tokio::test]
async fn test_adjustment_with_unbounded_delta_is_rejected() {
    let ledger = memory_ledger().await;
    let (x1, _) = receive_x1_x2(&ledger).await;

    for delta in [i64::MIN, i64::MAX] {
        let err = ledger
            .submit_adjustment(adjust(&x1, delta, AdjustmentReason::Correction))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { ref field, .. })) if field == "delta"
        ));
    }
    assert_eq!(quantity(&ledger, &x1).await, 10);
}

// =============================================================================
// Purchases
// =============================================================================

#[tokio::test]
async fn test_purchase_of_known_lot_tops_up_the_same_batch() {
    let ledger = memory_ledger().await;
    let first = receive(&ledger, vec![lot("L1", date(2024, 4, 1), 10)]).await;
    let second = receive(&ledger, vec![lot("L1", date(2024, 4, 1), 5)]).await;

    assert_eq!(first, second);
    assert_eq!(quantity(&ledger, &first[0]).await, 15);
    assert_eq!(ledger.database().batches().count().await.unwrap(), 1);

    let deltas: Vec<i64> = ledger
        .query_batch_history(&first[0])
        .await
        .unwrap()
        .iter()
        .map(|e| e.delta)
        .collect();
    assert_eq!(deltas, vec![10, 5]);
}

#[tokio::test]
async fn test_purchase_with_conflicting_expiry_is_rejected() {
    let ledger = memory_ledger().await;
    let ids = receive(&ledger, vec![lot("L1", date(2024, 4, 1), 10)]).await;

    let err = ledger
        .submit_purchase(purchase(vec![
            lot("L2", date(2024, 8, 1), 7),
            lot("L1", date(2024, 9, 1), 5),
        ]))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Domain(CoreError::LotMismatch { .. })));
    // Whole purchase rolled back, including the valid first line
    assert_eq!(quantity(&ledger, &ids[0]).await, 10);
    assert_eq!(ledger.database().batches().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_purchase_records_lines_and_audit() {
    let ledger = memory_ledger().await;
    let receipt = ledger
        .submit_purchase(purchase(vec![
            lot("P1", date(2024, 4, 1), 10),
            lot("P2", date(2024, 5, 1), 20),
        ]))
        .await
        .unwrap();

    let purchases = ledger.database().purchases();
    let stored = purchases.get(&receipt.purchase_id).await.unwrap().unwrap();
    assert_eq!(stored.total_cost_cents, 30 * 40);

    let lines = purchases.lines(&receipt.purchase_id).await.unwrap();
    let credited: Vec<&str> = lines.iter().map(|l| l.batch_id.as_str()).collect();
    assert_eq!(credited, vec![receipt.batch_ids[0].as_str(), receipt.batch_ids[1].as_str()]);

    let audit = ledger
        .audit_history("purchase", &receipt.purchase_id)
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
}

#[tokio::test]
async fn test_purchase_with_oversized_cost_is_rejected() {
    let ledger = memory_ledger().await;
    let mut line = lot("BIG", date(2024, 4, 1), 3);
    line.unit_cost_cents = i64::MAX / 2;

    let err = ledger.submit_purchase(purchase(vec![line])).await.unwrap_err();

    assert!(matches!(
        err,
        DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { max, .. })) if max == MAX_PRICE_CENTS
    ));
    assert_eq!(ledger.database().batches().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_restock_at_new_price_keeps_the_batch_mrp() {
    let ledger = memory_ledger().await;
    let ids = receive(&ledger, vec![lot("L1", date(2024, 4, 1), 10)]).await;

    let mut repriced = lot("L1", date(2024, 4, 1), 5);
    repriced.mrp_cents = 120;
    repriced.unit_cost_cents = 55;
    let receipt = ledger.submit_purchase(purchase(vec![repriced])).await.unwrap();
    assert_eq!(receipt.batch_ids, ids);

    let batch = ledger.database().batches().get(&ids[0]).await.unwrap().unwrap();
    assert_eq!(batch.mrp_cents, MRP);
    assert_eq!(batch.unit_cost_cents, 40);
    assert_eq!(batch.quantity_available, 15);

    // The line keeps what was actually paid
    let lines = ledger.database().purchases().lines(&receipt.purchase_id).await.unwrap();
    assert_eq!(lines[0].unit_cost_cents, 55);

    // The ceiling is still the MRP printed on the lot
    let err = ledger.submit_sale(sale(1, 100)).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::PriceExceedsMrp { mrp_cents, .. }) if mrp_cents == MRP));
}
