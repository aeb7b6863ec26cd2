// ABOUTME: Credit ledger integration tests - debits, refunds, and balance guards
// ABOUTME: Verifies balances never go negative and unknown members are distinguished
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

mod common;

use boxbook::database::ledger::CreditLedger;
use boxbook::errors::ErrorCode;
use uuid::Uuid;

#[tokio::test]
async fn test_debit_reduces_balance() {
    let db = common::test_db().await;
    let member = common::create_member(&db, "Alice", "member", 5).await;

    let ledger = CreditLedger::new(db.pool().clone());
    ledger.debit(member, 2).await.unwrap();

    assert_eq!(common::credits(&db, member).await, 3);
}

#[tokio::test]
async fn test_debit_fails_closed_on_empty_balance() {
    let db = common::test_db().await;
    let member = common::create_member(&db, "Bob", "member", 1).await;

    let ledger = CreditLedger::new(db.pool().clone());
    let err = ledger.debit(member, 2).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InsufficientCredits);
    assert_eq!(common::credits(&db, member).await, 1);
}

#[tokio::test]
async fn test_debit_unknown_member_is_not_found() {
    let db = common::test_db().await;
    let ledger = CreditLedger::new(db.pool().clone());

    let err = ledger.debit(Uuid::new_v4(), 1).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_refund_returns_new_balance() {
    let db = common::test_db().await;
    let member = common::create_member(&db, "Cara", "member", 0).await;

    let ledger = CreditLedger::new(db.pool().clone());
    let balance = ledger.refund(member, 3).await.unwrap();

    assert_eq!(balance, 3);
    assert_eq!(common::credits(&db, member).await, 3);
}

#[tokio::test]
async fn test_non_positive_amounts_rejected() {
    let db = common::test_db().await;
    let member = common::create_member(&db, "Dan", "member", 5).await;

    let ledger = CreditLedger::new(db.pool().clone());
    assert_eq!(
        ledger.debit(member, 0).await.unwrap_err().code,
        ErrorCode::InvalidInput
    );
    assert_eq!(
        ledger.refund(member, -1).await.unwrap_err().code,
        ErrorCode::InvalidInput
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_debits_of_last_credit() {
    let (db, _dir) = common::file_db().await;
    let member = common::create_member(&db, "Eve", "member", 1).await;

    let l1 = CreditLedger::new(db.pool().clone());
    let l2 = CreditLedger::new(db.pool().clone());
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { l1.debit(member, 1).await }),
        tokio::spawn(async move { l2.debit(member, 1).await }),
    );
    let results = [r1.unwrap(), r2.unwrap()];

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one debit may take the last credit");
    assert_eq!(common::credits(&db, member).await, 0);
}

#[tokio::test]
async fn test_balance_for_unknown_member_is_not_found() {
    let db = common::test_db().await;
    let ledger = CreditLedger::new(db.pool().clone());

    let err = ledger.balance(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}
