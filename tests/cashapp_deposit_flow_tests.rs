mod common;

use cashier_backend::{
    entities::{deposit_transactions, prelude::*, reports, users},
    errors::ErrorKind,
    models::deposit::{AmountInput, CheckCashappDepositRequest, SendCashappDepositRequest},
    services::{deposit_creator, deposit_verifier},
};
use common::*;
use sea_orm::{EntityTrait, PaginatorTrait};

fn cashapp_request(amount: f64) -> SendCashappDepositRequest {
    SendCashappDepositRequest {
        amount: Some(AmountInput::Number(amount)),
    }
}

fn check_request(payment_id: &str) -> CheckCashappDepositRequest {
    CheckCashappDepositRequest {
        payment_link: Some(receipt_link(payment_id)),
    }
}

#[tokio::test]
async fn test_repeated_request_reuses_pending_deposit() {
    let ctx = setup_context().await;
    let user = create_user(&ctx.state.db, "alice", None).await;

    let first = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();
    let second = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();

    assert_eq!(first.note.len(), 10);
    assert!(first.note.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(first.cashtag, CASH_TAG);
    assert_eq!(first.id, second.id);
    assert_eq!(first.note, second.note);
    assert_eq!(DepositTransactions::find().count(&ctx.state.db).await.unwrap(), 1);

    // A different amount is a different request
    let other = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(12.5))
        .await
        .unwrap();
    assert_ne!(other.id, first.id);
    assert_eq!(DepositTransactions::find().count(&ctx.state.db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_amount_at_minimum_is_rejected() {
    let ctx = setup_context().await;
    let user = create_user(&ctx.state.db, "bob", None).await;

    // floor(5 * 1.42) = 7, exclusive
    let err = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(7.0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "You can only deposit amounts above $7.00 (base minimum $5.00).");

    let err = deposit_creator::create_cashapp_deposit(
        &ctx.state,
        user.id,
        SendCashappDepositRequest { amount: None },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(DepositTransactions::find().count(&ctx.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_memo_is_not_found() {
    let ctx = setup_context().await;
    ctx.cashapp
        .put("pay1", receipt("$10.00", "NoSuchNote", "Cash", "SUCCESS"));

    let err = deposit_verifier::check_cashapp_deposit(&ctx.state, check_request("pay1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_invalid_link_is_rejected_before_fetch() {
    let ctx = setup_context().await;

    let err = deposit_verifier::check_cashapp_deposit(
        &ctx.state,
        CheckCashappDepositRequest {
            payment_link: Some("https://example.com/payments/abc/receipt".to_string()),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "Invalid payment link.");
}

#[tokio::test]
async fn test_mismatched_receipt_leaves_deposit_pending() {
    let ctx = setup_context().await;
    let user = create_user(&ctx.state.db, "carol", None).await;

    let created = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();

    let cases = [
        ("short", receipt("$9.00", &created.note, "Cash", "SUCCESS"), "Payment verification failed."),
        ("card", receipt("$10.00", &created.note, "Visa Debit 4242", "SUCCESS"), "Money must be sent with cash balance!"),
        ("pending", receipt("$10.00", &created.note, "Cash", "PENDING"), "Payment must be successful!"),
    ];

    for (payment_id, receipt, message) in cases {
        ctx.cashapp.put(payment_id, receipt);
        let err = deposit_verifier::check_cashapp_deposit(&ctx.state, check_request(payment_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Verification);
        assert_eq!(err.to_string(), message);
    }

    let tx = DepositTransactions::find_by_id(created.id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.state, "created");
    assert_eq!(tx.credited_amount, None);

    let user = Users::find_by_id(user.id).one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(user.balance, 0);
}

#[tokio::test]
async fn test_end_to_end_credit_and_resubmit() {
    let ctx = setup_context().await;
    let referrer = create_user(&ctx.state.db, "referrer", None).await;
    let user = create_user(&ctx.state.db, "dave", Some(referrer.id)).await;
    let mut updates = ctx.state.user_broadcaster.subscribe();

    let created = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();
    ctx.cashapp
        .put("PAYabc123", receipt("$10.00", &created.note, "Cash", "SUCCESS"));

    let credited = deposit_verifier::check_cashapp_deposit(&ctx.state, check_request("PAYabc123"))
        .await
        .unwrap();
    assert_eq!(credited.message, "Successfully credited 3333 coins to your wallet!");

    let tx: deposit_transactions::Model = DepositTransactions::find_by_id(created.id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.state, "completed");
    assert_eq!(tx.amount, 1000);
    assert_eq!(tx.credited_amount, Some(3333));

    let owner: users::Model = Users::find_by_id(user.id).one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(owner.balance, 3333);
    assert_eq!(owner.stats_deposit, 3333);
    assert_eq!(owner.limits_bet_to_withdraw, 3333);

    let referrer = Users::find_by_id(referrer.id).one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(referrer.affiliates_deposit, 3333);
    assert_eq!(referrer.balance, 0);

    let report: reports::Model = Reports::find().one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(report.total_deposit, 1000);
    assert_eq!(report.cashapp_deposit, 1000);
    assert_eq!(report.card_deposit, 0);

    let event = updates.recv().await.unwrap();
    assert_eq!(event.user_id, user.id);
    assert_eq!(event.user.balance, 3333);
    assert_eq!(event.user.stats.deposit, 3333);

    // Same receipt again
    let err = deposit_verifier::check_cashapp_deposit(&ctx.state, check_request("PAYabc123"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let owner = Users::find_by_id(user.id).one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(owner.balance, 3333);
    let report = Reports::find().one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(report.total_deposit, 1000);
}

#[tokio::test]
async fn test_credit_of_completed_transaction_conflicts() {
    let ctx = setup_context().await;
    let user = create_user(&ctx.state.db, "erin", None).await;

    let created = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(20.0))
        .await
        .unwrap();
    let tx = DepositTransactions::find_by_id(created.id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();

    deposit_verifier::credit_deposit(&ctx.state.db, &tx, 6666).await.unwrap();

    // Stale copy still says `created`; the compare-and-set must refuse it
    let err = deposit_verifier::credit_deposit(&ctx.state.db, &tx, 6666)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let user = Users::find_by_id(user.id).one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(user.balance, 6666);

    let report = Reports::find().one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(report.total_deposit, 2000);
}

#[tokio::test]
async fn test_completed_deposit_frees_key_for_new_request() {
    let ctx = setup_context().await;
    let user = create_user(&ctx.state.db, "frank", None).await;

    let first = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();
    ctx.cashapp
        .put("first", receipt("$10.00", &first.note, "Cash", "SUCCESS"));
    deposit_verifier::check_cashapp_deposit(&ctx.state, check_request("first"))
        .await
        .unwrap();

    let second = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();
    assert_ne!(second.id, first.id);
    assert_ne!(second.note, first.note);
}

#[tokio::test]
async fn test_oversized_receipt_amount_fails_verification() {
    let ctx = setup_context().await;
    let user = create_user(&ctx.state.db, "gina", None).await;

    let created = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();
    ctx.cashapp.put(
        "huge",
        receipt("$79228162514264337593543950335", &created.note, "Cash", "SUCCESS"),
    );

    let state = ctx.state.clone();
    let result = tokio::spawn(async move {
        deposit_verifier::check_cashapp_deposit(&state, check_request("huge")).await
    })
    .await
    .expect("verification must not panic");

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);

    let tx = DepositTransactions::find_by_id(created.id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.state, "created");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_pending_deposit() {
    let ctx = setup_context().await;
    let user_id = create_user(&ctx.state.db, "henry", None).await.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let state = ctx.state.clone();
            tokio::spawn(async move {
                deposit_creator::create_cashapp_deposit(&state, user_id, cashapp_request(15.0)).await
            })
        })
        .collect();

    let mut created = Vec::new();
    for handle in handles {
        created.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(DepositTransactions::find().count(&ctx.state.db).await.unwrap(), 1);
    assert!(created.iter().all(|c| c.id == created[0].id));
    assert!(created.iter().all(|c| c.note == created[0].note));
}

#[tokio::test]
async fn test_failed_credit_rolls_back_state_flip() {
    let ctx = setup_context().await;
    let user = create_user(&ctx.state.db, "iris", None).await;

    let created = deposit_creator::create_cashapp_deposit(&ctx.state, user.id, cashapp_request(10.0))
        .await
        .unwrap();
    let mut tx = DepositTransactions::find_by_id(created.id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();

    // The state flip succeeds, then the owner update matches no row
    tx.user_id = 9999;
    let err = deposit_verifier::credit_deposit(&ctx.state.db, &tx, 3333)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let stored = DepositTransactions::find_by_id(created.id)
        .one(&ctx.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, "created");
    assert_eq!(stored.credited_amount, None);
    assert_eq!(Reports::find().count(&ctx.state.db).await.unwrap(), 0);

    let user = Users::find_by_id(user.id).one(&ctx.state.db).await.unwrap().unwrap();
    assert_eq!(user.balance, 0);
}
