mod common;

use common::{CASE_A, CASE_B, create_user, setup, setup_file_db};
use gctracker::services::CaseError;
use sea_orm::ConnectionTrait;

#[tokio::test]
async fn test_add_case_rejects_bad_input() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;

    let err = ctx
        .state
        .case_service
        .add_case("alice", "EAC123", "bad\u{7}name")
        .await
        .unwrap_err();

    match err {
        CaseError::Validation(errors) => assert_eq!(errors.len(), 2, "{errors:?}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(ctx.source.calls(), 0);
    assert!(ctx.state.case_service.list_all_cases().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_case_fetches_initial_status() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    ctx.source.set(CASE_A, "Case Was Received");

    let case = ctx
        .state
        .case_service
        .add_case("alice", " eac2190012345 ", "Green card")
        .await
        .unwrap();

    assert_eq!(case.id, CASE_A);
    assert_eq!(case.name, "Green card");
    assert_eq!(case.status, "Case Was Received");
    assert!(case.old_status.is_empty());
    assert!(case.checked_at.is_some());

    let listed = ctx.state.case_service.list_cases("alice").await.unwrap();
    assert_eq!(listed, vec![case]);
}

#[tokio::test]
async fn test_add_case_survives_status_failure() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    ctx.source.fail(CASE_A);

    let case = ctx
        .state
        .case_service
        .add_case("alice", CASE_A, "")
        .await
        .unwrap();

    assert!(case.status.is_empty());
    assert!(case.checked_at.is_none());
}

#[tokio::test]
async fn test_shared_case_lives_until_last_user_leaves() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    create_user(&ctx, "bob").await;
    ctx.source.set(CASE_A, "Case Was Received");
    let cases = &ctx.state.case_service;

    cases.add_case("alice", CASE_A, "first").await.unwrap();
    let calls_after_first = ctx.source.calls();

    let case = cases.add_case("bob", CASE_A, "renamed").await.unwrap();
    assert_eq!(ctx.source.calls(), calls_after_first);
    assert_eq!(case.name, "renamed");
    assert_eq!(case.status, "Case Was Received");

    // Adding again is idempotent
    cases.add_case("bob", CASE_A, "renamed").await.unwrap();
    assert_eq!(cases.list_cases("bob").await.unwrap().len(), 1);

    let outcome = cases
        .delete_cases("alice", &[CASE_A.to_lowercase()])
        .await
        .unwrap();
    assert_eq!(outcome.unlinked, 1);
    assert!(outcome.removed.is_empty());
    assert!(cases.list_cases("alice").await.unwrap().is_empty());
    assert_eq!(cases.list_all_cases().await.unwrap().len(), 1);

    let outcome = cases
        .delete_cases("bob", &[CASE_A.to_string()])
        .await
        .unwrap();
    assert_eq!(outcome.removed, vec![CASE_A.to_string()]);
    assert!(cases.list_all_cases().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_untracked_case_changes_nothing() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    create_user(&ctx, "bob").await;
    ctx.source.set(CASE_A, "Case Was Received");
    let cases = &ctx.state.case_service;

    cases.add_case("alice", CASE_A, "").await.unwrap();

    let outcome = cases
        .delete_cases("bob", &[CASE_A.to_string(), CASE_B.to_string()])
        .await
        .unwrap();
    assert_eq!(outcome.unlinked, 0);
    assert!(outcome.removed.is_empty());
    assert_eq!(cases.list_cases("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sync_notifies_every_tracking_user() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    create_user(&ctx, "bob").await;
    create_user(&ctx, "carol").await;
    ctx.source.set(CASE_A, "Case Was Received");
    let cases = &ctx.state.case_service;

    cases.add_case("alice", CASE_A, "Mine").await.unwrap();
    cases.add_case("bob", CASE_A, "Mine").await.unwrap();

    ctx.source.set(CASE_A, "Card Was Produced");
    let report = cases.sync_all().await.unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.notified, 2);
    assert!(report.is_success());

    let expected = format!("Your case Mine ({CASE_A}) status has changed: Card Was Produced");
    assert_eq!(ctx.notifier.messages_to("alice@example.com").last(), Some(&expected));
    assert_eq!(ctx.notifier.messages_to("bob@example.com").last(), Some(&expected));
    assert_eq!(ctx.notifier.messages_to("carol@example.com").len(), 1);

    let case = ctx.state.store.get_case(CASE_A).await.unwrap().unwrap();
    assert_eq!(case.status, "Card Was Produced");
    assert_eq!(case.old_status, "Case Was Received");

    let report = cases.sync_all().await.unwrap();
    assert_eq!(report.changed, 0);
    assert_eq!(report.notified, 0);
}

#[tokio::test]
async fn test_sync_failure_does_not_stop_other_cases() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    ctx.source.set(CASE_A, "Case Was Received");
    ctx.source.set(CASE_B, "Case Was Received");
    let cases = &ctx.state.case_service;

    cases.add_case("alice", CASE_A, "").await.unwrap();
    cases.add_case("alice", CASE_B, "").await.unwrap();

    ctx.source.fail(CASE_A);
    ctx.source.set(CASE_B, "Case Was Approved");

    let report = cases.sync_all().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.changed, 1);
    assert!(!report.is_success());

    let case_a = ctx.state.store.get_case(CASE_A).await.unwrap().unwrap();
    assert_eq!(case_a.status, "Case Was Received");
    let case_b = ctx.state.store.get_case(CASE_B).await.unwrap().unwrap();
    assert_eq!(case_b.status, "Case Was Approved");
}

#[tokio::test]
async fn test_status_change_is_compare_and_set() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    ctx.source.set(CASE_A, "Case Was Received");
    ctx.state
        .case_service
        .add_case("alice", CASE_A, "")
        .await
        .unwrap();

    let store = &ctx.state.store;
    assert!(
        !store
            .record_case_status_change(CASE_A, "Something Else", "Card Was Produced")
            .await
            .unwrap()
    );
    assert!(
        store
            .record_case_status_change(CASE_A, "Case Was Received", "Card Was Produced")
            .await
            .unwrap()
    );
    assert!(
        !store
            .record_case_status_change(CASE_A, "Case Was Received", "Card Was Produced")
            .await
            .unwrap()
    );

    let case = store.get_case(CASE_A).await.unwrap().unwrap();
    assert_eq!(case.status, "Card Was Produced");
    assert_eq!(case.old_status, "Case Was Received");
}

#[tokio::test]
async fn test_concurrent_syncs_notify_once() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    create_user(&ctx, "bob").await;
    ctx.source.set(CASE_A, "Case Was Received");
    let cases = &ctx.state.case_service;

    cases.add_case("alice", CASE_A, "").await.unwrap();
    cases.add_case("bob", CASE_A, "").await.unwrap();
    ctx.source.set(CASE_A, "Card Was Produced");

    let (first, second) = tokio::join!(cases.sync_all(), cases.sync_all());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.changed + second.changed, 1);
    assert_eq!(first.notified + second.notified, 2);

    let change_mails = ctx
        .notifier
        .sent()
        .into_iter()
        .filter(|(_, message)| message.contains("status has changed"))
        .count();
    assert_eq!(change_mails, 2);
}

#[tokio::test]
async fn test_case_operations_need_existing_user() {
    let ctx = setup().await;

    let err = ctx
        .state
        .case_service
        .list_cases("ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, CaseError::UserNotFound));
}

#[tokio::test]
async fn test_concurrent_adds_of_new_case_link_every_user() {
    let ctx = setup_file_db().await;
    create_user(&ctx, "alice").await;
    create_user(&ctx, "bob").await;
    let cases = &ctx.state.case_service;

    for n in 0..20 {
        let id = format!("EAC21900{n:05}");
        ctx.source.set(&id, "Case Was Received");

        let (alice, bob) = tokio::join!(
            cases.add_case("alice", &id, "mine"),
            cases.add_case("bob", &id, "ours"),
        );
        alice.unwrap_or_else(|e| panic!("alice failed to add {id}: {e}"));
        bob.unwrap_or_else(|e| panic!("bob failed to add {id}: {e}"));
    }

    assert_eq!(cases.list_cases("alice").await.unwrap().len(), 20);
    assert_eq!(cases.list_cases("bob").await.unwrap().len(), 20);
    assert_eq!(cases.list_all_cases().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_change_is_kept_when_recipients_cannot_be_loaded() {
    let ctx = setup().await;
    create_user(&ctx, "alice").await;
    ctx.source.set(CASE_A, "Case Was Received");
    let cases = &ctx.state.case_service;
    cases.add_case("alice", CASE_A, "").await.unwrap();

    let conn = &ctx.state.store.conn;
    conn.execute_unprepared("ALTER TABLE user_cases RENAME TO user_cases_offline")
        .await
        .unwrap();
    ctx.source.set(CASE_A, "Card Was Produced");

    let report = cases.sync_all().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.changed, 0);
    let case = ctx.state.store.get_case(CASE_A).await.unwrap().unwrap();
    assert_eq!(case.status, "Case Was Received");

    conn.execute_unprepared("ALTER TABLE user_cases_offline RENAME TO user_cases")
        .await
        .unwrap();

    let report = cases.sync_all().await.unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(
        ctx.notifier.messages_to("alice@example.com").last().unwrap(),
        &format!("Your case {CASE_A} status has changed: Card Was Produced")
    );
}
