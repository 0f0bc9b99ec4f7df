mod common;

use common::{create_user, setup, setup_file_db, setup_with, test_config};
use gctracker::models::user::PasswordChangeIdentity;
use gctracker::services::AccountError;

#[tokio::test]
async fn test_sign_up_collects_every_error() {
    let ctx = setup().await;

    let err = ctx
        .state
        .account_service
        .sign_up("x", "not-an-email", "short", "other")
        .await
        .unwrap_err();

    match err {
        AccountError::Validation(errors) => {
            assert_eq!(errors.len(), 3, "{errors:?}");
            assert!(errors[0].contains("username"));
            assert!(errors[1].contains("not a valid email"));
            assert!(errors[2].contains("password"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_sign_up_sends_welcome_and_rejects_duplicates() {
    let ctx = setup().await;
    let accounts = &ctx.state.account_service;

    let user = accounts
        .sign_up("alice", " alice@example.com ", "password123", "password123")
        .await
        .unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(
        ctx.notifier.messages_to("alice@example.com"),
        vec!["Your account 'alice' has been created.".to_string()]
    );

    let err = accounts
        .sign_up("alice", "other@example.com", "password123", "password123")
        .await
        .unwrap_err();
    match err {
        AccountError::Validation(errors) => {
            assert_eq!(errors, vec!["username is already taken".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_sign_in_does_not_reveal_unknown_users() {
    let ctx = setup().await;
    create_user(&ctx, "bob").await;
    let accounts = &ctx.state.account_service;

    let user = accounts.sign_in("bob", "password123").await.unwrap();
    assert_eq!(user.email, "bob@example.com");

    let wrong_password = accounts.sign_in("bob", "password124").await.unwrap_err();
    let unknown_user = accounts.sign_in("carol", "password123").await.unwrap_err();

    assert!(matches!(wrong_password, AccountError::InvalidCredentials));
    assert!(matches!(unknown_user, AccountError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert_eq!(wrong_password.to_string(), "invalid username or password");
}

#[tokio::test]
async fn test_password_reset_requires_known_username() {
    let ctx = setup().await;
    let accounts = &ctx.state.account_service;

    let err = accounts
        .request_password_reset("  ", "http://gc.test")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "username is not specified");

    let err = accounts
        .request_password_reset("nobody", "http://gc.test")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "user not found");
}

#[tokio::test]
async fn test_reset_token_changes_password_once() {
    let ctx = setup().await;
    create_user(&ctx, "dave").await;
    let accounts = &ctx.state.account_service;

    accounts
        .request_password_reset("dave", "http://gc.test/")
        .await
        .unwrap();

    let mails = ctx.notifier.messages_to("dave@example.com");
    let link_mail = mails.last().unwrap();
    assert!(link_mail.starts_with("Please follow the link http://gc.test/changepwd?a=r&t="));
    assert!(link_mail.ends_with(" to reset your password."));

    let token = ctx.notifier.reset_token_for("dave@example.com").unwrap();
    let identity = PasswordChangeIdentity::ResetToken(token);

    let user = accounts
        .change_password(&identity, "newpassword1", "newpassword1")
        .await
        .unwrap();
    assert_eq!(user.username, "dave");
    assert_eq!(
        ctx.notifier.messages_to("dave@example.com").last().unwrap(),
        "Your password has been changed."
    );

    assert!(accounts.sign_in("dave", "newpassword1").await.is_ok());
    assert!(accounts.sign_in("dave", "password123").await.is_err());

    let reused = accounts
        .change_password(&identity, "anotherpass1", "anotherpass1")
        .await
        .unwrap_err();
    assert!(matches!(reused, AccountError::InvalidResetToken));
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    let ctx = setup().await;
    create_user(&ctx, "erin").await;

    let issued_at = chrono::Utc::now().timestamp() - 3601;
    ctx.state
        .store
        .set_reset_token("erin", "stale-token", issued_at)
        .await
        .unwrap();

    let err = ctx
        .state
        .account_service
        .change_password(
            &PasswordChangeIdentity::ResetToken("stale-token".to_string()),
            "newpassword1",
            "newpassword1",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::InvalidResetToken));
}

#[tokio::test]
async fn test_reset_token_ttl_is_configurable() {
    let mut config = test_config();
    config.security.reset_token_ttl_seconds = 7200;
    let ctx = setup_with(config).await;
    create_user(&ctx, "fred").await;

    let issued_at = chrono::Utc::now().timestamp() - 3601;
    ctx.state
        .store
        .set_reset_token("fred", "older-token", issued_at)
        .await
        .unwrap();

    let result = ctx
        .state
        .account_service
        .change_password(
            &PasswordChangeIdentity::ResetToken("older-token".to_string()),
            "newpassword1",
            "newpassword1",
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_change_password_validates_confirmation() {
    let ctx = setup().await;
    create_user(&ctx, "gina").await;

    let err = ctx
        .state
        .account_service
        .change_password(
            &PasswordChangeIdentity::Authenticated("gina".to_string()),
            "newpassword1",
            "newpassword2",
        )
        .await
        .unwrap_err();

    match err {
        AccountError::Validation(errors) => {
            assert_eq!(errors, vec!["passwords do not match".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(
        ctx.state
            .account_service
            .sign_in("gina", "password123")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_user_info_and_listing() {
    let ctx = setup().await;
    create_user(&ctx, "hank").await;
    create_user(&ctx, "ivy").await;
    let accounts = &ctx.state.account_service;

    let info = accounts.user_info("hank").await.unwrap();
    assert_eq!(info.email, "hank@example.com");
    assert!(matches!(
        accounts.user_info("nobody").await,
        Err(AccountError::UserNotFound)
    ));

    let names: Vec<String> = accounts
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, vec!["hank", "ivy"]);
}

#[tokio::test]
async fn test_reset_token_survives_only_one_concurrent_use() {
    let ctx = setup_file_db().await;
    create_user(&ctx, "jack").await;
    let accounts = &ctx.state.account_service;

    accounts
        .request_password_reset("jack", "http://gc.test")
        .await
        .unwrap();
    let token = ctx.notifier.reset_token_for("jack@example.com").unwrap();
    let identity = PasswordChangeIdentity::ResetToken(token);

    let (first, second) = tokio::join!(
        accounts.change_password(&identity, "firstpass1", "firstpass1"),
        accounts.change_password(&identity, "secondpass2", "secondpass2"),
    );

    let (winner, loser) = match (first, second) {
        (Ok(_), Err(e)) => ("firstpass1", e),
        (Err(e), Ok(_)) => ("secondpass2", e),
        (first, second) => panic!("expected exactly one success: {first:?} / {second:?}"),
    };
    assert!(matches!(loser, AccountError::InvalidResetToken), "{loser:?}");
    assert!(accounts.sign_in("jack", winner).await.is_ok());
}
