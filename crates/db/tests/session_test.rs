//! Integration tests for sessions and profile updates.

mod common;

use bankline_core::auth::{generate_token, hash_token};
use bankline_db::repositories::{CreateSessionParams, UpdateUserParams};
use chrono::{Duration, Utc};

use common::{create_user, store};

fn session_params(username: &str, access: &str, refresh: &str) -> CreateSessionParams {
    let now = Utc::now();
    CreateSessionParams {
        username: username.to_string(),
        access_token_hash: hash_token(access),
        access_expires_at: now + Duration::minutes(15),
        refresh_token_hash: hash_token(refresh),
        user_agent: "integration-test".to_string(),
        client_ip: "127.0.0.1".to_string(),
        expires_at: now + Duration::days(1),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_session_found_by_either_token() {
    let store = store().await;
    let user = create_user(&store).await;
    let (access, refresh) = (generate_token(), generate_token());

    let created = store
        .queries()
        .create_session(session_params(&user.username, &access, &refresh))
        .await
        .unwrap();
    assert!(!created.is_blocked);

    let by_access = store
        .queries()
        .get_session_by_access_token(&hash_token(&access))
        .await
        .unwrap()
        .unwrap();
    let by_refresh = store
        .queries()
        .get_session_by_refresh_token(&hash_token(&refresh))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(by_access.id, created.id);
    assert_eq!(by_refresh.id, created.id);
    assert!(by_access.access_valid_at(Utc::now()));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_renewed_access_token_replaces_old_one() {
    let store = store().await;
    let user = create_user(&store).await;
    let (access, refresh) = (generate_token(), generate_token());
    let session = store
        .queries()
        .create_session(session_params(&user.username, &access, &refresh))
        .await
        .unwrap();

    let renewed = generate_token();
    store
        .queries()
        .renew_access_token(
            session.id,
            hash_token(&renewed),
            Utc::now() + Duration::minutes(15),
        )
        .await
        .unwrap();

    let old = store
        .queries()
        .get_session_by_access_token(&hash_token(&access))
        .await
        .unwrap();
    assert!(old.is_none());

    let new = store
        .queries()
        .get_session_by_access_token(&hash_token(&renewed))
        .await
        .unwrap();
    assert_eq!(new.map(|s| s.id), Some(session.id));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_blocked_session_rejects_tokens() {
    let store = store().await;
    let user = create_user(&store).await;
    let (access, refresh) = (generate_token(), generate_token());
    let session = store
        .queries()
        .create_session(session_params(&user.username, &access, &refresh))
        .await
        .unwrap();

    let blocked = store.queries().block_session(session.id).await.unwrap();

    assert!(blocked.is_blocked);
    assert!(!blocked.access_valid_at(Utc::now()));
    assert!(!blocked.refresh_valid_at(Utc::now()));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_user_changes_only_given_fields() {
    let store = store().await;
    let user = create_user(&store).await;

    let renamed = store
        .queries()
        .update_user(UpdateUserParams {
            username: user.username.clone(),
            full_name: Some("Renamed User".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(renamed.full_name, "Renamed User");
    assert_eq!(renamed.email, user.email);
    assert_eq!(renamed.hashed_password, user.hashed_password);
    assert_eq!(renamed.password_changed_at, user.password_changed_at);

    let rehashed = store
        .queries()
        .update_user(UpdateUserParams {
            username: user.username.clone(),
            hashed_password: Some("$argon2id$new_hash".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rehashed.hashed_password, "$argon2id$new_hash");
    assert!(rehashed.password_changed_at > user.password_changed_at);
}
