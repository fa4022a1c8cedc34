mod common;

use serde_json::{json, Map};
use trailhead::{AppError, ErrorKind};

use common::test_app;

#[tokio::test]
async fn login_resolves_the_session_and_logout_ends_it() {
    let (_dir, app) = test_app().await;
    let user = app.create_user("walker", "trailmix99").await.unwrap();

    let session = app.login("walker", "trailmix99").await.unwrap();
    assert_eq!(session.fields.user, user.id);

    let resolved = app
        .sessions
        .get_user(Some(session.fields.key.as_str()))
        .await
        .unwrap();
    assert_eq!(resolved, user.id);

    // A live key means the caller is not logged out.
    let err = app
        .sessions
        .is_logged_out(Some(session.fields.key.as_str()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    app.sessions.end(Some(session.fields.key.as_str())).await.unwrap();
    let err = app
        .sessions
        .get_user(Some(session.fields.key.as_str()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));

    // Ended keys count as logged out, and ending again is a no-op.
    app.sessions
        .is_logged_out(Some(session.fields.key.as_str()))
        .await
        .unwrap();
    app.sessions.end(Some(session.fields.key.as_str())).await.unwrap();
}

#[tokio::test]
async fn absent_key_is_unauthenticated_but_logged_out() {
    let (_dir, app) = test_app().await;

    let err = app.sessions.get_user(None).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    app.sessions.is_logged_out(None).await.unwrap();
}

#[tokio::test]
async fn unknown_credentials_do_not_start_a_session() {
    let (_dir, app) = test_app().await;
    app.create_user("walker", "trailmix99").await.unwrap();

    let err = app.login("walker", "wrong_password").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    let err = app.login("nobody", "trailmix99").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
}

#[tokio::test]
async fn deleting_a_user_ends_every_session_first() {
    let (_dir, app) = test_app().await;
    let user = app.create_user("walker", "trailmix99").await.unwrap();

    // Two concurrent devices, two sessions.
    let first = app.login("walker", "trailmix99").await.unwrap();
    let second = app.login("walker", "trailmix99").await.unwrap();
    assert_ne!(first.fields.key, second.fields.key);

    app.delete_user(user.id).await.unwrap();

    for key in [&first.fields.key, &second.fields.key] {
        let err = app.sessions.get_user(Some(key.as_str())).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
    let err = app.users.get_by_id(user.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn password_change_invalidates_the_old_credential() {
    let (_dir, app) = test_app().await;
    let user = app.create_user("walker", "trailmix99").await.unwrap();

    let mut update = Map::new();
    update.insert("password".to_string(), json!("granola_bars"));
    app.users.update(user.id, &update).await.unwrap();

    let err = app
        .users
        .authenticate("walker", "trailmix99")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);

    let authed = app.users.authenticate("walker", "granola_bars").await.unwrap();
    assert_eq!(authed.id, user.id);

    // The stored credential is a hash, never the raw password.
    assert_ne!(authed.fields.password, "granola_bars");

    let mut update = Map::new();
    update.insert("password".to_string(), json!(""));
    let err = app.users.update(user.id, &update).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadValues);
}
