mod common;

use trailhead::{AppError, ErrorKind};

use common::test_app;

#[tokio::test]
async fn duplicate_pending_request_is_rejected_in_both_directions() {
    let (_dir, app) = test_app().await;
    let alice = app.create_user("alice", "hunter2hunter2").await.unwrap();
    let bob = app.create_user("bob", "hunter2hunter2").await.unwrap();

    app.friends.send_request(alice.id, bob.id).await.unwrap();

    let err = app.friends.send_request(alice.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::FriendRequestAlreadyExists { .. }));

    // The reverse direction counts as the same pending pair.
    let err = app.friends.send_request(bob.id, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::FriendRequestAlreadyExists { .. }));
}

#[tokio::test]
async fn accept_then_remove_then_remove_again_fails_not_found() {
    let (_dir, app) = test_app().await;
    let alice = app.create_user("alice", "hunter2hunter2").await.unwrap();
    let bob = app.create_user("bob", "hunter2hunter2").await.unwrap();

    app.friends.send_request(alice.id, bob.id).await.unwrap();
    app.friends.accept_request(alice.id, bob.id).await.unwrap();

    app.friends.remove_friend(alice.id, bob.id).await.unwrap();
    let err = app.friends.remove_friend(alice.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::FriendNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn accepting_or_rejecting_requires_a_pending_request() {
    let (_dir, app) = test_app().await;
    let alice = app.create_user("alice", "hunter2hunter2").await.unwrap();
    let bob = app.create_user("bob", "hunter2hunter2").await.unwrap();

    let err = app.friends.accept_request(alice.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::FriendRequestNotFound { .. }));

    let err = app.friends.reject_request(alice.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::FriendRequestNotFound { .. }));
}

#[tokio::test]
async fn rejection_allows_a_fresh_request_later() {
    let (_dir, app) = test_app().await;
    let alice = app.create_user("alice", "hunter2hunter2").await.unwrap();
    let bob = app.create_user("bob", "hunter2hunter2").await.unwrap();

    app.friends.send_request(alice.id, bob.id).await.unwrap();
    app.friends.reject_request(alice.id, bob.id).await.unwrap();

    // Rejection is terminal for that request but not for the pair.
    app.friends.send_request(alice.id, bob.id).await.unwrap();
    app.friends.accept_request(alice.id, bob.id).await.unwrap();

    assert_eq!(app.friends.get_friends(alice.id).await.unwrap(), vec![bob.id]);
}

#[tokio::test]
async fn friends_cannot_send_requests_and_withdrawal_works() {
    let (_dir, app) = test_app().await;
    let alice = app.create_user("alice", "hunter2hunter2").await.unwrap();
    let bob = app.create_user("bob", "hunter2hunter2").await.unwrap();

    app.friends.send_request(alice.id, bob.id).await.unwrap();
    app.friends.remove_request(alice.id, bob.id).await.unwrap();
    let err = app.friends.remove_request(alice.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::FriendRequestNotFound { .. }));

    app.friends.send_request(alice.id, bob.id).await.unwrap();
    app.friends.accept_request(alice.id, bob.id).await.unwrap();

    let err = app.friends.send_request(alice.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyFriends { .. }));
}

#[tokio::test]
async fn full_friendship_scenario_over_usernames() {
    let (_dir, app) = test_app().await;
    let alice = app.create_user("alice", "hunter2hunter2").await.unwrap();
    let bob = app.create_user("bob", "hunter2hunter2").await.unwrap();

    // alice sends, bob accepts.
    app.send_friend_request(alice.id, "bob").await.unwrap();
    app.accept_friend_request(bob.id, "alice").await.unwrap();

    assert_eq!(
        app.get_friend_usernames(alice.id).await.unwrap(),
        vec!["bob".to_string()]
    );
    assert_eq!(
        app.get_friend_usernames(bob.id).await.unwrap(),
        vec!["alice".to_string()]
    );

    app.remove_friend(alice.id, "bob").await.unwrap();
    assert!(app.get_friend_usernames(alice.id).await.unwrap().is_empty());
    assert!(app.get_friend_usernames(bob.id).await.unwrap().is_empty());

    let err = app.remove_friend(alice.id, "bob").await.unwrap_err();
    assert!(matches!(err, AppError::FriendNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn formatted_messages_resolve_ids_to_usernames() {
    let (_dir, app) = test_app().await;
    let alice = app.create_user("alice", "hunter2hunter2").await.unwrap();
    let bob = app.create_user("bob", "hunter2hunter2").await.unwrap();

    let registry = trailhead::responses::FormatterRegistry::new(app.users.clone());

    let err = AppError::FriendNotFound {
        user1: alice.id,
        user2: bob.id,
    };
    assert_eq!(registry.format(&err).await, "alice and bob are not friends!");

    // Unregistered kinds fall back to the raw rendering.
    let err = AppError::PinnedTrailLimitMet { user: alice.id };
    assert_eq!(registry.format(&err).await, "Max number of pins met!");
}
