mod common;

use trailhead::store::Filter;
use trailhead::{AppError, ErrorKind};

use common::{event_params, template_trail, test_app};

#[tokio::test]
async fn create_event_registers_owner_and_clones_template_trail() {
    let (_dir, app) = test_app().await;
    let owner = app.create_user("organizer", "hunter2hunter2").await.unwrap();
    let template = template_trail(&app).await;

    let event = app
        .create_event(owner.id, event_params(template, "Sunrise Hike"))
        .await
        .unwrap();

    assert_eq!(event.fields.owner, owner.id);
    assert_eq!(event.fields.attendees, vec![owner.id]);
    assert!(event.fields.posts.is_empty());
    assert_eq!(event.fields.trail, template);

    // The owner got a personal copy of the template trail.
    let personal = app.trails.get_by_author(owner.id).await.unwrap();
    assert_eq!(personal.len(), 1);
    assert_eq!(personal[0].fields.name, "Sunrise Hike");
    let template_doc = app.trails.get(template).await.unwrap();
    assert_eq!(personal[0].fields.locations, template_doc.fields.locations);
    assert_eq!(personal[0].fields.author, Some(owner.id));
}

#[tokio::test]
async fn create_event_requires_existing_template_trail() {
    let (_dir, app) = test_app().await;
    let owner = app.create_user("organizer", "hunter2hunter2").await.unwrap();

    let err = app
        .create_event(owner.id, event_params(9999, "Ghost Hike"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    // Nothing was written.
    assert!(app.get_events_by(None).await.unwrap().is_empty());
    assert!(app.trails.get_by_author(owner.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn register_for_event_clones_the_template_for_the_attendee() {
    let (_dir, app) = test_app().await;
    let owner = app.create_user("organizer", "hunter2hunter2").await.unwrap();
    let hiker = app.create_user("hiker", "hunter2hunter2").await.unwrap();
    let template = template_trail(&app).await;
    let event = app
        .create_event(owner.id, event_params(template, "Sunrise Hike"))
        .await
        .unwrap();

    let clone = app.register_for_event(hiker.id, event.id).await.unwrap();
    assert_eq!(clone.fields.author, Some(hiker.id));
    assert_eq!(clone.fields.name, "Sunrise Hike");
    let template_doc = app.trails.get(template).await.unwrap();
    assert_eq!(clone.fields.locations, template_doc.fields.locations);
    assert!(!clone.fields.pinned);

    let attendees = app.events.get_attendees(event.id).await.unwrap();
    assert_eq!(attendees, vec![owner.id, hiker.id]);
}

#[tokio::test]
async fn register_for_event_fails_before_mutating_when_template_is_gone() {
    let (_dir, app) = test_app().await;
    let owner = app.create_user("organizer", "hunter2hunter2").await.unwrap();
    let hiker = app.create_user("hiker", "hunter2hunter2").await.unwrap();
    let template = template_trail(&app).await;
    let event = app
        .create_event(owner.id, event_params(template, "Sunrise Hike"))
        .await
        .unwrap();

    // The template disappears between event creation and registration.
    app.trails.delete(template).await.unwrap();

    let err = app.register_for_event(hiker.id, event.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Registration must not have happened.
    let attendees = app.events.get_attendees(event.id).await.unwrap();
    assert!(!attendees.contains(&hiker.id));
}

#[tokio::test]
async fn delete_event_cascades_through_posts_and_comments() {
    let (_dir, app) = test_app().await;
    let owner = app.create_user("organizer", "hunter2hunter2").await.unwrap();
    let hiker = app.create_user("hiker", "hunter2hunter2").await.unwrap();
    let template = template_trail(&app).await;
    let event = app
        .create_event(owner.id, event_params(template, "Sunrise Hike"))
        .await
        .unwrap();
    app.register_for_event(hiker.id, event.id).await.unwrap();

    // Three posts on the event, two comments each.
    for i in 0..3 {
        let post = app
            .post_to_event(hiker.id, event.id, &format!("checkpoint {}", i), None)
            .await
            .unwrap();
        for j in 0..2 {
            app.create_comment(owner.id, &format!("reply {}", j), post.id)
                .await
                .unwrap();
        }
    }
    assert_eq!(app.get_posts_by(None).await.unwrap().len(), 3);
    assert_eq!(app.get_comments_on(None).await.unwrap().len(), 6);

    // Only the owner may delete.
    let err = app.delete_event(hiker.id, event.id).await.unwrap_err();
    assert!(matches!(err, AppError::EventOwnerNotMatch { .. }));

    app.delete_event(owner.id, event.id).await.unwrap();

    assert!(app.get_posts_by(None).await.unwrap().is_empty());
    assert!(app.get_comments_on(None).await.unwrap().is_empty());
    let err = app.events.get_event(event.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_post_removes_its_comments() {
    let (_dir, app) = test_app().await;
    let author = app.create_user("author", "hunter2hunter2").await.unwrap();
    let commenter = app.create_user("commenter", "hunter2hunter2").await.unwrap();

    let post = app
        .posts
        .create(author.id, "wildflowers along the creek", None, None)
        .await
        .unwrap();
    app.create_comment(commenter.id, "which creek?", post.id)
        .await
        .unwrap();
    app.create_comment(author.id, "the one past mile 3", post.id)
        .await
        .unwrap();

    app.delete_post(author.id, post.id).await.unwrap();

    assert!(app
        .comments
        .get_by_target(post.id)
        .await
        .unwrap()
        .is_empty());
    let err = app.posts.get_by_id(post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn comments_require_an_existing_target_post() {
    let (_dir, app) = test_app().await;
    let user = app.create_user("commenter", "hunter2hunter2").await.unwrap();

    let err = app
        .create_comment(user.id, "great view!", 424242)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(app
        .comments
        .get_comments(Filter::new())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn posting_to_an_event_requires_registration_and_links_the_post() {
    let (_dir, app) = test_app().await;
    let owner = app.create_user("organizer", "hunter2hunter2").await.unwrap();
    let stranger = app.create_user("stranger", "hunter2hunter2").await.unwrap();
    let template = template_trail(&app).await;
    let event = app
        .create_event(owner.id, event_params(template, "Sunrise Hike"))
        .await
        .unwrap();

    let err = app
        .post_to_event(stranger.id, event.id, "am I invited?", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotRegistered { .. }));

    let post = app
        .post_to_event(owner.id, event.id, "meet at the trailhead", None)
        .await
        .unwrap();
    let doc = app.events.get_event(event.id).await.unwrap();
    assert_eq!(doc.fields.posts, vec![post.id]);

    app.delete_post_from_event(owner.id, event.id, post.id)
        .await
        .unwrap();
    let doc = app.events.get_event(event.id).await.unwrap();
    assert!(doc.fields.posts.is_empty());
    // Unlinking leaves the post itself intact.
    assert!(app.posts.get_by_id(post.id).await.is_ok());

    let err = app
        .delete_post_from_event(owner.id, event.id, post.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
