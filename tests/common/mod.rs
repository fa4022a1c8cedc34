use serde_json::Map;
use tempfile::TempDir;

use trailhead::concepts::{EventDate, EventTags, EventTime, TrailStop};
use trailhead::store::{DocStore, Id};
use trailhead::sync::{App, NewEvent};

/// Fresh app over a temp-dir SQLite store. The TempDir must stay alive for
/// the duration of the test.
pub async fn test_app() -> (TempDir, App) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let store = DocStore::connect(&url).await.expect("connect store");
    let app = App::new(&store);
    (dir, app)
}

pub fn sample_stops() -> Vec<TrailStop> {
    vec![
        TrailStop {
            lat: 42.3601,
            lng: -71.0942,
            post: None,
        },
        TrailStop {
            lat: 42.3736,
            lng: -71.1097,
            post: None,
        },
        TrailStop {
            lat: 42.3770,
            lng: -71.1167,
            post: None,
        },
    ]
}

/// An author-less template trail, as events reference them.
pub async fn template_trail(app: &App) -> Id {
    app.trails
        .create(
            None,
            "Skyline Loop",
            "Ridge walk with two lookouts",
            sample_stops(),
            3.5,
            9.2,
        )
        .await
        .expect("create template trail")
        .id
}

pub fn event_params(trail: Id, name: &str) -> NewEvent {
    NewEvent {
        name: name.to_string(),
        description: "Group hike".to_string(),
        date: EventDate {
            month: "06".to_string(),
            date: "14".to_string(),
            year: "2026".to_string(),
        },
        time: EventTime {
            hour: "09".to_string(),
            minute: "30".to_string(),
            am: true,
        },
        tags: EventTags::default(),
        checklist: Map::new(),
        trail,
    }
}
