//! Shared setup for the engine integration tests: an in-memory database
//! with migrations applied, plus seeding helpers for the collaborator
//! entities.

#![allow(dead_code)]

use serde_json::json;
use storage::Database;
use storage::models::{Event, Song, User, UserRole};
use storage::repository::{EventRepository, SongRepository, UserRepository};
use uuid::Uuid;

use engine::ModuleGate;

pub async fn setup() -> Database {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();

    let db = Database::in_memory().await.expect("in-memory database");
    db.run_migrations().await.expect("migrations");
    db
}

pub async fn user(db: &Database, username: &str, role: UserRole) -> User {
    UserRepository::new(db.pool())
        .create(username, role)
        .await
        .expect("seed user")
}

pub async fn approved_song(db: &Database, title: &str) -> Song {
    SongRepository::new(db.pool())
        .create(title, Some("Seed Artist"), true)
        .await
        .expect("seed song")
}

pub async fn unapproved_song(db: &Database, title: &str) -> Song {
    SongRepository::new(db.pool())
        .create(title, None, false)
        .await
        .expect("seed song")
}

/// An event with its module settings initialized, plus its organizer.
pub async fn event_with_modules(db: &Database) -> (Event, User) {
    let organizer = user(db, "organizer", UserRole::Organizer).await;
    let event = EventRepository::new(db.pool())
        .create("Friday Night Social", organizer.user_id)
        .await
        .expect("seed event");

    ModuleGate::new(db.pool().clone())
        .initialize(event.event_id)
        .await
        .expect("initialize modules");

    (event, organizer)
}

/// Switches a module on with default settings.
pub async fn enable_module(db: &Database, event_id: Uuid, module: &str) {
    ModuleGate::new(db.pool().clone())
        .update(event_id, module, true, json!({}))
        .await
        .expect("enable module");
}
