mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use engine::{EngineError, ModuleGate, QueueAdmission};
use serde_json::json;
use storage::dto::queue::MarkPlayedRequest;
use storage::models::{QueueEntryState, UserRole};
use storage::repository::SongRepository;
use uuid::Uuid;

/// Queue settings tuned per test: quota of 3, no cooldown unless asked.
async fn configure_queue(db: &storage::Database, event_id: Uuid, cooldown_minutes: i64, allow_duplicates: bool) {
    ModuleGate::new(db.pool().clone())
        .update(
            event_id,
            "queue",
            true,
            json!({
                "max_songs_per_user": 3,
                "cooldown_minutes": cooldown_minutes,
                "allow_duplicates": allow_duplicates,
            }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn submit_is_forbidden_while_queue_module_inactive() {
    let db = common::setup().await;
    let (event, _) = common::event_with_modules(&db).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;
    let song = common::approved_song(&db, "Sing Sing Sing").await;

    ModuleGate::new(db.pool().clone())
        .update(event.event_id, "queue", false, json!({}))
        .await
        .unwrap();

    let queue = QueueAdmission::new(db.pool().clone());
    let err = queue
        .submit(event.event_id, player.user_id, song.song_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn submit_checks_song_existence_and_approval() {
    let db = common::setup().await;
    let (event, _) = common::event_with_modules(&db).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;
    let pending_song = common::unapproved_song(&db, "Demo Tape").await;

    let queue = QueueAdmission::new(db.pool().clone());

    let err = queue
        .submit(event.event_id, player.user_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = queue
        .submit(event.event_id, player.user_id, pending_song.song_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    // Approval unblocks the request.
    SongRepository::new(db.pool())
        .set_approved(pending_song.song_id, true)
        .await
        .unwrap();
    queue
        .submit(event.event_id, player.user_id, pending_song.song_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn quota_blocks_fourth_pending_and_frees_up_after_play() {
    let db = common::setup().await;
    let (event, organizer) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 0, false).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;

    let queue = QueueAdmission::new(db.pool().clone());
    let mut entries = Vec::new();
    for i in 0..3 {
        let song = common::approved_song(&db, &format!("Track {i}")).await;
        entries.push(
            queue
                .submit(event.event_id, player.user_id, song.song_id)
                .await
                .unwrap(),
        );
    }

    let overflow = common::approved_song(&db, "One Too Many").await;
    let err = queue
        .submit(event.event_id, player.user_id, overflow.song_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(_)));

    let played = queue
        .mark_played(
            event.event_id,
            entries[0].entry_id,
            organizer.user_id,
            &MarkPlayedRequest { score: Some(8500) },
        )
        .await
        .unwrap();
    assert_eq!(played.state, QueueEntryState::Finished);
    assert_eq!(played.score, Some(8500));

    queue
        .submit(event.event_id, player.user_id, overflow.song_id)
        .await
        .unwrap();

    let listing = queue.list(event.event_id).await.unwrap();
    assert_eq!(listing.len(), 4);
    assert_eq!(listing[0].state, QueueEntryState::Pending);
}

#[tokio::test]
async fn duplicate_pending_song_conflicts_until_played() {
    let db = common::setup().await;
    let (event, organizer) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 0, false).await;
    let first = common::user(&db, "first", UserRole::Player).await;
    let second = common::user(&db, "second", UserRole::Player).await;
    let song = common::approved_song(&db, "In The Mood").await;

    let queue = QueueAdmission::new(db.pool().clone());
    let entry = queue
        .submit(event.event_id, first.user_id, song.song_id)
        .await
        .unwrap();

    let err = queue
        .submit(event.event_id, second.user_id, song.song_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Duplicate suppression only looks at pending entries.
    queue
        .mark_played(event.event_id, entry.entry_id, organizer.user_id, &MarkPlayedRequest::default())
        .await
        .unwrap();
    queue
        .submit(event.event_id, second.user_id, song.song_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicates_allowed_when_configured() {
    let db = common::setup().await;
    let (event, _) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 0, true).await;
    let first = common::user(&db, "first", UserRole::Player).await;
    let second = common::user(&db, "second", UserRole::Player).await;
    let song = common::approved_song(&db, "In The Mood").await;

    let queue = QueueAdmission::new(db.pool().clone());
    queue.submit(event.event_id, first.user_id, song.song_id).await.unwrap();
    queue.submit(event.event_id, second.user_id, song.song_id).await.unwrap();
}

#[tokio::test]
async fn cooldown_rate_limits_until_the_boundary() {
    let db = common::setup().await;
    let (event, _) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 5, false).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;
    let first_song = common::approved_song(&db, "Opener").await;
    let second_song = common::approved_song(&db, "Follow Up").await;

    let queue = QueueAdmission::new(db.pool().clone());
    let entry = queue
        .submit(event.event_id, player.user_id, first_song.song_id)
        .await
        .unwrap();

    let err = queue
        .submit(event.event_id, player.user_id, second_song.song_id)
        .await
        .unwrap_err();
    match err {
        EngineError::RateLimited { wait_minutes } => {
            assert!((1..=5).contains(&wait_minutes), "wait was {wait_minutes}");
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }

    // Rewind the last entry to exactly the cooldown boundary.
    sqlx::query("UPDATE queue_entries SET created_at = ? WHERE entry_id = ?")
        .bind(Utc::now() - Duration::minutes(5))
        .bind(entry.entry_id)
        .execute(db.pool())
        .await
        .unwrap();

    queue
        .submit(event.event_id, player.user_id, second_song.song_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn cooldown_counts_finished_entries_too() {
    let db = common::setup().await;
    let (event, organizer) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 5, false).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;
    let first_song = common::approved_song(&db, "Opener").await;
    let second_song = common::approved_song(&db, "Follow Up").await;

    let queue = QueueAdmission::new(db.pool().clone());
    let entry = queue
        .submit(event.event_id, player.user_id, first_song.song_id)
        .await
        .unwrap();
    queue
        .mark_played(event.event_id, entry.entry_id, organizer.user_id, &MarkPlayedRequest::default())
        .await
        .unwrap();

    // The entry is no longer pending, but still throttles.
    let err = queue
        .submit(event.event_id, player.user_id, second_song.song_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RateLimited { .. }));
}

#[tokio::test]
async fn mark_played_is_organizer_only_and_terminal() {
    let db = common::setup().await;
    let (event, organizer) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 0, false).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;
    let song = common::approved_song(&db, "Moonglow").await;

    let queue = QueueAdmission::new(db.pool().clone());
    let entry = queue
        .submit(event.event_id, player.user_id, song.song_id)
        .await
        .unwrap();

    let err = queue
        .mark_played(event.event_id, entry.entry_id, player.user_id, &MarkPlayedRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = queue
        .mark_played(
            event.event_id,
            entry.entry_id,
            organizer.user_id,
            &MarkPlayedRequest { score: Some(20000) },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    queue
        .mark_played(event.event_id, entry.entry_id, organizer.user_id, &MarkPlayedRequest::default())
        .await
        .unwrap();

    let err = queue
        .mark_played(event.event_id, entry.entry_id, organizer.user_id, &MarkPlayedRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn remove_allows_owner_organizer_and_admin_only() {
    let db = common::setup().await;
    let (event, _) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 0, false).await;
    let owner = common::user(&db, "owner", UserRole::Player).await;
    let stranger = common::user(&db, "stranger", UserRole::Player).await;
    let admin = common::user(&db, "root", UserRole::Admin).await;

    let queue = QueueAdmission::new(db.pool().clone());

    let song = common::approved_song(&db, "First").await;
    let entry = queue.submit(event.event_id, owner.user_id, song.song_id).await.unwrap();
    let err = queue.remove(entry.entry_id, stranger.user_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    queue.remove(entry.entry_id, owner.user_id).await.unwrap();

    let song = common::approved_song(&db, "Second").await;
    let entry = queue.submit(event.event_id, owner.user_id, song.song_id).await.unwrap();
    queue.remove(entry.entry_id, admin.user_id).await.unwrap();

    assert!(queue.list(event.event_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_submissions_never_exceed_the_quota() {
    let db = common::setup().await;
    let (event, _) = common::event_with_modules(&db).await;
    configure_queue(&db, event.event_id, 0, false).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;

    let mut songs = Vec::new();
    for i in 0..6 {
        songs.push(common::approved_song(&db, &format!("Track {i}")).await);
    }

    let queue = Arc::new(QueueAdmission::new(db.pool().clone()));
    let mut handles = Vec::new();
    for song in songs {
        let queue = Arc::clone(&queue);
        let event_id = event.event_id;
        let user_id = player.user_id;
        handles.push(tokio::spawn(async move {
            queue.submit(event_id, user_id, song.song_id).await
        }));
    }

    let mut admitted = 0;
    let mut over_quota = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(EngineError::QuotaExceeded(_)) => over_quota += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(admitted, 3);
    assert_eq!(over_quota, 3);
}
