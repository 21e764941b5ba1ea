use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::Song;

/// Repository for Song catalog lookups
pub struct SongRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SongRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, title: &str, artist: Option<&str>, approved: bool) -> Result<Song> {
        let song = Song {
            song_id: Uuid::new_v4(),
            title: title.to_string(),
            artist: artist.map(str::to_string),
            approved,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO songs (song_id, title, artist, approved, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(song.song_id)
        .bind(&song.title)
        .bind(&song.artist)
        .bind(song.approved)
        .bind(song.created_at)
        .execute(self.pool)
        .await?;

        Ok(song)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Song> {
        sqlx::query_as::<_, Song>(
            r#"
            SELECT song_id, title, artist, approved, created_at
            FROM songs
            WHERE song_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)
    }

    pub async fn set_approved(&self, id: Uuid, approved: bool) -> Result<()> {
        let result = sqlx::query("UPDATE songs SET approved = ? WHERE song_id = ?")
            .bind(approved)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}
