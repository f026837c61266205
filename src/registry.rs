//! Content-registry shim: read-only lookup of a post's submitter and
//! media reference. Used only to attribute the submitter earning at
//! settlement; the registry itself (upload, watermarking, moderation)
//! is an external collaborator.

use sqlx::SqliteConnection;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ContentMeta {
    pub owner_account_id: Option<i64>,
    pub media_ref: String,
}

pub async fn content_meta(conn: &mut SqliteConnection, post_id: i64) -> Result<Option<ContentMeta>> {
    let row: Option<(Option<i64>, String)> =
        sqlx::query_as("SELECT owner_account_id, media_ref FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|(owner_account_id, media_ref)| ContentMeta { owner_account_id, media_ref }))
}
