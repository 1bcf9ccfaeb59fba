use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::{USER_EXISTS, UserStore, VideoStore};
use crate::{
    error::ApiError,
    models::{
        pagination::Page,
        user::{NewUser, User, UserChanges},
        video::{NewVideo, Video, VideoQuery},
    },
};

const USER_COLUMNS: &str = "id, username, email, full_name, avatar, cover_image, watch_history, \
     password, refresh_token, created_at, updated_at";

const VIDEO_COLUMNS: &str = "id, video_file, thumbnail, title, description, duration, views, \
     is_published, owner, created_at, updated_at";

/// Postgres error code for unique violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == "23505")
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 \
             ORDER BY (username = $1) DESC LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, ApiError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, full_name, avatar, cover_image, password)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.avatar)
            .bind(&user.cover_image)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::conflict(USER_EXISTS)
                } else {
                    ApiError::from(e)
                }
            })
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, ApiError> {
        let (touch_refresh_token, refresh_token) = match changes.refresh_token {
            Some(token) => (true, token),
            None => (false, None),
        };

        let sql = format!(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                avatar = COALESCE($4, avatar),
                cover_image = COALESCE($5, cover_image),
                password = COALESCE($6, password),
                refresh_token = CASE WHEN $7 THEN $8 ELSE refresh_token END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.full_name)
            .bind(changes.email)
            .bind(changes.avatar)
            .bind(changes.cover_image)
            .bind(changes.password)
            .bind(touch_refresh_token)
            .bind(refresh_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::conflict(USER_EXISTS)
                } else {
                    ApiError::from(e)
                }
            })
    }
}

pub struct PgVideoStore {
    pool: PgPool,
}

impl PgVideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A video row plus the window count of all rows matching the filter.
#[derive(FromRow)]
struct VideoPageRow {
    #[sqlx(flatten)]
    video: Video,
    total_docs: i64,
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn insert(&self, video: NewVideo) -> Result<Video, ApiError> {
        let sql = format!(
            r#"
            INSERT INTO videos (video_file, thumbnail, title, description, duration, is_published, owner)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VIDEO_COLUMNS}
            "#
        );
        let video = sqlx::query_as::<_, Video>(&sql)
            .bind(video.video_file)
            .bind(video.thumbnail)
            .bind(video.title)
            .bind(video.description)
            .bind(video.duration)
            .bind(video.is_published)
            .bind(video.owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(video)
    }

    async fn paginate(&self, query: VideoQuery) -> Result<Page<Video>, ApiError> {
        const FILTER: &str = "($1::BIGINT IS NULL OR owner = $1) \
             AND ($2::BOOLEAN IS NULL OR is_published = $2)";

        // Sort column and direction come from closed enums, never from raw input.
        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS}, COUNT(*) OVER() AS total_docs
            FROM videos
            WHERE {FILTER}
            ORDER BY {} {}, id {}
            LIMIT $3 OFFSET $4
            "#,
            query.sort_by.column(),
            query.sort_type.keyword(),
            query.sort_type.keyword(),
        );

        let rows = sqlx::query_as::<_, VideoPageRow>(&sql)
            .bind(query.owner)
            .bind(query.is_published)
            .bind(query.options.limit as i64)
            .bind(query.options.sql_offset())
            .fetch_all(&self.pool)
            .await?;

        let total_docs = match rows.first() {
            Some(row) => row.total_docs as u64,
            None if query.options.page > 1 => {
                let count_sql = format!("SELECT COUNT(*) FROM videos WHERE {FILTER}");
                let (count,): (i64,) = sqlx::query_as(&count_sql)
                    .bind(query.owner)
                    .bind(query.is_published)
                    .fetch_one(&self.pool)
                    .await?;
                count as u64
            }
            None => 0,
        };

        let docs = rows.into_iter().map(|row| row.video).collect();
        Ok(Page::new(docs, total_docs, query.options))
    }
}
