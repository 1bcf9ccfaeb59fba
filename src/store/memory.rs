use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{USER_EXISTS, UserStore, VideoStore};
use crate::{
    error::ApiError,
    models::{
        pagination::Page,
        user::{NewUser, User, UserChanges},
        video::{NewVideo, SortType, Video, VideoQuery, VideoSortField},
    },
};

struct Table<T> {
    next_id: i64,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Users kept in process memory. Uniqueness checks and writes happen under
/// one lock, so concurrent inserts of the same identity cannot both succeed.
#[derive(Default)]
pub struct MemoryUserStore {
    table: Mutex<Table<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, secrets included.
    pub async fn all(&self) -> Vec<User> {
        self.table.lock().await.rows.clone()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        let table = self.table.lock().await;
        let by_username = table.rows.iter().find(|user| user.username == username);
        Ok(by_username
            .or_else(|| table.rows.iter().find(|user| user.email == email))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, ApiError> {
        let table = self.table.lock().await;
        Ok(table.rows.iter().find(|user| user.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, ApiError> {
        let mut table = self.table.lock().await;
        if table
            .rows
            .iter()
            .any(|row| row.username == user.username || row.email == user.email)
        {
            return Err(ApiError::conflict(USER_EXISTS));
        }

        let now = Utc::now();
        let record = User {
            id: table.allocate_id(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: Vec::new(),
            password: user.password,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, ApiError> {
        let mut table = self.table.lock().await;

        if let Some(email) = &changes.email
            && table.rows.iter().any(|row| row.id != id && &row.email == email)
        {
            return Err(ApiError::conflict(USER_EXISTS));
        }

        let Some(user) = table.rows.iter_mut().find(|user| user.id == id) else {
            return Ok(None);
        };

        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = avatar;
        }
        if let Some(cover_image) = changes.cover_image {
            user.cover_image = cover_image;
        }
        if let Some(password) = changes.password {
            user.password = password;
        }
        if let Some(refresh_token) = changes.refresh_token {
            user.refresh_token = refresh_token;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }
}

#[derive(Default)]
pub struct MemoryVideoStore {
    table: Mutex<Table<Video>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(field: VideoSortField, a: &Video, b: &Video) -> Ordering {
    match field {
        VideoSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        VideoSortField::Views => a.views.cmp(&b.views),
        VideoSortField::Duration => a.duration.total_cmp(&b.duration),
        VideoSortField::Title => a.title.cmp(&b.title),
    }
    .then(a.id.cmp(&b.id))
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn insert(&self, video: NewVideo) -> Result<Video, ApiError> {
        let mut table = self.table.lock().await;
        let now = Utc::now();
        let record = Video {
            id: table.allocate_id(),
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: 0,
            is_published: video.is_published,
            owner: video.owner,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn paginate(&self, query: VideoQuery) -> Result<Page<Video>, ApiError> {
        let table = self.table.lock().await;

        let mut matching: Vec<&Video> = table.rows.iter().filter(|v| query.matches(v)).collect();
        matching.sort_by(|a, b| {
            let ordering = compare(query.sort_by, a, b);
            match query.sort_type {
                SortType::Asc => ordering,
                SortType::Desc => ordering.reverse(),
            }
        });

        let total_docs = matching.len() as u64;
        let docs = matching
            .into_iter()
            .skip(usize::try_from(query.options.offset()).unwrap_or(usize::MAX))
            .take(query.options.limit as usize)
            .cloned()
            .collect();

        Ok(Page::new(docs, total_docs, query.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pagination::PaginateOptions;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            full_name: "Someone".into(),
            avatar: "http://media/a.png".into(),
            cover_image: String::new(),
            password: "hash".into(),
        }
    }

    fn new_video(owner: i64, title: &str, published: Option<bool>) -> NewVideo {
        NewVideo {
            video_file: format!("http://media/{title}.mp4"),
            thumbnail: format!("http://media/{title}.png"),
            title: title.into(),
            description: String::new(),
            duration: 12.5,
            is_published: published,
            owner,
        }
    }

    #[tokio::test]
    async fn insert_rejects_taken_username_or_email() {
        let store = MemoryUserStore::new();
        store.insert(new_user("ada", "ada@example.com")).await.unwrap();

        let err = store.insert(new_user("ada", "other@example.com")).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        let err = store.insert(new_user("bob", "ada@example.com")).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn lookup_matches_either_identifier() {
        let store = MemoryUserStore::new();
        store.insert(new_user("ada", "ada@example.com")).await.unwrap();

        assert!(store.find_by_username_or_email("ada", "x@y.z").await.unwrap().is_some());
        assert!(store.find_by_username_or_email("zed", "ada@example.com").await.unwrap().is_some());
        assert!(store.find_by_username_or_email("zed", "x@y.z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn username_match_wins_over_email_match() {
        let store = MemoryUserStore::new();
        store.insert(new_user("ada", "ada@example.com")).await.unwrap();
        store.insert(new_user("bob", "bob@example.com")).await.unwrap();

        let found = store
            .find_by_username_or_email("bob", "ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.username, "bob");
    }

    #[tokio::test]
    async fn update_can_clear_refresh_token() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("ada", "ada@example.com")).await.unwrap();

        let changes = UserChanges {
            refresh_token: Some(Some("r1".into())),
            ..Default::default()
        };
        let updated = store.update(user.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.refresh_token.as_deref(), Some("r1"));

        let changes = UserChanges {
            refresh_token: Some(None),
            ..Default::default()
        };
        let updated = store.update(user.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.refresh_token, None);
        assert!(store.update(999, UserChanges::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn paginates_filtered_videos() {
        let store = MemoryVideoStore::new();
        for i in 0..5 {
            store.insert(new_video(1, &format!("v{i}"), Some(true))).await.unwrap();
        }
        store.insert(new_video(2, "other", Some(true))).await.unwrap();
        store.insert(new_video(1, "draft", None)).await.unwrap();

        let query = VideoQuery {
            owner: Some(1),
            is_published: Some(true),
            sort_by: VideoSortField::Title,
            sort_type: SortType::Asc,
            options: PaginateOptions::new(Some(2), Some(2)),
        };
        let page = store.paginate(query).await.unwrap();

        assert_eq!(page.total_docs, 5);
        assert_eq!(page.total_pages, 3);
        let titles: Vec<_> = page.docs.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, ["v2", "v3"]);
    }
}
