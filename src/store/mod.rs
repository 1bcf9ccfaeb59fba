//! Persistence ports.
//!
//! Handlers only see these traits; the concrete store is injected through
//! `AppState`. `postgres` is the production adapter, `memory` backs tests and
//! local experiments.

use async_trait::async_trait;

use crate::{
    error::ApiError,
    models::{
        pagination::Page,
        user::{NewUser, User, UserChanges},
        video::{NewVideo, Video, VideoQuery},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryUserStore, MemoryVideoStore};
pub use postgres::{PgUserStore, PgVideoStore};

/// Message used whenever a username or email is already taken.
pub const USER_EXISTS: &str = "User Already Exist";

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user whose username or whose email matches. When the two
    /// identifiers name different users, the username match wins.
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, ApiError>;

    /// Inserts an already-prepared record.
    ///
    /// Implementations must enforce uniqueness of `username` and `email`
    /// atomically and report a violation as a 409 `ApiError`.
    async fn insert(&self, user: NewUser) -> Result<User, ApiError>;

    /// Writes the given changes verbatim. Returns `None` for an unknown id.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, ApiError>;
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Stores a video record. No HTTP route publishes videos; this seeds
    /// the listing from fixtures and tooling.
    async fn insert(&self, video: NewVideo) -> Result<Video, ApiError>;

    /// Filters, sorts and slices in one pass, returning the page together
    /// with the total number of matching videos.
    async fn paginate(&self, query: VideoQuery) -> Result<Page<Video>, ApiError>;
}
