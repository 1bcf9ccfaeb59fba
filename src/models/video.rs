use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::pagination::PaginateOptions;

/// Represents the 'videos' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Seconds.
    pub duration: f64,
    pub views: i64,
    /// `None` means the owner never decided.
    pub is_published: Option<bool>,
    /// Owning user id.
    pub owner: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub is_published: Option<bool>,
    pub owner: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VideoSortField {
    #[default]
    CreatedAt,
    Views,
    Duration,
    Title,
}

impl VideoSortField {
    pub fn column(self) -> &'static str {
        match self {
            VideoSortField::CreatedAt => "created_at",
            VideoSortField::Views => "views",
            VideoSortField::Duration => "duration",
            VideoSortField::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Asc,
    #[default]
    Desc,
}

impl SortType {
    pub fn keyword(self) -> &'static str {
        match self {
            SortType::Asc => "ASC",
            SortType::Desc => "DESC",
        }
    }
}

/// Query parameters for listing videos.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub owner: Option<i64>,
    pub is_published: Option<bool>,
    pub sort_by: Option<VideoSortField>,
    pub sort_type: Option<SortType>,
}

/// Filter, order and window handed to `VideoStore::paginate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoQuery {
    pub owner: Option<i64>,
    pub is_published: Option<bool>,
    pub sort_by: VideoSortField,
    pub sort_type: SortType,
    pub options: PaginateOptions,
}

impl From<VideoListParams> for VideoQuery {
    fn from(params: VideoListParams) -> Self {
        Self {
            owner: params.owner,
            is_published: params.is_published,
            sort_by: params.sort_by.unwrap_or_default(),
            sort_type: params.sort_type.unwrap_or_default(),
            options: PaginateOptions::new(params.page, params.limit),
        }
    }
}

impl VideoQuery {
    pub fn matches(&self, video: &Video) -> bool {
        self.owner.is_none_or(|owner| video.owner == owner)
            && self
                .is_published
                .is_none_or(|published| video.is_published == Some(published))
    }
}
