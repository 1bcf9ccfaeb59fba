use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::Response,
};

use crate::{
    error::ApiError,
    models::video::{VideoListParams, VideoQuery},
    state::AppState,
    utils::{api_response::ApiResponse, async_handler::async_handler},
};

/// List videos, one page at a time.
/// Supports filtering by owner and publication state and sorting by any
/// listed field.
pub async fn list_videos(
    State(state): State<AppState>,
    params: Result<Query<VideoListParams>, QueryRejection>,
) -> Response {
    async_handler(async move {
        let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
        let page = state.videos.paginate(VideoQuery::from(params)).await?;
        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::OK,
            page,
            "Videos fetched successfully",
        ))
    })
    .await
}
