use axum::{http::StatusCode, response::Response};

use crate::{
    error::ApiError,
    utils::{api_response::ApiResponse, async_handler::async_handler},
};

pub async fn healthcheck() -> Response {
    async_handler(async { Ok::<_, ApiError>(ApiResponse::with_message(StatusCode::OK, (), "OK")) })
        .await
}
