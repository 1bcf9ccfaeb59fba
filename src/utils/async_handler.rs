use std::future::Future;

use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Runs a fallible request operation and forwards its failure to the
/// centralized error responder.
///
/// Handlers keep their business logic inside an `async` block returning
/// `Result<T, ApiError>` and hand it to this wrapper, so every failure leaves
/// the handler through one channel.
pub async fn async_handler<Fut, T>(operation: Fut) -> Response
where
    Fut: Future<Output = Result<T, ApiError>>,
    T: IntoResponse,
{
    match operation.await {
        Ok(value) => value.into_response(),
        Err(err) => next(err),
    }
}

fn next(err: ApiError) -> Response {
    tracing::debug!(
        status = err.status_code(),
        origin = err.stack(),
        "request failed: {}",
        err.message()
    );
    err.into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[tokio::test]
    async fn passes_success_through() {
        let response = async_handler(async { Ok::<_, ApiError>(StatusCode::ACCEPTED) }).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn forwards_failure_to_error_responder() {
        let response = async_handler(async {
            Err::<StatusCode, _>(ApiError::not_found("User does not exist"))
        })
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "User does not exist");
    }
}
