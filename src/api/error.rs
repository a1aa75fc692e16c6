use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::rental::RentalOperationError;

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(RentalOperationError);

impl From<RentalOperationError> for ApiError {
    fn from(err: RentalOperationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self.0 {
            // 400 Bad Request - 入力を直さない限り再試行しても無意味
            RentalOperationError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", self.0.to_string())
            }
            RentalOperationError::ItemNotFound(_) => {
                (StatusCode::BAD_REQUEST, "ITEM_NOT_FOUND", self.0.to_string())
            }
            RentalOperationError::ItemNotAvailable(_) => (
                StatusCode::BAD_REQUEST,
                "ITEM_NOT_AVAILABLE",
                self.0.to_string(),
            ),

            // 409 Conflict - 同じリクエストの再送で解決しうる
            RentalOperationError::ConcurrentModification => (
                StatusCode::CONFLICT,
                "CONCURRENT_MODIFICATION",
                self.0.to_string(),
            ),

            // 500 Internal Server Error - システム障害
            // 詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            RentalOperationError::TransactionAborted(source) => {
                tracing::error!("transaction aborted: {}", source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TRANSACTION_ABORTED",
                    "The rental could not be completed, please retry".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
