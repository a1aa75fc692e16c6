use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::application::rental::{
    ServiceDependencies, create_rental as execute_create_rental,
    create_reservation as execute_create_reservation,
};
use crate::domain::value_objects::{CustomerId, InventoryItemId, RentalId};

use super::{
    error::ApiError,
    types::{
        CreateRentalRequest, ErrorResponse, InventoryItemResponse, ListRentalsQuery,
        RentalResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /rentals - 新しいレンタルを作成
///
/// 強制されるビジネスルール:
/// - アイテムリストが空でなく、重複を含まないこと
/// - 要求されたすべてのアイテムが存在し AVAILABLE であること
/// - 在庫遷移とレンタル挿入がひとつの作業単位でコミットされること
pub async fn create_rental(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRentalRequest>,
) -> Result<(StatusCode, Json<RentalResponse>), ApiError> {
    let cmd = req.to_command();

    let rental = execute_create_rental(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(RentalResponse::from(rental))))
}

/// POST /reservations - 新しい予約を作成
///
/// レンタル作成と同じ検証・同じ原子性保証。在庫は RESERVED へ遷移し、
/// レンタルは RESERVED ステータスで reserved_at だけを持つ。
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRentalRequest>,
) -> Result<(StatusCode, Json<RentalResponse>), ApiError> {
    let cmd = req.to_command();

    let rental = execute_create_reservation(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(RentalResponse::from(rental))))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /rentals/:id - レンタル詳細をIDで取得
///
/// 見つかった場合はレンタル情報（明細行込み）を返し、見つからない場合は404を返す。
pub async fn get_rental_by_id(
    State(state): State<Arc<AppState>>,
    Path(rental_id): Path<i64>,
) -> Result<Json<RentalResponse>, QueryError> {
    let rental_id = RentalId::from_i64(rental_id);

    match state.service_deps.store.fetch_rental(rental_id).await {
        Ok(Some(rental)) => Ok(Json(RentalResponse::from(rental))),
        Ok(None) => Err(QueryError::NotFound(format!(
            "Rental {} not found",
            rental_id
        ))),
        Err(e) => Err(QueryError::InternalError(e.to_string())),
    }
}

/// GET /rentals - オプションフィルタ付きレンタル一覧取得
///
/// クエリパラメータ:
/// - customer_id: 顧客IDでフィルタリング（必須）
/// - status: ステータスでフィルタリング（RESERVED, OPEN, ...）（オプション）
pub async fn list_rentals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRentalsQuery>,
) -> Result<Json<Vec<RentalResponse>>, QueryError> {
    // customer_idを必須とする
    let customer_id = query.customer_id.ok_or_else(|| {
        QueryError::BadRequest("customer_id query parameter is required".to_string())
    })?;

    let customer_id = CustomerId::from_i64(customer_id);

    let rentals = state
        .service_deps
        .store
        .find_rentals_by_customer(customer_id)
        .await
        .map_err(|e| QueryError::InternalError(e.to_string()))?;

    // ステータスフィルタが指定されている場合は適用
    let filtered: Vec<RentalResponse> = if let Some(status_str) = &query.status {
        let status =
            super::types::parse_status_filter(status_str).map_err(QueryError::BadRequest)?;

        rentals
            .into_iter()
            .filter(|rental| rental.status == status)
            .map(RentalResponse::from)
            .collect()
    } else {
        rentals.into_iter().map(RentalResponse::from).collect()
    };

    Ok(Json(filtered))
}

/// GET /inventory/:id - 在庫アイテムの現在ステータスを取得
pub async fn get_inventory_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<i64>,
) -> Result<Json<InventoryItemResponse>, QueryError> {
    let item_id = InventoryItemId::from_i64(item_id);

    match state.service_deps.store.fetch_item(item_id).await {
        Ok(Some(item)) => Ok(Json(InventoryItemResponse {
            item_id: item.item_id.value(),
            movie_id: item.movie_id.value(),
            format_id: item.format_id.value(),
            location_id: item.location_id.value(),
            status: item.status.as_str().to_string(),
        })),
        Ok(None) => Err(QueryError::NotFound(format!(
            "Inventory item {} not found",
            item_id
        ))),
        Err(e) => Err(QueryError::InternalError(e.to_string())),
    }
}

// ============================================================================
// Error types
// ============================================================================

/// クエリハンドラー用のエラー型
#[derive(Debug)]
pub enum QueryError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            QueryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            QueryError::InternalError(msg) => {
                // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                tracing::error!("Internal error in query handler: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
