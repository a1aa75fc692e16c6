use thiserror::Error;

use crate::domain::errors::RequestValidationError;
use crate::domain::value_objects::InventoryItemId;
use crate::ports::rental_store::StoreError;

/// IDリストをエラーメッセージ用に整形する
fn join_ids(ids: &[InventoryItemId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// レンタル作成処理のエラー
///
/// どのエラーでも部分的な状態は一切コミットされない。
/// 再試行可能なのは `ConcurrentModification` と `TransactionAborted` のみ。
#[derive(Debug, Error)]
pub enum RentalOperationError {
    /// 呼び出し側の入力が不正（入力を直さない限り再試行不可）
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestValidationError),

    /// 存在しない在庫アイテムIDが指定された（再試行不可）
    #[error("inventory items not found: {}", join_ids(.0))]
    ItemNotFound(Vec<InventoryItemId>),

    /// 在庫アイテムが貸出可能ではない（別のアイテムを選ばない限り再試行不可）
    #[error("inventory items not available: {}", join_ids(.0))]
    ItemNotAvailable(Vec<InventoryItemId>),

    /// 同じアイテムを奪い合う並行リクエストに負けた（同じリクエストの再送で再試行可能）
    #[error("lost a concurrent race for the requested items, retry the request")]
    ConcurrentModification,

    /// 作業単位がインフラ要因でコミットできなかった（再試行可能）
    #[error("transaction aborted")]
    TransactionAborted(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for RentalOperationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => RentalOperationError::ConcurrentModification,
            StoreError::Backend(source) => RentalOperationError::TransactionAborted(source),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, RentalOperationError>;
