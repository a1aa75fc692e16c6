use std::fmt;

use super::{InventoryItemId, PromoCodeId};

/// リクエスト検証のエラー
///
/// 呼び出し側の入力が不正な場合に返す。入力を直さない限り再試行しても無意味。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestValidationError {
    /// アイテムリストが空
    NoItems,
    /// 同じアイテムIDが複数回指定された
    DuplicateItem(InventoryItemId),
    /// 指定されたプロモーションコードが存在しない
    UnknownPromoCode(PromoCodeId),
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestValidationError::NoItems => {
                write!(f, "inventory_items must contain at least one item")
            }
            RequestValidationError::DuplicateItem(id) => {
                write!(f, "inventory item {} is listed more than once", id)
            }
            RequestValidationError::UnknownPromoCode(id) => {
                write!(f, "promo code {} does not exist", id)
            }
        }
    }
}

impl std::error::Error for RequestValidationError {}
