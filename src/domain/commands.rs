use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::RequestValidationError;
use super::{CustomerId, EmployeeId, InventoryItemId, PromoCodeId};

/// コマンド：レンタルまたは予約を作成する
///
/// 同じコマンド型をRENTとRESERVEの両方で使う。操作種別は
/// アプリケーション層のエントリポイントが決める。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRental {
    pub customer_id: CustomerId,
    pub employee_id: Option<EmployeeId>,
    pub promo_code_id: Option<PromoCodeId>,
    /// 在庫アイテムID（入力順が明細行の順になる）
    pub item_ids: Vec<InventoryItemId>,
    pub requested_at: DateTime<Utc>,
}

impl CreateRental {
    /// 純粋関数：コマンドの検証
    ///
    /// ビジネスルール：
    /// - アイテムリストは空でないこと
    /// - アイテムIDに重複がないこと
    ///
    /// 顧客IDの存在は型で保証される（必須フィールド）。
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.item_ids.is_empty() {
            return Err(RequestValidationError::NoItems);
        }

        let mut seen = HashSet::with_capacity(self.item_ids.len());
        for item_id in &self.item_ids {
            if !seen.insert(*item_id) {
                return Err(RequestValidationError::DuplicateItem(*item_id));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(item_ids: Vec<i64>) -> CreateRental {
        CreateRental {
            customer_id: CustomerId::from_i64(7),
            employee_id: None,
            promo_code_id: None,
            item_ids: item_ids.into_iter().map(InventoryItemId::from_i64).collect(),
            requested_at: Utc::now(),
        }
    }

    // TDD: validate() のテスト
    #[test]
    fn test_validate_accepts_distinct_items() {
        assert!(command(vec![101, 102]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_items() {
        let result = command(vec![]).validate();
        assert_eq!(result.unwrap_err(), RequestValidationError::NoItems);
    }

    #[test]
    fn test_validate_rejects_duplicate_items() {
        let result = command(vec![101, 101]).validate();
        assert_eq!(
            result.unwrap_err(),
            RequestValidationError::DuplicateItem(InventoryItemId::from_i64(101))
        );
    }

    #[test]
    fn test_validate_names_first_duplicate() {
        let result = command(vec![101, 102, 102, 101]).validate();
        assert_eq!(
            result.unwrap_err(),
            RequestValidationError::DuplicateItem(InventoryItemId::from_i64(102))
        );
    }
}
