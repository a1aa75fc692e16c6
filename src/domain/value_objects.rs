use std::fmt;

use serde::{Deserialize, Serialize};

/// 在庫アイテムID - 在庫管理コンテキストの識別子
///
/// 元システムの整数キーをそのまま使用する（UUIDではない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryItemId(i64);

impl InventoryItemId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// レンタルID - レンタル集約の識別子
///
/// 作成時に採番される連番。採番はアトミックな作業単位の内側で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RentalId(i64);

impl RentalId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RentalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// レンタル明細行ID
///
/// レンタルIDと行位置（1始まり）から決定的に導出される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RentalLineId(i64);

impl RentalLineId {
    /// レンタルIDと行位置から明細行IDを導出する
    ///
    /// 同じ（レンタルID, 位置）の組は常に同じ行IDになる。
    pub fn derive(rental_id: RentalId, position: usize) -> Self {
        Self(rental_id.value() * 1000 + position as i64 + 1)
    }

    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RentalLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 顧客ID - 顧客管理コンテキストへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(i64);

impl CustomerId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 従業員ID - 従業員管理コンテキストへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(i64);

impl EmployeeId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// プロモーションコードID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromoCodeId(i64);

impl PromoCodeId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PromoCodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 映画ID - カタログ管理コンテキストへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovieId(i64);

impl MovieId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// フォーマットID（DVD/Blu-ray/VHSなど） - カタログ管理コンテキストへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatId(i64);

impl FormatId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 店舗ID - 店舗管理コンテキストへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(i64);

impl LocationId {
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_item_id_round_trip() {
        let id = InventoryItemId::from_i64(101);
        assert_eq!(id.value(), 101);
        assert_eq!(id.to_string(), "101");
    }

    #[test]
    fn test_rental_id_ordering() {
        let a = RentalId::from_i64(1);
        let b = RentalId::from_i64(2);
        assert!(a < b);
        assert_ne!(a, b);
    }

    // TDD: RentalLineId::derive() のテスト
    #[test]
    fn test_rental_line_id_is_deterministic() {
        let rental_id = RentalId::from_i64(42);
        let first = RentalLineId::derive(rental_id, 0);
        let again = RentalLineId::derive(rental_id, 0);
        assert_eq!(first, again);
    }

    #[test]
    fn test_rental_line_id_encodes_rental_and_position() {
        let rental_id = RentalId::from_i64(42);
        // 1始まりの行番号がレンタルIDに連結される
        assert_eq!(RentalLineId::derive(rental_id, 0).value(), 42_001);
        assert_eq!(RentalLineId::derive(rental_id, 1).value(), 42_002);
    }

    #[test]
    fn test_rental_line_id_differs_between_rentals() {
        let a = RentalLineId::derive(RentalId::from_i64(1), 0);
        let b = RentalLineId::derive(RentalId::from_i64(2), 0);
        assert_ne!(a, b);
    }
}
