use serde::{Deserialize, Serialize};

use super::{FormatId, InventoryItemId, LocationId, MovieId};

/// 在庫アイテムの貸出可否ステータス
///
/// 不変条件：許される遷移は
/// AVAILABLE→RENTED、AVAILABLE→RESERVED、{RENTED, RESERVED}→AVAILABLE のみ。
/// 遷移は在庫台帳（inventory_ledger）だけが、アトミックな作業単位の内側で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    /// 貸出可能
    Available,
    /// 貸出中
    Rented,
    /// 予約済み
    Reserved,
}

impl ItemStatus {
    /// 永続化層で使う文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "AVAILABLE",
            ItemStatus::Rented => "RENTED",
            ItemStatus::Reserved => "RESERVED",
        }
    }

    /// 貸出・予約の対象にできるか
    pub fn is_available(&self) -> bool {
        matches!(self, ItemStatus::Available)
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(ItemStatus::Available),
            "RENTED" => Ok(ItemStatus::Rented),
            "RESERVED" => Ok(ItemStatus::Reserved),
            _ => Err(format!("Invalid item status: {}", s)),
        }
    }
}

/// 在庫アイテム - ある店舗にある、ある映画の1本の物理コピー
///
/// 在庫プロビジョニング（スコープ外）が作成し、ステータスだけが
/// 在庫台帳によって変更される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: InventoryItemId,
    pub movie_id: MovieId,
    pub format_id: FormatId,
    pub location_id: LocationId,
    pub status: ItemStatus,
}

impl InventoryItem {
    /// 確認時点のカタログ参照を写し取ったスナップショットを返す
    ///
    /// スナップショットはレンタル明細行に埋め込まれ、後からの
    /// カタログ変更が過去のレンタル記録に波及しないようにする。
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            movie_id: self.movie_id,
            format_id: self.format_id,
            location_id: self.location_id,
        }
    }
}

/// アイテムスナップショット - 予約確定時点のカタログ参照の写し
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub movie_id: MovieId,
    pub format_id: FormatId,
    pub location_id: LocationId,
}
