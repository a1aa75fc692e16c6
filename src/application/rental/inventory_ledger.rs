use std::collections::HashMap;

use crate::domain::inventory::{ItemSnapshot, ItemStatus};
use crate::domain::value_objects::InventoryItemId;
use crate::ports::rental_store::RentalUnitOfWork;

use super::errors::{RentalOperationError, Result};

/// 在庫台帳：アイテム可用性の唯一の管理者
///
/// AVAILABLE からの遷移はこのモジュールの `reserve_batch` だけが行い、
/// AVAILABLE への復帰は `release_batch` だけが行う。どちらも呼び出し側が
/// 渡すアトミックな作業単位の中で動く。

/// 純粋でない関数：アイテム一括予約
///
/// 渡されたすべてのアイテムが存在し AVAILABLE であることを確認した上で、
/// 同じ作業単位の中で `target` へ遷移させる。確認と遷移は分離不可能であり、
/// 並行する予約と同じアイテムを奪い合った場合はどちらか一方だけが成功する。
///
/// 前提条件：`item_ids` は空でなく、重複を含まない（コマンド検証で保証）。
///
/// # 戻り値
/// 入力順のアイテムスナップショット（IDとの組）。呼び出し側はこれを
/// レンタル明細行へ埋め込む。
///
/// # エラー
/// - `ItemNotFound`：存在しないIDがあった（該当IDをすべて列挙）
/// - `ItemNotAvailable`：AVAILABLE でないIDがあった（該当IDをすべて列挙）
/// - `ConcurrentModification`：並行する書き込みに負けた
///
/// どのエラーでも、どのアイテムのステータスも変更されない。
pub async fn reserve_batch(
    uow: &mut dyn RentalUnitOfWork,
    item_ids: &[InventoryItemId],
    target: ItemStatus,
) -> Result<Vec<(InventoryItemId, ItemSnapshot)>> {
    debug_assert!(!target.is_available(), "reserve target must not be AVAILABLE");

    // 1. 要求されたアイテムを作業単位の中で読み込む
    let items = uow.load_items(item_ids).await?;
    let by_id: HashMap<InventoryItemId, _> =
        items.iter().map(|item| (item.item_id, item)).collect();

    // 2. 欠けているIDを列挙する
    let missing: Vec<InventoryItemId> = item_ids
        .iter()
        .copied()
        .filter(|id| !by_id.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(RentalOperationError::ItemNotFound(missing));
    }

    // 3. 貸出可能でないIDを列挙する
    let unavailable: Vec<InventoryItemId> = item_ids
        .iter()
        .copied()
        .filter(|id| !by_id[id].status.is_available())
        .collect();
    if !unavailable.is_empty() {
        return Err(RentalOperationError::ItemNotAvailable(unavailable));
    }

    // 4. 一括で遷移させ、確認時点のスナップショットを返す
    uow.update_item_statuses(item_ids, target).await?;

    Ok(item_ids
        .iter()
        .map(|id| (*id, by_id[id].snapshot()))
        .collect())
}

/// 純粋でない関数：アイテム一括解放
///
/// 返却・キャンセルフロー（スコープ外）が使う台帳側の契約。
/// 各アイテムを AVAILABLE に戻す。`reserve_batch` と同じく、呼び出し側の
/// アトミックな作業単位の中で動く。
pub async fn release_batch(
    uow: &mut dyn RentalUnitOfWork,
    item_ids: &[InventoryItemId],
) -> Result<()> {
    uow.update_item_statuses(item_ids, ItemStatus::Available)
        .await?;
    Ok(())
}
