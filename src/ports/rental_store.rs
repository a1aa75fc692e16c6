use async_trait::async_trait;
use thiserror::Error;

use crate::domain::inventory::{InventoryItem, ItemStatus};
use crate::domain::rental::{PromoSnapshot, Rental};
use crate::domain::value_objects::{CustomerId, InventoryItemId, PromoCodeId, RentalId};

/// ストア層のエラー
///
/// `Conflict` は同じ行を触った並行書き込みに負けたことを表す（再試行可能）。
/// それ以外のインフラ障害は `Backend` に包む。
#[derive(Debug, Error)]
pub enum StoreError {
    /// 並行する書き込みと衝突した（呼び出し側はリクエストを再送してよい）
    #[error("conflicting concurrent update")]
    Conflict,
    /// バックエンドのI/O障害
    #[error("backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// レンタルストアポート
///
/// 在庫アイテムとレンタルの両方にまたがる永続化を抽象化する。
/// 書き込みはすべて `begin` が返すアトミックな作業単位の中で行い、
/// 読み取り専用のクエリは作業単位の外で直接提供する。
#[async_trait]
pub trait RentalStore: Send + Sync {
    /// アトミックな作業単位を開始する
    ///
    /// 作業単位の中の読み書きは、コミットまで他の作業単位から観測されない。
    /// コミットに失敗した場合、どの書き込みも永続化されない。
    async fn begin(&self) -> Result<Box<dyn RentalUnitOfWork>>;

    /// IDでレンタルを取得する（明細行込み）
    async fn fetch_rental(&self, rental_id: RentalId) -> Result<Option<Rental>>;

    /// 顧客の全レンタルを取得する
    async fn find_rentals_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Rental>>;

    /// IDで在庫アイテムを取得する
    async fn fetch_item(&self, item_id: InventoryItemId) -> Result<Option<InventoryItem>>;
}

/// アトミックな作業単位
///
/// 在庫アイテムの読み取りとステータス遷移、レンタルID採番、レンタル挿入を
/// ひとつの境界にまとめる。`load_items` が返したステータスは、コミット時点まで
/// 他の作業単位によって変更されないことが分離性として保証される
/// （行ロックまたは楽観検証。衝突は `StoreError::Conflict`）。
#[async_trait]
pub trait RentalUnitOfWork: Send {
    /// 指定IDの在庫アイテムを読み込む
    ///
    /// 存在するアイテムだけを返す（欠けているIDの検出は呼び出し側の責務）。
    /// 返した行はこの作業単位の決着までステータス遷移から保護される。
    async fn load_items(&mut self, item_ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>>;

    /// 指定IDの在庫アイテムのステータスを一括で変更する
    async fn update_item_statuses(
        &mut self,
        item_ids: &[InventoryItemId],
        status: ItemStatus,
    ) -> Result<()>;

    /// 次のレンタルIDを採番する（既存の最大ID + 1）
    ///
    /// この読み取りは同じ作業単位の中で行われる。並行する採番同士の衝突は
    /// コミット時に `Conflict` として表面化する。
    async fn next_rental_id(&mut self) -> Result<RentalId>;

    /// プロモーションコードのスナップショットを読み込む
    async fn load_promo(&mut self, promo_code_id: PromoCodeId) -> Result<Option<PromoSnapshot>>;

    /// 新しいレンタルを挿入する（明細行込み）
    async fn insert_rental(&mut self, rental: &Rental) -> Result<()>;

    /// 作業単位をコミットする
    ///
    /// 成功すればすべての書き込みが耐久化される。失敗すればどれも残らない。
    async fn commit(self: Box<Self>) -> Result<()>;

    /// 作業単位を破棄する
    ///
    /// ステージされた書き込みをすべて取り消す。ドロップでも同じ結果になる。
    async fn rollback(self: Box<Self>) -> Result<()>;
}
