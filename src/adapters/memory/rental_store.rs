use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::inventory::{InventoryItem, ItemStatus};
use crate::domain::rental::{PromoSnapshot, Rental};
use crate::domain::value_objects::{CustomerId, InventoryItemId, PromoCodeId, RentalId};
use crate::ports::rental_store::{
    RentalStore as RentalStoreTrait, RentalUnitOfWork, Result, StoreError,
};

/// ストアの共有状態
#[derive(Default)]
struct StoreState {
    items: HashMap<InventoryItemId, InventoryItem>,
    rentals: BTreeMap<i64, Rental>,
    promos: HashMap<PromoCodeId, PromoSnapshot>,
}

/// RentalStoreのインメモリ実装
///
/// テストとローカル実行用。作業単位は楽観的に動く：読み取り時に観測した
/// アイテムステータスをコミット時にひとつのロックの下で再検証し、
/// 途中で変わっていれば `Conflict` で失敗する。これにより同じアイテムを
/// 奪い合う並行予約はどちらか一方しか成功しない。
pub struct InMemoryRentalStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryRentalStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    /// テスト用に在庫アイテムを登録
    pub fn seed_item(&self, item: InventoryItem) {
        self.state.lock().unwrap().items.insert(item.item_id, item);
    }

    /// テスト用にプロモーションコードを登録
    pub fn seed_promo(&self, promo: PromoSnapshot) {
        self.state
            .lock()
            .unwrap()
            .promos
            .insert(promo.promo_code_id, promo);
    }

    /// テスト用：アイテムの現在ステータスを覗く
    pub fn item_status(&self, item_id: InventoryItemId) -> Option<ItemStatus> {
        self.state
            .lock()
            .unwrap()
            .items
            .get(&item_id)
            .map(|item| item.status)
    }

    /// テスト用：保存されているレンタル件数
    pub fn rental_count(&self) -> usize {
        self.state.lock().unwrap().rentals.len()
    }
}

impl Default for InMemoryRentalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RentalStoreTrait for InMemoryRentalStore {
    async fn begin(&self) -> Result<Box<dyn RentalUnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            state: Arc::clone(&self.state),
            observed: Vec::new(),
            staged_statuses: Vec::new(),
            staged_rental: None,
        }))
    }

    async fn fetch_rental(&self, rental_id: RentalId) -> Result<Option<Rental>> {
        let state = self.state.lock().unwrap();
        Ok(state.rentals.get(&rental_id.value()).cloned())
    }

    async fn find_rentals_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Rental>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rentals
            .values()
            .filter(|rental| rental.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn fetch_item(&self, item_id: InventoryItemId) -> Result<Option<InventoryItem>> {
        let state = self.state.lock().unwrap();
        Ok(state.items.get(&item_id).cloned())
    }
}

/// インメモリの作業単位
///
/// 書き込みはコミットまでステージに溜める。コミットはひとつのロックの下で
/// 「読んだときのステータスのまま変わっていないこと」と「採番したレンタルIDが
/// まだ使われていないこと」を検証してから適用する。
struct InMemoryUnitOfWork {
    state: Arc<Mutex<StoreState>>,
    /// 読み取り時に観測した (アイテムID, ステータス)
    observed: Vec<(InventoryItemId, ItemStatus)>,
    /// ステージされたステータス遷移
    staged_statuses: Vec<(InventoryItemId, ItemStatus)>,
    /// ステージされたレンタル挿入
    staged_rental: Option<Rental>,
}

#[async_trait]
impl RentalUnitOfWork for InMemoryUnitOfWork {
    async fn load_items(&mut self, item_ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>> {
        let state = self.state.lock().unwrap();
        let mut found = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            if let Some(item) = state.items.get(item_id) {
                self.observed.push((item.item_id, item.status));
                found.push(item.clone());
            }
        }
        Ok(found)
    }

    async fn update_item_statuses(
        &mut self,
        item_ids: &[InventoryItemId],
        status: ItemStatus,
    ) -> Result<()> {
        for item_id in item_ids {
            self.staged_statuses.push((*item_id, status));
        }
        Ok(())
    }

    async fn next_rental_id(&mut self) -> Result<RentalId> {
        let state = self.state.lock().unwrap();
        let max_id = state.rentals.keys().next_back().copied().unwrap_or(0);
        Ok(RentalId::from_i64(max_id + 1))
    }

    async fn load_promo(&mut self, promo_code_id: PromoCodeId) -> Result<Option<PromoSnapshot>> {
        let state = self.state.lock().unwrap();
        Ok(state.promos.get(&promo_code_id).cloned())
    }

    async fn insert_rental(&mut self, rental: &Rental) -> Result<()> {
        self.staged_rental = Some(rental.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnitOfWork {
            state,
            observed,
            staged_statuses,
            staged_rental,
        } = *self;
        let mut state = state.lock().unwrap();

        // 観測したステータスが今も変わっていないことを検証する
        for (item_id, observed_status) in &observed {
            match state.items.get(item_id) {
                Some(current) if current.status == *observed_status => {}
                _ => return Err(StoreError::Conflict),
            }
        }

        // 採番したレンタルIDが横取りされていないことを検証する
        if let Some(rental) = &staged_rental {
            if state.rentals.contains_key(&rental.rental_id.value()) {
                return Err(StoreError::Conflict);
            }
        }

        // 検証が通ったのでまとめて適用する
        for (item_id, status) in staged_statuses {
            if let Some(item) = state.items.get_mut(&item_id) {
                item.status = status;
            }
        }
        if let Some(rental) = staged_rental {
            state.rentals.insert(rental.rental_id.value(), rental);
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // ステージを捨てるだけでよい
        Ok(())
    }
}
