use std::sync::Arc;

use chrono::{Duration, Utc};
use movie_rental_ddd::adapters::memory::InMemoryRentalStore;
use movie_rental_ddd::application::rental::{
    RentalOperationError, ServiceDependencies, create_rental, create_reservation,
    inventory_ledger,
};
use movie_rental_ddd::domain::commands::CreateRental;
use movie_rental_ddd::domain::inventory::{InventoryItem, ItemStatus};
use movie_rental_ddd::domain::rental::{PromoSnapshot, RentalStatus};
use movie_rental_ddd::domain::value_objects::*;
use movie_rental_ddd::ports::rental_store::RentalStore;

// ============================================================================
// テスト用ヘルパー
// ============================================================================

/// インメモリストアとサービス依存関係を組み立てる
fn setup() -> (ServiceDependencies, Arc<InMemoryRentalStore>) {
    let store = Arc::new(InMemoryRentalStore::new());
    let deps = ServiceDependencies {
        store: store.clone(),
    };
    (deps, store)
}

/// 在庫アイテムを組み立てる
fn item(id: i64, movie: i64, format: i64, location: i64, status: ItemStatus) -> InventoryItem {
    InventoryItem {
        item_id: InventoryItemId::from_i64(id),
        movie_id: MovieId::from_i64(movie),
        format_id: FormatId::from_i64(format),
        location_id: LocationId::from_i64(location),
        status,
    }
}

/// レンタル作成コマンドを組み立てる
fn command(customer: i64, items: &[i64]) -> CreateRental {
    CreateRental {
        customer_id: CustomerId::from_i64(customer),
        employee_id: None,
        promo_code_id: None,
        item_ids: items.iter().map(|id| InventoryItemId::from_i64(*id)).collect(),
        requested_at: Utc::now(),
    }
}

fn item_id(id: i64) -> InventoryItemId {
    InventoryItemId::from_i64(id)
}

// ============================================================================
// 正常系
// ============================================================================

#[tokio::test]
async fn test_create_rental_success() {
    let (deps, store) = setup();
    // 顧客7が店舗3のアイテム[101, 102]をレンタルする
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));
    store.seed_item(item(102, 9, 2, 3, ItemStatus::Available));

    let cmd = command(7, &[101, 102]);
    let requested_at = cmd.requested_at;
    let rental = create_rental(&deps, cmd).await.unwrap();

    // レンタルの形：OPEN、due = rented + 7日、店舗は先頭アイテムの店舗
    assert_eq!(rental.status, RentalStatus::Open);
    assert_eq!(rental.rented_at, Some(requested_at));
    assert_eq!(rental.due_at, Some(requested_at + Duration::days(7)));
    assert_eq!(rental.location_id, LocationId::from_i64(3));
    assert_eq!(rental.customer_id, CustomerId::from_i64(7));

    // 明細行は要求順に一致する
    let line_items: Vec<InventoryItemId> =
        rental.lines.iter().map(|line| line.item_id).collect();
    assert_eq!(line_items, vec![item_id(101), item_id(102)]);

    // 両アイテムが RENTED になっている
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Rented));
    assert_eq!(store.item_status(item_id(102)), Some(ItemStatus::Rented));

    // レンタルが永続化され、読み直せる
    let fetched = store.fetch_rental(rental.rental_id).await.unwrap().unwrap();
    assert_eq!(fetched, rental);
}

#[tokio::test]
async fn test_create_reservation_sets_reserved_state() {
    let (deps, store) = setup();
    store.seed_item(item(201, 4, 3, 2, ItemStatus::Available));

    let cmd = command(7, &[201]);
    let requested_at = cmd.requested_at;
    let rental = create_reservation(&deps, cmd).await.unwrap();

    // 予約：RESERVED、reserved_at のみ設定される
    assert_eq!(rental.status, RentalStatus::Reserved);
    assert_eq!(rental.reserved_at, Some(requested_at));
    assert_eq!(rental.rented_at, None);
    assert_eq!(rental.due_at, None);

    // アイテムは RESERVED になる
    assert_eq!(store.item_status(item_id(201)), Some(ItemStatus::Reserved));
}

#[tokio::test]
async fn test_rental_ids_are_allocated_sequentially() {
    let (deps, store) = setup();
    store.seed_item(item(101, 1, 1, 1, ItemStatus::Available));
    store.seed_item(item(102, 1, 1, 1, ItemStatus::Available));

    let first = create_rental(&deps, command(7, &[101])).await.unwrap();
    let second = create_rental(&deps, command(8, &[102])).await.unwrap();

    assert_eq!(first.rental_id, RentalId::from_i64(1));
    assert_eq!(second.rental_id, RentalId::from_i64(2));
}

// ============================================================================
// 失敗系：検証と在庫確認
// ============================================================================

#[tokio::test]
async fn test_create_rental_fails_when_item_not_available() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));
    store.seed_item(item(102, 9, 2, 3, ItemStatus::Reserved));

    let result = create_rental(&deps, command(7, &[101, 102])).await;

    // 貸出不可のIDが名指しされる
    match result.unwrap_err() {
        RentalOperationError::ItemNotAvailable(ids) => {
            assert_eq!(ids, vec![item_id(102)]);
        }
        other => panic!("Expected ItemNotAvailable, got {:?}", other),
    }

    // 貸出可能だった方のアイテムも含め、何も変更されない
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Available));
    assert_eq!(store.item_status(item_id(102)), Some(ItemStatus::Reserved));
    assert_eq!(store.rental_count(), 0);
}

#[tokio::test]
async fn test_create_rental_fails_when_item_missing() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));

    let result = create_rental(&deps, command(7, &[101, 999])).await;

    // 存在しないIDが名指しされる
    match result.unwrap_err() {
        RentalOperationError::ItemNotFound(ids) => {
            assert_eq!(ids, vec![item_id(999)]);
        }
        other => panic!("Expected ItemNotFound, got {:?}", other),
    }

    // 副作用なし
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Available));
    assert_eq!(store.rental_count(), 0);
}

#[tokio::test]
async fn test_create_rental_rejects_duplicate_items() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));

    let result = create_rental(&deps, command(7, &[101, 101])).await;

    assert!(matches!(
        result.unwrap_err(),
        RentalOperationError::InvalidRequest(_)
    ));
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Available));
}

#[tokio::test]
async fn test_create_rental_rejects_empty_items() {
    let (deps, _store) = setup();

    let result = create_rental(&deps, command(7, &[])).await;

    assert!(matches!(
        result.unwrap_err(),
        RentalOperationError::InvalidRequest(_)
    ));
}

#[tokio::test]
async fn test_failed_request_leaves_no_hidden_state() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));

    // 1回目：存在しないアイテムを含むため失敗する
    let result = create_rental(&deps, command(7, &[101, 999])).await;
    assert!(result.is_err());

    // 2回目：入力を直して再送すると、独立した新しい評価として成功する
    let rental = create_rental(&deps, command(7, &[101])).await.unwrap();
    assert_eq!(rental.rental_id, RentalId::from_i64(1));
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Rented));
}

// ============================================================================
// プロモーションコード
// ============================================================================

#[tokio::test]
async fn test_create_rental_embeds_promo_snapshot() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));
    let promo = PromoSnapshot {
        promo_code_id: PromoCodeId::from_i64(11),
        code: "WELCOME10".to_string(),
        percent_off: Some(10.0),
        amount_off_dkk: None,
        starts_at: None,
        ends_at: None,
    };
    store.seed_promo(promo.clone());

    let mut cmd = command(7, &[101]);
    cmd.promo_code_id = Some(PromoCodeId::from_i64(11));

    let rental = create_rental(&deps, cmd).await.unwrap();
    assert_eq!(rental.promo, Some(promo));
}

#[tokio::test]
async fn test_unknown_promo_code_rolls_back_reservation() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));

    let mut cmd = command(7, &[101]);
    cmd.promo_code_id = Some(PromoCodeId::from_i64(99));

    let result = create_rental(&deps, cmd).await;
    assert!(matches!(
        result.unwrap_err(),
        RentalOperationError::InvalidRequest(_)
    ));

    // 予約まで進んでいても、作業単位ごと破棄されて在庫は元のまま
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Available));
    assert_eq!(store.rental_count(), 0);
}

// ============================================================================
// 並行性
// ============================================================================

#[tokio::test]
async fn test_concurrent_rentals_for_same_item_have_one_winner() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));

    // 同じアイテムを要求する2つの呼び出しを同時に走らせる
    let (first, second) = futures::future::join(
        create_rental(&deps, command(7, &[101])),
        create_rental(&deps, command(8, &[101])),
    )
    .await;

    // ちょうど一方だけが成功する
    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    // 敗者は ItemNotAvailable か ConcurrentModification で失敗する
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(
        loser.unwrap_err(),
        RentalOperationError::ItemNotAvailable(_) | RentalOperationError::ConcurrentModification
    ));

    // 最終状態：アイテムは RENTED、参照するレンタルはちょうど1件
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Rented));
    assert_eq!(store.rental_count(), 1);
}

#[tokio::test]
async fn test_concurrent_rentals_for_disjoint_items_both_succeed_or_retry() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));
    store.seed_item(item(102, 9, 2, 3, ItemStatus::Available));

    let (first, second) = futures::future::join(
        create_rental(&deps, command(7, &[101])),
        create_rental(&deps, command(8, &[102])),
    )
    .await;

    // アイテムが重ならない場合、失敗するとしてもID採番の競合（再試行可能）だけ
    for result in [first, second] {
        match result {
            Ok(rental) => assert_eq!(rental.lines.len(), 1),
            Err(err) => assert!(matches!(
                err,
                RentalOperationError::ConcurrentModification
            )),
        }
    }
}

// ============================================================================
// 在庫台帳の解放契約
// ============================================================================

#[tokio::test]
async fn test_release_batch_returns_items_to_available() {
    let (deps, store) = setup();
    store.seed_item(item(101, 7, 1, 3, ItemStatus::Available));
    store.seed_item(item(102, 9, 2, 3, ItemStatus::Available));

    create_rental(&deps, command(7, &[101, 102])).await.unwrap();
    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Rented));

    // 返却フロー（スコープ外）が使う台帳契約：一括で AVAILABLE に戻す
    let ids = [item_id(101), item_id(102)];
    let mut uow = store.begin().await.unwrap();
    inventory_ledger::release_batch(uow.as_mut(), &ids).await.unwrap();
    uow.commit().await.unwrap();

    assert_eq!(store.item_status(item_id(101)), Some(ItemStatus::Available));
    assert_eq!(store.item_status(item_id(102)), Some(ItemStatus::Available));
}
