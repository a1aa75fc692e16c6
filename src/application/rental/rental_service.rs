use std::sync::Arc;

use crate::domain::commands::CreateRental;
use crate::domain::errors::RequestValidationError;
use crate::domain::rental::{Rental, RentalKind, check_out};
use crate::ports::rental_store::{RentalStore, RentalUnitOfWork};

use super::errors::{RentalOperationError, Result};
use super::inventory_ledger;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub store: Arc<dyn RentalStore>,
}

/// レンタルを作成する
///
/// ビジネスルール：
/// - アイテムリストは空でなく、重複を含まないこと
/// - 要求されたすべてのアイテムが存在し AVAILABLE であること
/// - レンタルの店舗は先頭アイテムの店舗とする
/// - status = OPEN、rented_at = now、due_at = now + 7日
///
/// # 一貫性保証
///
/// 在庫ステータスの遷移とレンタルの挿入はひとつのアトミックな作業単位で
/// 行われる。両方がコミットされるか、どちらも残らないかのいずれかであり、
/// 途中状態が観測されることはない。
///
/// # 戻り値
/// 作成されたレンタル（明細行・プロモスナップショット込み）
pub async fn create_rental(deps: &ServiceDependencies, cmd: CreateRental) -> Result<Rental> {
    check_out_with(deps, RentalKind::Rent, cmd).await
}

/// 予約を作成する
///
/// `create_rental` と同じ流れで、在庫は RESERVED へ遷移し、
/// レンタルは status = RESERVED、reserved_at = now だけを持つ
/// （rented_at / due_at は未設定のまま）。
pub async fn create_reservation(deps: &ServiceDependencies, cmd: CreateRental) -> Result<Rental> {
    check_out_with(deps, RentalKind::Reserve, cmd).await
}

/// レンタル・予約作成の共通本体
async fn check_out_with(
    deps: &ServiceDependencies,
    kind: RentalKind,
    cmd: CreateRental,
) -> Result<Rental> {
    // 1. コマンドの検証（純粋関数）
    cmd.validate()?;

    // 2. アトミックな作業単位を開始
    let mut uow = deps.store.begin().await?;

    // 3〜6. 予約・構築・挿入。失敗したら作業単位ごと破棄する
    match build_and_insert(uow.as_mut(), kind, &cmd).await {
        Ok(rental) => {
            // 7. コミット。失敗すれば在庫もレンタルも一切残らない
            uow.commit().await?;
            Ok(rental)
        }
        Err(err) => {
            // ドロップでもロールバックされるが、明示的に破棄して結果だけ記録する
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!("rollback after failed checkout also failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// 作業単位の中で行う本体：予約 → 採番 → 構築 → 挿入
async fn build_and_insert(
    uow: &mut dyn RentalUnitOfWork,
    kind: RentalKind,
    cmd: &CreateRental,
) -> Result<Rental> {
    // 3. 在庫台帳にアイテム一括予約を委譲（失敗はそのまま伝播）
    let reserved_items =
        inventory_ledger::reserve_batch(uow, &cmd.item_ids, kind.item_status()).await?;

    // 4. プロモーションコードのスナップショットを同じ作業単位で解決
    let promo = match cmd.promo_code_id {
        Some(promo_code_id) => Some(uow.load_promo(promo_code_id).await?.ok_or(
            RentalOperationError::InvalidRequest(RequestValidationError::UnknownPromoCode(
                promo_code_id,
            )),
        )?),
        None => None,
    };

    // 5. レンタルIDの採番（既存の最大ID + 1、同じ作業単位の中）
    let rental_id = uow.next_rental_id().await?;

    // 6. 集約を構築して挿入
    let rental = check_out(
        kind,
        rental_id,
        cmd.customer_id,
        cmd.employee_id,
        promo,
        &reserved_items,
        cmd.requested_at,
    )?;
    uow.insert_rental(&rental).await?;

    Ok(rental)
}
