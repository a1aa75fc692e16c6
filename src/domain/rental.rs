use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::RequestValidationError;
use super::inventory::ItemSnapshot;
use super::{
    CustomerId, EmployeeId, FormatId, InventoryItemId, ItemStatus, LocationId, MovieId,
    PromoCodeId, RentalId, RentalLineId,
};

/// レンタル期間（日数）
pub const RENTAL_PERIOD_DAYS: i64 = 7;

/// レンタルのステータス
///
/// この中核が作り出すのは OPEN（レンタル）と RESERVED（予約）のみ。
/// RETURNED / LATE / CANCELLED への遷移は返却・キャンセルフロー（スコープ外）が
/// 同じ作業単位の規律で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RentalStatus {
    /// 予約済み（未貸出）
    Reserved,
    /// 貸出中
    Open,
    /// 返却済み
    Returned,
    /// 延滞
    Late,
    /// キャンセル済み
    Cancelled,
}

impl RentalStatus {
    /// 永続化層で使う文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Reserved => "RESERVED",
            RentalStatus::Open => "OPEN",
            RentalStatus::Returned => "RETURNED",
            RentalStatus::Late => "LATE",
            RentalStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for RentalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(RentalStatus::Reserved),
            "OPEN" => Ok(RentalStatus::Open),
            "RETURNED" => Ok(RentalStatus::Returned),
            "LATE" => Ok(RentalStatus::Late),
            "CANCELLED" => Ok(RentalStatus::Cancelled),
            _ => Err(format!("Invalid rental status: {}", s)),
        }
    }
}

/// 操作種別：レンタルか予約か
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalKind {
    Rent,
    Reserve,
}

impl RentalKind {
    /// この操作が在庫アイテムに与えるステータス
    pub fn item_status(&self) -> ItemStatus {
        match self {
            RentalKind::Rent => ItemStatus::Rented,
            RentalKind::Reserve => ItemStatus::Reserved,
        }
    }

    /// この操作が作るレンタルの初期ステータス
    pub fn initial_status(&self) -> RentalStatus {
        match self {
            RentalKind::Rent => RentalStatus::Open,
            RentalKind::Reserve => RentalStatus::Reserved,
        }
    }
}

/// レンタル明細行
///
/// 作成時点のスナップショットを保持する。ライブジョインはしない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalLine {
    pub line_id: RentalLineId,
    pub item_id: InventoryItemId,
    pub movie_id: MovieId,
    pub format_id: FormatId,
}

/// プロモーションコードのスナップショット
///
/// 割引計算はスコープ外。作成時点のコード内容だけを写し取る。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoSnapshot {
    pub promo_code_id: PromoCodeId,
    pub code: String,
    pub percent_off: Option<f64>,
    pub amount_off_dkk: Option<f64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// レンタル集約 - 1回のレンタルまたは予約のトランザクション
///
/// 明細行が参照する在庫アイテムIDの集合は作成時に固定され、
/// 作成の瞬間において、他のアクティブなレンタルの明細行と重ならない
/// （在庫台帳のアトミックな予約により強制される）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub rental_id: RentalId,
    pub customer_id: CustomerId,
    pub employee_id: Option<EmployeeId>,
    pub location_id: LocationId,
    pub status: RentalStatus,

    // ステータスに応じて埋まるタイムスタンプ群
    pub reserved_at: Option<DateTime<Utc>>,
    pub rented_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,

    pub lines: Vec<RentalLine>,
    pub promo: Option<PromoSnapshot>,
}

/// 純粋関数：予約済みアイテム群からレンタル集約を構築する
///
/// ビジネスルール：
/// - 明細行は入力順。行IDはレンタルIDと行位置から決定的に導出する
/// - 店舗は先頭アイテムの店舗とする（複数店舗にまたがる入力でも先頭優先。
///   既知の簡略化であり、ここでは修正しない）
/// - RENT：status = OPEN、rented_at = now、due_at = now + 7日
/// - RESERVE：status = RESERVED、reserved_at = now のみ
///
/// 副作用なし。呼び出し側が同じ作業単位の中で永続化する。
pub fn check_out(
    kind: RentalKind,
    rental_id: RentalId,
    customer_id: CustomerId,
    employee_id: Option<EmployeeId>,
    promo: Option<PromoSnapshot>,
    reserved_items: &[(InventoryItemId, ItemSnapshot)],
    now: DateTime<Utc>,
) -> Result<Rental, RequestValidationError> {
    let Some((_, first)) = reserved_items.first() else {
        return Err(RequestValidationError::NoItems);
    };
    let location_id = first.location_id;

    let lines = reserved_items
        .iter()
        .enumerate()
        .map(|(position, (item_id, snapshot))| RentalLine {
            line_id: RentalLineId::derive(rental_id, position),
            item_id: *item_id,
            movie_id: snapshot.movie_id,
            format_id: snapshot.format_id,
        })
        .collect();

    let (reserved_at, rented_at, due_at) = match kind {
        RentalKind::Rent => (None, Some(now), Some(now + Duration::days(RENTAL_PERIOD_DAYS))),
        RentalKind::Reserve => (Some(now), None, None),
    };

    Ok(Rental {
        rental_id,
        customer_id,
        employee_id,
        location_id,
        status: kind.initial_status(),
        reserved_at,
        rented_at,
        due_at,
        returned_at: None,
        lines,
        promo,
    })
}
