use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::commands::CreateRental;
use crate::domain::rental::{PromoSnapshot, Rental, RentalLine, RentalStatus};
use crate::domain::value_objects::{CustomerId, EmployeeId, InventoryItemId, PromoCodeId};

/// リクエストボディのアイテム参照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItemRef {
    pub item_id: i64,
}

/// レンタル・予約作成リクエスト（POST /rentals、POST /reservations）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRentalRequest {
    pub customer_id: i64,
    pub employee_id: Option<i64>,
    pub promo_code_id: Option<i64>,
    pub inventory_items: Vec<InventoryItemRef>,
}

impl CreateRentalRequest {
    /// リクエストをコマンドに変換する（requested_at はこの時点の現在時刻）
    pub fn to_command(&self) -> CreateRental {
        CreateRental {
            customer_id: CustomerId::from_i64(self.customer_id),
            employee_id: self.employee_id.map(EmployeeId::from_i64),
            promo_code_id: self.promo_code_id.map(PromoCodeId::from_i64),
            item_ids: self
                .inventory_items
                .iter()
                .map(|item| InventoryItemId::from_i64(item.item_id))
                .collect(),
            requested_at: Utc::now(),
        }
    }
}

/// レンタル一覧取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListRentalsQuery {
    /// 顧客IDでフィルタリング
    pub customer_id: Option<i64>,
    /// ステータスでフィルタリング
    pub status: Option<String>,
}

/// レンタル明細行レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct RentalLineResponse {
    pub rental_item_id: i64,
    pub inventory_item_id: i64,
    pub movie_id: i64,
    pub format_id: i64,
}

impl From<&RentalLine> for RentalLineResponse {
    fn from(line: &RentalLine) -> Self {
        Self {
            rental_item_id: line.line_id.value(),
            inventory_item_id: line.item_id.value(),
            movie_id: line.movie_id.value(),
            format_id: line.format_id.value(),
        }
    }
}

/// プロモーションスナップショットレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct PromoResponse {
    pub promo_code_id: i64,
    pub code: String,
    pub percent_off: Option<f64>,
    pub amount_off_dkk: Option<f64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<&PromoSnapshot> for PromoResponse {
    fn from(promo: &PromoSnapshot) -> Self {
        Self {
            promo_code_id: promo.promo_code_id.value(),
            code: promo.code.clone(),
            percent_off: promo.percent_off,
            amount_off_dkk: promo.amount_off_dkk,
            starts_at: promo.starts_at,
            ends_at: promo.ends_at,
        }
    }
}

/// レンタルレスポンス（詳細形式、明細行込み）
#[derive(Debug, Serialize, Deserialize)]
pub struct RentalResponse {
    pub id: i64,
    pub customer_id: i64,
    pub location_id: i64,
    pub employee_id: Option<i64>,
    pub status: String,
    pub reserved_at: Option<DateTime<Utc>>,
    pub rented_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub items: Vec<RentalLineResponse>,
    pub promo: Option<PromoResponse>,
}

impl From<Rental> for RentalResponse {
    fn from(rental: Rental) -> Self {
        Self {
            id: rental.rental_id.value(),
            customer_id: rental.customer_id.value(),
            location_id: rental.location_id.value(),
            employee_id: rental.employee_id.map(|id| id.value()),
            status: rental.status.as_str().to_string(),
            reserved_at: rental.reserved_at,
            rented_at: rental.rented_at,
            due_at: rental.due_at,
            returned_at: rental.returned_at,
            items: rental.lines.iter().map(RentalLineResponse::from).collect(),
            promo: rental.promo.as_ref().map(PromoResponse::from),
        }
    }
}

/// 在庫アイテムレスポンス（GET /inventory/:id）
#[derive(Debug, Serialize, Deserialize)]
pub struct InventoryItemResponse {
    pub item_id: i64,
    pub movie_id: i64,
    pub format_id: i64,
    pub location_id: i64,
    pub status: String,
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// ステータスクエリパラメータのパースとバリデーション
pub fn parse_status_filter(status: &str) -> Result<RentalStatus, String> {
    status.parse::<RentalStatus>()
}
