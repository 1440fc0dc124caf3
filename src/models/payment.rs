use serde::Serialize;
use validator::Validate;

use super::{ComboId, SeatId, ShowtimeId, UserId};

/// Тело `POST /payments/client`.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub user_id: UserId,
    pub showtime_id: ShowtimeId,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub list_seat_id: Vec<SeatId>,
    #[validate(length(min = 1, message = "payment method is required"))]
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub list_combo: Option<Vec<ComboLine>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ComboLine {
    pub combo_id: ComboId,
    #[validate(range(min = 1))]
    pub quantity: u32,
}
