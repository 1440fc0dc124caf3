pub mod combo;
pub mod movie;
pub mod payment;
pub mod rank;
pub mod seat;
pub mod showtime;

pub use combo::{Combo, ComboItem};
pub use movie::MovieDetail;
pub use payment::{ComboLine, PaymentRequest};
pub use rank::MemberRank;
pub use seat::{Seat, SeatCategory, SeatCode, SeatRecord, SeatStatus};
pub use showtime::{Showtime, Theater};

use serde::{de::Error as _, Deserialize, Deserializer};

pub type SeatId = i64;
pub type ShowtimeId = i64;
pub type TheaterId = i64;
pub type MovieId = i64;
pub type ComboId = i64;
pub type UserId = i64;

/// Деньги в целых единицах валюты.
pub type Money = i64;

/// Верхняя граница суммы, которую клиент принимает от сервера.
pub const MAX_AMOUNT: Money = 1_000_000_000_000;

/// Перевод суммы с сервера в [`Money`]. `None` для отрицательных,
/// нечисловых и неправдоподобно больших значений.
pub fn money_from_amount(value: f64) -> Option<Money> {
    if !value.is_finite() || value < 0.0 || value > MAX_AMOUNT as f64 {
        return None;
    }
    Some(value.round() as Money)
}

// Бэкенд присылает цены и как целые, и как дробные числа
pub(crate) fn deserialize_money<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    money_from_amount(value).ok_or_else(|| D::Error::custom(format!("invalid amount {value}")))
}
