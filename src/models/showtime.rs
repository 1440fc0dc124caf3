use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ShowtimeId, TheaterId};

/// Кинотеатр, в котором фильм идёт в выбранную дату.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theater {
    pub id: TheaterId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Сеанс: фильм в конкретном зале в конкретное время.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: ShowtimeId,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub room_id: i64,
    pub room_name: String,
    #[serde(default)]
    pub total_seats: Option<u32>,
    #[serde(default)]
    pub available_seats: Option<u32>,
}
