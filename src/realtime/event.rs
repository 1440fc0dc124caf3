use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{SeatId, ShowtimeId};

/// Номер подписки; растёт монотонно в пределах сессии.
pub type SubscriptionId = u64;

pub const SEAT_LOCKED: &str = "seat_locked";
pub const SEAT_LOCKED_FAILED: &str = "seat_locked_failed";

/// Входящее событие push-канала.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Места заняты другим покупателем.
    SeatLocked(Vec<SeatId>),
    /// Информационное сообщение, состояние не меняет.
    SeatLockFailed(String),
}

/// Событие вместе с подпиской, которая его доставила.
#[derive(Debug, Clone, PartialEq)]
pub struct LockNotice {
    pub subscription: SubscriptionId,
    pub showtime_id: ShowtimeId,
    pub event: PushEvent,
}

#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(alias = "type")]
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeatIdList {
    Bare(Vec<SeatId>),
    Wrapped {
        #[serde(alias = "listSeatId", alias = "seats")]
        #[serde(rename = "seatIds")]
        seat_ids: Vec<SeatId>,
    },
}

impl PushEvent {
    /// Разбирает текстовый кадр `{"event": "...", "data": ...}`.
    /// Неизвестные события и битые кадры возвращают `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Ignoring malformed push frame: {}", e);
                return None;
            }
        };

        match frame.event.as_str() {
            SEAT_LOCKED => match serde_json::from_value::<SeatIdList>(frame.data) {
                Ok(SeatIdList::Bare(ids)) | Ok(SeatIdList::Wrapped { seat_ids: ids }) => {
                    Some(PushEvent::SeatLocked(ids))
                }
                Err(e) => {
                    debug!("Ignoring seat_locked frame with bad payload: {}", e);
                    None
                }
            },
            SEAT_LOCKED_FAILED => {
                let message = match &frame.data {
                    Value::String(message) => message.clone(),
                    other => other
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                };
                Some(PushEvent::SeatLockFailed(message))
            }
            other => {
                debug!(event = other, "Ignoring unknown push event");
                None
            }
        }
    }
}
