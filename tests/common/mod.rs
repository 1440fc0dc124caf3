//! Общие заготовки для интеграционных тестов: фикстуры бэкенда и
//! push-сервер блокировок на axum.

#![allow(dead_code)]

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};

use cinema_booking::models::ShowtimeId;

pub fn seats_json() -> Value {
    json!([
        {"id": 1, "seatNumber": "A1", "seatType": "STANDARD", "price": 50, "status": "AVAILABLE"},
        {"id": 2, "seatNumber": "A2", "seatType": "STANDARD", "price": 50, "status": "AVAILABLE"},
        {"id": 3, "seatNumber": "A3", "seatType": "STANDARD", "price": 50, "status": "BOOKED"},
        {"id": 4, "seatNumber": "_A4", "seatType": "WALKWAY", "status": "AVAILABLE"},
        {"id": 5, "seatNumber": "A5-A6", "seatType": "COUPLE", "status": "AVAILABLE"}
    ])
}

pub fn other_seats_json() -> Value {
    json!([
        {"id": 21, "seatNumber": "B1", "seatType": "VIP", "price": 70, "status": "AVAILABLE"},
        {"id": 22, "seatNumber": "B2", "seatType": "VIP", "price": 70, "status": "AVAILABLE"}
    ])
}

pub fn theaters_json() -> Value {
    json!({"data": [{"id": 3, "name": "Central", "address": "1 Main St"}]})
}

pub fn showtimes_json() -> Value {
    json!({"data": [
        {"id": 10, "startTime": "2026-10-20T19:30:00", "endTime": "2026-10-20T21:30:00",
         "roomId": 1, "roomName": "Room 1", "totalSeats": 5},
        {"id": 11, "startTime": "2026-10-20T22:00:00", "endTime": "2026-10-21T00:00:00",
         "roomId": 2, "roomName": "Room 2"}
    ]})
}

/// Что отправить подписчикам сеанса.
#[derive(Debug, Clone)]
pub enum Frame {
    Text(String),
    /// Сервер закрывает соединение.
    Close,
}

/// Тестовый push-канал: сообщает о каждом подключении и рассылает кадры
/// подписчикам нужного сеанса.
pub struct PushServer {
    pub url: String,
    pub frames: broadcast::Sender<(ShowtimeId, Frame)>,
    pub connected: mpsc::UnboundedReceiver<ShowtimeId>,
}

#[derive(Clone)]
struct PushState {
    frames: broadcast::Sender<(ShowtimeId, Frame)>,
    connected: mpsc::UnboundedSender<ShowtimeId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushQuery {
    showtime_id: ShowtimeId,
}

impl PushServer {
    pub async fn start() -> Self {
        let (frames, _) = broadcast::channel(64);
        let (connected_tx, connected) = mpsc::unbounded_channel();
        let state = PushState {
            frames: frames.clone(),
            connected: connected_tx,
        };

        let app = Router::new()
            .route("/ws/seats", get(upgrade))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("ws://{addr}/ws/seats"),
            frames,
            connected,
        }
    }

    pub fn send(&self, showtime_id: ShowtimeId, frame: Value) {
        let _ = self.frames.send((showtime_id, Frame::Text(frame.to_string())));
    }

    /// Обрывает все соединения сеанса.
    pub fn disconnect(&self, showtime_id: ShowtimeId) {
        let _ = self.frames.send((showtime_id, Frame::Close));
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<PushQuery>,
    State(state): State<PushState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, query.showtime_id, state))
}

async fn serve_socket(mut socket: WebSocket, showtime_id: ShowtimeId, state: PushState) {
    let mut frames = state.frames.subscribe();
    let _ = state.connected.send(showtime_id);

    while let Ok((target, frame)) = frames.recv().await {
        if target != showtime_id {
            continue;
        }
        match frame {
            Frame::Text(text) => {
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Frame::Close => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }
}
