use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::event::{LockNotice, PushEvent, SubscriptionId};
use crate::config::Config;
use crate::error::PushError;
use crate::models::ShowtimeId;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushQuery<'a> {
    showtime_id: ShowtimeId,
    client_id: &'a str,
}

/// Настройки подключения к push-каналу. Сам по себе ничего не держит открытым.
#[derive(Debug, Clone)]
pub struct PushChannel {
    base_url: String,
    max_reconnects: u32,
    reconnect_delay: Duration,
}

impl PushChannel {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.backend.push_url.clone(),
            max_reconnects: config.push.max_reconnects,
            reconnect_delay: Duration::from_millis(config.push.reconnect_delay_ms),
        }
    }

    /// URL подписки на сеанс; `clientId` различает вкладки одного пользователя.
    pub fn subscription_url(
        &self,
        showtime_id: ShowtimeId,
        client_id: &str,
    ) -> Result<String, PushError> {
        let query = serde_urlencoded::to_string(PushQuery {
            showtime_id,
            client_id,
        })
        .map_err(|e| PushError::Url(e.to_string()))?;
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}{}", self.base_url, separator, query))
    }

    /// Открывает подписку на блокировки мест сеанса. Подключение идёт в фоне:
    /// вызов не блокирует, а сбой подключения просто оставляет канал немым.
    pub fn subscribe(
        &self,
        showtime_id: ShowtimeId,
        subscription: SubscriptionId,
        sink: mpsc::UnboundedSender<LockNotice>,
    ) -> Result<LockSubscription, PushError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = self.subscription_url(showtime_id, &client_id)?;

        let worker = SubscriptionWorker {
            url,
            showtime_id,
            subscription,
            sink,
            max_reconnects: self.max_reconnects,
            reconnect_delay: self.reconnect_delay,
        };
        let task = tokio::spawn(worker.run());

        debug!(showtime_id, subscription, "Lock subscription opened");
        Ok(LockSubscription {
            id: subscription,
            showtime_id,
            task,
        })
    }
}

/// Живая подписка на один сеанс. Единственный владелец; при `close` или
/// уничтожении фоновая задача останавливается.
#[derive(Debug)]
pub struct LockSubscription {
    id: SubscriptionId,
    showtime_id: ShowtimeId,
    task: JoinHandle<()>,
}

impl LockSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn showtime_id(&self) -> ShowtimeId {
        self.showtime_id
    }

    /// Канал закрылся сам (обрыв без переподключения или закрыт получатель).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn close(self) {
        debug!(showtime_id = self.showtime_id, subscription = self.id, "Lock subscription closed");
    }
}

impl Drop for LockSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct SubscriptionWorker {
    url: String,
    showtime_id: ShowtimeId,
    subscription: SubscriptionId,
    sink: mpsc::UnboundedSender<LockNotice>,
    max_reconnects: u32,
    reconnect_delay: Duration,
}

enum SessionEnd {
    /// Соединение оборвалось; можно пробовать снова.
    Dropped,
    /// Получатель уведомлений исчез, слушать больше некому.
    SinkClosed,
}

impl SubscriptionWorker {
    async fn run(self) {
        let mut retries_left = self.max_reconnects;

        loop {
            match connect_async(self.url.as_str()).await {
                Ok((ws_stream, _response)) => {
                    info!(showtime_id = self.showtime_id, "Push channel connected");
                    retries_left = self.max_reconnects;
                    if let SessionEnd::SinkClosed = self.pump(ws_stream).await {
                        return;
                    }
                }
                Err(e) => {
                    warn!(showtime_id = self.showtime_id, error = %e, "Push channel connection failed");
                }
            }

            if retries_left == 0 {
                warn!(
                    showtime_id = self.showtime_id,
                    "Push channel stopped; lock updates resume after showtime is reselected"
                );
                return;
            }
            retries_left -= 1;
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn pump(&self, ws_stream: WsStream) -> SessionEnd {
        let (_sink, mut stream) = ws_stream.split();

        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let Some(event) = PushEvent::parse(&text) else {
                        continue;
                    };
                    let notice = LockNotice {
                        subscription: self.subscription,
                        showtime_id: self.showtime_id,
                        event,
                    };
                    if self.sink.send(notice).is_err() {
                        return SessionEnd::SinkClosed;
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(?frame, showtime_id = self.showtime_id, "Push channel closed by server");
                    return SessionEnd::Dropped;
                }
                Ok(_) => {
                    // Ping/Pong обрабатывает tungstenite, бинарные кадры не используются.
                }
                Err(e) => {
                    warn!(error = %e, showtime_id = self.showtime_id, "Push channel receive error");
                    return SessionEnd::Dropped;
                }
            }
        }

        SessionEnd::Dropped
    }
}
