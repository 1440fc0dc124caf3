//! payment.rs
//!
//! Оформление заказа: проверка запроса, `POST /payments/client` и извлечение
//! URL переадресации на платёжную страницу.
//!
//! Повторных попыток нет: если бэкенд отказал, ошибка уходит пользователю
//! как есть (см. [`BookingError::user_message`]).

use serde_json::Value;
use tracing::{error, info};
use validator::Validate;

use crate::error::BookingError;
use crate::models::PaymentRequest;
use crate::services::backend::BackendClient;

#[derive(Clone)]
pub struct PaymentService {
    backend: BackendClient,
}

impl PaymentService {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Создаёт платёж и возвращает URL, на который нужно отправить пользователя.
    pub async fn submit(&self, request: &PaymentRequest) -> Result<String, BookingError> {
        request.validate()?;

        info!(
            user_id = request.user_id,
            showtime_id = request.showtime_id,
            seats = request.list_seat_id.len(),
            method = %request.payment_method,
            "Submitting booking"
        );

        let payload = self
            .backend
            .create_client_payment(request)
            .await
            .map_err(|e| {
                error!(showtime_id = request.showtime_id, "Booking submission failed: {}", e);
                BookingError::Rejected(e)
            })?;

        let url = redirect_url(&payload).ok_or(BookingError::MissingRedirect)?;
        info!(showtime_id = request.showtime_id, "Booking accepted, redirecting to payment page");
        Ok(url)
    }
}

/// Ищет URL переадресации в известных формах ответа:
/// `{"data": {"paymentUrl": ..}}`, `{"data": {"url": ..}}`, `{"data": ".."}`,
/// а также те же ключи на верхнем уровне.
pub fn redirect_url(payload: &Value) -> Option<String> {
    const KEYS: [&str; 3] = ["paymentUrl", "url", "redirectUrl"];

    let from_object = |value: &Value| {
        KEYS.iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .map(str::to_string)
    };

    let found = match payload.get("data") {
        Some(Value::String(url)) => Some(url.clone()),
        Some(data @ Value::Object(_)) => from_object(data),
        _ => None,
    };

    found
        .or_else(|| from_object(payload))
        .or_else(|| payload.as_str().map(str::to_string))
        .filter(|url| !url.trim().is_empty())
}
