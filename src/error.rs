//! Ошибки клиента бронирования.
//!
//! Ни одна из них не фатальна для приложения: загрузчики сбрасывают состояние
//! в пустое, push-канал просто замолкает, а ошибка оформления заказа
//! показывается пользователю через [`BookingError::user_message`].

/// Сообщение, которое видит пользователь, если сервер не прислал своего.
pub const GENERIC_BOOKING_FAILURE: &str = "Booking failed, please try again";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Ошибки REST-клиента бэкенда.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Circuit Breaker разомкнут, запрос даже не отправлялся.
    #[error("Circuit breaker is open - backend temporarily unavailable")]
    CircuitOpen,

    #[error("Backend transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Неуспешный HTTP-статус; `message` берётся из тела ответа, если есть.
    #[error("Backend returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("Unexpected backend payload: {0}")]
    Decode(String),
}

impl ApiError {
    /// Сообщение сервера, если оно было в ответе.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Ошибки push-канала блокировок.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Invalid push channel URL: {0}")]
    Url(String),
}

/// Ошибки оформления заказа.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("No seats selected")]
    NothingSelected,

    #[error("No showtime selected")]
    NoShowtime,

    #[error("User is not known")]
    NoUser,

    #[error("Invalid booking request: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("Booking rejected: {0}")]
    Rejected(#[from] ApiError),

    #[error("Payment response has no redirect URL")]
    MissingRedirect,
}

impl BookingError {
    /// Текст для блокирующего уведомления: сообщение сервера или общий текст.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Rejected(api) => api
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_BOOKING_FAILURE.to_string()),
            BookingError::NothingSelected => "Please select at least one seat".to_string(),
            BookingError::NoShowtime => "Please select a showtime".to_string(),
            BookingError::NoUser => "Please sign in to book".to_string(),
            _ => GENERIC_BOOKING_FAILURE.to_string(),
        }
    }
}
