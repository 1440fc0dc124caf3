//! REST-клиент бэкенда кинотеатра.
//!
//! Покрывает только те вызовы, которые нужны экрану бронирования: шапка фильма,
//! кинотеатры на дату, сеансы, места сеанса, комбо, ранг пользователя и
//! создание платежа. Все запросы проходят через [`CircuitBreaker`].

use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    Combo, MemberRank, MovieDetail, MovieId, PaymentRequest, Seat, SeatRecord, Showtime,
    ShowtimeId, Theater, TheaterId, UserId,
};
use crate::services::circuit_breaker::CircuitBreaker;

/// Бэкенд отвечает либо голым JSON, либо обёрткой `{ "data": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TheaterSearchQuery {
    movie_id: MovieId,
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowtimeQuery {
    movie_id: MovieId,
    theater_id: TheaterId,
    date: NaiveDate,
}

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    access_token: Option<String>,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl BackendClient {
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.backend.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.backend.access_token.clone(),
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::from_config(&config.circuit_breaker)),
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http_client.get(self.url(path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `GET /movies/{id}/detail`
    pub async fn movie_detail(&self, movie_id: MovieId) -> Result<MovieDetail, ApiError> {
        self.fetch(self.get(&format!("/movies/{movie_id}/detail"))).await
    }

    /// `GET /theaters/search?movieId&date`
    pub async fn search_theaters(
        &self,
        movie_id: MovieId,
        date: NaiveDate,
    ) -> Result<Vec<Theater>, ApiError> {
        let query = TheaterSearchQuery { movie_id, date };
        self.fetch(self.get("/theaters/search").query(&query)).await
    }

    /// `GET /showtimes?movieId&theaterId&date`
    pub async fn showtimes(
        &self,
        movie_id: MovieId,
        theater_id: TheaterId,
        date: NaiveDate,
    ) -> Result<Vec<Showtime>, ApiError> {
        let query = ShowtimeQuery {
            movie_id,
            theater_id,
            date,
        };
        self.fetch(self.get("/showtimes").query(&query)).await
    }

    /// `GET /showtimes/{id}/seats`. Один битый код места - ошибка всей выборки,
    /// частичная сетка не возвращается.
    pub async fn showtime_seats(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>, ApiError> {
        let records: Vec<SeatRecord> = self
            .fetch(self.get(&format!("/showtimes/{showtime_id}/seats")))
            .await?;

        records
            .into_iter()
            .map(|record| Seat::try_from(record).map_err(|e| ApiError::Decode(e.to_string())))
            .collect()
    }

    /// `GET /combos`
    pub async fn combos(&self) -> Result<Vec<Combo>, ApiError> {
        self.fetch(self.get("/combos")).await
    }

    /// Ранг и скидка пользователя.
    pub async fn member_rank(&self, user_id: UserId) -> Result<MemberRank, ApiError> {
        self.fetch(self.get(&format!("/ranks/users/{user_id}"))).await
    }

    /// `POST /payments/client`. Возвращает сырой ответ: форма полезной нагрузки
    /// с URL переадресации разбирается в сервисе оплаты.
    pub async fn create_client_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let builder = self.authorize(self.http_client.post(self.url("/payments/client")));
        let response = self.send(builder.json(request)).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(Envelope::into_inner)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Отправляет запрос через Circuit Breaker и превращает неуспешный статус в ошибку.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking backend request");
            return Err(ApiError::CircuitOpen);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Backend request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                return Err(ApiError::Transport(e));
            }
        };

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "Backend responded");

        if status.is_server_error() {
            self.circuit_breaker.record_failure();
        } else {
            self.circuit_breaker.record_success();
        }

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: extract_message(&body),
        })
    }
}

/// Достаёт `message` или `error` из тела ошибки, если это JSON.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .filter(|m| !m.trim().is_empty())
}
