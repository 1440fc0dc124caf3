//! Асинхронный драйвер экрана бронирования.
//!
//! Все запросы к бэкенду запускаются отдельными задачами и складывают
//! результат в одну очередь вместе с билетом запроса. Драйвер разбирает
//! очередь по порядку прихода и отдаёт каждый ответ сессии, которая сама
//! решает, не устарел ли он. Подписка на блокировки мест живёт ровно столько,
//! сколько выбран её сеанс: старая закрывается до открытия новой.

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::selection::Toggle;
use super::session::{BookingSession, Completion, NoticeOutcome, Slot, Ticket};
use crate::config::Config;
use crate::error::{ApiError, BookingError};
use crate::models::{
    Combo, MemberRank, MovieDetail, MovieId, Seat, SeatId, Showtime, ShowtimeId, Theater,
    TheaterId, UserId,
};
use crate::realtime::{LockNotice, LockSubscription, PushChannel};
use crate::services::backend::BackendClient;
use crate::services::payment::PaymentService;

/// Ответы бэкенда, ожидающие применения.
#[derive(Debug)]
enum Fetched {
    Movie(Result<MovieDetail, ApiError>),
    Combos(Result<Vec<Combo>, ApiError>),
    Rank(Result<MemberRank, ApiError>),
    Theaters(Ticket, Result<Vec<Theater>, ApiError>),
    Showtimes(Ticket, Result<Vec<Showtime>, ApiError>),
    Seats(Ticket, Result<Vec<Seat>, ApiError>),
}

/// Что изменилось после обработки одного события.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowUpdate {
    Movie(Completion),
    Combos(Completion),
    Rank(Completion),
    List(Slot, Completion),
    Lock(NoticeOutcome),
}

pub struct BookingFlow {
    backend: BackendClient,
    payments: PaymentService,
    push: PushChannel,
    default_payment_method: String,
    session: BookingSession,
    subscription: Option<LockSubscription>,
    fetch_tx: mpsc::UnboundedSender<Fetched>,
    fetch_rx: mpsc::UnboundedReceiver<Fetched>,
    lock_tx: mpsc::UnboundedSender<LockNotice>,
    lock_rx: mpsc::UnboundedReceiver<LockNotice>,
    pending: usize,
}

impl BookingFlow {
    pub fn new(config: &Config, movie_id: MovieId, user_id: Option<UserId>) -> Result<Self, ApiError> {
        let backend = BackendClient::from_config(config)?;
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let (lock_tx, lock_rx) = mpsc::unbounded_channel();

        Ok(Self {
            payments: PaymentService::new(backend.clone()),
            backend,
            push: PushChannel::from_config(config),
            default_payment_method: config.payment.default_method.clone(),
            session: BookingSession::new(movie_id, user_id),
            subscription: None,
            fetch_tx,
            fetch_rx,
            lock_tx,
            lock_rx,
            pending: 0,
        })
    }

    pub fn session(&self) -> &BookingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut BookingSession {
        &mut self.session
    }

    fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = Fetched> + Send + 'static,
    {
        self.pending += 1;
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(future.await);
        });
    }

    /// Шапка фильма, каталог комбо и ранг пользователя. Независимы от выбора.
    pub fn start(&mut self) {
        let backend = self.backend.clone();
        let movie_id = self.session.movie_id();
        self.spawn(async move { Fetched::Movie(backend.movie_detail(movie_id).await) });

        let backend = self.backend.clone();
        self.spawn(async move { Fetched::Combos(backend.combos().await) });

        if let Some(user_id) = self.session.user_id() {
            let backend = self.backend.clone();
            self.spawn(async move { Fetched::Rank(backend.member_rank(user_id).await) });
        }
    }

    pub fn choose_date(&mut self, date: NaiveDate) {
        self.close_subscription();
        let ticket = self.session.select_date(date);
        let backend = self.backend.clone();
        self.spawn(async move {
            let result = backend.search_theaters(ticket.movie_id, date).await;
            Fetched::Theaters(ticket, result)
        });
    }

    /// `false`, если дата ещё не выбрана.
    pub fn choose_theater(&mut self, theater_id: TheaterId) -> bool {
        let Some(ticket) = self.session.select_theater(theater_id) else {
            return false;
        };
        self.close_subscription();
        let Some(date) = ticket.context.date else {
            return false;
        };
        let backend = self.backend.clone();
        self.spawn(async move {
            let result = backend.showtimes(ticket.movie_id, theater_id, date).await;
            Fetched::Showtimes(ticket, result)
        });
        true
    }

    /// Загружает места сеанса и открывает подписку на его блокировки.
    /// `false`, если не выбраны дата и кинотеатр.
    pub fn choose_showtime(&mut self, showtime_id: ShowtimeId) -> bool {
        // Старая подписка закрывается до открытия новой
        self.close_subscription();
        let Some((ticket, subscription)) = self.session.select_showtime(showtime_id) else {
            return false;
        };

        self.spawn_seat_fetch(ticket, showtime_id);

        match self
            .push
            .subscribe(showtime_id, subscription, self.lock_tx.clone())
        {
            Ok(handle) => self.subscription = Some(handle),
            Err(e) => warn!(showtime_id, "Lock updates unavailable: {}", e),
        }
        true
    }

    /// Перезагрузка мест текущего сеанса без смены подписки.
    pub fn reload_seats(&mut self) -> bool {
        let Some(ticket) = self.session.reload_seats() else {
            return false;
        };
        let Some(showtime_id) = ticket.context.showtime_id else {
            return false;
        };
        self.spawn_seat_fetch(ticket, showtime_id);
        true
    }

    fn spawn_seat_fetch(&mut self, ticket: Ticket, showtime_id: ShowtimeId) {
        let backend = self.backend.clone();
        self.spawn(async move {
            let result = backend.showtime_seats(showtime_id).await;
            Fetched::Seats(ticket, result)
        });
    }

    /// Уход с сеанса: подписка закрыта, сетка сброшена.
    pub fn leave_showtime(&mut self) {
        self.close_subscription();
        self.session.leave_showtime();
    }

    fn close_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
        }
    }

    pub fn subscription(&self) -> Option<&LockSubscription> {
        self.subscription.as_ref()
    }

    pub fn toggle_seat(&mut self, seat_id: SeatId) -> Toggle {
        self.session.toggle_seat(seat_id)
    }

    /// Ждёт следующий ответ или уведомление и применяет его.
    pub async fn next_update(&mut self) -> FlowUpdate {
        tokio::select! {
            Some(fetched) = self.fetch_rx.recv() => {
                self.pending = self.pending.saturating_sub(1);
                self.apply(fetched)
            }
            Some(notice) = self.lock_rx.recv() => {
                FlowUpdate::Lock(self.session.apply_lock_notice(&notice))
            }
        }
    }

    /// Обрабатывает события, пока не будут получены ответы на все запросы.
    /// Уведомления, пришедшие за это время, тоже применяются.
    pub async fn settle(&mut self) -> Vec<FlowUpdate> {
        let mut updates = Vec::new();
        while self.pending > 0 {
            updates.push(self.next_update().await);
        }
        updates
    }

    fn apply(&mut self, fetched: Fetched) -> FlowUpdate {
        match fetched {
            Fetched::Movie(result) => FlowUpdate::Movie(self.session.apply_movie(result)),
            Fetched::Combos(result) => FlowUpdate::Combos(self.session.apply_combos(result)),
            Fetched::Rank(result) => FlowUpdate::Rank(self.session.apply_rank(result)),
            Fetched::Theaters(ticket, result) => {
                FlowUpdate::List(Slot::Theaters, self.session.apply_theaters(&ticket, result))
            }
            Fetched::Showtimes(ticket, result) => {
                FlowUpdate::List(Slot::Showtimes, self.session.apply_showtimes(&ticket, result))
            }
            Fetched::Seats(ticket, result) => {
                FlowUpdate::List(Slot::Seats, self.session.apply_seats(&ticket, result))
            }
        }
    }

    /// Оформляет заказ и возвращает URL платёжной страницы. Без повторов.
    pub async fn submit(&self, payment_method: Option<&str>) -> Result<String, BookingError> {
        let method = payment_method.unwrap_or(self.default_payment_method.as_str());
        let request = self.session.payment_request(method)?;
        let url = self.payments.submit(&request).await?;
        info!(showtime_id = request.showtime_id, "Redirecting to payment page");
        Ok(url)
    }
}
