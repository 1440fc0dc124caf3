//! Состояние экрана бронирования.
//!
//! Цепочка выбора дата → кинотеатр → сеанс: каждый шаг сбрасывает и заново
//! запрашивает следующий список. Каждый запрос получает [`Ticket`] с
//! монотонным номером; ответ применяется только если его билет всё ещё
//! последний для своего слота, иначе он отбрасывается. Так поздний ответ по
//! сеансу A не затирает сетку сеанса B.
//!
//! Сессия синхронная и ничего не знает о сети: запросы выполняет
//! [`BookingFlow`](super::flow::BookingFlow).

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::cart::ComboCart;
use super::pricing::{price_breakdown, PriceBreakdown};
use super::selection::{LockMerge, SeatMap, Toggle};
use crate::error::{ApiError, BookingError};
use crate::models::{
    Combo, MemberRank, MovieDetail, MovieId, PaymentRequest, Seat, SeatId, Showtime, ShowtimeId,
    Theater, TheaterId, UserId,
};
use crate::realtime::{LockNotice, PushEvent, SubscriptionId};

pub const NOTICE_NO_THEATERS: &str = "No theaters found, please choose another date";
pub const NOTICE_NO_SHOWTIMES: &str = "No showtimes found, please choose another theater";
pub const NOTICE_NO_SEATS: &str = "Seats could not be loaded, please choose another showtime";

/// Зависимые списки, которые перезапрашиваются при смене выбора.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Theaters,
    Showtimes,
    Seats,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::Theaters => 0,
            Slot::Showtimes => 1,
            Slot::Seats => 2,
        }
    }
}

/// Что именно выбрано на данный момент.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionContext {
    pub date: Option<NaiveDate>,
    pub theater_id: Option<TheaterId>,
    pub showtime_id: Option<ShowtimeId>,
}

/// Квитанция на запрос зависимого списка.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub request_id: u64,
    pub movie_id: MovieId,
    pub context: SelectionContext,
}

#[derive(Debug, Default)]
struct RequestTracker {
    next_id: u64,
    latest: [Option<u64>; 3],
}

impl RequestTracker {
    fn issue(&mut self, slot: Slot) -> u64 {
        self.next_id += 1;
        self.latest[slot.index()] = Some(self.next_id);
        self.next_id
    }

    fn invalidate(&mut self, slot: Slot) {
        self.latest[slot.index()] = None;
    }

    fn is_current(&self, slot: Slot, request_id: u64) -> bool {
        self.latest[slot.index()] == Some(request_id)
    }

    fn finish(&mut self, slot: Slot) {
        self.latest[slot.index()] = None;
    }
}

/// Чем закончилась обработка ответа на запрос.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// Ошибка: список сброшен в пустой, показано нейтральное сообщение.
    Failed,
    /// Ответ устарел и отброшен.
    Stale,
}

/// Чем закончилась обработка уведомления push-канала.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeOutcome {
    Merged(LockMerge),
    /// `seat_locked_failed`: только сообщение, состояние не меняется.
    Informational(String),
    /// Уведомление от закрытой подписки или другого сеанса.
    Ignored,
}

#[derive(Debug)]
pub struct BookingSession {
    movie_id: MovieId,
    user_id: Option<UserId>,
    movie: Option<MovieDetail>,
    context: SelectionContext,
    tracker: RequestTracker,
    theaters: Vec<Theater>,
    showtimes: Vec<Showtime>,
    seat_map: SeatMap,
    /// Места текущего сеанса уже загружались хотя бы раз.
    seats_loaded: bool,
    live_subscription: Option<SubscriptionId>,
    next_subscription: SubscriptionId,
    combos: Vec<Combo>,
    cart: ComboCart,
    rank: Option<MemberRank>,
    notice: Option<String>,
}

impl BookingSession {
    pub fn new(movie_id: MovieId, user_id: Option<UserId>) -> Self {
        Self {
            movie_id,
            user_id,
            movie: None,
            context: SelectionContext::default(),
            tracker: RequestTracker::default(),
            theaters: Vec::new(),
            showtimes: Vec::new(),
            seat_map: SeatMap::default(),
            seats_loaded: false,
            live_subscription: None,
            next_subscription: 0,
            combos: Vec::new(),
            cart: ComboCart::new(),
            rank: None,
            notice: None,
        }
    }

    fn ticket(&mut self, slot: Slot) -> Ticket {
        Ticket {
            slot,
            request_id: self.tracker.issue(slot),
            movie_id: self.movie_id,
            context: self.context,
        }
    }

    fn reset_showtime(&mut self) {
        self.context.showtime_id = None;
        self.tracker.invalidate(Slot::Seats);
        self.seat_map = SeatMap::default();
        self.seats_loaded = false;
        self.live_subscription = None;
    }

    fn reset_theater(&mut self) {
        self.reset_showtime();
        self.context.theater_id = None;
        self.tracker.invalidate(Slot::Showtimes);
        self.showtimes.clear();
    }

    /// Выбор даты: кинотеатры, сеансы и места сбрасываются.
    pub fn select_date(&mut self, date: NaiveDate) -> Ticket {
        self.reset_theater();
        self.theaters.clear();
        self.context.date = Some(date);
        self.notice = None;
        self.ticket(Slot::Theaters)
    }

    /// Выбор кинотеатра; без даты запрос невозможен.
    pub fn select_theater(&mut self, theater_id: TheaterId) -> Option<Ticket> {
        self.context.date?;
        self.reset_theater();
        self.context.theater_id = Some(theater_id);
        self.notice = None;
        Some(self.ticket(Slot::Showtimes))
    }

    /// Выбор сеанса: старая сетка, выбор и блокировки выбрасываются целиком,
    /// выдаётся номер новой подписки на блокировки.
    pub fn select_showtime(&mut self, showtime_id: ShowtimeId) -> Option<(Ticket, SubscriptionId)> {
        self.context.date?;
        self.context.theater_id?;
        self.reset_showtime();
        self.context.showtime_id = Some(showtime_id);
        self.next_subscription += 1;
        self.live_subscription = Some(self.next_subscription);
        self.notice = None;
        Some((self.ticket(Slot::Seats), self.next_subscription))
    }

    /// Повторная загрузка мест того же сеанса; подписка остаётся прежней.
    /// Новая сетка приходит без выбора и без прежних блокировок.
    pub fn reload_seats(&mut self) -> Option<Ticket> {
        self.context.showtime_id?;
        Some(self.ticket(Slot::Seats))
    }

    /// Уход с сеанса (смена фильма, закрытие экрана).
    pub fn leave_showtime(&mut self) {
        self.reset_showtime();
    }

    fn accept(&mut self, ticket: &Ticket) -> bool {
        let current = ticket.movie_id == self.movie_id
            && ticket.context == self.context
            && self.tracker.is_current(ticket.slot, ticket.request_id);
        if current {
            self.tracker.finish(ticket.slot);
        } else {
            debug!(slot = ?ticket.slot, request_id = ticket.request_id, "Dropping stale response");
        }
        current
    }

    pub fn apply_theaters(
        &mut self,
        ticket: &Ticket,
        result: Result<Vec<Theater>, ApiError>,
    ) -> Completion {
        if !self.accept(ticket) {
            return Completion::Stale;
        }
        match result {
            Ok(theaters) => {
                info!(count = theaters.len(), "Theaters loaded");
                if theaters.is_empty() {
                    self.notice = Some(NOTICE_NO_THEATERS.to_string());
                }
                self.theaters = theaters;
                Completion::Applied
            }
            Err(e) => {
                warn!("Failed to load theaters: {}", e);
                self.theaters.clear();
                self.notice = Some(NOTICE_NO_THEATERS.to_string());
                Completion::Failed
            }
        }
    }

    pub fn apply_showtimes(
        &mut self,
        ticket: &Ticket,
        result: Result<Vec<Showtime>, ApiError>,
    ) -> Completion {
        if !self.accept(ticket) {
            return Completion::Stale;
        }
        match result {
            Ok(showtimes) => {
                info!(count = showtimes.len(), "Showtimes loaded");
                if showtimes.is_empty() {
                    self.notice = Some(NOTICE_NO_SHOWTIMES.to_string());
                }
                self.showtimes = showtimes;
                Completion::Applied
            }
            Err(e) => {
                warn!("Failed to load showtimes: {}", e);
                self.showtimes.clear();
                self.notice = Some(NOTICE_NO_SHOWTIMES.to_string());
                Completion::Failed
            }
        }
    }

    /// Сетка заменяется целиком, выбор и блокировки сбрасываются. Исключение:
    /// блокировки, пришедшие по живой подписке до первой загрузки мест сеанса,
    /// переносятся в новую сетку.
    pub fn apply_seats(&mut self, ticket: &Ticket, result: Result<Vec<Seat>, ApiError>) -> Completion {
        if !self.accept(ticket) {
            return Completion::Stale;
        }
        match result {
            Ok(seats) => {
                info!(
                    showtime_id = ?self.context.showtime_id,
                    count = seats.len(),
                    "Seats loaded"
                );
                let mut seat_map = SeatMap::new(seats);
                if !self.seats_loaded {
                    seat_map.merge_locks(self.seat_map.locked().iter().copied());
                }
                self.seat_map = seat_map;
                self.seats_loaded = true;
                Completion::Applied
            }
            Err(e) => {
                warn!(showtime_id = ?self.context.showtime_id, "Failed to load seats: {}", e);
                self.seat_map = SeatMap::default();
                self.seats_loaded = false;
                self.notice = Some(NOTICE_NO_SEATS.to_string());
                Completion::Failed
            }
        }
    }

    pub fn apply_movie(&mut self, result: Result<MovieDetail, ApiError>) -> Completion {
        match result {
            Ok(movie) if movie.id == self.movie_id => {
                self.movie = Some(movie);
                Completion::Applied
            }
            Ok(movie) => {
                debug!(movie_id = movie.id, "Dropping movie detail for another movie");
                Completion::Stale
            }
            Err(e) => {
                warn!(movie_id = self.movie_id, "Failed to load movie detail: {}", e);
                Completion::Failed
            }
        }
    }

    pub fn apply_combos(&mut self, result: Result<Vec<Combo>, ApiError>) -> Completion {
        match result {
            Ok(combos) => {
                self.combos = combos;
                Completion::Applied
            }
            Err(e) => {
                warn!("Failed to load combos: {}", e);
                self.combos.clear();
                Completion::Failed
            }
        }
    }

    /// Без ранга скидка нулевая.
    pub fn apply_rank(&mut self, result: Result<MemberRank, ApiError>) -> Completion {
        match result {
            Ok(rank) => {
                info!(rank = %rank.rank_name, discount = rank.discount_percent, "Member rank loaded");
                self.rank = Some(rank);
                Completion::Applied
            }
            Err(e) => {
                warn!(user_id = ?self.user_id, "Failed to load member rank: {}", e);
                self.rank = None;
                Completion::Failed
            }
        }
    }

    /// Применяет уведомление только от живой подписки текущего сеанса.
    pub fn apply_lock_notice(&mut self, notice: &LockNotice) -> NoticeOutcome {
        let live = self.live_subscription == Some(notice.subscription)
            && self.context.showtime_id == Some(notice.showtime_id);
        if !live {
            debug!(
                subscription = notice.subscription,
                showtime_id = notice.showtime_id,
                "Ignoring notice from a closed subscription"
            );
            return NoticeOutcome::Ignored;
        }

        match &notice.event {
            PushEvent::SeatLocked(ids) => {
                NoticeOutcome::Merged(self.seat_map.merge_locks(ids.iter().copied()))
            }
            PushEvent::SeatLockFailed(message) => {
                info!(showtime_id = notice.showtime_id, "Seat lock failed: {}", message);
                NoticeOutcome::Informational(message.clone())
            }
        }
    }

    pub fn toggle_seat(&mut self, seat_id: SeatId) -> Toggle {
        self.seat_map.toggle(seat_id)
    }

    pub fn cart_mut(&mut self) -> &mut ComboCart {
        &mut self.cart
    }

    pub fn price(&self) -> PriceBreakdown {
        let discount = self
            .rank
            .as_ref()
            .map(MemberRank::effective_discount)
            .unwrap_or(0.0);
        price_breakdown(
            self.seat_map.selected_seats(),
            self.cart.priced_lines(&self.combos),
            discount,
        )
    }

    /// Собирает запрос на оплату из текущего выбора.
    pub fn payment_request(&self, payment_method: &str) -> Result<PaymentRequest, BookingError> {
        let user_id = self.user_id.ok_or(BookingError::NoUser)?;
        let showtime_id = self.context.showtime_id.ok_or(BookingError::NoShowtime)?;
        let list_seat_id: Vec<SeatId> = self.seat_map.selected().iter().copied().collect();
        if list_seat_id.is_empty() {
            return Err(BookingError::NothingSelected);
        }

        Ok(PaymentRequest {
            user_id,
            showtime_id,
            list_seat_id,
            payment_method: payment_method.to_string(),
            list_combo: self.cart.request_lines(&self.combos),
        })
    }

    pub fn movie_id(&self) -> MovieId {
        self.movie_id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn movie(&self) -> Option<&MovieDetail> {
        self.movie.as_ref()
    }

    pub fn context(&self) -> SelectionContext {
        self.context
    }

    pub fn theaters(&self) -> &[Theater] {
        &self.theaters
    }

    pub fn showtimes(&self) -> &[Showtime] {
        &self.showtimes
    }

    pub fn selected_showtime(&self) -> Option<&Showtime> {
        let id = self.context.showtime_id?;
        self.showtimes.iter().find(|showtime| showtime.id == id)
    }

    pub fn seat_map(&self) -> &SeatMap {
        &self.seat_map
    }

    pub fn live_subscription(&self) -> Option<SubscriptionId> {
        self.live_subscription
    }

    pub fn combos(&self) -> &[Combo] {
        &self.combos
    }

    pub fn cart(&self) -> &ComboCart {
        &self.cart
    }

    pub fn rank(&self) -> Option<&MemberRank> {
        self.rank.as_ref()
    }

    /// Нейтральное сообщение после неудачной загрузки списка.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}
