use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

use crate::models::{Seat, SeatId};

/// Состояние места с точки зрения текущей сессии.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatState {
    /// Продано, служебный статус или проход. Не кликается.
    Unavailable,
    /// Держит другой покупатель (по уведомлению push-канала). Не кликается.
    LockedByOther,
    Available,
    Selected,
}

/// Результат клика по месту.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
    /// Клик ничего не изменил; внутри - состояние места в момент клика.
    Ignored(SeatState),
    UnknownSeat,
}

/// Итог слияния уведомления о блокировке.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockMerge {
    /// Места, которых раньше не было в множестве блокировок.
    pub newly_locked: Vec<SeatId>,
    /// Места, снятые с выбора этой сессии, потому что их занял кто-то другой.
    pub evicted: Vec<SeatId>,
}

/// Сетка мест одного сеанса вместе с выбором и чужими блокировками.
///
/// Создаётся заново при каждой загрузке мест; между сеансами ничего не
/// переносится.
#[derive(Debug, Clone, Default)]
pub struct SeatMap {
    seats: Vec<Seat>,
    index: HashMap<SeatId, usize>,
    locked: HashSet<SeatId>,
    selected: BTreeSet<SeatId>,
}

impl SeatMap {
    /// При повторе id остаётся последнее место, остальные выбрасываются из
    /// сетки целиком.
    pub fn new(seats: Vec<Seat>) -> Self {
        let mut seen = HashSet::with_capacity(seats.len());
        let mut unique: Vec<Seat> = Vec::with_capacity(seats.len());
        for seat in seats.into_iter().rev() {
            if seen.insert(seat.id) {
                unique.push(seat);
            } else {
                warn!(seat_id = seat.id, "Duplicate seat id in seat list, keeping the last one");
            }
        }
        unique.reverse();

        let index = unique
            .iter()
            .enumerate()
            .map(|(i, seat)| (seat.id, i))
            .collect();
        let seats = unique;
        Self {
            seats,
            index,
            locked: HashSet::new(),
            selected: BTreeSet::new(),
        }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.index.get(&id).map(|&i| &self.seats[i])
    }

    /// Поиск по отображаемому коду (`A5`, `a5`, `A7-A8`).
    pub fn seat_by_code(&self, code: &str) -> Option<&Seat> {
        let wanted = code.trim().to_ascii_uppercase();
        self.seats
            .iter()
            .find(|seat| seat.code.to_string() == wanted)
            .or_else(|| {
                let parsed: crate::models::SeatCode = wanted.parse().ok()?;
                self.seats.iter().find(|seat| seat.code == parsed)
            })
    }

    /// Текущее состояние, вычисленное из статуса и множества блокировок.
    pub fn state(&self, id: SeatId) -> Option<SeatState> {
        let seat = self.seat(id)?;
        Some(if !seat.is_bookable() {
            SeatState::Unavailable
        } else if self.locked.contains(&id) {
            SeatState::LockedByOther
        } else if self.selected.contains(&id) {
            SeatState::Selected
        } else {
            SeatState::Available
        })
    }

    /// Переключает место между свободным и выбранным. Состояние читается в
    /// момент клика, так что место, заблокированное между отрисовками,
    /// выбрать нельзя.
    pub fn toggle(&mut self, id: SeatId) -> Toggle {
        match self.state(id) {
            None => Toggle::UnknownSeat,
            Some(SeatState::Available) => {
                self.selected.insert(id);
                Toggle::Selected
            }
            Some(SeatState::Selected) => {
                self.selected.remove(&id);
                Toggle::Deselected
            }
            Some(other) => {
                debug!(seat_id = id, state = ?other, "Ignoring click on non-interactive seat");
                Toggle::Ignored(other)
            }
        }
    }

    /// Объединяет блокировки с уже известными. Повторы безвредны. Если другой
    /// покупатель занял место, выбранное здесь, выбор снимается.
    pub fn merge_locks<I>(&mut self, ids: I) -> LockMerge
    where
        I: IntoIterator<Item = SeatId>,
    {
        let mut merge = LockMerge::default();
        for id in ids {
            if self.locked.insert(id) {
                merge.newly_locked.push(id);
            }
            if self.selected.remove(&id) {
                merge.evicted.push(id);
            }
        }
        if !merge.evicted.is_empty() {
            warn!(seats = ?merge.evicted, "Selected seats were locked by another customer");
        }
        merge
    }

    pub fn locked(&self) -> &HashSet<SeatId> {
        &self.locked
    }

    pub fn selected(&self) -> &BTreeSet<SeatId> {
        &self.selected
    }

    pub fn selected_seats(&self) -> impl Iterator<Item = &Seat> + '_ {
        self.selected.iter().filter_map(|id| self.seat(*id))
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}
