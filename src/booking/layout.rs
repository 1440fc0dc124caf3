//! Раскладка плоского списка мест по рядам зала.
//!
//! Чистая функция от списка мест: ряд берётся из кода места (проходы `_A6`
//! попадают в тот же ряд, что и соседи), внутри ряда места идут по номеру
//! позиции, у парного места позиция - номер первой половины. Результат не
//! зависит от порядка мест на входе.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::selection::SeatState;
use crate::models::{Seat, SeatCategory, SeatId};

/// Сколько места ячейка занимает на схеме.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    Single,
    /// Парное место - двойная ширина.
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeatCell<'a> {
    pub seat: &'a Seat,
    pub footprint: Footprint,
    /// Проходы и проданные места не кликабельны.
    pub interactive: bool,
    /// Проход рисуется прозрачным.
    pub transparent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeatRow<'a> {
    pub label: &'a str,
    pub cells: Vec<SeatCell<'a>>,
}

impl<'a> SeatRow<'a> {
    /// Ширина ряда в одинарных ячейках.
    pub fn width(&self) -> usize {
        self.cells
            .iter()
            .map(|cell| match cell.footprint {
                Footprint::Single => 1,
                Footprint::Double => 2,
            })
            .sum()
    }
}

pub fn arrange_rows(seats: &[Seat]) -> Vec<SeatRow<'_>> {
    // Ключ (длина, метка): ряд Z идёт раньше AA
    let mut rows: BTreeMap<(usize, &str), Vec<&Seat>> = BTreeMap::new();
    for seat in seats {
        let label = seat.code.row.as_str();
        rows.entry((label.len(), label)).or_default().push(seat);
    }

    rows.into_iter()
        .map(|((_, label), mut members)| {
            members.sort_by_key(|seat| (seat.code.column, seat.code.paired_column, seat.id));
            SeatRow {
                label,
                cells: members.into_iter().map(cell).collect(),
            }
        })
        .collect()
}

fn cell(seat: &Seat) -> SeatCell<'_> {
    let footprint = if seat.category == SeatCategory::Couple || seat.code.is_pair() {
        Footprint::Double
    } else {
        Footprint::Single
    };

    SeatCell {
        seat,
        footprint,
        interactive: seat.is_bookable(),
        transparent: seat.is_walkway(),
    }
}

/// Текстовая схема зала для терминала.
///
/// `[ ]` свободно, `[x]` выбрано, `[!]` занято другим покупателем,
/// `[#]` недоступно; парные места в два раза шире, проход - пустое место.
pub fn render_text<F>(rows: &[SeatRow<'_>], state_of: F) -> String
where
    F: Fn(SeatId) -> SeatState,
{
    let label_width = rows.iter().map(|row| row.label.len()).max().unwrap_or(1);
    let mut out = String::new();

    for row in rows {
        let _ = write!(out, "{:>width$} ", row.label, width = label_width);
        for (i, cell) in row.cells.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if cell.transparent {
                out.push_str(match cell.footprint {
                    Footprint::Single => "   ",
                    Footprint::Double => "       ",
                });
                continue;
            }
            let mark = match state_of(cell.seat.id) {
                SeatState::Available => ' ',
                SeatState::Selected => 'x',
                SeatState::LockedByOther => '!',
                SeatState::Unavailable => '#',
            };
            match cell.footprint {
                Footprint::Single => {
                    let _ = write!(out, "[{mark}]");
                }
                Footprint::Double => {
                    let _ = write!(out, "[{mark}{mark}{mark}{mark}{mark}]");
                }
            }
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeatCode, SeatStatus};
    use proptest::prelude::*;

    fn seat(id: SeatId, code: &str, category: SeatCategory) -> Seat {
        let code: SeatCode = code.parse().unwrap();
        let category = if code.walkway { SeatCategory::Walkway } else { category };
        Seat {
            id,
            code,
            category,
            price: category.default_price(),
            status: SeatStatus::Available,
            color: None,
        }
    }

    fn labels(rows: &[SeatRow<'_>]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.cells.iter().map(|c| c.seat.code.to_string()).collect())
            .collect()
    }

    #[test]
    fn groups_by_row_and_orders_by_column() {
        let seats = vec![
            seat(1, "B2", SeatCategory::Standard),
            seat(2, "A10", SeatCategory::Standard),
            seat(3, "A2", SeatCategory::Standard),
            seat(4, "_A3", SeatCategory::Standard),
            seat(5, "B1", SeatCategory::Vip),
        ];
        let rows = arrange_rows(&seats);
        assert_eq!(
            labels(&rows),
            vec![vec!["A2", "_A3", "A10"], vec!["B1", "B2"]]
        );
        assert_eq!(rows[0].label, "A");
    }

    #[test]
    fn couple_seat_takes_first_member_position_and_double_width() {
        let seats = vec![
            seat(1, "C5", SeatCategory::Standard),
            seat(2, "C3-C4", SeatCategory::Couple),
            seat(3, "C1", SeatCategory::Standard),
        ];
        let rows = arrange_rows(&seats);
        assert_eq!(labels(&rows), vec![vec!["C1", "C3-C4", "C5"]]);
        assert_eq!(rows[0].cells[1].footprint, Footprint::Double);
        assert_eq!(rows[0].width(), 4);
    }

    #[test]
    fn walkway_is_transparent_and_inert() {
        let seats = vec![seat(1, "_D2", SeatCategory::Standard)];
        let rows = arrange_rows(&seats);
        let cell = &rows[0].cells[0];
        assert!(cell.transparent);
        assert!(!cell.interactive);
        assert_eq!(cell.footprint, Footprint::Single);
    }

    #[test]
    fn short_rows_precede_long_rows() {
        let seats = vec![
            seat(1, "AA1", SeatCategory::Standard),
            seat(2, "Z1", SeatCategory::Standard),
        ];
        let rows = arrange_rows(&seats);
        let order: Vec<&str> = rows.iter().map(|r| r.label).collect();
        assert_eq!(order, vec!["Z", "AA"]);
    }

    #[test]
    fn renders_states() {
        let seats = vec![
            seat(1, "A1", SeatCategory::Standard),
            seat(2, "_A2", SeatCategory::Standard),
            seat(3, "A3-A4", SeatCategory::Couple),
            seat(4, "A5", SeatCategory::Standard),
        ];
        let rows = arrange_rows(&seats);
        let text = render_text(&rows, |id| match id {
            1 => SeatState::Selected,
            4 => SeatState::LockedByOther,
            _ => SeatState::Available,
        });
        assert_eq!(text, "A [x]     [     ] [!]\n");
    }

    fn arb_seats() -> impl Strategy<Value = Vec<Seat>> {
        prop::collection::vec((0usize..4, 1u32..30, 0u8..4), 0..40).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (row, column, kind))| {
                    let row = ["A", "B", "C", "AA"][row];
                    let (code, category) = match kind {
                        0 => (format!("{row}{column}"), SeatCategory::Standard),
                        1 => (format!("{row}{column}"), SeatCategory::Vip),
                        2 => (format!("{row}{column}-{row}{}", column + 1), SeatCategory::Couple),
                        _ => (format!("_{row}{column}"), SeatCategory::Walkway),
                    };
                    seat(i as SeatId, &code, category)
                })
                .collect()
        })
    }

    fn flatten_ids(rows: &[SeatRow<'_>]) -> Vec<SeatId> {
        rows.iter()
            .flat_map(|row| row.cells.iter().map(|c| c.seat.id))
            .collect()
    }

    proptest! {
        #[test]
        fn rows_partition_input_losslessly(seats in arb_seats()) {
            let rows = arrange_rows(&seats);
            let mut flattened = flatten_ids(&rows);
            flattened.sort_unstable();
            let mut input: Vec<SeatId> = seats.iter().map(|s| s.id).collect();
            input.sort_unstable();
            prop_assert_eq!(flattened, input);

            for row in &rows {
                prop_assert!(row.cells.iter().all(|c| c.seat.code.row == row.label));
            }
        }

        #[test]
        fn layout_ignores_input_order(
            (seats, shuffled) in arb_seats().prop_flat_map(|seats| {
                let shuffled = Just(seats.clone()).prop_shuffle();
                (Just(seats), shuffled)
            })
        ) {
            let a = arrange_rows(&seats);
            let b = arrange_rows(&shuffled);
            prop_assert_eq!(flatten_ids(&a), flatten_ids(&b));
            let labels_a: Vec<&str> = a.iter().map(|r| r.label).collect();
            let labels_b: Vec<&str> = b.iter().map(|r| r.label).collect();
            prop_assert_eq!(labels_a, labels_b);
        }
    }
}
