use serde::Serialize;

use crate::models::{Money, Seat};

/// Разбивка стоимости заказа для панели цены.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub seats_total: Money,
    pub combos_total: Money,
    /// Сумма до скидки, показывается рядом со скидочной.
    pub total: Money,
    pub discount_percent: f64,
    pub discounted_total: Money,
}

impl PriceBreakdown {
    pub fn savings(&self) -> Money {
        self.total.saturating_sub(self.discounted_total)
    }
}

/// `round(total * (1 - d/100))`, скидка ограничена диапазоном 0..=100.
pub fn apply_discount(total: Money, discount_percent: f64) -> Money {
    let percent = if discount_percent.is_finite() {
        discount_percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    (total as f64 * (1.0 - percent / 100.0)).round() as Money
}

pub fn price_breakdown<'a, S, C>(seats: S, combos: C, discount_percent: f64) -> PriceBreakdown
where
    S: IntoIterator<Item = &'a Seat>,
    C: IntoIterator<Item = (Money, u32)>,
{
    // Суммы насыщаются, а не переполняются
    let seats_total = seats
        .into_iter()
        .fold(0, |acc: Money, seat| acc.saturating_add(seat.price));
    let combos_total = combos.into_iter().fold(0, |acc: Money, (price, quantity)| {
        acc.saturating_add(price.saturating_mul(Money::from(quantity)))
    });
    let total = seats_total.saturating_add(combos_total);

    PriceBreakdown {
        seats_total,
        combos_total,
        total,
        discount_percent,
        discounted_total: apply_discount(total, discount_percent),
    }
}
