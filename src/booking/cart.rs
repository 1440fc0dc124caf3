use std::collections::BTreeMap;

use crate::models::{Combo, ComboId, ComboLine, Money};

/// Количество каждого комбо в заказе. От выбора мест не зависит и
/// отправляется только вместе с оформлением.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboCart {
    quantities: BTreeMap<ComboId, u32>,
}

impl ComboCart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ноль убирает комбо из корзины.
    pub fn set(&mut self, combo_id: ComboId, quantity: u32) {
        if quantity == 0 {
            self.quantities.remove(&combo_id);
        } else {
            self.quantities.insert(combo_id, quantity);
        }
    }

    pub fn increment(&mut self, combo_id: ComboId) -> u32 {
        let quantity = self.quantities.entry(combo_id).or_insert(0);
        *quantity = quantity.saturating_add(1);
        *quantity
    }

    pub fn decrement(&mut self, combo_id: ComboId) -> u32 {
        let remaining = self.quantity(combo_id).saturating_sub(1);
        self.set(combo_id, remaining);
        remaining
    }

    pub fn quantity(&self, combo_id: ComboId) -> u32 {
        self.quantities.get(&combo_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn clear(&mut self) {
        self.quantities.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = (ComboId, u32)> + '_ {
        self.quantities.iter().map(|(&id, &quantity)| (id, quantity))
    }

    /// Пары (цена, количество) по каталогу; комбо вне каталога не считаются.
    pub fn priced_lines(&self, catalog: &[Combo]) -> Vec<(Money, u32)> {
        self.known_lines(catalog)
            .map(|(combo, quantity)| (combo.price, quantity))
            .collect()
    }

    /// Строки для запроса оплаты или `None`, если комбо не выбраны.
    pub fn request_lines(&self, catalog: &[Combo]) -> Option<Vec<ComboLine>> {
        let lines: Vec<ComboLine> = self
            .known_lines(catalog)
            .map(|(combo, quantity)| ComboLine {
                combo_id: combo.id,
                quantity,
            })
            .collect();
        (!lines.is_empty()).then_some(lines)
    }

    fn known_lines<'a>(&'a self, catalog: &'a [Combo]) -> impl Iterator<Item = (&'a Combo, u32)> + 'a {
        self.lines().filter_map(move |(id, quantity)| {
            catalog
                .iter()
                .find(|combo| combo.id == id)
                .map(|combo| (combo, quantity))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(id: ComboId, price: Money) -> Combo {
        Combo {
            id,
            name: format!("Combo {id}"),
            price,
            image: None,
            items: Vec::new(),
        }
    }

    #[test]
    fn increments_and_decrements() {
        let mut cart = ComboCart::new();
        assert_eq!(cart.increment(1), 1);
        assert_eq!(cart.increment(1), 2);
        assert_eq!(cart.decrement(1), 1);
        assert_eq!(cart.decrement(1), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.decrement(1), 0);
    }

    #[test]
    fn prices_only_catalog_combos() {
        let mut cart = ComboCart::new();
        cart.set(1, 2);
        cart.set(7, 1);
        let catalog = [combo(1, 30_000), combo(2, 40_000)];
        assert_eq!(cart.priced_lines(&catalog), vec![(30_000, 2)]);
        assert_eq!(
            cart.request_lines(&catalog),
            Some(vec![ComboLine { combo_id: 1, quantity: 2 }])
        );
    }

    #[test]
    fn empty_cart_sends_no_combo_list() {
        let cart = ComboCart::new();
        assert_eq!(cart.request_lines(&[combo(1, 10)]), None);
    }
}
