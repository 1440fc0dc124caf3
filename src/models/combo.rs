use serde::{Deserialize, Serialize};

use super::{deserialize_money, ComboId, Money};

/// Набор из бара, который можно добавить к билетам.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    pub id: ComboId,
    pub name: String,
    #[serde(deserialize_with = "deserialize_money")]
    pub price: Money,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "comboItems")]
    pub items: Vec<ComboItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboItem {
    #[serde(alias = "itemName")]
    pub name: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_fractional_price_and_default_quantity() {
        let json = r#"{"id": 3, "name": "Couple combo", "price": 89000.0,
                       "items": [{"name": "Popcorn L"}, {"name": "Coke", "quantity": 2}]}"#;
        let combo: Combo = serde_json::from_str(json).unwrap();
        assert_eq!(combo.price, 89_000);
        assert_eq!(combo.items[0].quantity, 1);
        assert_eq!(combo.items[1].quantity, 2);
    }

    #[test]
    fn rejects_negative_price() {
        let json = r#"{"id": 3, "name": "Broken", "price": -1}"#;
        assert!(serde_json::from_str::<Combo>(json).is_err());
    }

    #[test]
    fn rejects_absurd_price() {
        let json = r#"{"id": 3, "name": "Broken", "price": 1e19}"#;
        assert!(serde_json::from_str::<Combo>(json).is_err());
    }
}
