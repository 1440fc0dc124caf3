use serde::{Deserialize, Serialize};

/// Ранг участника программы лояльности и его скидка в процентах.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRank {
    #[serde(alias = "name", alias = "rank")]
    pub rank_name: String,
    #[serde(alias = "discount", alias = "discountPercentage")]
    pub discount_percent: f64,
}

impl MemberRank {
    /// Скидка, приведённая к диапазону 0..=100.
    pub fn effective_discount(&self) -> f64 {
        if self.discount_percent.is_finite() {
            self.discount_percent.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}
