use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::{money_from_amount, Money, SeatId};

/// Префикс кода ячейки-прохода: `_A6` - проход в ряду A на позиции 6.
pub const WALKWAY_PREFIX: char = '_';

/// Место в том виде, в котором его отдаёт `GET /showtimes/{id}/seats`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRecord {
    pub id: SeatId,
    #[serde(alias = "seat_number", alias = "code")]
    pub seat_number: String,
    #[serde(default, alias = "seat_type", alias = "type")]
    pub seat_type: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Место в сетке зала после разбора кода и подстановки цен по умолчанию.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seat {
    pub id: SeatId,
    pub code: SeatCode,
    pub category: SeatCategory,
    /// Цена сервера, а если её нет - цена категории.
    pub price: Money,
    pub status: SeatStatus,
    pub color: Option<String>,
}

impl Seat {
    pub fn is_walkway(&self) -> bool {
        self.category == SeatCategory::Walkway
    }

    /// Можно ли вообще взаимодействовать с местом (без учёта чужих блокировок).
    pub fn is_bookable(&self) -> bool {
        self.status == SeatStatus::Available && !self.is_walkway()
    }

    pub fn display_color(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| self.category.default_color())
    }
}

impl TryFrom<SeatRecord> for Seat {
    type Error = SeatCodeError;

    fn try_from(record: SeatRecord) -> Result<Self, Self::Error> {
        let code: SeatCode = record.seat_number.parse()?;
        let category = if code.walkway {
            SeatCategory::Walkway
        } else {
            record
                .seat_type
                .as_deref()
                .map(SeatCategory::from_wire)
                .unwrap_or(SeatCategory::Standard)
        };
        let price = record
            .price
            .and_then(money_from_amount)
            .unwrap_or_else(|| category.default_price());
        let status = if category == SeatCategory::Walkway {
            SeatStatus::Other
        } else {
            record
                .status
                .as_deref()
                .map(SeatStatus::from_wire)
                .unwrap_or(SeatStatus::Available)
        };

        Ok(Seat {
            id: record.id,
            code,
            category,
            price,
            status,
            color: record.color.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Категория места. Цена и цвет по умолчанию используются только когда
/// сервер их не прислал.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatCategory {
    Standard,
    Vip,
    Couple,
    Walkway,
}

impl SeatCategory {
    /// Разбор `seatType`; неизвестные типы считаются обычными местами.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "VIP" => SeatCategory::Vip,
            "COUPLE" | "DOUBLE" | "SWEETBOX" => SeatCategory::Couple,
            "WALKWAY" | "AISLE" | "EMPTY" => SeatCategory::Walkway,
            _ => SeatCategory::Standard,
        }
    }

    pub fn default_price(self) -> Money {
        match self {
            SeatCategory::Standard => 45_000,
            SeatCategory::Vip => 60_000,
            SeatCategory::Couple => 110_000,
            SeatCategory::Walkway => 0,
        }
    }

    pub fn default_color(self) -> &'static str {
        match self {
            SeatCategory::Standard => "#6b7280",
            SeatCategory::Vip => "#f59e0b",
            SeatCategory::Couple => "#ec4899",
            SeatCategory::Walkway => "transparent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Booked,
    Other,
}

impl SeatStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" | "EMPTY" | "FREE" => SeatStatus::Available,
            "BOOKED" | "SOLD" | "RESERVED" => SeatStatus::Booked,
            _ => SeatStatus::Other,
        }
    }
}

/// Разобранный код места: буква ряда, номер позиции и, для парных мест,
/// номер второй половины.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeatCode {
    pub row: String,
    pub column: u32,
    pub paired_column: Option<u32>,
    pub walkway: bool,
}

impl SeatCode {
    pub fn is_pair(&self) -> bool {
        self.paired_column.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid seat code {code:?}: {reason}")]
pub struct SeatCodeError {
    pub code: String,
    pub reason: &'static str,
}

impl FromStr for SeatCode {
    type Err = SeatCodeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let fail = |reason| SeatCodeError {
            code: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        let (walkway, body) = match trimmed.strip_prefix(WALKWAY_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (row, column, rest) = split_position(body).ok_or_else(|| fail("expected <row><number>"))?;
        let rest = rest.strip_prefix(|c: char| c == '-' || c == '/').unwrap_or(rest);

        let paired_column = if rest.is_empty() {
            None
        } else if rest.starts_with(|c: char| c.is_ascii_digit()) {
            // "A7-8": ряд второй половины совпадает с первой
            Some(rest.parse().map_err(|_| fail("bad paired number"))?)
        } else {
            let (second_row, second_column, tail) =
                split_position(rest).ok_or_else(|| fail("bad paired seat"))?;
            if !tail.is_empty() {
                return Err(fail("trailing characters"));
            }
            if second_row != row {
                return Err(fail("paired seat spans two rows"));
            }
            Some(second_column)
        };

        if walkway && paired_column.is_some() {
            return Err(fail("walkway cannot be paired"));
        }

        Ok(SeatCode {
            row,
            column,
            paired_column,
            walkway,
        })
    }
}

// Буквы ряда, затем цифры номера; возвращает остаток строки.
fn split_position(s: &str) -> Option<(String, u32, &str)> {
    let letters = s.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(s.len());
    if letters == 0 {
        return None;
    }
    let after_row = &s[letters..];
    let digits = after_row
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_row.len());
    if digits == 0 {
        return None;
    }
    let column = after_row[..digits].parse().ok()?;
    Some((s[..letters].to_ascii_uppercase(), column, &after_row[digits..]))
}

impl fmt::Display for SeatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.walkway {
            write!(f, "{}", WALKWAY_PREFIX)?;
        }
        write!(f, "{}{}", self.row, self.column)?;
        if let Some(paired) = self.paired_column {
            write!(f, "-{}{}", self.row, paired)?;
        }
        Ok(())
    }
}

impl Serialize for SeatCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: SeatId, code: &str) -> SeatRecord {
        SeatRecord {
            id,
            seat_number: code.to_string(),
            seat_type: None,
            price: None,
            status: Some("AVAILABLE".to_string()),
            color: None,
        }
    }

    #[test]
    fn parses_plain_code() {
        let code: SeatCode = "b12".parse().unwrap();
        assert_eq!(code.row, "B");
        assert_eq!(code.column, 12);
        assert!(!code.is_pair());
        assert!(!code.walkway);
    }

    #[test]
    fn parses_couple_codes() {
        for raw in ["A7-A8", "A7A8", "A7/A8", "A7-8"] {
            let code: SeatCode = raw.parse().unwrap();
            assert_eq!(code.row, "A", "{raw}");
            assert_eq!(code.column, 7, "{raw}");
            assert_eq!(code.paired_column, Some(8), "{raw}");
        }
    }

    #[test]
    fn parses_walkway_code() {
        let code: SeatCode = "_C4".parse().unwrap();
        assert!(code.walkway);
        assert_eq!(code.row, "C");
        assert_eq!(code.column, 4);
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["", "12", "A", "A1-B2", "_A1-A2", "A1-A2x"] {
            assert!(raw.parse::<SeatCode>().is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn server_price_wins_over_category_default() {
        let mut rec = record(1, "A1");
        rec.seat_type = Some("VIP".to_string());
        rec.price = Some(72_500.0);
        let seat = Seat::try_from(rec).unwrap();
        assert_eq!(seat.category, SeatCategory::Vip);
        assert_eq!(seat.price, 72_500);
    }

    #[test]
    fn absurd_price_falls_back_to_category_table() {
        for bogus in [1e19, f64::INFINITY, -5.0] {
            let mut rec = record(4, "A4");
            rec.price = Some(bogus);
            let seat = Seat::try_from(rec).unwrap();
            assert_eq!(seat.price, SeatCategory::Standard.default_price(), "price {bogus}");
        }
    }

    #[test]
    fn missing_price_uses_category_table() {
        let mut rec = record(2, "A2-A3");
        rec.seat_type = Some("couple".to_string());
        let seat = Seat::try_from(rec).unwrap();
        assert_eq!(seat.price, SeatCategory::Couple.default_price());
        assert_eq!(seat.display_color(), SeatCategory::Couple.default_color());
    }

    #[test]
    fn walkway_prefix_forces_walkway_category() {
        let mut rec = record(3, "_A4");
        rec.seat_type = Some("STANDARD".to_string());
        let seat = Seat::try_from(rec).unwrap();
        assert!(seat.is_walkway());
        assert!(!seat.is_bookable());
    }

    #[test]
    fn deserializes_backend_payload() {
        let json = r##"{"id": 9, "seatNumber": "D3", "seatType": "VIP", "price": 65000,
                        "status": "BOOKED", "color": "#123456"}"##;
        let rec: SeatRecord = serde_json::from_str(json).unwrap();
        let seat = Seat::try_from(rec).unwrap();
        assert_eq!(seat.status, SeatStatus::Booked);
        assert_eq!(seat.display_color(), "#123456");
        assert_eq!(seat.code.to_string(), "D3");
    }
}
