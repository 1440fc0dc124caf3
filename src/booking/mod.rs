//! Экран бронирования: выбор сеанса, схема зала, выбор мест, комбо и цена.

pub mod cart;
pub mod flow;
pub mod layout;
pub mod pricing;
pub mod selection;
pub mod session;

pub use cart::ComboCart;
pub use flow::{BookingFlow, FlowUpdate};
pub use layout::{arrange_rows, render_text, Footprint, SeatCell, SeatRow};
pub use pricing::{apply_discount, price_breakdown, PriceBreakdown};
pub use selection::{LockMerge, SeatMap, SeatState, Toggle};
pub use session::{BookingSession, Completion, NoticeOutcome, SelectionContext, Slot, Ticket};
