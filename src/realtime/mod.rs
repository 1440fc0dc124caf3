//! Push-канал блокировок мест.
//!
//! На каждый выбранный сеанс открывается ровно одна подписка
//! ([`LockSubscription`]), которая пересылает уведомления сервера в очередь
//! владельца. Подписка принадлежит одному владельцу: при смене сеанса или
//! уничтожении экрана она закрывается, а уведомления с её номером
//! игнорируются сессией.

pub mod event;
pub mod listener;

pub use event::{LockNotice, PushEvent, SubscriptionId};
pub use listener::{LockSubscription, PushChannel};
