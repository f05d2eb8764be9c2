//! Подсистема Publish–Subscribe (pub/sub).
//!
//! Этот модуль реализует типизированную внутрипроцессную шину событий:
//!
//! - `publisher`: реестр подписчиков, рассылка сообщений, `stop` и `wait`.
//! - `subscriber`: подписка, задача доставки и отписка.
//! - `handler`: трейт обработчика и адаптеры для замыканий.
//! - `metrics`: счётчики публикаций и доставок.
//! - `registry` (приватный): карта `id -> канал` и выдача идентификаторов.
//! - `wait_group` (приватный): учёт незавершённых доставок для `wait`.
//!
//! ```text
//! publish(m)
//!     │  (мьютекс реестра только на время перечисления)
//!     ├──► task ──► [channel 1] ──► delivery task 1 ──► callback1(m)
//!     ├──► task ──► [channel 2] ──► delivery task 2 ──► callback2(m)
//!     └──► task ──► [channel N] ──► delivery task N ──► callbackN(m)
//! ```

pub mod handler;
pub mod metrics;
pub mod publisher;
mod registry;
pub mod subscriber;
mod wait_group;

// Публичный экспорт типов из вложенных модулей, чтобы упростить доступ
// к ним из внешнего кода.
pub use handler::*;
pub use metrics::{MetricsSnapshot, PublisherMetrics};
pub use publisher::Publisher;
pub use registry::SubscriberId;
pub use subscriber::Subscriber;
