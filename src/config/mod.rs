//! Конфигурация шины: настройки издателя и сводные настройки приложения.

pub mod publisher;
pub mod settings;

pub use publisher::{PublisherConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_PUBLISHER_NAME};
pub use settings::Settings;
