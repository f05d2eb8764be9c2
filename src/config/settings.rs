use serde::{Deserialize, Serialize};

use config::{Config, Environment};

use super::publisher::{PublisherConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_PUBLISHER_NAME};
use crate::{logging::LoggingConfig, BusResult};

/// Полная конфигурация приложения: издатель и логирование.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub publisher: PublisherConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки из переменных окружения.
    ///
    /// Вложенные ключи разделяются `__`, например
    /// `EVBUS_PUBLISHER__CHANNEL_CAPACITY=4` или `EVBUS_LOGGING__LEVEL=debug`.
    pub fn load() -> BusResult<Self> {
        let logging = LoggingConfig::default();
        let cfg = Config::builder()
            // Добавляем значения по умолчанию
            .set_default("publisher.name", DEFAULT_PUBLISHER_NAME)?
            .set_default("publisher.channel_capacity", DEFAULT_CHANNEL_CAPACITY as u64)?
            .set_default("publisher.catch_panics", true)?
            .set_default("logging.level", logging.level.as_str())?
            .set_default("logging.format", logging.format.as_str())?
            // Добавляем переменные окружения с префиксом EVBUS_
            .add_source(
                Environment::with_prefix("EVBUS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Десериализуем конфигурацию в нашу структуру
        let settings: Self = cfg.try_deserialize()?;
        settings.publisher.validate()?;
        settings.logging.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    fn clear_env() {
        env::remove_var("EVBUS_PUBLISHER__CHANNEL_CAPACITY");
        env::remove_var("EVBUS_PUBLISHER__NAME");
        env::remove_var("EVBUS_LOGGING__LEVEL");
        env::remove_var("EVBUS_LOGGING__FORMAT");
    }

    #[test]
    #[serial]
    fn test_settings_defaults() {
        clear_env();
        let settings = Settings::load().unwrap();
        assert_eq!(settings.publisher, PublisherConfig::default());
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    /// Тест проверяет чтение вложенных ключей из окружения.
    #[test]
    #[serial]
    fn test_settings_nested_env_overrides() {
        clear_env();
        env::set_var("EVBUS_PUBLISHER__CHANNEL_CAPACITY", "4");
        env::set_var("EVBUS_PUBLISHER__NAME", "orders");
        env::set_var("EVBUS_LOGGING__LEVEL", "debug");
        env::set_var("EVBUS_LOGGING__FORMAT", "json");

        let settings = Settings::load();
        clear_env();
        let settings = settings.unwrap();

        assert_eq!(settings.publisher.channel_capacity, 4);
        assert_eq!(settings.publisher.name, "orders");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    /// Тест проверяет, что неизвестный уровень логирования отклоняется.
    #[test]
    #[serial]
    fn test_settings_invalid_level() {
        clear_env();
        env::set_var("EVBUS_LOGGING__LEVEL", "loud");
        let res = Settings::load();
        clear_env();
        assert!(res.is_err());
    }
}
