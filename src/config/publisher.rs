use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::{BusError, BusResult};

/// Ёмкость канала доставки по умолчанию.
///
/// В Tokio нет каналов нулевой ёмкости, поэтому минимальный буфер в одно
/// сообщение ближе всего к передаче "из рук в руки".
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Имя издателя по умолчанию (используется в логах).
pub const DEFAULT_PUBLISHER_NAME: &str = "publisher";

/// Настройки издателя.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Имя издателя для логов.
    pub name: String,
    /// Ёмкость канала доставки каждого подписчика (не меньше 1).
    pub channel_capacity: usize,
    /// Перехватывать ли панику в колбэке подписчика.
    ///
    /// При `false` паника завершает задачу доставки этого подписчика.
    pub catch_panics: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PUBLISHER_NAME.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            catch_panics: true,
        }
    }
}

impl PublisherConfig {
    /// Загружает настройки из переменных окружения с префиксом `EVBUS_`
    /// (`EVBUS_CHANNEL_CAPACITY`, `EVBUS_CATCH_PANICS`, `EVBUS_NAME`)
    /// поверх значений по умолчанию.
    pub fn load() -> BusResult<Self> {
        let cfg = Config::builder()
            .set_default("name", DEFAULT_PUBLISHER_NAME)?
            .set_default("channel_capacity", DEFAULT_CHANNEL_CAPACITY as u64)?
            .set_default("catch_panics", true)?
            .add_source(Environment::with_prefix("EVBUS").try_parsing(true))
            .build()?;

        let config: Self = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Проверяет корректность значений.
    pub fn validate(&self) -> BusResult<()> {
        if self.channel_capacity == 0 {
            return Err(BusError::invalid_config(
                "channel_capacity",
                "must be at least 1",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(BusError::invalid_config("name", "must not be empty"));
        }
        Ok(())
    }

    pub fn with_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_channel_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_catch_panics(
        mut self,
        catch_panics: bool,
    ) -> Self {
        self.catch_panics = catch_panics;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    fn clear_env() {
        env::remove_var("EVBUS_NAME");
        env::remove_var("EVBUS_CHANNEL_CAPACITY");
        env::remove_var("EVBUS_CATCH_PANICS");
    }

    /// Тест проверяет значения по умолчанию.
    #[test]
    fn test_default_values() {
        let cfg = PublisherConfig::default();
        assert_eq!(cfg.name, "publisher");
        assert_eq!(cfg.channel_capacity, 1);
        assert!(cfg.catch_panics);
        assert!(cfg.validate().is_ok());
    }

    /// Тест проверяет, что нулевая ёмкость канала отклоняется.
    #[test]
    fn test_zero_capacity_rejected() {
        let cfg = PublisherConfig::default().with_channel_capacity(0);
        match cfg.validate() {
            Err(BusError::InvalidConfig { field, .. }) => assert_eq!(field, "channel_capacity"),
            other => panic!("Expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_name_rejected() {
        let cfg = PublisherConfig::default().with_name("   ");
        assert!(matches!(
            cfg.validate(),
            Err(BusError::InvalidConfig { field: "name", .. })
        ));
    }

    /// Тест проверяет загрузку без переменных окружения.
    #[test]
    #[serial]
    fn test_load_defaults_from_empty_env() {
        clear_env();
        let cfg = PublisherConfig::load().unwrap();
        assert_eq!(cfg, PublisherConfig::default());
    }

    /// Тест проверяет, что переменные окружения перекрывают значения по
    /// умолчанию.
    #[test]
    #[serial]
    fn test_load_env_overrides() {
        clear_env();
        env::set_var("EVBUS_NAME", "audit");
        env::set_var("EVBUS_CHANNEL_CAPACITY", "16");
        env::set_var("EVBUS_CATCH_PANICS", "false");

        let cfg = PublisherConfig::load().unwrap();
        clear_env();

        assert_eq!(cfg.name, "audit");
        assert_eq!(cfg.channel_capacity, 16);
        assert!(!cfg.catch_panics);
    }

    /// Тест проверяет, что некорректное значение из окружения не проходит
    /// валидацию.
    #[test]
    #[serial]
    fn test_load_rejects_zero_capacity_from_env() {
        clear_env();
        env::set_var("EVBUS_CHANNEL_CAPACITY", "0");
        let res = PublisherConfig::load();
        clear_env();

        assert!(matches!(res, Err(BusError::InvalidConfig { .. })));
    }

    #[test]
    fn test_builder_methods_chain() {
        let cfg = PublisherConfig::default()
            .with_name("metrics")
            .with_channel_capacity(8)
            .with_catch_panics(false);
        assert_eq!(cfg.name, "metrics");
        assert_eq!(cfg.channel_capacity, 8);
        assert!(!cfg.catch_panics);
    }
}
