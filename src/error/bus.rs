use thiserror::Error;

pub type BusResult<T> = Result<T, BusError>;

/// Ошибки шины событий.
///
/// Основные операции (`publish`, `stop`, `wait`, подписка и отписка) не
/// возвращают ошибок. Ошибки возникают только на этапе построения:
/// загрузка конфигурации, инициализация логирования и поиск рантайма.
#[derive(Error, Debug)]
pub enum BusError {
    // ==== Конфигурация ====
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    // ==== Логирование ====
    #[error("Logging initialization failed: {0}")]
    Logging(String),

    // ==== Рантайм ====
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

impl BusError {
    /// Короткий конструктор для [`BusError::InvalidConfig`].
    pub fn invalid_config(
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
