use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BusError, BusResult};

/// Формат вывода логов.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Однострочный человекочитаемый формат
    #[default]
    Compact,
    /// Многострочный формат для локальной отладки
    Pretty,
    /// JSON, по одной записи на строку
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

/// Настройки логирования.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень для target `evbus` (trace/debug/info/warn/error).
    pub level: String,
    /// Формат вывода
    pub format: LogFormat,
    /// Цветной вывод
    pub with_ansi: bool,
    /// Печатать target события
    pub with_target: bool,
    /// Печатать id и имена потоков
    pub with_thread_ids: bool,
    /// Печатать номера строк
    pub with_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl LoggingConfig {
    /// Проверяет, что уровень логирования распознаётся `tracing`.
    pub fn validate(&self) -> BusResult<()> {
        tracing::Level::from_str(&self.level)
            .map(|_| ())
            .map_err(|e| BusError::invalid_config("logging.level", e.to_string()))
    }

    /// Директива фильтра для `EnvFilter`, например `"evbus=debug"`.
    pub fn build_filter_directive(&self) -> String {
        format!("evbus={}", self.level.to_lowercase())
    }
}
