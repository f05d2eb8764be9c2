pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{BusError, BusResult};

/// Инициализация глобального логирования с конфигурацией.
///
/// Повторный вызов возвращает [`BusError::Logging`] вместо паники.
pub fn init_logging(config: LoggingConfig) -> BusResult<()> {
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);
    let fmt_layer = formatter::build_formatter_from_config(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| BusError::Logging(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = config.format.as_str(),
        "Logging system initialized"
    );

    Ok(())
}
