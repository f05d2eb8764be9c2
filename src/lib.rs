/// Configuration: publisher settings and application settings.
pub mod config;
/// Common error types.
pub mod error;
/// Logging setup (filters, formats).
pub mod logging;
/// Pub/Sub: Publisher, Subscriber, Handler.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{PublisherConfig, Settings};
/// Operation errors and result types.
pub use error::{BusError, BusResult};
/// Logging API.
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// Pub/Sub API.
pub use pubsub::{
    async_handler_fn, handler_fn, AsyncFnHandler, FnHandler, Handler, MetricsSnapshot, Publisher,
    Subscriber, SubscriberId,
};
