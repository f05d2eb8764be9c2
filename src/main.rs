use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use evbus::{init_logging, Publisher, Settings, Subscriber};

/// Демонстрация: два подписчика, рассылка, отписка одного из них и
/// глобальная остановка.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(settings.logging.clone())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT"),
        publisher = %settings.publisher.name,
        "evbus demo starting"
    );

    let publisher = Publisher::<u32>::with_config(settings.publisher)?;

    let a_seen = Arc::new(Mutex::new(Vec::new()));
    let b_seen = Arc::new(Mutex::new(Vec::new()));

    let a = {
        let seen = a_seen.clone();
        Subscriber::new(&publisher, move |m| seen.lock().push(m))
    };
    let b = {
        let seen = b_seen.clone();
        Subscriber::new(&publisher, move |m| seen.lock().push(m))
    };

    for m in [1, 2] {
        publisher.publish(m);
        publisher.wait().await;
    }
    info!(a = ?a_seen.lock().clone(), b = ?b_seen.lock().clone(), "after two broadcasts");

    a.unsubscribe();
    publisher.publish(3);
    publisher.wait().await;
    info!(a = ?a_seen.lock().clone(), b = ?b_seen.lock().clone(), "after unsubscribing A");

    publisher.stop();
    b.shutdown().await;

    info!(
        metrics = %serde_json::to_string(&publisher.metrics())?,
        "evbus demo finished"
    );

    Ok(())
}
