use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Счётчики издателя.
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Кол-во вызовов `publish`
    published: AtomicU64,
    /// Кол-во запущенных доставок (по одной на подписчика в каждом `publish`)
    dispatched: AtomicU64,
    /// Кол-во сообщений, обработанных колбэком без паники
    delivered: AtomicU64,
    /// Кол-во сообщений, отброшенных из-за закрытого подписчика
    dropped: AtomicU64,
    /// Кол-во перехваченных паник в колбэках
    panicked: AtomicU64,
}

/// Снимок счётчиков на момент вызова [`PublisherMetrics::snapshot`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub dispatched: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub panicked: u64,
}

impl PublisherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(
        &self,
        count: u64,
    ) {
        self.dispatched.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}
