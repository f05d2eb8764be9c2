use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    notify: Notify,
}

/// Счётчик незавершённых доставок.
///
/// Каждая доставка держит [`GroupGuard`]; счётчик уменьшается при drop
/// guard'а, а [`WaitGroup::wait`] ждёт, пока он не станет нулём.
#[derive(Debug, Default, Clone)]
pub(crate) struct WaitGroup {
    inner: Arc<Inner>,
}

/// Guard одной незавершённой доставки.
#[derive(Debug)]
pub(crate) struct GroupGuard(Arc<Inner>);

impl WaitGroup {
    pub(crate) fn add(&self) -> GroupGuard {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        GroupGuard(self.inner.clone())
    }

    pub(crate) fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    pub(crate) async fn wait(&self) {
        loop {
            if self.count() == 0 {
                break;
            }

            // `Notified` получает уведомления от `notify_waiters` сразу
            // после создания, поэтому повторная проверка исключает гонку.
            let notified = self.inner.notify.notified();

            if self.count() == 0 {
                break;
            }

            notified.await;
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.notify.notify_waiters();
        }
    }
}
