use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, error::SendError},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{
    handler::Handler,
    metrics::{MetricsSnapshot, PublisherMetrics},
    registry::{Envelope, Registry, SubscriberId},
    wait_group::WaitGroup,
    Subscriber,
};
use crate::{BusResult, PublisherConfig};

/// Общее состояние издателя.
///
/// Подписчики держат на него `Weak`-ссылку: издатель не принадлежит
/// подписчикам и переживает их.
pub(crate) struct Inner<T> {
    /// Реестр подписчиков и счётчик `last_id` под одним мьютексом.
    registry: Mutex<Registry<T>>,
    /// Незавершённые доставки (для `wait`)
    wait_group: WaitGroup,
    pub(crate) metrics: Arc<PublisherMetrics>,
    pub(crate) config: PublisherConfig,
    pub(crate) runtime: Handle,
    stopped: AtomicBool,
}

impl<T> Inner<T> {
    pub(crate) fn register(
        &self,
        sender: mpsc::Sender<Envelope<T>>,
        cancel: CancellationToken,
    ) -> SubscriberId {
        let id = self.registry.lock().register(sender, cancel);
        debug!(publisher = %self.config.name, subscriber = %id, "subscriber registered");
        id
    }

    pub(crate) fn unregister(
        &self,
        id: SubscriberId,
    ) -> bool {
        // Запись (и её отправитель) удаляется уже после освобождения мьютекса.
        let removed = self.registry.lock().unregister(id);
        match removed {
            Some(_) => {
                debug!(publisher = %self.config.name, subscriber = %id, "subscriber unregistered");
                true
            }
            None => false,
        }
    }
}

/// Издатель: реестр подписчиков и рассылка сообщений всем подписчикам.
///
/// Клонирование дешёвое: все клоны разделяют один реестр.
///
/// # Пример
/// ```
/// use evbus::{Publisher, Subscriber};
///
/// # #[tokio::main]
/// # async fn main() {
/// let publisher = Publisher::<u32>::new();
/// let sub = Subscriber::new(&publisher, |n| println!("got {n}"));
///
/// publisher.publish(1);
/// publisher.wait().await;
///
/// sub.unsubscribe();
/// # }
/// ```
pub struct Publisher<T> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<T> Publisher<T>
where
    T: Clone + Send + 'static,
{
    /// Создаёт издателя с настройками по умолчанию в текущем рантайме Tokio.
    ///
    /// # Panics
    /// Паникует, если вызван вне рантайма Tokio (как и `tokio::spawn`).
    /// Для проверяемого варианта используйте [`Publisher::try_new`].
    pub fn new() -> Self {
        Self::from_parts(Handle::current(), PublisherConfig::default())
    }

    /// Как [`Publisher::new`], но без паники вне рантайма.
    pub fn try_new() -> BusResult<Self> {
        Self::with_config(PublisherConfig::default())
    }

    /// Создаёт издателя с заданной конфигурацией в текущем рантайме.
    pub fn with_config(config: PublisherConfig) -> BusResult<Self> {
        Self::with_runtime(Handle::try_current()?, config)
    }

    /// Создаёт издателя, все задачи которого запускаются в `runtime`.
    pub fn with_runtime(
        runtime: Handle,
        config: PublisherConfig,
    ) -> BusResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(runtime, config))
    }

    fn from_parts(
        runtime: Handle,
        config: PublisherConfig,
    ) -> Self {
        debug!(
            publisher = %config.name,
            channel_capacity = config.channel_capacity,
            catch_panics = config.catch_panics,
            "publisher created"
        );
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                wait_group: WaitGroup::default(),
                metrics: Arc::new(PublisherMetrics::new()),
                config,
                runtime,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Подписывает синхронный колбэк. То же, что [`Subscriber::new`].
    pub fn subscribe<F>(
        &self,
        callback: F,
    ) -> Subscriber<T>
    where
        F: FnMut(T) + Send + 'static,
    {
        Subscriber::new(self, callback)
    }

    /// Подписывает произвольный [`Handler`]. То же, что
    /// [`Subscriber::with_handler`].
    pub fn subscribe_with<H>(
        &self,
        handler: H,
    ) -> Subscriber<T>
    where
        H: Handler<T>,
    {
        Subscriber::with_handler(self, handler)
    }

    /// Рассылает сообщение всем открытым подписчикам.
    ///
    /// Мьютекс реестра удерживается только на время перечисления
    /// подписчиков. Каждая доставка выполняется отдельной задачей, поэтому
    /// метод возвращается сразу и не ждёт медленных подписчиков.
    /// Завершение доставок можно дождаться через [`Publisher::wait`].
    ///
    /// Подписчик, закрытый после перечисления, но до получения сообщения,
    /// его не увидит: сообщение отбрасывается.
    pub fn publish(
        &self,
        message: T,
    ) {
        let inner = &self.inner;
        inner.metrics.record_published();

        let targets = inner.registry.lock().live_senders();
        if targets.is_empty() {
            trace!(publisher = %inner.config.name, "publish without subscribers");
            return;
        }
        inner.metrics.record_dispatched(targets.len() as u64);

        for (id, sender) in targets {
            let envelope = Envelope {
                message: message.clone(),
                _guard: inner.wait_group.add(),
            };
            let metrics = inner.metrics.clone();

            inner.runtime.spawn(async move {
                if let Err(SendError(envelope)) = sender.send(envelope).await {
                    metrics.record_dropped();
                    debug!(subscriber = %id, "delivery dropped: subscriber is closed");
                    drop(envelope);
                }
            });
        }
    }

    /// Закрывает всех зарегистрированных подписчиков, не удаляя их из
    /// реестра.
    ///
    /// Задачи доставки отбрасывают ещё не обработанные сообщения и
    /// завершаются. Повторный вызов ничего не делает. Подписчики,
    /// созданные после `stop`, работают как обычно.
    pub fn stop(&self) {
        let closed = self.inner.registry.lock().close_all();
        self.inner.stopped.store(true, Ordering::Release);
        debug!(publisher = %self.inner.config.name, closed, "publisher stopped");
    }

    /// Ждёт завершения всех доставок, запущенных к этому моменту,
    /// включая вызовы колбэков.
    ///
    /// Не мешает параллельным вызовам `publish`: это "слив" очереди, а не
    /// барьер. Если колбэк подписчика завис, `wait` не завершится.
    pub async fn wait(&self) {
        self.inner.wait_group.wait().await;
    }

    /// Удаляет подписчика из реестра. Отсутствующий `id` — не ошибка.
    ///
    /// Возвращает `true`, если запись была удалена этим вызовом.
    pub fn unregister(
        &self,
        id: SubscriberId,
    ) -> bool {
        self.inner.unregister(id)
    }

    /// Кол-во зарегистрированных и ещё не закрытых подписчиков.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().live_count()
    }

    /// Проверяет, есть ли запись с таким `id` в реестре (в том числе
    /// закрытая через `stop`).
    pub fn is_registered(
        &self,
        id: SubscriberId,
    ) -> bool {
        self.inner.registry.lock().contains(id)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Кол-во доставок, которые ещё не завершились.
    pub fn in_flight(&self) -> usize {
        self.inner.wait_group.count()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.inner.config
    }

    pub(crate) fn register(
        &self,
        sender: mpsc::Sender<Envelope<T>>,
        cancel: CancellationToken,
    ) -> SubscriberId {
        self.inner.register(sender, cancel)
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner<T>> {
        Arc::downgrade(&self.inner)
    }
}

impl<T> fmt::Debug for Publisher<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("Publisher")
            .field("name", &self.inner.config.name)
            .field("registered", &registry.len())
            .field("live", &registry.live_count())
            .field("last_id", &registry.last_id())
            .field("in_flight", &self.inner.wait_group.count())
            .field("stopped", &self.inner.stopped.load(Ordering::Acquire))
            .finish()
    }
}
