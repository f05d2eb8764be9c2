use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Weak},
};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, trace, warn, Instrument};

use super::{
    handler::{handler_fn, Handler},
    metrics::PublisherMetrics,
    publisher::Inner,
    registry::{Envelope, SubscriberId},
    Publisher,
};

/// Подписчик издателя.
///
/// Владеет каналом доставки и выделенной задачей, которая вызывает
/// колбэк для каждого сообщения по порядку, никогда не параллельно.
///
/// Отписка происходит автоматически при `Drop`.
#[must_use = "dropping a Subscriber unsubscribes it immediately"]
pub struct Subscriber<T> {
    id: SubscriberId,
    cancel: CancellationToken,
    /// Обратная ссылка на издателя (не владение)
    publisher: Weak<Inner<T>>,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscriber<T>
where
    T: Clone + Send + 'static,
{
    /// Создаёт подписчика с синхронным колбэком и сразу запускает его
    /// задачу доставки.
    pub fn new<F>(
        publisher: &Publisher<T>,
        callback: F,
    ) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        Self::with_handler(publisher, handler_fn(callback))
    }

    /// Создаёт подписчика с произвольным [`Handler`].
    pub fn with_handler<H>(
        publisher: &Publisher<T>,
        handler: H,
    ) -> Self
    where
        H: Handler<T>,
    {
        let inner = &publisher.inner;
        let (sender, receiver) = mpsc::channel(inner.config.channel_capacity);
        let cancel = CancellationToken::new();
        let id = publisher.register(sender, cancel.clone());

        let span = info_span!(
            "subscriber",
            publisher = %inner.config.name,
            id = id.get(),
            handler = handler.name()
        );
        let delivery = Delivery {
            id,
            handler,
            receiver,
            cancel: cancel.clone(),
            metrics: inner.metrics.clone(),
            catch_panics: inner.config.catch_panics,
        };
        let task = inner.runtime.spawn(delivery.run().instrument(span));

        Self {
            id,
            cancel,
            publisher: publisher.downgrade(),
            task: Some(task),
        }
    }
}

impl<T> Subscriber<T> {
    /// Идентификатор, выданный издателем.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Закрыт ли подписчик (`unsubscribe`, `stop` или завершение задачи).
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Завершилась ли задача доставки.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Отписывается: удаляет запись из реестра издателя и закрывает канал.
    ///
    /// После возврата колбэк больше не вызывается для новых сообщений
    /// (уже выполняющийся вызов завершится). Метод поглощает `self`,
    /// поэтому повторная отписка невозможна; отписка после
    /// `Publisher::stop` безопасна.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Отписывается и ждёт завершения задачи доставки.
    pub async fn shutdown(mut self) {
        self.detach();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!(subscriber = %self.id, "delivery task terminated by panic");
                }
            }
        }
    }

    fn detach(&mut self) {
        if let Some(inner) = self.publisher.upgrade() {
            inner.unregister(self.id);
        }
        self.publisher = Weak::new();

        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            debug!(subscriber = %self.id, "subscriber closed");
        }
    }
}

impl<T> Drop for Subscriber<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("finished", &self.is_finished())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Задача доставки
////////////////////////////////////////////////////////////////////////////////

struct Delivery<T, H> {
    id: SubscriberId,
    handler: H,
    receiver: mpsc::Receiver<Envelope<T>>,
    cancel: CancellationToken,
    metrics: Arc<PublisherMetrics>,
    catch_panics: bool,
}

impl<T, H> Delivery<T, H>
where
    T: Send + 'static,
    H: Handler<T>,
{
    async fn run(mut self) {
        // Задача, снятая рантаймом, тоже помечает подписчика закрытым.
        let _close_on_exit = self.cancel.clone().drop_guard();
        trace!("delivery task started");

        let mut unwinding = None;
        loop {
            let envelope = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                envelope = self.receiver.recv() => envelope,
            };
            // `None`: издатель уничтожен или запись удалена через
            // `unregister`, и все отправители завершились.
            let Some(envelope) = envelope else {
                break;
            };
            if let Some(payload) = self.deliver(envelope).await {
                unwinding = Some(payload);
                break;
            }
        }
        self.cancel.cancel();

        // Сообщения, поставленные в очередь до закрытия, колбэк не увидит.
        self.receiver.close();
        let mut discarded = 0u64;
        while let Some(envelope) = self.receiver.recv().await {
            self.metrics.record_dropped();
            discarded += 1;
            drop(envelope);
        }

        debug!(subscriber = %self.id, discarded, "delivery task finished");

        if let Some(payload) = unwinding {
            panic::resume_unwind(payload);
        }
    }

    /// Вызывает обработчик для одного сообщения.
    ///
    /// Возвращает payload паники, если её нужно пробросить дальше
    /// (`catch_panics = false`).
    async fn deliver(
        &mut self,
        envelope: Envelope<T>,
    ) -> Option<Box<dyn Any + Send>> {
        // Guard живёт до конца вызова колбэка.
        let Envelope { message, _guard } = envelope;

        if self.cancel.is_cancelled() {
            self.metrics.record_dropped();
            return None;
        }

        match AssertUnwindSafe(self.handler.handle(message))
            .catch_unwind()
            .await
        {
            Ok(()) => {
                self.metrics.record_delivered();
                None
            }
            Err(payload) => {
                self.metrics.record_panicked();
                error!(
                    subscriber = %self.id,
                    handler = self.handler.name(),
                    panic = %panic_message(payload.as_ref()),
                    resumed = !self.catch_panics,
                    "subscriber callback panicked"
                );
                (!self.catch_panics).then_some(payload)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
