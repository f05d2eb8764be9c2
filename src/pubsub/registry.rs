use std::{collections::HashMap, fmt};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::wait_group::GroupGuard;

/// Уникальный идентификатор подписчика в пределах одного издателя.
///
/// Выдаётся по возрастанию начиная с 1 и никогда не переиспользуется.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Сообщение в канале доставки вместе с guard'ом незавершённой доставки.
///
/// Guard освобождается, когда колбэк вернул управление или сообщение
/// отброшено, поэтому `Publisher::wait` дожидается и самих колбэков.
pub(crate) struct Envelope<T> {
    pub(crate) message: T,
    pub(crate) _guard: GroupGuard,
}

/// Запись реестра: отправляющая сторона канала и токен закрытия
/// подписчика.
pub(crate) struct Slot<T> {
    pub(crate) sender: mpsc::Sender<Envelope<T>>,
    pub(crate) cancel: CancellationToken,
}

/// Реестр подписчиков издателя.
///
/// Не потокобезопасен сам по себе: издатель держит его под одним
/// мьютексом вместе со счётчиком `last_id`.
pub(crate) struct Registry<T> {
    slots: HashMap<SubscriberId, Slot<T>>,
    last_id: u64,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Registry<T> {
    /// Регистрирует канал и возвращает новый идентификатор `last_id + 1`.
    pub(crate) fn register(
        &mut self,
        sender: mpsc::Sender<Envelope<T>>,
        cancel: CancellationToken,
    ) -> SubscriberId {
        let id = SubscriberId(self.last_id + 1);
        self.slots.insert(id, Slot { sender, cancel });
        self.last_id = id.0;
        id
    }

    /// Удаляет запись. Отсутствующий `id` — не ошибка.
    pub(crate) fn unregister(
        &mut self,
        id: SubscriberId,
    ) -> Option<Slot<T>> {
        self.slots.remove(&id)
    }

    /// Отправители всех ещё открытых подписчиков.
    pub(crate) fn live_senders(&self) -> Vec<(SubscriberId, mpsc::Sender<Envelope<T>>)> {
        self.slots
            .iter()
            .filter(|(_, slot)| !slot.cancel.is_cancelled())
            .map(|(id, slot)| (*id, slot.sender.clone()))
            .collect()
    }

    /// Закрывает все записи, не удаляя их. Возвращает число закрытых
    /// этим вызовом.
    pub(crate) fn close_all(&self) -> usize {
        let mut closed = 0;
        for slot in self.slots.values() {
            if !slot.cancel.is_cancelled() {
                slot.cancel.cancel();
                closed += 1;
            }
        }
        closed
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| !slot.cancel.is_cancelled())
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn contains(
        &self,
        id: SubscriberId,
    ) -> bool {
        self.slots.contains_key(&id)
    }

    pub(crate) fn last_id(&self) -> u64 {
        self.last_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_parts() -> (mpsc::Sender<Envelope<u8>>, CancellationToken) {
        let (tx, _rx) = mpsc::channel(1);
        (tx, CancellationToken::new())
    }

    /// Тест проверяет, что идентификаторы выдаются по порядку с 1.
    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut reg = Registry::<u8>::default();
        let ids: Vec<_> = (0..3)
            .map(|_| {
                let (tx, st) = slot_parts();
                reg.register(tx, st)
            })
            .collect();

        assert_eq!(
            ids.iter().map(|id| id.get()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.last_id(), 3);
    }

    /// Тест проверяет, что после удаления идентификатор не переиспользуется.
    #[test]
    fn test_ids_not_reused_after_unregister() {
        let mut reg = Registry::<u8>::default();
        let (tx, st) = slot_parts();
        let first = reg.register(tx, st);
        assert!(reg.unregister(first).is_some());

        let (tx, st) = slot_parts();
        let second = reg.register(tx, st);
        assert_ne!(first, second);
        assert_eq!(second.get(), 2);
        assert!(!reg.contains(first));
    }

    /// Тест проверяет, что удаление несуществующего id ничего не делает.
    #[test]
    fn test_unregister_unknown_is_noop() {
        let mut reg = Registry::<u8>::default();
        assert!(reg.unregister(SubscriberId(42)).is_none());
        assert_eq!(reg.len(), 0);
    }

    /// Тест проверяет, что `close_all` закрывает записи, не удаляя их, и
    /// повторный вызов ничего не закрывает.
    #[test]
    fn test_close_all_keeps_entries() {
        let mut reg = Registry::<u8>::default();
        for _ in 0..2 {
            let (tx, st) = slot_parts();
            reg.register(tx, st);
        }

        assert_eq!(reg.close_all(), 2);
        assert_eq!(reg.close_all(), 0);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.live_count(), 0);
        assert!(reg.live_senders().is_empty());
    }

    /// Тест проверяет, что `close_all` отменяет токены, которые держат
    /// подписчики, а уже закрытые не считает.
    #[test]
    fn test_close_all_cancels_tokens() {
        let mut reg = Registry::<u8>::default();
        let (tx, first) = slot_parts();
        reg.register(tx, first.clone());
        let (tx, second) = slot_parts();
        reg.register(tx, second.clone());

        second.cancel();
        assert_eq!(reg.live_count(), 1);
        assert_eq!(reg.close_all(), 1);
        assert!(first.is_cancelled());
    }

    #[test]
    fn test_subscriber_id_display() {
        assert_eq!(SubscriberId(7).to_string(), "7");
    }
}
