//! Обработчики сообщений подписчика.
//!
//! [`Handler`] — точка расширения: задача доставки подписчика вызывает
//! [`Handler::handle`] для каждого сообщения строго по очереди.
//! Замыкания превращаются в обработчики через [`handler_fn`] и
//! [`async_handler_fn`].

use std::{future::Future, marker::PhantomData};

use async_trait::async_trait;

/// Обработчик сообщений одного подписчика.
///
/// Вызывается из выделенной задачи доставки, никогда не параллельно
/// самому себе, в порядке получения сообщений.
#[async_trait]
pub trait Handler<T: Send + 'static>: Send + 'static {
    /// Обрабатывает одно сообщение.
    async fn handle(
        &mut self,
        message: T,
    );

    /// Имя обработчика для логов.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Синхронное замыкание в роли обработчика.
pub struct FnHandler<T, F> {
    f: F,
    name: &'static str,
    _marker: PhantomData<fn(T)>,
}

/// Асинхронное замыкание в роли обработчика.
pub struct AsyncFnHandler<T, F> {
    f: F,
    name: &'static str,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> FnHandler<T, F> {
    /// Задаёт имя обработчика для логов.
    pub fn named(
        mut self,
        name: &'static str,
    ) -> Self {
        self.name = name;
        self
    }
}

impl<T, F> AsyncFnHandler<T, F> {
    /// Задаёт имя обработчика для логов.
    pub fn named(
        mut self,
        name: &'static str,
    ) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl<T, F> Handler<T> for FnHandler<T, F>
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    #[inline]
    async fn handle(
        &mut self,
        message: T,
    ) {
        (self.f)(message);
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[async_trait]
impl<T, F, Fut> Handler<T> for AsyncFnHandler<T, F>
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    #[inline]
    async fn handle(
        &mut self,
        message: T,
    ) {
        (self.f)(message).await;
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Оборачивает синхронное замыкание в [`Handler`].
///
/// Замыкание выполняется прямо в задаче доставки: долгие блокирующие
/// вызовы занимают поток рантайма.
#[inline]
pub fn handler_fn<T, F>(f: F) -> FnHandler<T, F>
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    FnHandler {
        f,
        name: "fn",
        _marker: PhantomData,
    }
}

/// Оборачивает асинхронное замыкание в [`Handler`].
#[inline]
pub fn async_handler_fn<T, F, Fut>(f: F) -> AsyncFnHandler<T, F>
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    AsyncFnHandler {
        f,
        name: "async_fn",
        _marker: PhantomData,
    }
}
